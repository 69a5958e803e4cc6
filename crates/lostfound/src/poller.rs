//! Long-polling loop feeding platform updates to the bot.
//!
//! The loop fetches updates one batch at a time, advances the offset past
//! every update it has seen, and spawns one handler task per event. Each
//! event's turn is reserved before its task is spawned, so handlers for the
//! same identity run one at a time in arrival order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lostfound_telegram::{Client, Update};
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::conversation::Bot;
use crate::error::Result;
use crate::transport::telegram::event_from_update;

/// Somewhere updates come from.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Fetch updates with id at least `offset`, waiting up to `timeout_secs`
    /// for one to arrive.
    async fn fetch(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>>;
}

#[async_trait]
impl UpdateSource for Client {
    async fn fetch(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        self.get_updates(offset, timeout_secs).await.map_err(|e| {
            if e.is_api_error() {
                // A rejected token or a second poller on the same bot.
                error!("Bot API rejected getUpdates: {}", e);
            }
            e.into()
        })
    }
}

/// Polling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// Long-poll timeout passed to the platform.
    pub timeout_secs: u64,
    /// Pause after a failed fetch.
    pub retry_delay: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            retry_delay: Duration::from_secs(3),
        }
    }
}

/// A cloneable handle that stops a running poller.
#[derive(Debug, Clone, Default)]
pub struct PollerHandle {
    stop_signal: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl PollerHandle {
    /// Create a new handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the poller to stop.
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Check if the stop signal has been sent.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }

    /// Resolve once [`PollerHandle::stop`] has been called.
    pub async fn stopped(&self) {
        loop {
            let notified = self.notify.notified();
            if self.should_stop() {
                return;
            }
            notified.await;
        }
    }
}

/// Counters reported when the poller exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollerStats {
    /// Updates received from the source.
    pub updates: u64,
    /// Updates that did not map to an event.
    pub ignored: u64,
    /// Failed fetches.
    pub fetch_errors: u64,
}

/// Drives a [`Bot`] from an [`UpdateSource`].
#[derive(Debug)]
pub struct Poller<S> {
    source: S,
    bot: Bot,
    config: PollerConfig,
    handle: PollerHandle,
}

impl<S: UpdateSource> Poller<S> {
    /// Create a poller.
    #[must_use]
    pub fn new(source: S, bot: Bot, config: PollerConfig) -> Self {
        Self {
            source,
            bot,
            config,
            handle: PollerHandle::new(),
        }
    }

    /// Get a handle that can stop this poller.
    #[must_use]
    pub fn handle(&self) -> PollerHandle {
        self.handle.clone()
    }

    /// Poll until stopped, then wait for in-flight handlers.
    ///
    /// Fetch failures are logged and retried after the configured delay.
    pub async fn run(self) -> PollerStats {
        let mut stats = PollerStats::default();
        let mut tasks = JoinSet::new();
        let mut offset: Option<i64> = None;

        info!(
            "Polling for updates (timeout {}s)",
            self.config.timeout_secs
        );

        while !self.handle.should_stop() {
            let fetched = tokio::select! {
                result = self.source.fetch(offset, self.config.timeout_secs) => result,
                () = self.handle.stopped() => break,
            };

            match fetched {
                Ok(updates) => {
                    debug!("Fetched {} updates", updates.len());
                    for update in updates {
                        stats.updates += 1;
                        offset = Some(offset.map_or(update.update_id + 1, |o| {
                            o.max(update.update_id + 1)
                        }));
                        match event_from_update(&update) {
                            Some(event) => {
                                let bot = self.bot.clone();
                                let ticket = bot.reserve(&event);
                                tasks.spawn(async move {
                                    bot.handle_in_turn(ticket, event).await;
                                });
                            }
                            None => {
                                stats.ignored += 1;
                                debug!("Ignoring update {}", update.update_id);
                            }
                        }
                    }
                }
                Err(e) => {
                    stats.fetch_errors += 1;
                    warn!("Failed to fetch updates: {}", e);
                    tokio::select! {
                        () = tokio::time::sleep(self.config.retry_delay) => {}
                        () = self.handle.stopped() => break,
                    }
                }
            }

            while let Some(joined) = tasks.try_join_next() {
                if let Err(e) = joined {
                    error!("Event handler panicked: {}", e);
                }
            }
        }

        if !tasks.is_empty() {
            info!("Waiting for {} in-flight handlers", tasks.len());
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Event handler panicked: {}", e);
            }
        }

        let abandoned = self.bot.active_flows();
        if abandoned > 0 {
            info!("{} conversations were in progress at shutdown", abandoned);
        }
        info!(
            "Poller stopped after {} updates ({} ignored, {} fetch errors)",
            stats.updates, stats.ignored, stats.fetch_errors
        );
        stats
    }
}

/// Stop `handle` when the process receives Ctrl-C.
pub fn stop_on_ctrl_c(handle: PollerHandle) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, shutting down");
                handle.stop();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });
}
