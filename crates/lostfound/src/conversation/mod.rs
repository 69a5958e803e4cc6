//! The conversation engine.
//!
//! [`Bot`] takes one [`InboundEvent`] at a time per identity, advances that
//! identity's [`Flow`], reads and writes the [`Registry`], and answers through
//! a [`ChatTransport`]. Onboarding collects a profile; reporting appends a
//! report, posts it to the broadcast channel, and for found IDs tries to reach
//! the registered owner.

pub mod flow;
pub mod locks;
pub mod menu;
pub(crate) mod messages;

use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::error::{Error, Result};
use crate::model::{Identity, ItemKind, Profile, Report, ReportSubject};
use crate::storage::Registry;
use crate::transport::{ChatTarget, ChatTransport, EventKind, InboundEvent};

pub use flow::{Flow, MemoryStateStore, StateStore};
pub use locks::{IdentityGuard, IdentityLocks, Ticket};
pub use menu::{MenuChoice, ITEM_TYPE_NO, ITEM_TYPE_YES};

/// Behaviour knobs of the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotSettings {
    /// Where reports are posted.
    pub channel: ChatTarget,
    /// Whether the main menu offers "Browse Items".
    pub show_browse_button: bool,
    /// Reply to `/help`.
    pub help_text: String,
}

/// The conversation state machine plus its collaborators.
#[derive(Debug, Clone)]
pub struct Bot {
    registry: Registry,
    transport: Arc<dyn ChatTransport>,
    states: Arc<dyn StateStore>,
    locks: IdentityLocks,
    settings: BotSettings,
}

impl Bot {
    /// Create a bot keeping flows in process memory.
    #[must_use]
    pub fn new(registry: Registry, transport: Arc<dyn ChatTransport>, settings: BotSettings) -> Self {
        Self::with_state_store(registry, transport, Arc::new(MemoryStateStore::new()), settings)
    }

    /// Create a bot with an explicit state store.
    #[must_use]
    pub fn with_state_store(
        registry: Registry,
        transport: Arc<dyn ChatTransport>,
        states: Arc<dyn StateStore>,
        settings: BotSettings,
    ) -> Self {
        Self {
            registry,
            transport,
            states,
            locks: IdentityLocks::new(),
            settings,
        }
    }

    /// Get the settings.
    #[must_use]
    pub fn settings(&self) -> &BotSettings {
        &self.settings
    }

    /// Current flow of `identity`.
    #[must_use]
    pub fn flow(&self, identity: Identity) -> Option<Flow> {
        self.states.get(identity)
    }

    /// Number of identities in the middle of a flow.
    #[must_use]
    pub fn active_flows(&self) -> usize {
        self.states.active()
    }

    /// Handle one event.
    ///
    /// Events from the same identity are processed one at a time. Failures
    /// are logged and answered with a generic apology; the identity's flow is
    /// left as it was.
    pub async fn handle(&self, event: InboundEvent) {
        let ticket = self.reserve(&event);
        self.handle_in_turn(ticket, event).await;
    }

    /// Reserve `event`'s place among events of the same identity.
    ///
    /// Events are handled in reservation order, so callers that hand events
    /// to other tasks reserve before spawning.
    #[must_use]
    pub fn reserve(&self, event: &InboundEvent) -> Ticket {
        self.locks.reserve(event.identity)
    }

    /// Handle `event` once every earlier reservation of its identity is done.
    pub async fn handle_in_turn(&self, ticket: Ticket, event: InboundEvent) {
        let span = info_span!("event", identity = %event.identity, kind = event.kind_name());
        async {
            let _guard = ticket.wait().await;
            match self.dispatch(&event).await {
                Ok(()) => {}
                Err(Error::ProfileMissing(identity)) => {
                    warn!("No profile for {}, restarting onboarding", identity);
                    if let Err(e) = self
                        .begin_onboarding(&event, messages::REGISTRATION_REQUIRED)
                        .await
                    {
                        error!("Failed to restart onboarding: {}", e);
                    }
                }
                Err(e) => {
                    error!("Failed to handle {} event: {}", event.kind_name(), e);
                    if let Err(e) = self
                        .transport
                        .send_text(&event.chat, messages::GENERIC_ERROR, None)
                        .await
                    {
                        error!("Failed to send error reply: {}", e);
                    }
                }
            }
        }
        .instrument(span)
        .await;
    }

    /// Advance the flow for one event without error recovery.
    ///
    /// Callers must serialize events per identity; [`Bot::handle`] does.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProfileMissing`] when a report is completed by an
    /// identity without a profile, and store or transport errors otherwise.
    pub async fn dispatch(&self, event: &InboundEvent) -> Result<()> {
        let flow = self.states.get(event.identity);
        debug!(
            "Dispatching with flow {}",
            flow.as_ref().map_or("idle", Flow::stage)
        );

        match &event.kind {
            EventKind::Start => self.start(event).await,
            EventKind::Help => {
                self.transport
                    .send_text(&event.chat, &self.settings.help_text, None)
                    .await
            }
            EventKind::Text(text) => self.text(event, flow, text).await,
            EventKind::Photo { file_id, caption } => match flow {
                Some(Flow::AwaitDescription { kind }) => {
                    self.report_photo(event, kind, file_id, caption.as_deref())
                        .await
                }
                _ => {
                    debug!("Ignoring photo outside of an item description");
                    Ok(())
                }
            },
            EventKind::Button { callback_id, data } => {
                self.button(event, flow, callback_id, data).await
            }
        }
    }

    async fn start(&self, event: &InboundEvent) -> Result<()> {
        if self.registry.profile(event.identity).await?.is_some() {
            self.states.clear(event.identity);
            self.show_menu(&event.chat).await
        } else {
            self.begin_onboarding(event, messages::WELCOME).await
        }
    }

    async fn begin_onboarding(&self, event: &InboundEvent, prompt: &str) -> Result<()> {
        self.states.set(event.identity, Flow::AwaitName);
        self.reply(event, prompt).await
    }

    async fn text(&self, event: &InboundEvent, flow: Option<Flow>, text: &str) -> Result<()> {
        let identity = event.identity;

        // Onboarding answers are taken verbatim, even if they match a menu label.
        match flow {
            Some(Flow::AwaitName) => {
                self.states.set(
                    identity,
                    Flow::AwaitPhone {
                        name: text.to_string(),
                    },
                );
                return self.reply(event, messages::ASK_PHONE).await;
            }
            Some(Flow::AwaitPhone { name }) => {
                self.states.set(
                    identity,
                    Flow::AwaitIdNumber {
                        name,
                        phone_number: text.to_string(),
                    },
                );
                return self.reply(event, messages::ASK_ID_NUMBER).await;
            }
            Some(Flow::AwaitIdNumber { name, phone_number }) => {
                let profile = Profile::new(identity, name, phone_number, text);
                self.registry.save_profile(identity, &profile).await?;
                info!("Registered profile for {}", identity);
                self.states.clear(identity);
                return self.show_menu(&event.chat).await;
            }
            _ => {}
        }

        match MenuChoice::parse(text) {
            Some(MenuChoice::Report(kind)) => return self.begin_report(event, kind).await,
            Some(MenuChoice::Browse) => return self.browse(event).await,
            None => {}
        }

        match flow {
            Some(Flow::AwaitReportIdNumber { kind }) => self.report_id(event, kind, text).await,
            Some(Flow::AwaitDescription { kind }) => {
                let reporter = self.reporter(event).await?;
                let subject = ReportSubject::Description {
                    text: text.to_string(),
                    photo_url: None,
                };
                self.file_report(event, kind, &reporter, subject, None)
                    .await?;
                self.reply(event, &messages::item_reported(kind, false))
                    .await?;
                self.finish(event).await
            }
            _ => self.show_menu(&event.chat).await,
        }
    }

    async fn begin_report(&self, event: &InboundEvent, kind: ItemKind) -> Result<()> {
        if self.registry.profile(event.identity).await?.is_none() {
            return Err(Error::ProfileMissing(event.identity));
        }
        self.states.set(event.identity, Flow::AwaitItemKind { kind });
        self.transport
            .send_text(
                &event.chat,
                messages::ASK_ITEM_KIND,
                Some(&menu::item_kind_keyboard()),
            )
            .await
    }

    async fn button(
        &self,
        event: &InboundEvent,
        flow: Option<Flow>,
        callback_id: &str,
        data: &str,
    ) -> Result<()> {
        self.transport.answer_button(callback_id).await?;

        let kind = flow.as_ref().and_then(Flow::report_kind);
        match (kind, data) {
            (Some(kind), ITEM_TYPE_YES) => {
                self.states
                    .set(event.identity, Flow::AwaitReportIdNumber { kind });
                self.reply(event, messages::ASK_REPORT_ID_NUMBER).await
            }
            (Some(kind), ITEM_TYPE_NO) => {
                self.states.set(event.identity, Flow::AwaitDescription { kind });
                self.reply(event, messages::ASK_DESCRIPTION).await
            }
            _ => {
                debug!("Stale button press {:?}", data);
                self.show_menu(&event.chat).await
            }
        }
    }

    async fn report_id(&self, event: &InboundEvent, kind: ItemKind, id_number: &str) -> Result<()> {
        let reporter = self.reporter(event).await?;
        let subject = ReportSubject::IdNumber(id_number.to_string());
        self.file_report(event, kind, &reporter, subject, None)
            .await?;

        let reply = match kind {
            ItemKind::Lost => messages::LOST_ID_REPORTED,
            ItemKind::Found => {
                if self.notify_owner(id_number, &reporter).await {
                    messages::OWNER_NOTIFIED
                } else {
                    messages::OWNER_UNKNOWN
                }
            }
        };
        self.reply(event, reply).await?;
        self.finish(event).await
    }

    async fn report_photo(
        &self,
        event: &InboundEvent,
        kind: ItemKind,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<()> {
        let reporter = self.reporter(event).await?;
        let link = self.transport.resolve_file_link(file_id).await?;
        let subject = ReportSubject::Description {
            text: caption.unwrap_or_default().to_string(),
            photo_url: Some(link),
        };
        self.file_report(event, kind, &reporter, subject, Some(file_id))
            .await?;
        self.reply(event, &messages::item_reported(kind, true))
            .await?;
        self.finish(event).await
    }

    /// Profile of the identity completing a report.
    async fn reporter(&self, event: &InboundEvent) -> Result<Profile> {
        self.registry
            .profile(event.identity)
            .await?
            .ok_or(Error::ProfileMissing(event.identity))
    }

    /// Store a report and post it to the channel.
    async fn file_report(
        &self,
        event: &InboundEvent,
        kind: ItemKind,
        reporter: &Profile,
        subject: ReportSubject,
        photo: Option<&str>,
    ) -> Result<()> {
        let post = messages::broadcast(kind, reporter, &subject);
        let report = Report::new(kind, subject, event.identity);
        let key = self.registry.append_report(&report).await?;
        info!("Filed {} report {}", kind, key);

        match photo {
            Some(file_id) => {
                self.transport
                    .send_photo(&self.settings.channel, file_id, &post)
                    .await?;
            }
            None => {
                self.transport
                    .send_text(&self.settings.channel, &post, None)
                    .await?;
            }
        }
        Ok(())
    }

    /// Tell the owner of `id_number` that `finder` has their ID.
    ///
    /// Lookup and delivery failures count as "owner not found".
    async fn notify_owner(&self, id_number: &str, finder: &Profile) -> bool {
        let owner = match self.registry.find_by_id_number(id_number).await {
            Ok(Some(profile)) => profile,
            Ok(None) => return false,
            Err(e) => {
                warn!("Owner lookup failed: {}", e);
                return false;
            }
        };
        let Some(owner_identity) = owner.identity else {
            debug!("Owner profile has no chat identity");
            return false;
        };

        match self
            .transport
            .send_text(
                &ChatTarget::direct(owner_identity),
                &messages::owner_notice(finder),
                None,
            )
            .await
        {
            Ok(()) => {
                info!("Notified owner {} of found ID", owner_identity);
                true
            }
            Err(e) => {
                warn!("Failed to notify owner {}: {}", owner_identity, e);
                false
            }
        }
    }

    async fn browse(&self, event: &InboundEvent) -> Result<()> {
        let reports = self.registry.reports().await?;
        self.reply(event, &messages::listing(&reports)).await
    }

    async fn finish(&self, event: &InboundEvent) -> Result<()> {
        self.states.clear(event.identity);
        self.show_menu(&event.chat).await
    }

    async fn reply(&self, event: &InboundEvent, text: &str) -> Result<()> {
        self.transport.send_text(&event.chat, text, None).await
    }

    async fn show_menu(&self, chat: &ChatTarget) -> Result<()> {
        menu::show_main_menu(
            self.transport.as_ref(),
            chat,
            self.settings.show_browse_button,
        )
        .await
    }
}
