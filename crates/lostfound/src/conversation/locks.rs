//! Per-identity serialization of event handling.
//!
//! Each identity has a lane of numbered tickets. A ticket is taken
//! synchronously, in arrival order, and its holder may only proceed once every
//! earlier ticket of the same identity has been released or abandoned. Taking
//! the ticket before spawning the handler keeps one identity's events in the
//! order they were received, whichever task the runtime polls first.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::model::Identity;

#[derive(Debug)]
struct Lane {
    /// Next ticket number to hand out.
    issued: u64,
    /// Ticket number currently allowed to run.
    turn: watch::Sender<u64>,
    /// Tickets dropped before their turn came.
    abandoned: BTreeSet<u64>,
}

impl Lane {
    fn new() -> Self {
        Self {
            issued: 0,
            turn: watch::channel(0).0,
            abandoned: BTreeSet::new(),
        }
    }
}

type LaneMap = HashMap<Identity, Lane>;

/// Hands out ordered turns per identity.
///
/// Entries exist only while some ticket of the identity is outstanding.
#[derive(Debug, Default, Clone)]
pub struct IdentityLocks {
    lanes: Arc<Mutex<LaneMap>>,
}

impl IdentityLocks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next place in `identity`'s queue without waiting.
    #[must_use]
    pub fn reserve(&self, identity: Identity) -> Ticket {
        let mut lanes = lane_map(&self.lanes);
        let lane = lanes.entry(identity).or_insert_with(Lane::new);
        let number = lane.issued;
        lane.issued += 1;
        Ticket {
            identity,
            number,
            turn: lane.turn.subscribe(),
            locks: self.clone(),
            done: false,
        }
    }

    /// Queue behind every earlier holder of `identity` and wait for the turn.
    pub async fn acquire(&self, identity: Identity) -> IdentityGuard {
        self.reserve(identity).wait().await
    }

    /// Number of identities with outstanding tickets.
    #[must_use]
    pub fn tracked(&self) -> usize {
        lane_map(&self.lanes).len()
    }

    /// Give up ticket `number`, passing the turn on if it was this ticket's.
    fn release(&self, identity: Identity, number: u64) {
        let mut lanes = lane_map(&self.lanes);
        let Some(lane) = lanes.get_mut(&identity) else {
            return;
        };
        if *lane.turn.borrow() != number {
            lane.abandoned.insert(number);
            return;
        }

        let mut next = number + 1;
        while lane.abandoned.remove(&next) {
            next += 1;
        }
        if next == lane.issued {
            lanes.remove(&identity);
        } else {
            lane.turn.send_replace(next);
        }
    }
}

/// A reserved place in one identity's queue.
///
/// Dropping a ticket without waiting on it gives up its place.
#[derive(Debug)]
pub struct Ticket {
    identity: Identity,
    number: u64,
    turn: watch::Receiver<u64>,
    locks: IdentityLocks,
    done: bool,
}

impl Ticket {
    /// Identity this ticket queues for.
    #[must_use]
    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// Wait until every earlier ticket of the identity is released.
    pub async fn wait(mut self) -> IdentityGuard {
        let number = self.number;
        // The lane, and its sender, outlive every outstanding ticket.
        let _ = self.turn.wait_for(|turn| *turn == number).await;
        self.done = true;
        IdentityGuard {
            identity: self.identity,
            number,
            locks: self.locks.clone(),
        }
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if !self.done {
            self.locks.release(self.identity, self.number);
        }
    }
}

/// Exclusive hold on one identity.
#[derive(Debug)]
pub struct IdentityGuard {
    identity: Identity,
    number: u64,
    locks: IdentityLocks,
}

impl Drop for IdentityGuard {
    fn drop(&mut self) {
        self.locks.release(self.identity, self.number);
    }
}

fn lane_map(lanes: &Mutex<LaneMap>) -> MutexGuard<'_, LaneMap> {
    lanes.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let locks = IdentityLocks::new();
        {
            let _guard = locks.acquire(Identity(42)).await;
            assert_eq!(locks.tracked(), 1);
        }
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn test_different_identities_do_not_block() {
        let locks = IdentityLocks::new();
        let _a = locks.acquire(Identity(1)).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(Identity(2))).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_same_identity_is_serialized() {
        let locks = IdentityLocks::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = Arc::clone(&inside);
            let max_inside = Arc::clone(&max_inside);
            tasks.push(tokio::spawn(async move {
                let _guard = locks.acquire(Identity(7)).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn test_waiter_keeps_entry_alive() {
        let locks = IdentityLocks::new();
        let first = locks.acquire(Identity(5)).await;

        let waiter_locks = locks.clone();
        let waiter = tokio::spawn(async move {
            let _guard = waiter_locks.acquire(Identity(5)).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(first);
        assert_eq!(locks.tracked(), 1);

        waiter.await.unwrap();
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_turns_follow_reservation_order() {
        let locks = IdentityLocks::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let tickets: Vec<Ticket> = (0..16).map(|_| locks.reserve(Identity(9))).collect();
        let mut tasks = Vec::new();
        // Spawn in reverse so the runtime tends to poll later tickets first.
        for (i, ticket) in tickets.into_iter().enumerate().rev() {
            assert_eq!(ticket.identity(), Identity(9));
            let order = Arc::clone(&order);
            tasks.push(tokio::spawn(async move {
                let _guard = ticket.wait().await;
                order.lock().unwrap().push(i);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), (0..16).collect::<Vec<_>>());
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn test_dropped_ticket_passes_its_turn() {
        let locks = IdentityLocks::new();
        let first = locks.acquire(Identity(3)).await;
        let skipped = locks.reserve(Identity(3));
        let last = locks.reserve(Identity(3));

        drop(skipped);
        drop(first);

        let guard = tokio::time::timeout(Duration::from_millis(100), last.wait()).await;
        assert!(guard.is_ok());
        drop(guard);
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn test_dropped_ticket_at_its_turn() {
        let locks = IdentityLocks::new();
        let unused = locks.reserve(Identity(4));
        let next = locks.reserve(Identity(4));

        drop(unused);

        let guard = tokio::time::timeout(Duration::from_millis(100), next.wait()).await;
        assert!(guard.is_ok());
        drop(guard);
        assert_eq!(locks.tracked(), 0);
    }
}
