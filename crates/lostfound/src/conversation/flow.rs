//! Per-identity conversation state.
//!
//! An identity with no stored [`Flow`] is idle. Every step of a guided
//! interaction replaces the stored flow, and completing a flow clears it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::model::{Identity, ItemKind};

/// Where an identity is inside a guided interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Onboarding: waiting for the full name.
    AwaitName,
    /// Onboarding: waiting for the phone number.
    AwaitPhone {
        /// Name given in the previous step.
        name: String,
    },
    /// Onboarding: waiting for the user's own ID number.
    AwaitIdNumber {
        /// Name given earlier.
        name: String,
        /// Phone number given in the previous step.
        phone_number: String,
    },
    /// Reporting: waiting for the "is this an ID?" answer.
    AwaitItemKind {
        /// Lost or found.
        kind: ItemKind,
    },
    /// Reporting an ID: waiting for its number.
    AwaitReportIdNumber {
        /// Lost or found.
        kind: ItemKind,
    },
    /// Reporting an item: waiting for a description or photo.
    AwaitDescription {
        /// Lost or found.
        kind: ItemKind,
    },
}

impl Flow {
    /// Report kind carried by a reporting flow.
    #[must_use]
    pub fn report_kind(&self) -> Option<ItemKind> {
        match self {
            Self::AwaitItemKind { kind }
            | Self::AwaitReportIdNumber { kind }
            | Self::AwaitDescription { kind } => Some(*kind),
            Self::AwaitName | Self::AwaitPhone { .. } | Self::AwaitIdNumber { .. } => None,
        }
    }

    /// Short name of the stage, for logs.
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::AwaitName => "await_name",
            Self::AwaitPhone { .. } => "await_phone",
            Self::AwaitIdNumber { .. } => "await_id_number",
            Self::AwaitItemKind { .. } => "await_item_kind",
            Self::AwaitReportIdNumber { .. } => "await_report_id_number",
            Self::AwaitDescription { .. } => "await_description",
        }
    }
}

/// Storage for in-progress flows, keyed by identity.
pub trait StateStore: Send + Sync + std::fmt::Debug {
    /// Current flow of `identity`, or `None` when idle.
    fn get(&self, identity: Identity) -> Option<Flow>;

    /// Replace the flow of `identity`.
    fn set(&self, identity: Identity, flow: Flow);

    /// Return `identity` to idle.
    fn clear(&self, identity: Identity);

    /// Number of identities currently inside a flow.
    fn active(&self) -> usize;
}

/// Process-memory state store. Flows are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    flows: Mutex<HashMap<Identity, Flow>>,
}

impl MemoryStateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn flows(&self) -> MutexGuard<'_, HashMap<Identity, Flow>> {
        // A panic while holding the map cannot leave it half-written.
        self.flows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, identity: Identity) -> Option<Flow> {
        self.flows().get(&identity).cloned()
    }

    fn set(&self, identity: Identity, flow: Flow) {
        self.flows().insert(identity, flow);
    }

    fn clear(&self, identity: Identity) {
        self.flows().remove(&identity);
    }

    fn active(&self) -> usize {
        self.flows().len()
    }
}
