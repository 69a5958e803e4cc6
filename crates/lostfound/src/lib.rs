//! `lostfound` - A Telegram bot for lost and found IDs and items
//!
//! This library provides the conversation state machine, the document store
//! holding profiles and reports, and the Telegram plumbing that connects them.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod logging;
pub mod model;
pub mod poller;
pub mod storage;
pub mod transport;

pub use config::Config;
pub use conversation::{Bot, BotSettings, Flow};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use model::{Identity, ItemKind, Profile, Report, ReportSubject};
pub use poller::{Poller, PollerHandle};
pub use storage::{DocumentStore, Registry, RegistryStats};
pub use transport::{ChatTarget, ChatTransport, InboundEvent};
