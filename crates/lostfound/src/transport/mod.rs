//! Chat transport abstraction.
//!
//! The conversation engine talks to users through [`ChatTransport`] and is fed
//! [`InboundEvent`]s; the Telegram adapter in [`telegram`] implements both
//! directions.

pub mod telegram;

#[cfg(test)]
pub(crate) mod recording;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::Identity;

pub use telegram::TelegramTransport;

/// Where an outgoing message goes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChatTarget {
    /// A chat addressed by numeric id (private chats use the user's id).
    Chat(i64),
    /// A public channel addressed by `@username`.
    Channel(String),
}

impl ChatTarget {
    /// Parse a configured destination: `@username` or a numeric chat id.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Ok(id) = value.parse::<i64>() {
            return Some(Self::Chat(id));
        }
        match value.strip_prefix('@') {
            Some(name) if !name.is_empty() => Some(Self::Channel(value.to_string())),
            _ => None,
        }
    }

    /// Direct chat with `identity`.
    #[must_use]
    pub fn direct(identity: Identity) -> Self {
        Self::Chat(identity.0)
    }
}

impl std::fmt::Display for ChatTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chat(id) => write!(f, "{id}"),
            Self::Channel(name) => write!(f, "{name}"),
        }
    }
}

/// An inline button: a label and the data sent back when pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    /// Text shown on the button.
    pub label: String,
    /// Opaque data delivered with the button press.
    pub data: String,
}

impl Button {
    /// Create a button.
    #[must_use]
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Keyboard attached to an outgoing text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Persistent keyboard whose buttons send their label as a text message.
    Reply(Vec<Vec<String>>),
    /// Buttons attached to the message that produce button-press events.
    Inline(Vec<Vec<Button>>),
}

/// What happened in an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// The `/start` command.
    Start,
    /// The `/help` command.
    Help,
    /// Any other text message.
    Text(String),
    /// A photo, optionally captioned.
    Photo {
        /// Platform handle of the photo file.
        file_id: String,
        /// Caption typed with the photo.
        caption: Option<String>,
    },
    /// An inline button press.
    Button {
        /// Identifier used to acknowledge the press.
        callback_id: String,
        /// Data attached to the pressed button.
        data: String,
    },
}

/// An event received from a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Who sent it.
    pub identity: Identity,
    /// Where replies go.
    pub chat: ChatTarget,
    /// What was sent.
    pub kind: EventKind,
}

impl InboundEvent {
    /// Event from a private chat, where the chat id equals the identity.
    #[must_use]
    pub fn private(identity: Identity, kind: EventKind) -> Self {
        Self {
            identity,
            chat: ChatTarget::direct(identity),
            kind,
        }
    }

    /// Short name of the event kind, for logs.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            EventKind::Start => "start",
            EventKind::Help => "help",
            EventKind::Text(_) => "text",
            EventKind::Photo { .. } => "photo",
            EventKind::Button { .. } => "button",
        }
    }
}

/// Outbound operations offered by the chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync + std::fmt::Debug {
    /// Send a text message, optionally with a keyboard.
    async fn send_text(&self, chat: &ChatTarget, text: &str, keyboard: Option<&Keyboard>)
        -> Result<()>;

    /// Send a photo already hosted by the platform, with a caption.
    async fn send_photo(&self, chat: &ChatTarget, file_id: &str, caption: &str) -> Result<()>;

    /// Acknowledge a button press.
    async fn answer_button(&self, callback_id: &str) -> Result<()>;

    /// Turn a temporary file handle into a durable download link.
    async fn resolve_file_link(&self, file_id: &str) -> Result<String>;
}
