//! Telegram implementation of the chat transport.

use async_trait::async_trait;
use lostfound_telegram::{
    ChatRef, Client, InlineKeyboardButton, KeyboardButton, ReplyMarkup, Update,
};
use tracing::trace;

use super::{ChatTarget, ChatTransport, EventKind, InboundEvent, Keyboard};
use crate::error::Result;
use crate::model::Identity;

/// Chat transport backed by the Telegram Bot API.
#[derive(Debug, Clone)]
pub struct TelegramTransport {
    client: Client,
}

impl TelegramTransport {
    /// Wrap a Bot API client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl From<&ChatTarget> for ChatRef {
    fn from(target: &ChatTarget) -> Self {
        match target {
            ChatTarget::Chat(id) => ChatRef::Id(*id),
            ChatTarget::Channel(name) => ChatRef::Username(name.clone()),
        }
    }
}

impl From<&Keyboard> for ReplyMarkup {
    fn from(keyboard: &Keyboard) -> Self {
        match keyboard {
            Keyboard::Reply(rows) => ReplyMarkup::Keyboard {
                keyboard: rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|label| KeyboardButton {
                                text: label.clone(),
                            })
                            .collect()
                    })
                    .collect(),
                resize_keyboard: true,
            },
            Keyboard::Inline(rows) => ReplyMarkup::Inline {
                inline_keyboard: rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|button| InlineKeyboardButton {
                                text: button.label.clone(),
                                callback_data: button.data.clone(),
                            })
                            .collect()
                    })
                    .collect(),
            },
        }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(
        &self,
        chat: &ChatTarget,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<()> {
        let markup = keyboard.map(ReplyMarkup::from);
        self.client
            .send_message(&ChatRef::from(chat), text, markup.as_ref())
            .await?;
        Ok(())
    }

    async fn send_photo(&self, chat: &ChatTarget, file_id: &str, caption: &str) -> Result<()> {
        self.client
            .send_photo(&ChatRef::from(chat), file_id, caption)
            .await?;
        Ok(())
    }

    async fn answer_button(&self, callback_id: &str) -> Result<()> {
        self.client.answer_callback_query(callback_id).await?;
        Ok(())
    }

    async fn resolve_file_link(&self, file_id: &str) -> Result<String> {
        Ok(self.client.file_link(file_id).await?)
    }
}

/// Translate a Telegram update into an inbound event.
///
/// Returns `None` for updates the bot does not react to: messages without a
/// sender, bot senders, and messages that are neither text nor photo.
#[must_use]
pub fn event_from_update(update: &Update) -> Option<InboundEvent> {
    if let Some(query) = &update.callback_query {
        let chat = query
            .message
            .as_ref()
            .map_or(query.from.id, |message| message.chat.id);
        return Some(InboundEvent {
            identity: Identity(query.from.id),
            chat: ChatTarget::Chat(chat),
            kind: EventKind::Button {
                callback_id: query.id.clone(),
                data: query.data.clone().unwrap_or_default(),
            },
        });
    }

    let message = update.message.as_ref()?;
    let from = message.from.as_ref().filter(|user| !user.is_bot)?;

    let kind = if let Some(photo) = message.largest_photo() {
        EventKind::Photo {
            file_id: photo.file_id.clone(),
            caption: message.caption.clone(),
        }
    } else {
        match message.command() {
            Some("start") => EventKind::Start,
            Some("help") => EventKind::Help,
            _ => EventKind::Text(message.text.clone()?),
        }
    };

    trace!("Update {} from {} is a {:?}", update.update_id, from.id, kind);
    Some(InboundEvent {
        identity: Identity(from.id),
        chat: ChatTarget::Chat(message.chat.id),
        kind,
    })
}
