//! Transport double that records every outbound call.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ChatTarget, ChatTransport, Keyboard};
use crate::error::{Error, Result};

/// One outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Sent {
    Text {
        chat: ChatTarget,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Photo {
        chat: ChatTarget,
        file_id: String,
        caption: String,
    },
    Answer(String),
}

#[derive(Debug, Default)]
pub(crate) struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    failing: Mutex<HashSet<ChatTarget>>,
    resolved: Mutex<Vec<String>>,
}

impl RecordingTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make every send to `chat` fail.
    pub(crate) fn fail_sends_to(&self, chat: ChatTarget) {
        self.failing.lock().unwrap().insert(chat);
    }

    pub(crate) fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// File ids passed to `resolve_file_link`, in order.
    pub(crate) fn resolved_files(&self) -> Vec<String> {
        self.resolved.lock().unwrap().clone()
    }

    pub(crate) fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    /// Texts sent to `chat`, in order.
    pub(crate) fn texts_to(&self, chat: &ChatTarget) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { chat: c, text, .. } if &c == chat => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Number of messages (text or photo) sent to `chat`.
    pub(crate) fn count_to(&self, chat: &ChatTarget) -> usize {
        self.sent()
            .iter()
            .filter(|s| match s {
                Sent::Text { chat: c, .. } | Sent::Photo { chat: c, .. } => c == chat,
                Sent::Answer(_) => false,
            })
            .count()
    }

    pub(crate) fn last_keyboard_to(&self, chat: &ChatTarget) -> Option<Keyboard> {
        self.sent().into_iter().rev().find_map(|s| match s {
            Sent::Text {
                chat: c, keyboard, ..
            } if &c == chat => Some(keyboard),
            _ => None,
        })?
    }

    fn check(&self, chat: &ChatTarget) -> Result<()> {
        if self.failing.lock().unwrap().contains(chat) {
            Err(Error::transport(format!("send to {chat} failed")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(
        &self,
        chat: &ChatTarget,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<()> {
        self.check(chat)?;
        self.sent.lock().unwrap().push(Sent::Text {
            chat: chat.clone(),
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(())
    }

    async fn send_photo(&self, chat: &ChatTarget, file_id: &str, caption: &str) -> Result<()> {
        self.check(chat)?;
        self.sent.lock().unwrap().push(Sent::Photo {
            chat: chat.clone(),
            file_id: file_id.to_string(),
            caption: caption.to_string(),
        });
        Ok(())
    }

    async fn answer_button(&self, callback_id: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Answer(callback_id.to_string()));
        Ok(())
    }

    async fn resolve_file_link(&self, file_id: &str) -> Result<String> {
        self.resolved.lock().unwrap().push(file_id.to_string());
        Ok(format!("https://files.example.test/{file_id}.jpg"))
    }
}
