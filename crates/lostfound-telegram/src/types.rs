//! Bot API object types.
//!
//! Only the fields the bot reads are modelled; unknown fields are ignored on
//! deserialization.

use serde::{Deserialize, Serialize};

/// Envelope wrapping every Bot API response.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

/// An incoming update from `getUpdates`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    /// Monotonic update identifier, used as the polling offset.
    pub update_id: i64,
    /// New incoming message, if this update carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// Inline button press, if this update carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_query: Option<CallbackQuery>,
}

/// A Telegram user or bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: i64,
    /// Whether this user is a bot.
    #[serde(default)]
    pub is_bot: bool,
    /// User's first name.
    #[serde(default)]
    pub first_name: String,
    /// User's username, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// A chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    /// Unique chat identifier.
    pub id: i64,
    /// Chat type: private, group, supergroup or channel.
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// One size of a photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSize {
    /// Identifier usable to download or resend the file.
    pub file_id: String,
    /// Identifier stable across bots.
    #[serde(default)]
    pub file_unique_id: String,
    /// Photo width.
    pub width: u32,
    /// Photo height.
    pub height: u32,
    /// File size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// A message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier inside the chat.
    pub message_id: i64,
    /// Sender; empty for messages sent to channels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    /// Unix time the message was sent.
    #[serde(default)]
    pub date: i64,
    /// Chat the message belongs to.
    pub chat: Chat,
    /// Text of a text message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Caption of a media message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Available sizes of an attached photo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<PhotoSize>>,
}

impl Message {
    /// Return the bot command this message starts with, without the leading
    /// slash and without any `@botname` suffix.
    #[must_use]
    pub fn command(&self) -> Option<&str> {
        let text = self.text.as_deref()?;
        let word = text.split_whitespace().next()?;
        let command = word.strip_prefix('/')?;
        let command = command.split('@').next().unwrap_or(command);
        if command.is_empty() {
            None
        } else {
            Some(command)
        }
    }

    /// Return the largest available size of the attached photo.
    #[must_use]
    pub fn largest_photo(&self) -> Option<&PhotoSize> {
        self.photo
            .as_ref()?
            .iter()
            .max_by_key(|size| u64::from(size.width) * u64::from(size.height))
    }
}

/// An inline keyboard button press.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Identifier to pass to `answerCallbackQuery`.
    pub id: String,
    /// User who pressed the button.
    pub from: User,
    /// Message the button was attached to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// Data associated with the button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// A file ready to be downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    /// Identifier of the file.
    pub file_id: String,
    /// Identifier stable across bots.
    #[serde(default)]
    pub file_unique_id: String,
    /// File size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Path to pass to the file download endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

/// Destination of an outgoing message: a numeric chat id or a public
/// `@username`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatRef {
    /// Numeric chat identifier.
    Id(i64),
    /// Public channel or group username, including the leading `@`.
    Username(String),
}

impl From<i64> for ChatRef {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl std::fmt::Display for ChatRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Username(name) => write!(f, "{name}"),
        }
    }
}

/// A button of a custom reply keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardButton {
    /// Text sent as a message when the button is pressed.
    pub text: String,
}

/// A button of an inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboardButton {
    /// Label shown on the button.
    pub text: String,
    /// Data sent back in the callback query.
    pub callback_data: String,
}

/// Keyboard attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    /// Custom keyboard replacing the user's keyboard.
    Keyboard {
        /// Rows of buttons.
        keyboard: Vec<Vec<KeyboardButton>>,
        /// Ask clients to shrink the keyboard to fit its buttons.
        resize_keyboard: bool,
    },
    /// Buttons attached to the message itself.
    Inline {
        /// Rows of buttons.
        inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
    },
}
