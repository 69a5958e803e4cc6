//! Telegram Bot API client for lostfound.
//!
//! This crate wraps the handful of Bot API methods the bot needs: long polling
//! for updates, sending text and photos, answering button presses, and
//! resolving uploaded files to download links. It knows nothing about
//! conversations or storage.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod client;
pub mod error;
pub mod types;

pub use client::{Client, DEFAULT_API_URL};
pub use error::{Result, TelegramError};
pub use types::{
    CallbackQuery, Chat, ChatRef, File, InlineKeyboardButton, KeyboardButton, Message, PhotoSize,
    ReplyMarkup, Update, User,
};

/// Get the platform name.
#[must_use]
pub fn platform_name() -> &'static str {
    "Telegram"
}
