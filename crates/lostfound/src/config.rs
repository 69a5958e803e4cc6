//! Configuration management for lostfound.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::conversation::BotSettings;
use crate::error::{Error, Result};
use crate::poller::PollerConfig;
use crate::transport::ChatTarget;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "lostfound";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "lostfound.db";

/// Prefix of environment variables overriding config keys.
const ENV_PREFIX: &str = "LOSTFOUND_";

/// Conventional variable holding the bot token.
const TOKEN_ENV_VAR: &str = "TELEGRAM_BOT_TOKEN";

const DEFAULT_CHANNEL: &str = "@julostandfound";

const DEFAULT_HELP_TEXT: &str =
    "This bot is developed by \n Amenadam Solomon \n Freshman Student in JIT";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. `TELEGRAM_BOT_TOKEN` for the bot token
/// 2. Environment variables (prefixed with `LOSTFOUND_`, `__` between sections)
/// 3. TOML config file at `~/.config/lostfound/config.toml`
/// 4. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Telegram configuration.
    pub telegram: TelegramConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Conversation configuration.
    pub conversation: ConversationConfig,
}

/// Telegram-related configuration.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot API token. Required to run the bot.
    pub bot_token: String,
    /// Channel reports are posted to: `@username` or a numeric chat id.
    pub channel: String,
    /// Bot API base URL.
    pub api_url: String,
    /// Long-poll timeout in seconds.
    pub poll_timeout_secs: u64,
    /// Pause after a failed poll in milliseconds.
    pub retry_delay_ms: u64,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Which document store to use.
    pub backend: StorageBackend,
    /// Path to the database file.
    /// Defaults to `~/.local/share/lostfound/lostfound.db`
    pub database_path: Option<PathBuf>,
}

/// Document store backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// `SQLite` database file.
    #[default]
    Sqlite,
    /// Process memory; nothing persists.
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Conversation-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Offer "Browse Items" on the main menu.
    pub show_browse_button: bool,
    /// Reply to `/help`.
    pub help_text: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            channel: DEFAULT_CHANNEL.to_string(),
            api_url: lostfound_telegram::DEFAULT_API_URL.to_string(),
            poll_timeout_secs: 30,
            retry_delay_ms: 3_000,
        }
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &redact(&self.bot_token))
            .field("channel", &self.channel)
            .field("api_url", &self.api_url)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .finish()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            database_path: None, // Resolved at runtime
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            show_browse_button: false,
            help_text: DEFAULT_HELP_TEXT.to_string(),
        }
    }
}

fn channel_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(@[A-Za-z][A-Za-z0-9_]{3,}|-?[0-9]+)$").expect("Invalid channel pattern")
    })
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        let config: Config = Self::figment(&config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the layered provider for `config_file`.
    #[must_use]
    pub fn figment(config_file: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Env::raw().only(&[TOKEN_ENV_VAR]).map(|_| "telegram.bot_token".into()))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// The bot token is not checked here so that configuration can be
    /// inspected without one; see [`Config::require_token`].
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if !channel_pattern().is_match(self.telegram.channel.trim()) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "channel must be @username or a numeric chat id, got {:?}",
                    self.telegram.channel
                ),
            });
        }

        if self.telegram.poll_timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "poll_timeout_secs must be greater than 0".to_string(),
            });
        }

        if !self.telegram.api_url.starts_with("http://")
            && !self.telegram.api_url.starts_with("https://")
        {
            return Err(Error::ConfigValidation {
                message: format!("api_url must be an http(s) URL, got {:?}", self.telegram.api_url),
            });
        }

        Ok(())
    }

    /// Get the bot token, failing if none is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty.
    pub fn require_token(&self) -> Result<&str> {
        let token = self.telegram.bot_token.trim();
        if token.is_empty() {
            return Err(Error::ConfigValidation {
                message: format!(
                    "no bot token configured; set {TOKEN_ENV_VAR} or telegram.bot_token"
                ),
            });
        }
        Ok(token)
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the broadcast channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel cannot be parsed.
    pub fn channel(&self) -> Result<ChatTarget> {
        ChatTarget::parse(&self.telegram.channel).ok_or_else(|| Error::ConfigValidation {
            message: format!("invalid channel {:?}", self.telegram.channel),
        })
    }

    /// Get the retry delay as a Duration.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.telegram.retry_delay_ms)
    }

    /// Get the polling parameters.
    #[must_use]
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            timeout_secs: self.telegram.poll_timeout_secs,
            retry_delay: self.retry_delay(),
        }
    }

    /// Get the conversation settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel cannot be parsed.
    pub fn bot_settings(&self) -> Result<BotSettings> {
        Ok(BotSettings {
            channel: self.channel()?,
            show_browse_button: self.conversation.show_browse_button,
            help_text: self.conversation.help_text.clone(),
        })
    }

    /// Copy with the bot token hidden, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        config.telegram.bot_token = redact(&self.telegram.bot_token).to_string();
        config
    }
}
