//! Error types for the Telegram client.

use thiserror::Error;

/// Errors returned by the Bot API client.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// The HTTP request could not be sent or the body could not be read.
    #[error("telegram request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The Bot API answered with `ok: false`.
    #[error("telegram API error in {method}: {description}")]
    Api {
        /// Bot API method that was called.
        method: &'static str,
        /// Numeric error code reported by Telegram, if any.
        error_code: Option<i64>,
        /// Human-readable description reported by Telegram.
        description: String,
    },

    /// The response was `ok: true` but carried no result.
    #[error("telegram API returned no result for {0}")]
    MissingResult(&'static str),

    /// `getFile` returned a file without a downloadable path.
    #[error("file {0} has no download path")]
    FileUnavailable(String),
}

/// Result type for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;

impl TelegramError {
    /// Check if this error was reported by the Bot API itself.
    #[must_use]
    pub fn is_api_error(&self) -> bool {
        matches!(self, Self::Api { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = TelegramError::Api {
            method: "sendMessage",
            error_code: Some(400),
            description: "Bad Request: chat not found".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("sendMessage"));
        assert!(msg.contains("chat not found"));
        assert!(err.is_api_error());
    }

    #[test]
    fn test_missing_result_display() {
        let err = TelegramError::MissingResult("getFile");
        assert_eq!(err.to_string(), "telegram API returned no result for getFile");
        assert!(!err.is_api_error());
    }

    #[test]
    fn test_file_unavailable_display() {
        let err = TelegramError::FileUnavailable("AgAD".to_string());
        assert!(err.to_string().contains("AgAD"));
    }
}
