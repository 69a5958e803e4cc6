//! HTTP client for the Telegram Bot API.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, trace};

use crate::error::{Result, TelegramError};
use crate::types::{ApiResponse, ChatRef, File, Message, ReplyMarkup, Update};

/// Default Bot API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Extra time allowed on top of the long-polling timeout before the HTTP
/// request itself is abandoned.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Timeout for every request other than `getUpdates`.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a ChatRef,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a ReplyMarkup>,
}

/// Bot API client bound to one bot token.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    token: String,
    api_url: String,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client talking to the public Bot API.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api_url(token, DEFAULT_API_URL)
    }

    /// Create a client talking to a custom Bot API server.
    #[must_use]
    pub fn with_api_url(token: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Get the API base URL.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    async fn call<P, T>(&self, method: &'static str, params: &P, timeout: Duration) -> Result<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        trace!("Calling {}", method);
        let response: ApiResponse<T> = self
            .http
            .post(self.method_url(method))
            .timeout(timeout)
            .json(params)
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(TelegramError::Api {
                method,
                error_code: response.error_code,
                description: response
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }

        response.result.ok_or(TelegramError::MissingResult(method))
    }

    /// Long-poll for new updates.
    ///
    /// Only messages and callback queries are requested.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API rejects it.
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        let params = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        let updates: Vec<Update> = self
            .call(
                "getUpdates",
                &params,
                Duration::from_secs(timeout_secs) + POLL_GRACE,
            )
            .await?;
        if !updates.is_empty() {
            debug!("Received {} updates", updates.len());
        }
        Ok(updates)
    }

    /// Send a text message, optionally with a keyboard.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API rejects it.
    pub async fn send_message(
        &self,
        chat: &ChatRef,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> Result<Message> {
        let params = SendMessage {
            chat_id: chat,
            text,
            reply_markup: markup,
        };
        self.call("sendMessage", &params, REQUEST_TIMEOUT).await
    }

    /// Send a photo that already lives on Telegram's servers.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API rejects it.
    pub async fn send_photo(&self, chat: &ChatRef, file_id: &str, caption: &str) -> Result<Message> {
        let params = json!({
            "chat_id": chat,
            "photo": file_id,
            "caption": caption,
        });
        self.call("sendPhoto", &params, REQUEST_TIMEOUT).await
    }

    /// Acknowledge an inline button press.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API rejects it.
    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<bool> {
        let params = json!({ "callback_query_id": callback_query_id });
        self.call("answerCallbackQuery", &params, REQUEST_TIMEOUT)
            .await
    }

    /// Fetch file metadata, including the download path.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API rejects it.
    pub async fn get_file(&self, file_id: &str) -> Result<File> {
        let params = json!({ "file_id": file_id });
        self.call("getFile", &params, REQUEST_TIMEOUT).await
    }

    /// Build the download URL for a file returned by [`Client::get_file`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file has no download path.
    pub fn file_url(&self, file: &File) -> Result<String> {
        let path = file
            .file_path
            .as_deref()
            .ok_or_else(|| TelegramError::FileUnavailable(file.file_id.clone()))?;
        Ok(format!("{}/file/bot{}/{}", self.api_url, self.token, path))
    }

    /// Resolve a file id straight to its download URL.
    ///
    /// # Errors
    ///
    /// Returns an error if `getFile` fails or the file has no download path.
    pub async fn file_link(&self, file_id: &str) -> Result<String> {
        let file = self.get_file(file_id).await?;
        self.file_url(&file)
    }
}
