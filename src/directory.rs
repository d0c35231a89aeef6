//! # Directory Client Module
//!
//! HTTP client for the remote user/conversation directory service.
//!
//! Endpoints (relative to the configured base URL):
//! - `GET  /users/{chat_id}/`                 → 200 when the user exists
//! - `POST /users/`                           → create a user record
//! - `POST /conversations/`                   → create a conversation, returns `{ "_id": ... }`
//! - `POST /conversations/{id}/messages`      → append one message
//!
//! Transport failures and 5xx answers are retried with exponential backoff
//! and random jitter according to [`RetryConfig`]. Nothing here is
//! idempotent: a retried create may produce a duplicate on the remote side.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{DirectoryConfig, RetryConfig};
use crate::directory_errors::DirectoryError;
use crate::profile_model::{ConversationMessage, NewConversation, UserLookup, UserRecord};

/// Operations the bot needs from the directory service
#[async_trait]
pub trait Directory: Send + Sync {
    /// Probe whether a user with this chat id is registered
    async fn lookup_user(&self, chat_id: i64) -> Result<UserLookup, DirectoryError>;

    /// Create a user record, returning its id
    async fn create_user(&self, user: &UserRecord) -> Result<i64, DirectoryError>;

    /// Create a conversation, returning the id assigned by the service
    async fn create_conversation(&self, seed: &NewConversation) -> Result<String, DirectoryError>;

    /// Append one message to an existing conversation
    async fn append_message(
        &self,
        conversation_id: &str,
        message: &ConversationMessage,
    ) -> Result<(), DirectoryError>;
}

/// reqwest-backed [`Directory`] implementation
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    http: Client,
    base_url: String,
    retry: RetryConfig,
}

impl DirectoryClient {
    /// Build a client from configuration
    pub fn new(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(http, &config.base_url, config.retry.clone()))
    }

    /// Build a client around an existing `reqwest::Client`
    pub fn with_client(http: Client, base_url: &str, retry: RetryConfig) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send the request built by `build`, retrying transient failures.
    ///
    /// Server errors come back as `Err(DirectoryError::Status)`; any other
    /// status is handed to the caller untouched.
    async fn send_with_retry<F>(
        &self,
        operation: &'static str,
        build: F,
    ) -> Result<Response, DirectoryError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0u32;
        loop {
            let result = match build().send().await {
                Ok(response) if response.status().is_server_error() => {
                    Err(status_error(response).await)
                }
                Ok(response) => Ok(response),
                Err(e) => Err(DirectoryError::from(e)),
            };

            match result {
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = retry_delay(&self.retry, attempt);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Directory request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

#[async_trait]
impl Directory for DirectoryClient {
    async fn lookup_user(&self, chat_id: i64) -> Result<UserLookup, DirectoryError> {
        let url = self.url(&format!("/users/{chat_id}/"));
        let response = self
            .send_with_retry("lookup_user", || self.http.get(&url))
            .await?;

        let status = response.status();
        debug!(chat_id, status = status.as_u16(), "User lookup answered");

        if status.is_success() {
            Ok(UserLookup::Found)
        } else if status.is_client_error() {
            Ok(UserLookup::NotFound)
        } else {
            Err(status_error(response).await)
        }
    }

    async fn create_user(&self, user: &UserRecord) -> Result<i64, DirectoryError> {
        let url = self.url("/users/");
        let response = self
            .send_with_retry("create_user", || self.http.post(&url).json(user))
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        info!(chat_id = user.id, "User record created");
        Ok(user.id)
    }

    async fn create_conversation(&self, seed: &NewConversation) -> Result<String, DirectoryError> {
        let url = self.url("/conversations/");
        let response = self
            .send_with_retry("create_conversation", || self.http.post(&url).json(seed))
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: Value = response.json().await?;
        let conversation_id = extract_id(&body).ok_or(DirectoryError::MissingId)?;
        info!(chat_id = seed.user_id, conversation_id = %conversation_id, "Conversation created");
        Ok(conversation_id)
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        message: &ConversationMessage,
    ) -> Result<(), DirectoryError> {
        let url = self.url(&format!("/conversations/{conversation_id}/messages"));
        let response = self
            .send_with_retry("append_message", || self.http.post(&url).json(message))
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        debug!(conversation_id, "Message appended");
        Ok(())
    }
}

async fn status_error(response: Response) -> DirectoryError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    DirectoryError::Status { status, body }
}

/// Pull the `_id` out of a directory response.
///
/// Accepts a plain string, a number, or Mongo extended JSON (`{"$oid": "..."}`).
pub fn extract_id(body: &Value) -> Option<String> {
    match body.get("_id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        Value::Object(map) => map.get("$oid").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Exponential backoff with ±20 % random jitter, capped at `max_retry_delay_ms`.
pub fn retry_delay(config: &RetryConfig, attempt: u32) -> Duration {
    // 2^(attempt-1), clamped to 5 doublings
    let exponent = attempt.saturating_sub(1).min(5);
    let base = config.base_retry_delay_ms.saturating_mul(1u64 << exponent);
    let factor = 0.8 + rand::random::<f64>() * 0.4;
    let delay = (base as f64 * factor) as u64;
    Duration::from_millis(delay.min(config.max_retry_delay_ms))
}
