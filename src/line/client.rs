//! LINE Messaging API client
//!
//! Sends are fire-and-forget from the caller's point of view: a non-2xx
//! response is reported as [`NotifyError::Status`] and never retried here.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use super::messages::{Message, PushRequest, ReplyRequest, MAX_MESSAGES_PER_CALL};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LINE API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Nothing to send")]
    Empty,
}

/// Outbound side of the chat platform
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Answer an inbound event using its one-shot reply token
    async fn reply(&self, reply_token: &str, messages: &[Message]) -> Result<(), NotifyError>;

    /// Send to a known user outside of any inbound event
    async fn push(&self, line_user_id: &str, messages: &[Message]) -> Result<(), NotifyError>;
}

pub struct LineClient {
    client: Client,
    api_base: String,
    access_token: String,
}

impl LineClient {
    pub fn new(
        api_base: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    async fn post<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.access_token)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Status {
            status: status.as_u16(),
            body: body.chars().take(500).collect(),
        })
    }
}

fn capped(messages: &[Message]) -> Result<&[Message], NotifyError> {
    if messages.is_empty() {
        return Err(NotifyError::Empty);
    }
    if messages.len() > MAX_MESSAGES_PER_CALL {
        tracing::warn!(
            count = messages.len(),
            "Dropping messages beyond the per-call limit"
        );
    }
    Ok(&messages[..messages.len().min(MAX_MESSAGES_PER_CALL)])
}

#[async_trait]
impl Notifier for LineClient {
    async fn reply(&self, reply_token: &str, messages: &[Message]) -> Result<(), NotifyError> {
        let messages = capped(messages)?;
        self.post(
            "/v2/bot/message/reply",
            &ReplyRequest {
                reply_token,
                messages,
            },
        )
        .await
    }

    async fn push(&self, line_user_id: &str, messages: &[Message]) -> Result<(), NotifyError> {
        let messages = capped(messages)?;
        self.post(
            "/v2/bot/message/push",
            &PushRequest {
                to: line_user_id,
                messages,
            },
        )
        .await
    }
}
