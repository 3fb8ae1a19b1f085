//! Outbound payment notification to Cloudreve.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Invalid notify target: {0}")]
    InvalidTarget(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Unreadable response: {0}")]
    InvalidResponse(String),

    #[error("Platform rejected notification: code {code}, error {error}")]
    Rejected { code: i64, error: String },
}

impl DeliveryError {
    /// Default classifier: everything except a broken target may succeed
    /// on a later attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DeliveryError::InvalidTarget(_))
    }
}

/// Body Cloudreve answers a notification with.
#[derive(Debug, Deserialize)]
pub struct NotifyReply {
    pub code: i64,
    #[serde(default)]
    pub error: String,
}

/// Delivers a signed payment notification.
#[async_trait]
pub trait PlatformNotifier: Send + Sync {
    /// One delivery attempt; `authorization` is the full header value.
    async fn notify(&self, target: &Url, authorization: &str) -> Result<(), DeliveryError>;
}

/// reqwest-backed notifier issuing `GET <notify_url>`.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
}

impl HttpNotifier {
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PlatformNotifier for HttpNotifier {
    async fn notify(&self, target: &Url, authorization: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .get(target.clone())
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }

        let reply: NotifyReply = response
            .json()
            .await
            .map_err(|e| DeliveryError::InvalidResponse(e.to_string()))?;

        if reply.code != 0 {
            return Err(DeliveryError::Rejected {
                code: reply.code,
                error: reply.error,
            });
        }
        Ok(())
    }
}
