//! Alert sinks: where formatted alerts leave the pipeline.
//!
//! The enricher depends only on `AlertSink`. Transport details (HTTP, retries,
//! truncation) belong to the adapter.

pub mod log;
pub mod memory;
pub mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use self::log::LogSink;
pub use self::memory::InMemorySink;
pub use self::webhook::{WebhookConfig, WebhookSink};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The request could not be sent (connection refused, DNS, TLS, ...).
    #[error("request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status.
    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request timed out")]
    Timeout,

    /// The sink refused the alert without trying (misconfiguration, test failure mode).
    #[error("alert rejected: {0}")]
    Rejected(String),
}

impl SinkError {
    /// Whether the same alert might be accepted on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            SinkError::Request(_) | SinkError::Timeout => true,
            SinkError::Status { status, .. } => *status == 429 || *status >= 500,
            SinkError::Rejected(_) => false,
        }
    }
}

/// External destination for formatted alerts.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn post(&self, alert: &str) -> Result<(), SinkError>;
}

#[async_trait]
impl<S> AlertSink for Arc<S>
where
    S: AlertSink + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn post(&self, alert: &str) -> Result<(), SinkError> {
        (**self).post(alert).await
    }
}
