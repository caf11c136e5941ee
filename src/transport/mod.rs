pub mod http;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::core::Params;
use crate::error::{UpstreamError, UpstreamErrorKind};
use crate::retry::AttemptOutcome;

pub use http::NexonHttpTransport;
pub use reqwest::Method;

/// Trait for upstream transports: one network call per invocation, no
/// retries, no caching
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one call and return the decoded JSON body
    async fn call(
        &self,
        method: Method,
        path: &str,
        params: &Params,
    ) -> Result<serde_json::Value, TransportError>;

    /// Get transport name for logging
    fn name(&self) -> &str;
}

/// Where a transport failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureLevel {
    /// No response: connect error, timeout, reset, truncated body
    Network,
    /// The upstream answered with an error status or an unusable body
    Application,
}

/// Classified transport failure
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct TransportError {
    pub level: FailureLevel,
    pub status: Option<u16>,
    /// Upstream error code from the error body
    pub code: Option<String>,
    /// Server-supplied `Retry-After` hint
    pub retry_after: Option<Duration>,
    pub message: String,
}

impl TransportError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            level: FailureLevel::Network,
            status: None,
            code: None,
            retry_after: None,
            message: message.into(),
        }
    }

    pub fn http(status: u16, code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            level: FailureLevel::Application,
            status: Some(status),
            code,
            retry_after: None,
            message: message.into(),
        }
    }

    /// 2xx response whose body is not the JSON we expect
    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            level: FailureLevel::Application,
            status: None,
            code: None,
            retry_after: None,
            message: message.into(),
        }
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// 429, 5xx and every network-level failure
    pub fn is_retryable(&self) -> bool {
        match self.level {
            FailureLevel::Network => true,
            FailureLevel::Application => matches!(self.status, Some(429) | Some(500..=599)),
        }
    }

    /// Convert into the tagged outcome the retry policy consumes
    pub fn into_outcome<T>(self) -> AttemptOutcome<T> {
        let retryable = self.is_retryable();
        let kind = match (self.level, retryable) {
            (FailureLevel::Network, _) => UpstreamErrorKind::TransportFailure,
            (FailureLevel::Application, true) => UpstreamErrorKind::RetryableUpstreamFailure,
            (FailureLevel::Application, false) => UpstreamErrorKind::FatalUpstreamFailure,
        };

        let retry_after = self.retry_after;
        let reason = UpstreamError::new(kind, self.message)
            .with_status(self.status)
            .with_code(self.code);

        if retryable {
            AttemptOutcome::RetryableFailure { reason, retry_after }
        } else {
            AttemptOutcome::FatalFailure(reason)
        }
    }
}
