use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a failure that escapes the access layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamErrorKind {
    /// Caller gave up waiting for admission (timeout or cancellation)
    RateLimitTimeout,
    /// 429/5xx responses persisted through every attempt
    RetryableUpstreamFailure,
    /// Non-retryable 4xx, malformed request or schema violation
    FatalUpstreamFailure,
    /// Network-level failure persisted through every attempt
    TransportFailure,
}

impl UpstreamErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimitTimeout => "rate_limit_timeout",
            Self::RetryableUpstreamFailure => "retryable_upstream_failure",
            Self::FatalUpstreamFailure => "fatal_upstream_failure",
            Self::TransportFailure => "transport_failure",
        }
    }
}

impl fmt::Display for UpstreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure returned to calling tools.
///
/// Carries no user-facing prose: `message` is the upstream's own message
/// (or the transport error text) and formatting is left to the tool layer.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct UpstreamError {
    pub kind: UpstreamErrorKind,
    pub message: String,

    /// HTTP status of the last attempt, if a response was received
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Upstream error code (e.g. `OPENAPI00007`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Number of transport attempts made before giving up
    #[serde(default)]
    pub attempts: u32,
}

impl UpstreamError {
    pub fn new(kind: UpstreamErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            code: None,
            attempts: 0,
        }
    }

    pub fn rate_limit_timeout(message: impl Into<String>) -> Self {
        Self::new(UpstreamErrorKind::RateLimitTimeout, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(UpstreamErrorKind::FatalUpstreamFailure, message)
    }

    pub fn with_status(mut self, status: Option<u16>) -> Self {
        self.status = status;
        self
    }

    pub fn with_code(mut self, code: Option<String>) -> Self {
        self.code = code;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.kind == UpstreamErrorKind::FatalUpstreamFailure
    }
}

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Terminal failure from the access layer
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Caller supplied an argument outside its accepted range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client construction errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Config file I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML config parse errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Upstream failure carried by this error, if any
    pub fn upstream(&self) -> Option<&UpstreamError> {
        match self {
            EngineError::Upstream(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EngineError>;
