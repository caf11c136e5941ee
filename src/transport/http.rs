use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, Method};
use serde::Deserialize;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::core::Params;
use crate::error::{EngineError, Result};
use crate::transport::{Transport, TransportError};

/// Header carrying the static API key
pub const API_KEY_HEADER: &str = "x-nxopen-api-key";

/// reqwest transport for the MapleStory Open API
pub struct NexonHttpTransport {
    client: Client,
    base_url: String,
    api_key: String,
}

/// Upstream error body: `{"error": {"name": "OPENAPI00004", "message": "..."}}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: String,
}

impl NexonHttpTransport {
    /// Create transport from engine config
    pub fn new(config: &EngineConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(EngineError::Config(
                "api_key is required (set NEXON_API_KEY)".to_string(),
            ));
        }

        let client = Client::builder()
            .connect_timeout(config.timeouts.connect_duration())
            .timeout(config.timeouts.request_duration())
            .user_agent(concat!("kissbot-maple-engine/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(client, &config.base_url, &config.api_key))
    }

    /// Create transport around an existing client
    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn describe(err: &reqwest::Error) -> String {
        if err.is_timeout() {
            format!("request timed out: {}", err)
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            format!("request failed: {}", err)
        }
    }
}

/// Longest `Retry-After` hint honoured; longer hints are ignored
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(300);

/// Parse a `Retry-After` value: delta-seconds or an HTTP date.
///
/// Hints beyond [`MAX_RETRY_AFTER`] yield `None`, leaving the computed
/// backoff in charge.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    let hint = match value.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => {
            let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
            (at - now).to_std().unwrap_or(Duration::ZERO)
        }
    };

    if hint > MAX_RETRY_AFTER {
        tracing::warn!("⚠️ Ignoring Retry-After of {:?}", hint);
        return None;
    }
    Some(hint)
}

#[async_trait]
impl Transport for NexonHttpTransport {
    async fn call(
        &self,
        method: Method,
        path: &str,
        params: &Params,
    ) -> std::result::Result<serde_json::Value, TransportError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .request(method, &url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(params)
            .send()
            .await
            .map_err(|e| TransportError::network(Self::describe(&e)))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| parse_retry_after(v, Utc::now()));

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::network(format!("body read failed: {}", e)))?;

        if !status.is_success() {
            let (code, message) = match serde_json::from_slice::<ErrorBody>(&body) {
                Ok(parsed) => (parsed.error.name, parsed.error.message),
                Err(_) => (
                    None,
                    status.canonical_reason().unwrap_or("HTTP error").to_string(),
                ),
            };

            tracing::debug!("Upstream {} → HTTP {} {:?}", path, status.as_u16(), code);

            return Err(TransportError::http(status.as_u16(), code, message)
                .with_retry_after(retry_after));
        }

        serde_json::from_slice(&body)
            .map_err(|e| TransportError::malformed(format!("invalid JSON from {}: {}", path, e)))
    }

    fn name(&self) -> &str {
        "nexon"
    }
}
