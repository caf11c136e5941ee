//! ⏱️ HTTP timeout configuration for upstream calls
//!
//! reqwest takes two explicit timeouts:
//! - connect : Establish TCP/TLS connection
//! - request : Whole request, from send to last body byte

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP timeouts in seconds, with defaults tuned for the Open API.
///
/// # Examples
///
/// ```
/// use kissbot_maple_engine::config::HttpTimeouts;
///
/// let timeouts = HttpTimeouts::default();
/// assert_eq!(timeouts.connect, 3.0);
/// assert_eq!(timeouts.request, 10.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpTimeouts {
    /// TCP/TLS connection timeout
    pub connect: f64,

    /// Whole-request timeout
    pub request: f64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: 3.0,
            request: 10.0,
        }
    }
}

/// Longest accepted timeout, in seconds
pub const MAX_TIMEOUT_SECS: f64 = 600.0;

impl HttpTimeouts {
    /// Reject timeouts that are not finite, not positive, or above
    /// [`MAX_TIMEOUT_SECS`]
    pub fn validate(&self) -> Result<(), String> {
        for (name, secs) in [("connect", self.connect), ("request", self.request)] {
            let in_range = secs > 0.0 && secs <= MAX_TIMEOUT_SECS;
            if !in_range || Duration::try_from_secs_f64(secs).is_err() {
                return Err(format!(
                    "timeouts.{} must be within (0, {}] seconds, got {}",
                    name, MAX_TIMEOUT_SECS, secs
                ));
            }
        }
        Ok(())
    }

    pub fn connect_duration(&self) -> Duration {
        to_duration(self.connect, Self::default().connect)
    }

    pub fn request_duration(&self) -> Duration {
        to_duration(self.request, Self::default().request)
    }
}

fn to_duration(secs: f64, fallback: f64) -> Duration {
    Duration::try_from_secs_f64(secs.clamp(0.0, MAX_TIMEOUT_SECS))
        .unwrap_or_else(|_| Duration::from_secs_f64(fallback))
}

impl std::fmt::Display for HttpTimeouts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "connect={}s, request={}s", self.connect, self.request)
    }
}
