use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{UpstreamError, UpstreamErrorKind};

/// Upstream reachability as seen by one health check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Check call succeeded
    Ok,
    /// Upstream answered, but rejected the check call (4xx)
    Degraded,
    /// No usable answer: network failure, 5xx or admission timeout
    Unreachable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthReport {
    pub reachable: bool,
    pub status: HealthStatus,
    pub latency_ms: f64,
    pub checked_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<UpstreamError>,
}

impl HealthReport {
    pub fn ok(latency_ms: f64) -> Self {
        Self {
            reachable: true,
            status: HealthStatus::Ok,
            latency_ms,
            checked_at: Utc::now(),
            error: None,
        }
    }

    pub fn from_error(error: UpstreamError, latency_ms: f64) -> Self {
        let status = match (error.kind, error.status) {
            (UpstreamErrorKind::FatalUpstreamFailure, Some(_)) => HealthStatus::Degraded,
            _ => HealthStatus::Unreachable,
        };

        Self {
            reachable: status == HealthStatus::Degraded,
            status,
            latency_ms,
            checked_at: Utc::now(),
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_is_degraded_but_reachable() {
        let err = UpstreamError::fatal("Please input valid parameter").with_status(Some(400));
        let report = HealthReport::from_error(err, 12.0);
        assert!(report.reachable);
        assert_eq!(report.status, HealthStatus::Degraded);
    }

    #[test]
    fn test_server_and_network_errors_are_unreachable() {
        let err = UpstreamError::new(UpstreamErrorKind::RetryableUpstreamFailure, "Server error")
            .with_status(Some(503));
        assert_eq!(HealthReport::from_error(err, 1.0).status, HealthStatus::Unreachable);

        let err = UpstreamError::new(UpstreamErrorKind::TransportFailure, "connection reset");
        let report = HealthReport::from_error(err, 1.0);
        assert!(!report.reachable);
        assert_eq!(report.status, HealthStatus::Unreachable);
    }
}
