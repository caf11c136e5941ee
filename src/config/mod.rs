pub mod timeouts;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::core::{Endpoint, TtlClass};
use crate::error::{EngineError, Result};

pub use timeouts::HttpTimeouts;

/// Default Open API host
pub const DEFAULT_BASE_URL: &str = "https://open.api.nexon.com";

/// Highest accepted sustained rate
pub const MAX_REQUESTS_PER_SECOND: u32 = 1000;

/// Highest accepted concurrency cap
pub const MAX_CONCURRENT: usize = 1024;

/// Full engine configuration, usually loaded from `config.yaml`.
///
/// Every field has a default so a file only needs the keys it changes:
///
/// ```yaml
/// api_key: "live_..."
/// rate_limit:
///   requests_per_second: 5
///   max_concurrent: 4
/// cache:
///   ttl:
///     stats_secs: 120
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Static key forwarded in the `x-nxopen-api-key` header
    pub api_key: String,
    pub base_url: String,
    pub timeouts: HttpTimeouts,
    pub rate_limit: RateLimitConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub health: HealthConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeouts: HttpTimeouts::default(),
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            health: HealthConfig::default(),
        }
    }
}

/// Admission caps for outbound calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Sustained rate; also the cap for any rolling one-second window
    pub requests_per_second: u32,
    /// Tokens available at once before the sustained rate applies
    pub burst: u32,
    /// Maximum simultaneous in-flight requests
    pub max_concurrent: usize,
    /// Give up waiting for admission after this long (`None` = wait forever)
    pub acquire_timeout_ms: Option<u64>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 5,
            burst: 2,
            max_concurrent: 4,
            acquire_timeout_ms: Some(30_000),
        }
    }
}

impl RateLimitConfig {
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }
}

/// Retry/backoff knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per logical call, first attempt included
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Relative jitter applied to each computed delay (0.0 - 1.0)
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
            jitter: 0.2,
        }
    }
}

/// Per-class TTLs in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    pub identity_secs: u64,
    pub profile_secs: u64,
    pub stats_secs: u64,
    pub ranking_secs: u64,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            identity_secs: 24 * 3600,
            profile_secs: 30 * 60,
            stats_secs: 5 * 60,
            ranking_secs: 3600,
        }
    }
}

impl TtlConfig {
    pub fn for_class(&self, class: TtlClass) -> Duration {
        let secs = match class {
            TtlClass::Identity => self.identity_secs,
            TtlClass::Profile => self.profile_secs,
            TtlClass::Stats => self.stats_secs,
            TtlClass::Ranking => self.ranking_secs,
        };
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl: TtlConfig,
    /// Per-endpoint TTL overrides in seconds, keyed by endpoint id
    pub overrides: HashMap<String, u64>,
    /// Evict oldest entries beyond this count
    pub max_entries: Option<usize>,
    /// Run a background expiry sweep at this interval
    pub sweep_interval_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: TtlConfig::default(),
            overrides: HashMap::new(),
            max_entries: Some(10_000),
            sweep_interval_secs: Some(300),
        }
    }
}

impl CacheConfig {
    /// TTL for an endpoint: explicit override first, then its class TTL
    pub fn ttl_for(&self, endpoint: Endpoint) -> Duration {
        match self.overrides.get(endpoint.id()) {
            Some(secs) => Duration::from_secs(*secs),
            None => self.ttl.for_class(endpoint.ttl_class()),
        }
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Character name looked up by the health check
    pub check_character: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_character: "KissBot".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load from a YAML file, then overlay environment variables
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = tokio::fs::read_to_string(path.as_ref()).await?;
        let mut config = Self::from_yaml_str(&yaml_content)?;
        config.apply_env();
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Defaults overlaid with environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overlay `NEXON_API_KEY`, `MAPLE_API_BASE_URL` and `MAPLE_RATE_LIMIT_RPS`
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("NEXON_API_KEY") {
            if !key.trim().is_empty() {
                self.api_key = key.trim().to_string();
            }
        }
        if let Ok(url) = std::env::var("MAPLE_API_BASE_URL") {
            if !url.trim().is_empty() {
                self.base_url = url.trim().to_string();
            }
        }
        if let Some(rps) = std::env::var("MAPLE_RATE_LIMIT_RPS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
        {
            self.rate_limit.requests_per_second = rps;
        }
    }

    /// Reject settings the limiter or retry policy cannot honour
    pub fn validate(&self) -> Result<()> {
        let rl = &self.rate_limit;
        if !(1..=MAX_REQUESTS_PER_SECOND).contains(&rl.requests_per_second) {
            return Err(EngineError::Config(format!(
                "rate_limit.requests_per_second must be within 1..={}, got {}",
                MAX_REQUESTS_PER_SECOND, rl.requests_per_second
            )));
        }
        if !(1..=MAX_REQUESTS_PER_SECOND).contains(&rl.burst) {
            return Err(EngineError::Config(format!(
                "rate_limit.burst must be within 1..={}, got {}",
                MAX_REQUESTS_PER_SECOND, rl.burst
            )));
        }
        if !(1..=MAX_CONCURRENT).contains(&rl.max_concurrent) {
            return Err(EngineError::Config(format!(
                "rate_limit.max_concurrent must be within 1..={}, got {}",
                MAX_CONCURRENT, rl.max_concurrent
            )));
        }

        self.timeouts.validate().map_err(EngineError::Config)?;

        let retry = &self.retry;
        if retry.max_attempts == 0 {
            return Err(EngineError::Config("retry.max_attempts must be > 0".into()));
        }
        if retry.base_delay_ms > retry.max_delay_ms {
            return Err(EngineError::Config(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                retry.base_delay_ms, retry.max_delay_ms
            )));
        }
        if !(0.0..=1.0).contains(&retry.jitter) {
            return Err(EngineError::Config("retry.jitter must be within 0.0..=1.0".into()));
        }

        for key in self.cache.overrides.keys() {
            key.parse::<Endpoint>().map_err(EngineError::Config)?;
        }

        Ok(())
    }
}

impl fmt::Display for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "base_url={}, api_key={}, rps={}, burst={}, concurrency={}, attempts={}, {}",
            self.base_url,
            if self.api_key.is_empty() { "<unset>" } else { "<redacted>" },
            self.rate_limit.requests_per_second,
            self.rate_limit.burst,
            self.rate_limit.max_concurrent,
            self.retry.max_attempts,
            self.timeouts
        )
    }
}
