#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kissbot_maple_engine::config::{RateLimitConfig, RetryConfig};
use kissbot_maple_engine::transport::Method;
use kissbot_maple_engine::{EngineConfig, MapleEngine, Params, Transport, TransportError};

pub const ID_PATH: &str = "/maplestory/v1/id";
pub const BASIC_PATH: &str = "/maplestory/v1/character/basic";
pub const STAT_PATH: &str = "/maplestory/v1/character/stat";
pub const GUILD_ID_PATH: &str = "/maplestory/v1/guild/id";
pub const GUILD_BASIC_PATH: &str = "/maplestory/v1/guild/basic";
pub const RANKING_PATH: &str = "/maplestory/v1/ranking/overall";

/// Entries per leaderboard page in the fake upstream
pub const PAGE_SIZE: u32 = 10;
/// Total leaderboard length in the fake upstream
pub const BOARD_LEN: u32 = 30;

type Handler = Box<dyn Fn(&str, &Params) -> Result<Value, TransportError> + Send + Sync>;

/// Call-counting transport answering from a closure
pub struct MockTransport {
    handler: Handler,
    delay: Duration,
    calls: Mutex<Vec<(String, Params)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&str, &Params) -> Result<Value, TransportError> + Send + Sync + 'static,
    {
        Self::with_delay(Duration::ZERO, handler)
    }

    /// Every call takes `delay` before answering
    pub fn with_delay<F>(delay: Duration, handler: F) -> Arc<Self>
    where
        F: Fn(&str, &Params) -> Result<Value, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            delay,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls.lock().iter().filter(|(p, _)| p == path).count()
    }

    pub fn calls(&self) -> Vec<(String, Params)> {
        self.calls.lock().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn call(
        &self,
        _method: Method,
        path: &str,
        params: &Params,
    ) -> Result<Value, TransportError> {
        self.calls.lock().push((path.to_string(), params.clone()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = (self.handler)(path, params);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Fast admission and short deterministic backoff
pub fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.rate_limit = RateLimitConfig {
        requests_per_second: 1000,
        burst: 1000,
        max_concurrent: 4,
        acquire_timeout_ms: None,
    };
    config.retry = RetryConfig {
        max_attempts: 3,
        base_delay_ms: 10,
        max_delay_ms: 100,
        jitter: 0.0,
    };
    config.cache.sweep_interval_secs = None;
    config
}

pub fn engine(transport: Arc<MockTransport>) -> MapleEngine {
    engine_with(test_config(), transport)
}

pub fn engine_with(config: EngineConfig, transport: Arc<MockTransport>) -> MapleEngine {
    MapleEngine::with_transport(config, transport).expect("valid test config")
}

pub fn not_found() -> TransportError {
    TransportError::http(400, Some("OPENAPI00004".into()), "Please input valid parameter")
}

pub fn server_error() -> TransportError {
    TransportError::http(503, Some("OPENAPI00001".into()), "Service unavailable")
}

pub fn param<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params.get(key).map(String::as_str)
}

/// Leaderboard name at `rank`; "KissBot" sits at rank 15 (page 2)
pub fn ranked_name(rank: u32) -> String {
    if rank == 15 {
        "KissBot".to_string()
    } else {
        format!("Player{}", rank)
    }
}

/// Fake upstream with one character, one guild and a 30-entry leaderboard
pub fn maple_api(path: &str, params: &Params) -> Result<Value, TransportError> {
    match path {
        ID_PATH => match param(params, "character_name") {
            Some("KissBot") => Ok(json!({ "ocid": "ocid-kissbot" })),
            _ => Err(not_found()),
        },
        BASIC_PATH => match param(params, "ocid") {
            Some("ocid-kissbot") => Ok(json!({
                "date": param(params, "date"),
                "character_name": "KissBot",
                "world_name": "스카니아",
                "character_gender": "남",
                "character_class": "나이트로드",
                "character_class_level": "6",
                "character_level": 285,
                "character_exp": 123456789,
                "character_exp_rate": "12.345",
                "character_guild_name": "KissGuild",
                "character_image": "https://open.api.nexon.com/static/maplestory/Character/abc",
                "character_date_create": "2020-01-01T00:00+09:00",
                "access_flag": "true"
            })),
            _ => Err(not_found()),
        },
        STAT_PATH => match param(params, "ocid") {
            Some("ocid-kissbot") => Ok(json!({
                "date": param(params, "date"),
                "character_class": "나이트로드",
                "final_stat": [
                    { "stat_name": "전투력", "stat_value": "98765432" },
                    { "stat_name": "LUK", "stat_value": "45000" }
                ],
                "remain_ap": 0
            })),
            _ => Err(not_found()),
        },
        GUILD_ID_PATH => match (param(params, "guild_name"), param(params, "world_name")) {
            (Some("KissGuild"), Some("스카니아")) => Ok(json!({ "oguild_id": "oguild-kiss" })),
            _ => Err(not_found()),
        },
        GUILD_BASIC_PATH => match param(params, "oguild_id") {
            Some("oguild-kiss") => Ok(json!({
                "date": null,
                "world_name": "스카니아",
                "guild_name": "KissGuild",
                "guild_level": 28,
                "guild_fame": 1000,
                "guild_point": 50000,
                "guild_master_name": "KissBot",
                "guild_member_count": 2,
                "guild_member": ["KissBot", "Player1"]
            })),
            _ => Err(not_found()),
        },
        RANKING_PATH => {
            let page: u32 = param(params, "page").and_then(|p| p.parse().ok()).unwrap_or(1);
            let first = (page - 1) * PAGE_SIZE + 1;
            let ranking: Vec<Value> = (first..first + PAGE_SIZE)
                .filter(|rank| *rank <= BOARD_LEN)
                .map(|rank| {
                    json!({
                        "date": param(params, "date"),
                        "ranking": rank,
                        "character_name": ranked_name(rank),
                        "world_name": param(params, "world_name").unwrap_or("스카니아"),
                        "class_name": "도적",
                        "sub_class_name": "나이트로드",
                        "character_level": 300 - rank,
                        "character_exp": 1000 * u64::from(BOARD_LEN - rank),
                        "character_popularity": 10,
                        "character_guildname": null
                    })
                })
                .collect();
            Ok(json!({ "ranking": ranking }))
        }
        _ => Err(TransportError::http(404, None, "Not Found")),
    }
}
