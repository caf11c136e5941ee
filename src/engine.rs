use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::admission::{LimiterStats, RateLimiter};
use crate::cache::{spawn_sweeper, CacheStats, MemoryCache, Payload, ResponseCache};
use crate::config::{CacheConfig, EngineConfig, HealthConfig};
use crate::core::{
    params, CharacterBasic, CharacterId, CharacterProfile, CharacterStat, Endpoint, GuildBasic,
    GuildId, GuildProfile, HealthReport, Params, RankingPage, RankingQuery, RankingSearch,
    RankingSearchResult,
};
use crate::error::{EngineError, Result, UpstreamError};
use crate::ranking::{self, RankingSource};
use crate::retry::{AttemptOutcome, RetryPolicy};
use crate::transport::{Method, NexonHttpTransport, Transport};

/// API access layer: every upstream call goes cache → admission → retry →
/// transport
pub struct MapleEngine {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn ResponseCache>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    cache_config: CacheConfig,
    health: HealthConfig,
    shutdown: CancellationToken,
}

impl MapleEngine {
    /// Create engine talking to the Open API over HTTP
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let transport = NexonHttpTransport::new(&config)?;
        tracing::info!("✅ Nexon transport ready ({})", config.base_url);
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create engine from defaults overlaid with environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(EngineConfig::from_env())
    }

    /// Create engine around any transport
    pub fn with_transport(config: EngineConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;

        let cache: Arc<dyn ResponseCache> = match config.cache.max_entries {
            Some(max) => Arc::new(MemoryCache::with_capacity(max)),
            None => Arc::new(MemoryCache::new()),
        };

        tracing::debug!("Engine config: {}", config);

        Ok(Self {
            transport,
            cache,
            limiter: Arc::new(RateLimiter::new(&config.rate_limit)),
            retry: RetryPolicy::from_config(&config.retry),
            cache_config: config.cache,
            health: config.health,
            shutdown: CancellationToken::new(),
        })
    }

    /// Replace the response cache
    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Run the periodic expiry sweep until the engine shuts down.
    ///
    /// Returns `None` when the sweep is disabled in config.
    pub fn start_cache_sweeper(&self) -> Option<JoinHandle<()>> {
        let interval = self.cache_config.sweep_interval()?;
        tracing::info!("🧹 Cache sweeper every {:?}", interval);
        Some(spawn_sweeper(
            self.cache.clone(),
            interval,
            self.shutdown.child_token(),
        ))
    }

    /// Cancel queued admissions, retry backoffs and the sweeper
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Raw payload for one endpoint call
    pub async fn request(
        &self,
        endpoint: Endpoint,
        params: &Params,
    ) -> std::result::Result<Payload, UpstreamError> {
        self.request_cancellable(endpoint, params, &self.shutdown).await
    }

    /// Like [`request`](Self::request), abandoning admission waits and retry
    /// backoff once `cancel` fires
    pub async fn request_cancellable(
        &self,
        endpoint: Endpoint,
        params: &Params,
        cancel: &CancellationToken,
    ) -> std::result::Result<Payload, UpstreamError> {
        let key = endpoint.cache_key(params);

        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!("💾 Cache hit: {}", key);
            return Ok(cached);
        }
        tracing::debug!("🔍 Cache miss: {}", key);

        let value = self.call_upstream(endpoint, params, cancel).await?;
        let payload = Arc::new(value);
        self.cache
            .set(&key, payload.clone(), self.cache_config.ttl_for(endpoint));

        Ok(payload)
    }

    async fn call_upstream(
        &self,
        endpoint: Endpoint,
        params: &Params,
        cancel: &CancellationToken,
    ) -> std::result::Result<serde_json::Value, UpstreamError> {
        let start = Instant::now();

        let result = self
            .retry
            .execute(cancel, move |attempt| async move {
                let ticket = match self.limiter.acquire_cancellable(cancel).await {
                    Ok(ticket) => ticket,
                    Err(e) => return AttemptOutcome::FatalFailure(e),
                };

                tracing::debug!(
                    "📡 {} {} attempt {} (ticket {})",
                    self.transport.name(),
                    endpoint,
                    attempt,
                    ticket.id()
                );
                let response = self.transport.call(Method::GET, endpoint.path(), params).await;
                self.limiter.release(ticket);

                match response {
                    Ok(value) => AttemptOutcome::Success(value),
                    Err(e) => e.into_outcome(),
                }
            })
            .await;

        match &result {
            Ok(_) => tracing::debug!(
                "✅ {} answered in {:.1}ms",
                endpoint,
                start.elapsed().as_secs_f64() * 1000.0
            ),
            Err(e) => tracing::warn!("❌ {} failed: {}", endpoint, e),
        }
        result
    }

    /// Request and decode; a payload that does not fit `T` is dropped from
    /// the cache and reported as fatal
    async fn fetch<T: DeserializeOwned>(&self, endpoint: Endpoint, params: Params) -> Result<T> {
        let payload = self.request(endpoint, &params).await?;

        T::deserialize(&*payload).map_err(|e| {
            self.cache.invalidate(&endpoint.cache_key(&params));
            tracing::warn!("⚠️ Unexpected {} payload: {}", endpoint, e);
            EngineError::Upstream(UpstreamError::fatal(format!(
                "unexpected {} payload: {}",
                endpoint, e
            )))
        })
    }

    /// Resolve a character name to its ocid
    pub async fn character_id(&self, name: &str) -> Result<CharacterId> {
        let name = required("character name", name)?;
        self.fetch(Endpoint::CharacterId, params([("character_name", name)]))
            .await
    }

    pub async fn character_basic(
        &self,
        ocid: &str,
        date: Option<NaiveDate>,
    ) -> Result<CharacterBasic> {
        self.fetch(Endpoint::CharacterBasic, dated(ocid_params("ocid", ocid)?, date))
            .await
    }

    pub async fn character_stat(
        &self,
        ocid: &str,
        date: Option<NaiveDate>,
    ) -> Result<CharacterStat> {
        self.fetch(Endpoint::CharacterStat, dated(ocid_params("ocid", ocid)?, date))
            .await
    }

    /// Name → ocid, then basic info and stats
    pub async fn lookup_character(
        &self,
        name: &str,
        date: Option<NaiveDate>,
    ) -> Result<CharacterProfile> {
        let CharacterId { ocid } = self.character_id(name).await?;

        let (basic, stat) = tokio::try_join!(
            self.character_basic(&ocid, date),
            self.character_stat(&ocid, date)
        )?;

        Ok(CharacterProfile { ocid, basic, stat })
    }

    /// Resolve a guild name within a world to its oguild_id
    pub async fn guild_id(&self, name: &str, world: &str) -> Result<GuildId> {
        let name = required("guild name", name)?;
        let world = required("world name", world)?;
        self.fetch(
            Endpoint::GuildId,
            params([("guild_name", name), ("world_name", world)]),
        )
        .await
    }

    pub async fn guild_basic(
        &self,
        oguild_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<GuildBasic> {
        self.fetch(Endpoint::GuildBasic, dated(ocid_params("oguild_id", oguild_id)?, date))
            .await
    }

    /// (name, world) → oguild_id, then basic info
    pub async fn lookup_guild(
        &self,
        name: &str,
        world: &str,
        date: Option<NaiveDate>,
    ) -> Result<GuildProfile> {
        let GuildId { oguild_id } = self.guild_id(name, world).await?;
        let basic = self.guild_basic(&oguild_id, date).await?;
        Ok(GuildProfile { oguild_id, basic })
    }

    /// One page of the overall leaderboard
    pub async fn overall_ranking(&self, query: &RankingQuery) -> Result<RankingPage> {
        self.fetch(Endpoint::OverallRanking, query.to_params(Utc::now()))
            .await
    }

    /// Page through the leaderboard looking for `search.name`
    pub async fn find_position(&self, search: &RankingSearch) -> Result<RankingSearchResult> {
        ranking::find_position(self, search).await
    }

    /// Check the upstream with one uncached, unretried call that still
    /// goes through admission
    pub async fn health_check(&self) -> HealthReport {
        let start = Instant::now();
        let query = params([("character_name", self.health.check_character.as_str())]);

        let outcome = match self.limiter.acquire_cancellable(&self.shutdown).await {
            Ok(ticket) => {
                let response = self
                    .transport
                    .call(Method::GET, Endpoint::CharacterId.path(), &query)
                    .await;
                self.limiter.release(ticket);
                match response {
                    Ok(value) => AttemptOutcome::Success(value),
                    Err(e) => e.into_outcome(),
                }
            }
            Err(e) => AttemptOutcome::FatalFailure(e),
        };

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        let report = match outcome {
            AttemptOutcome::Success(_) => HealthReport::ok(latency_ms),
            AttemptOutcome::RetryableFailure { reason, .. } => {
                HealthReport::from_error(reason.with_attempts(1), latency_ms)
            }
            AttemptOutcome::FatalFailure(reason) => {
                HealthReport::from_error(reason.with_attempts(1), latency_ms)
            }
        };

        tracing::info!("🩺 Health: {:?} in {:.1}ms", report.status, report.latency_ms);
        report
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::info!("🗑️ Cache cleared");
    }

    /// Drop expired entries now, returning how many were removed
    pub fn purge_expired_cache(&self) -> usize {
        self.cache.purge_expired()
    }

    pub fn limiter_stats(&self) -> LimiterStats {
        self.limiter.stats()
    }
}

impl Drop for MapleEngine {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[async_trait]
impl RankingSource for MapleEngine {
    async fn ranking_page(&self, query: &RankingQuery) -> Result<RankingPage> {
        self.overall_ranking(query).await
    }
}

fn required<'a>(what: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(EngineError::InvalidArgument(format!("{} must not be empty", what)));
    }
    Ok(value)
}

fn ocid_params(key: &str, id: &str) -> Result<Params> {
    Ok(params([(key, required(key, id)?)]))
}

fn dated(mut params: Params, date: Option<NaiveDate>) -> Params {
    if let Some(date) = date {
        params.insert("date".into(), date.format("%Y-%m-%d").to_string());
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;

    struct Unreachable;

    #[async_trait]
    impl Transport for Unreachable {
        async fn call(
            &self,
            _method: Method,
            _path: &str,
            _params: &Params,
        ) -> std::result::Result<serde_json::Value, TransportError> {
            Err(TransportError::network("connection refused"))
        }

        fn name(&self) -> &str {
            "unreachable"
        }
    }

    #[test]
    fn test_engine_requires_api_key() {
        let result = MapleEngine::new(EngineConfig::default());
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_engine_rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.rate_limit.max_concurrent = 0;
        let result = MapleEngine::with_transport(config, Arc::new(Unreachable));
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[tokio::test]
    async fn test_empty_names_fail_without_upstream_call() {
        let engine =
            MapleEngine::with_transport(EngineConfig::default(), Arc::new(Unreachable)).unwrap();

        let empty_name = engine.character_id("  ").await;
        assert!(matches!(empty_name, Err(EngineError::InvalidArgument(_))));
        let empty_world = engine.guild_id("Guild", "").await;
        assert!(matches!(empty_world, Err(EngineError::InvalidArgument(_))));
        assert_eq!(engine.limiter_stats().acquire_calls, 0);
    }

    #[tokio::test]
    async fn test_health_check_reports_unreachable() {
        let engine =
            MapleEngine::with_transport(EngineConfig::default(), Arc::new(Unreachable)).unwrap();

        let report = engine.health_check().await;
        assert!(!report.reachable);
        assert_eq!(report.error.map(|e| e.attempts), Some(1));
    }

    #[test]
    fn test_dated_params() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let p = dated(params([("ocid", "abc")]), Some(date));
        assert_eq!(p.get("date").map(String::as_str), Some("2024-01-15"));
        assert_eq!(dated(params([("ocid", "abc")]), None).len(), 1);
    }
}
