//! # KissBot Maple Engine
//!
//! Access layer for the MapleStory Open API:
//! - In-memory response cache with per-endpoint TTLs
//! - Admission control (sustained rate + concurrency cap, FIFO)
//! - Retry with exponential backoff, jitter and `Retry-After`
//! - Paginated ranking position search
//! - Multiple interfaces: Rust library, HTTP API, CLI
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use kissbot_maple_engine::{EngineConfig, MapleEngine, RankingSearch};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = MapleEngine::new(EngineConfig::from_env())?;
//!
//!     let profile = engine.lookup_character("KissBot", None).await?;
//!     println!("{} Lv.{}", profile.basic.character_name, profile.basic.character_level);
//!
//!     let result = engine
//!         .find_position(&RankingSearch::new("KissBot", 5).world("스카니아"))
//!         .await?;
//!     println!("found={} rank={:?}", result.found, result.position);
//!     Ok(())
//! }
//! ```

pub mod admission;
pub mod cache;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod ranking;
pub mod retry;
pub mod transport;

// Re-export primary types
pub use admission::{LimiterStats, RateLimiter, Ticket};
pub use cache::{CacheStats, MemoryCache, Payload, ResponseCache};
pub use config::EngineConfig;
pub use core::{
    CharacterProfile, Endpoint, GuildProfile, HealthReport, HealthStatus, Params, RankingEntry,
    RankingPage, RankingQuery, RankingSearch, RankingSearchResult,
};
pub use engine::MapleEngine;
pub use error::{EngineError, Result, UpstreamError, UpstreamErrorKind};
pub use retry::{AttemptOutcome, RetryPolicy};
pub use transport::{NexonHttpTransport, Transport, TransportError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
