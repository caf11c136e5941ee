use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kissbot_maple_engine::{
    CacheStats, CharacterProfile, EngineConfig, EngineError, GuildProfile, HealthReport,
    HealthStatus, LimiterStats, MapleEngine, RankingPage, RankingQuery, RankingSearch,
    RankingSearchResult, UpstreamErrorKind,
};

#[derive(Clone)]
struct AppState {
    engine: Arc<MapleEngine>,
}

#[derive(Debug, Deserialize)]
struct DateParams {
    date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    name: String,
    world: Option<String>,
    class: Option<String>,
    #[serde(default = "default_max_pages")]
    max_pages: u32,
    date: Option<NaiveDate>,
}

fn default_max_pages() -> u32 {
    5
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<UpstreamErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: HealthStatus,
    version: String,
    upstream: HealthReport,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    cache: CacheStats,
    hit_rate: f64,
    limiter: LimiterStats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maple_engine_server=debug,kissbot_maple_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8090);

    let config = if std::path::Path::new(&config_path).exists() {
        tracing::info!("📄 Config: {}", config_path);
        EngineConfig::load(&config_path).await?
    } else {
        tracing::info!("📄 No {}, using defaults + environment", config_path);
        EngineConfig::from_env()
    };

    tracing::info!("🚀 Starting KissBot Maple Engine Server");
    tracing::info!("⚙️ {}", config);
    tracing::info!("🔌 Port: {}", port);

    let engine = MapleEngine::new(config)?;
    let _sweeper = engine.start_cache_sweeper();

    let state = AppState {
        engine: Arc::new(engine),
    };

    // Build router
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/character/:name", get(character_handler))
        .route("/v1/guild/:world/:name", get(guild_handler))
        .route("/v1/ranking", get(ranking_handler))
        .route("/v1/ranking/search", get(ranking_search_handler))
        .route("/v1/stats", get(stats_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    tracing::info!("🍁 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let report = state.engine.health_check().await;
    let code = match report.status {
        HealthStatus::Unreachable => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    (
        code,
        Json(HealthResponse {
            status: report.status,
            version: kissbot_maple_engine::VERSION.to_string(),
            upstream: report,
        }),
    )
}

async fn character_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<DateParams>,
) -> Result<Json<CharacterProfile>, AppError> {
    let profile = state.engine.lookup_character(&name, params.date).await?;
    tracing::info!(
        "✅ {} → Lv.{} {}",
        name,
        profile.basic.character_level,
        profile.basic.character_class
    );
    Ok(Json(profile))
}

async fn guild_handler(
    State(state): State<AppState>,
    Path((world, name)): Path<(String, String)>,
    Query(params): Query<DateParams>,
) -> Result<Json<GuildProfile>, AppError> {
    let profile = state.engine.lookup_guild(&name, &world, params.date).await?;
    Ok(Json(profile))
}

async fn ranking_handler(
    State(state): State<AppState>,
    Query(query): Query<RankingQuery>,
) -> Result<Json<RankingPage>, AppError> {
    Ok(Json(state.engine.overall_ranking(&query).await?))
}

async fn ranking_search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<RankingSearchResult>, AppError> {
    let search = RankingSearch {
        name: params.name,
        world: params.world,
        class: params.class,
        max_pages: params.max_pages,
        date: params.date,
    };

    let result = state.engine.find_position(&search).await?;
    tracing::info!(
        "🏆 {} → found={} rank={:?} ({} pages)",
        search.name,
        result.found,
        result.position,
        result.searched_pages
    );
    Ok(Json(result))
}

async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.engine.cache_stats();
    Json(StatsResponse {
        hit_rate: cache.hit_rate(),
        cache,
        limiter: state.engine.limiter_stats(),
    })
}

// Error handling
struct AppError(EngineError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, code) = match &self.0 {
            EngineError::Upstream(e) => {
                let status = match (e.kind, e.status) {
                    (UpstreamErrorKind::RateLimitTimeout, _) => StatusCode::SERVICE_UNAVAILABLE,
                    (UpstreamErrorKind::FatalUpstreamFailure, Some(400)) => StatusCode::BAD_REQUEST,
                    (UpstreamErrorKind::FatalUpstreamFailure, Some(404)) => StatusCode::NOT_FOUND,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, Some(e.kind), e.code.clone())
            }
            EngineError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, None, None),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, None, None),
        };
        let message = self.0.to_string();

        tracing::error!("❌ Error: {} - {}", status, message);

        (status, Json(ErrorResponse { error: message, kind, code })).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<EngineError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
