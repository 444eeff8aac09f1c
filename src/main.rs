use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tinylink::{
    cache::{LinkCache, NullCache, ResolutionCache},
    config::{AppConfig, StrategyKind},
    db::{self, SqliteSequence, SqliteStore},
    handlers, AllocationStrategy, AppState, Shortener,
};

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env; a missing file is fine, the environment may already be set
    dotenvy::dotenv().ok();

    // Initialise structured logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tinylink=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!("Starting tinylink on {}", config.bind_addr());
    tracing::info!("Short URL prefix: {}", config.shortener.short_url_prefix);

    let pool = db::connect(&config.database_url, 10)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;

    let cache: Arc<dyn ResolutionCache> = if config.shortener.cache_ttl.is_zero() {
        tracing::info!("Caching disabled (CACHE_TTL_SECS=0)");
        Arc::new(NullCache)
    } else {
        let cache = LinkCache::new();
        cache.spawn_sweeper(config.cache_sweep_interval);
        Arc::new(cache)
    };

    let strategy = match config.shortener.strategy {
        StrategyKind::Sequence => AllocationStrategy::Sequence(Arc::new(SqliteSequence::new(
            pool.clone(),
            config.sequence_name.clone(),
        ))),
        StrategyKind::Random => AllocationStrategy::Random {
            code_length: config.shortener.random_code_length,
            max_attempts: config.shortener.max_collision_retries,
        },
    };
    tracing::info!("Allocation strategy: {:?}", strategy);

    let shortener = Shortener::new(
        &config.shortener,
        Arc::new(SqliteStore::new(pool)),
        cache,
        strategy,
    )
    .context("invalid CODE_ALPHABET")?;

    let app = handlers::router(Arc::new(AppState { shortener }));

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
