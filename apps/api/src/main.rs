mod assessment;
mod config;
mod db;
mod errors;
mod models;
mod report;
mod routes;
mod state;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::assessment::cache::RedisResponseCache;
use crate::assessment::resolver::{EquivalenceTable, QuestionResolver};
use crate::assessment::store::PgAssessmentStore;
use crate::config::Config;
use crate::db::create_pool;
use crate::report::export::S3SnapshotStore;
use crate::report::{default_page_config, FontFamily};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting readiness API v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url).await?;

    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    let resolver = build_resolver(&config).await?;
    info!(strategies = ?resolver.strategy_names(), "Question resolver ready");

    let page_config = default_page_config(FontFamily::Helvetica);
    info!(
        "Report page config: {:?} {}pt, {} lines per page",
        page_config.font, page_config.font_size_pt, page_config.lines_per_page
    );

    let state = AppState {
        store: Arc::new(PgAssessmentStore::new(db)),
        cache: Arc::new(RedisResponseCache::new(redis)),
        snapshots: Arc::new(S3SnapshotStore::new(s3, config.s3_bucket.clone())),
        resolver: Arc::new(resolver),
        retry_policy: config.retry_policy(),
        page_config,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the assessment frontend

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Built-in equivalence table, extended from CATEGORY_ALIASES_PATH when set.
async fn build_resolver(config: &Config) -> Result<QuestionResolver> {
    let mut table = EquivalenceTable::builtin();

    if let Some(path) = &config.category_aliases_path {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Could not read category aliases from '{path}'"))?;
        let added = table
            .extend_from_json(&raw)
            .with_context(|| format!("Category aliases in '{path}' are not valid JSON"))?;
        info!(path = %path, added, "Loaded category aliases");
    }
    if table.is_empty() {
        info!("Category equivalence table is empty; legacy ids resolve by name only");
    } else {
        info!(categories = table.len(), "Category equivalence table ready");
    }

    let resolver = QuestionResolver::standard(table);
    Ok(if config.enable_fallback_sampling {
        resolver.with_fallback_sampling()
    } else {
        resolver
    })
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "readiness-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
