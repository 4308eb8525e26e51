use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod constants;
mod crypto;
mod db;
mod error;
mod ledger;
mod leveling;
mod models;
mod services;

use config::Config;
use constants::API_VERSION;
use db::Database;
use ledger::{CharacterLedger, RpcLedgerClient};
use services::{LevelReconciler, SkillLedger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "runeforge_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Starting RUNEFORGE Backend Server");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("API Version: {}", API_VERSION);
    if config.is_testnet() {
        tracing::info!("Running against a test cluster");
    }

    // Initialize database
    let db = Database::new(&config).await?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db.run_migrations().await?;

    // External ledger client (optional: without a relayer, level-ups stay
    // flagged pending until an operator repairs the configuration)
    let ledger_client: Option<Arc<dyn CharacterLedger>> = RpcLedgerClient::from_config(&config)?
        .map(|client| Arc::new(client) as Arc<dyn CharacterLedger>);
    if ledger_client.is_none() {
        tracing::warn!("No ledger relayer configured; on-chain sync disabled");
    }

    let reconciler = Arc::new(LevelReconciler::new(db.clone(), ledger_client));
    let skill_ledger = Arc::new(SkillLedger::new(db.clone(), reconciler.clone()));

    let app_state = api::AppState {
        db: db.clone(),
        config: config.clone(),
        skills: skill_ledger,
    };

    // Build router
    let app = build_router(app_state);

    // Start background services
    tokio::spawn(services::start_background_services(db.clone(), reconciler));

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid address");

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: api::AppState) -> Router {
    // CORS configuration
    let cors = cors_from_config(&state.config);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Skills (session-authenticated surface)
        .route(
            "/api/v1/skills/add-experience",
            post(api::skills::add_experience),
        )
        .route("/api/v1/skills/{asset_id}", get(api::skills::get_skills))
        // Characters (game-server surface)
        .route(
            "/api/v1/characters/add-skill-xp",
            post(api::characters::add_skill_xp),
        )
        .route(
            "/api/v1/characters/award-action",
            post(api::characters::award_action),
        )
        .route(
            "/api/v1/characters/xp-actions/list",
            get(api::characters::list_xp_actions),
        )
        .route(
            "/api/v1/characters/{asset_id}/skills",
            get(api::characters::get_character_skills),
        )
        .layer(cors)
        .with_state(state)
}

fn cors_from_config(config: &Config) -> CorsLayer {
    let raw = config.cors_allowed_origins.trim();
    if raw.is_empty() || raw == "*" {
        return CorsLayer::very_permissive();
    }

    let allowed: Vec<HeaderValue> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!("No valid CORS origins parsed; falling back to permissive");
        return CorsLayer::very_permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
