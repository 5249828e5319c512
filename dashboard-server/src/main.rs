//! Birth Trauma Risk Dashboard Server
//!
//! Form-based assessment of postpartum childbirth-trauma risk.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  BIRTH TRAUMA DASHBOARD                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌─────────────────────────┐ │
//! │  │  HTML     │  │  JSON     │  │  Plot                   │ │
//! │  │  Form     │  │  API      │  │  (SVG / raster)         │ │
//! │  └─────┬─────┘  └─────┬─────┘  └────────────┬────────────┘ │
//! │        └──────────────┼──────────────────────┘              │
//! │                       ▼                                     │
//! │     normalize → predict → TreeSHAP → force plot             │
//! │                (birth-trauma-core Pipeline)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod handlers;
mod views;

#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use birth_trauma_core::logic::model::load_model;
use birth_trauma_core::Pipeline;
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging (also forwards `log` records from the core crate)
    let json_logs = config.is_production();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "birth_trauma_dashboard=debug,birth_trauma_core=info,tower_http=debug".into()))
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    tracing::info!("Birth Trauma Dashboard starting ({})...", config.environment);
    tracing::info!("Model: {}", config.model_path);

    // Model is required: no model, no listener
    let model = load_model(&config.model_path, config.model_sha256.as_deref())
        .with_context(|| format!("failed to load model from {}", config.model_path))?;

    let pipeline = Pipeline::new(model, config.pipeline_config());

    // Build application state
    let state = AppState {
        pipeline: Arc::new(pipeline),
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Shared application state, read-only after startup
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Browser pages
    let page_routes = Router::new()
        .route("/", get(handlers::page::index))
        .route("/assess", post(handlers::page::submit));

    // JSON API
    let api_routes = Router::new()
        .route("/api/v1/schema", get(handlers::schema::schema))
        .route("/api/v1/glossary", get(handlers::schema::glossary))
        .route("/api/v1/assess", post(handlers::assess::assess))
        .route("/api/v1/assess/plot", post(handlers::assess::plot));

    Router::new()
        .route("/health", get(handlers::health::check))
        .merge(page_routes)
        .merge(api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
