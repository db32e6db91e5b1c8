//! Web server module exposing the ingestion pipeline over HTTP

pub mod http;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::analysis::ExternalAnalyzer;
use crate::config::Config;
use crate::pipeline::IngestionService;
use crate::store::RecordStore;

/// Shared server state
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub service: Arc<IngestionService>,
}

impl ServerState {
    /// Wire the store and the external analyzer described by `config`
    pub fn from_config(config: Config) -> Self {
        let store = Arc::new(RecordStore::new(config.storage.store_path.clone()));
        let analyzer = Arc::new(ExternalAnalyzer::from_config(&config));
        Self {
            service: Arc::new(IngestionService::new(store, analyzer)),
            config: Arc::new(config),
        }
    }
}

/// Every endpoint, unmounted
fn api_routes() -> Router<ServerState> {
    Router::new()
        .route("/experiences", get(http::list_handler))
        .route("/user-experiences", get(http::list_handler))
        .route("/experiences/filter", get(http::filter_handler))
        .route("/experiences/search", get(http::search_handler))
        .route("/experiences/stats", get(http::stats_handler))
        .route("/experiences/{id}", get(http::get_handler))
        .route("/submit-experience", post(http::submit_handler))
        .route("/health", get(http::health_handler))
        .route("/test-nlp", post(http::test_nlp_handler))
}

/// Build the application router.
///
/// Routes are served at the root and again under the configured API prefix.
pub fn router(state: ServerState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new().merge(api_routes());
    if let Some(prefix) = normalized_prefix(&state.config.server.api_prefix) {
        app = app.nest(&prefix, api_routes());
    }

    app.layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `"api/"` -> `Some("/api")`; empty or `/` -> None
fn normalized_prefix(prefix: &str) -> Option<String> {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("/{}", trimmed))
    }
}

/// Start the web server
pub async fn start(config: Config) -> Result<()> {
    config.validate()?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    let store_path = config.storage.store_path.clone();
    let analyzer = config.analyzer.clone();

    let state = ServerState::from_config(config);
    // Surface an unusable store at startup rather than on the first request
    let existing = state
        .service
        .store()
        .load()
        .await
        .context("Failed to open experience store")?;

    let app = router(state);

    info!(
        %addr,
        store = %store_path.display(),
        experiences = existing.len(),
        analyzer_enabled = analyzer.enabled,
        analyzer = %analyzer.program.display(),
        timeout_secs = analyzer.timeout_secs,
        "Interview insights server starting"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
