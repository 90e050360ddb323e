use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, MethodRouter},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::config::AppConfig;
use crate::database::{DatabaseManager, QuarterStore, StoreError};
use crate::error::ApiError;
use crate::handlers::{fallback, health, legacy, login, quarters, save_quarter};

/// Shared request state: configuration plus the quarter store, if one is configured
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Option<Arc<dyn QuarterStore>>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Option<Arc<dyn QuarterStore>>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    /// Build the PostgreSQL store from `config.database`. The pool connects lazily.
    pub fn from_config(config: AppConfig) -> Result<Self, StoreError> {
        let store = DatabaseManager::store(&config.database)?;
        Ok(Self::new(config, store))
    }

    pub fn store(&self) -> Result<&dyn QuarterStore, ApiError> {
        self.store
            .as_deref()
            .ok_or(ApiError::ServerMisconfigured("DATABASE_URL"))
    }
}

fn endpoint(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.fallback(fallback::method_not_allowed)
}

fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/login", endpoint(post(login::login)))
        .route("/quarters", endpoint(get(quarters::get_quarters)))
        .route("/save-quarter", endpoint(post(save_quarter::save_quarter)))
}

// Paths and response keys of the serverless deployment the existing front end calls
fn legacy_routes() -> Router<AppState> {
    Router::new()
        .route("/login", endpoint(post(login::login)))
        .route("/get-quarters", endpoint(get(legacy::get_quarters)))
        .route("/save-quarter", endpoint(post(legacy::save_quarter)))
}

pub fn app(state: AppState) -> Router {
    let body_limit = state.config.api.max_request_size_bytes;
    let request_logging = state.config.api.enable_request_logging;

    let router = Router::new()
        .route("/health", endpoint(get(health::health)))
        .merge(dashboard_routes())
        .nest("/.netlify/functions", legacy_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        // answers every OPTIONS request itself
        .layer(CorsLayer::permissive())
        .with_state(state);

    if request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Bind `port` and serve until ctrl-c
pub async fn serve(config: AppConfig, port: u16) -> anyhow::Result<()> {
    let environment = config.environment;
    let state = AppState::from_config(config).context("failed to set up the quarter store")?;

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Finance dashboard API ({:?}) listening on http://{}", environment, bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
