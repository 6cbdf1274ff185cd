//! srcverify API /v1: REST endpoints
pub mod handlers;
pub mod metrics;
pub mod middleware;

use axum::{
    routing::{get, post},
    Router,
};
use metrics::ApiMetrics;
use srcverify_core::AttestationController;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<AttestationController>,
    pub metrics: Arc<ApiMetrics>,
}

impl AppState {
    pub fn new(controller: Arc<AttestationController>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            controller,
            metrics: Arc::new(ApiMetrics::new()?),
        })
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/v1/source", post(handlers::propose))
        .route("/v1/sign", post(handlers::sign))
        .route("/v1/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(axum::middleware::from_fn(middleware::request_id))
        .layer(middleware::cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(addr: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("srcverify API listening on {}", addr);
    axum::serve(listener, create_app(state)).await
}
