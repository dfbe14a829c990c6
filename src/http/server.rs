//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with every API route
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Serve on a listener until the shutdown future resolves

use axum::{
    routing::{get, post},
    Router,
};
use axum::http::HeaderName;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::attestation::AttestationService;
use crate::config::AgriConfig;
use crate::http::handlers;

/// Header carrying the per-request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AttestationService>,
}

/// HTTP server for the attestation API.
pub struct HttpServer {
    router: Router,
    config: AgriConfig,
}

impl HttpServer {
    pub fn new(config: AgriConfig, service: Arc<AttestationService>) -> Self {
        let router = build_router(&config, AppState { service });
        Self { router, config }
    }

    /// Run the server, accepting connections until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &AgriConfig {
        &self.config
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(config: &AgriConfig, state: AppState) -> Router {
    let request_id = HeaderName::from_static(X_REQUEST_ID);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/harvest/submit", post(handlers::submit_harvest))
        .route("/api/harvest/verify", post(handlers::verify_harvest))
        .route("/api/harvest/records", get(handlers::all_records))
        .route("/api/harvest/records/{farmer_id}", get(handlers::records_by_farmer))
        .route("/api/harvest/stats/{farmer_id}", get(handlers::farmer_stats))
        .route("/api/keys/generate", post(handlers::generate_keys))
        .route("/api/wallet", get(handlers::wallet))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}
