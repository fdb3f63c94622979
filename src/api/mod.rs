//! HTTP surface over [`EstimateService`]: the estimate endpoint plus a
//! couple of read-only probes.

mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{middleware, Router};
use tracing::{error, info};

use crate::application::EstimateService;

pub use handlers::{ApiError, EstimateResponse, LOCATION_HINT};

/// Build the API router around a shared service.
pub fn router(service: Arc<EstimateService>) -> Router {
    Router::new()
        .route("/api/estimate", post(handlers::estimate))
        .route("/api/fx", get(handlers::fx))
        .route("/health", get(handlers::health))
        .layer(middleware::map_response(no_store))
        .with_state(service)
}

async fn no_store(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, service: EstimateService) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(addr = %listener.local_addr()?, "Estimator API listening");

    axum::serve(listener, router(Arc::new(service)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Estimator API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for shutdown signal");
    }
}
