//! HTTP scrape endpoint.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::encoding::text;
use crate::registry::Registry;

/// Router serving `GET /metrics` from `registry`. Other paths are `404`.
pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(registry)
}

async fn metrics_handler(State(registry): State<Arc<Registry>>) -> Response {
    let snapshot = registry.scrape().await;

    let mut buffer = String::new();
    if let Err(err) = text::encode(&mut buffer, &snapshot) {
        error!(%err, "failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    ([(CONTENT_TYPE, text::CONTENT_TYPE)], Body::from(buffer)).into_response()
}

/// Serve `registry` on `listener` until Ctrl+C.
pub async fn serve(listener: TcpListener, registry: Arc<Registry>) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "serving metrics on /metrics");
    }

    axum::serve(listener, router(registry))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutting down"),
        Err(err) => {
            error!(%err, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
