//! Axum server setup, shared application state, and graceful shutdown.
//!
//! Contains [`AppState`] (the `Arc`-shared state holding the service
//! name, outbound client, upstream, and uptime), [`build_router`] for
//! constructing the router with the correlation layer outermost, and
//! [`shutdown_signal`] for SIGTERM / Ctrl+C handling.

use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

use crate::client::CorrelatedClient;
use crate::health::health_handler;
use crate::middleware::CorrelationLayer;
use crate::proxy;

pub struct AppState {
    pub service: String,
    pub client: CorrelatedClient,
    pub upstream: Option<url::Url>,
    pub start_time: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(service: impl Into<String>, upstream: Option<url::Url>) -> Self {
        Self {
            service: service.into(),
            client: CorrelatedClient::new(),
            upstream,
            start_time: Instant::now(),
        }
    }
}

pub fn build_router(state: Arc<AppState>, max_body: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .fallback(proxy::relay_handler)
        .layer(
            ServiceBuilder::new()
                .layer(CorrelationLayer::new())
                .layer(RequestBodyLimitLayer::new(max_body)),
        )
        .with_state(state)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
