//! `GET /health` endpoint handler.
//!
//! Returns a [`HealthResponse`] with the service name, crate version,
//! uptime, and the correlation ID the request was handled under.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::context;
use crate::server::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub uptime_seconds: u64,
    #[serde(rename = "correlationId")]
    pub correlation_id: Option<String>,
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    tracing::debug!("health check");
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.service.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        correlation_id: context::get_correlation_id(),
    })
}
