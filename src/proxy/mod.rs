//! Relay handler for the demo service.
//!
//! [`relay_handler`] is the Axum fallback. With an upstream configured
//! it forwards the request through [`CorrelatedClient`](crate::client::CorrelatedClient),
//! so the downstream service receives the same correlation ID this
//! request is logged under. Without one it answers 404.

pub mod headers;

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::server::AppState;

/// Resolve `uri`'s path and query against `upstream`.
pub fn upstream_url(upstream: &url::Url, uri: &Uri) -> Result<url::Url, url::ParseError> {
    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
    upstream.join(path_and_query)
}

pub async fn relay_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    req_headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(upstream) = state.upstream.as_ref() else {
        tracing::warn!("no upstream configured");
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "detail": "not found" })),
        )
            .into_response();
    };

    let target = match upstream_url(upstream, &uri) {
        Ok(target) => target,
        Err(e) => {
            tracing::error!(error = %e, "invalid upstream URL");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let forwarded = headers::build_relay_headers(&req_headers, &target);
    tracing::info!(upstream = %target, "relaying request");

    match state
        .client
        .request(method, target.as_str(), forwarded, body)
        .await
    {
        Ok(upstream_response) => {
            let (mut parts, incoming) = upstream_response.into_parts();
            headers::strip_response_hop_by_hop(&mut parts.headers);
            Response::from_parts(parts, Body::new(incoming))
        }
        Err(e) => {
            tracing::error!(error = &e as &(dyn std::error::Error + 'static), "relay failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "detail": "upstream unavailable" })),
            )
                .into_response()
        }
    }
}
