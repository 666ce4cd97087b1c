//! Correlation-ID middleware as a Tower layer.
//!
//! [`CorrelationLayer`] wraps any service that produces HTTP responses.
//! For every request it opens a [`context`] scope, seeds it with the
//! correlation ID (from `x-correlation-id`, or a fresh UUID v4), path,
//! and method, then runs the inner service inside that scope so every
//! log line and outbound call made while handling the request sees the
//! same ID.
//!
//! The request then ends in one of three states (see [`outcome`]):
//!
//! - **succeeded** — status in `[200, 400)`, response passed through;
//! - **error handled** — any other status, body re-emitted as parsed
//!   JSON (`null` when it does not parse);
//! - **faulted** — the inner service errored or panicked, answered with
//!   a 500 carrying the error message as a JSON string.
//!
//! The layer never fails itself, so it can sit at the outermost position
//! of an axum `Router`.

pub mod outcome;

use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response};
use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tower::{BoxError, Layer, Service, ServiceExt};

use crate::context::{self, CORRELATION_ID_HEADER};
use outcome::{Dispatched, Outcome};

#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationLayer;

impl CorrelationLayer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for CorrelationLayer {
    type Service = CorrelationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct CorrelationService<S> {
    inner: S,
}

/// Correlation ID carried by `request`, if any. Empty values count as absent.
pub fn correlation_id_from<B>(request: &Request<B>) -> Option<String> {
    request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CorrelationService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: http_body::Body<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError>,
{
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Readiness of the inner service is awaited per request so that its
        // errors become faulted responses instead of layer errors.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let inner = self.inner.clone();
        let correlation_id =
            correlation_id_from(&request).unwrap_or_else(context::generate_correlation_id);
        let method = request.method().to_string();
        let path = request.uri().path().to_string();

        Box::pin(context::scope(async move {
            context::set_correlation_id(Some(correlation_id));
            context::set_request_context(Some(path.clone()), Some(method.clone()));
            tracing::info!("incoming request - {method} {path}");

            let dispatched = match AssertUnwindSafe(inner.oneshot(request))
                .catch_unwind()
                .await
            {
                Ok(Ok(response)) => Dispatched::Completed(response.map(Body::new)),
                Ok(Err(e)) => Dispatched::Faulted(e.into()),
                Err(payload) => Dispatched::Faulted(outcome::panic_to_error(&*payload)),
            };

            Ok(respond(dispatched, &method, &path).await)
        }))
    }
}

async fn respond(dispatched: Dispatched, method: &str, path: &str) -> Response<Body> {
    match dispatched {
        Dispatched::Faulted(err) => {
            let source: &(dyn std::error::Error + 'static) = &*err;
            tracing::error!(error = source, "unexpected server error: {err}");
            outcome::fault_response(&err.to_string())
        }
        Dispatched::Completed(response) => match Outcome::classify(response.status()) {
            Outcome::Succeeded => {
                let status = response.status().as_u16();
                tracing::info!("request succeeded - {method} {path} - Status: {status}");
                response
            }
            Outcome::ErrorHandled => {
                let (parts, body) = response.into_parts();
                let detail = outcome::read_json_detail(body).await;
                tracing::error!(
                    status = parts.status.as_u16(),
                    "request failed - {method} {path} - {}",
                    outcome::render_detail(detail.as_ref())
                );
                outcome::json_error_response(parts, detail.as_ref())
            }
        },
    }
}
