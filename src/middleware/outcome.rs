//! Response classification and error-response normalization.
//!
//! Everything here is independent of the tower plumbing in the parent
//! module: given what the inner service produced, decide which terminal
//! state the request reaches and build the response for it.

use axum::body::Body;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING};
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use serde_json::Value;
use tower::BoxError;

/// What the inner service handed back.
pub enum Dispatched {
    Completed(Response),
    Faulted(BoxError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Status in `[200, 400)`, passed through untouched.
    Succeeded,
    /// Any other status; the body is normalized to JSON.
    ErrorHandled,
}

impl Outcome {
    #[must_use]
    pub fn classify(status: StatusCode) -> Self {
        let code = status.as_u16();
        if (200..400).contains(&code) {
            Self::Succeeded
        } else {
            Self::ErrorHandled
        }
    }
}

/// Drain `body` and parse it as JSON. Any failure yields `None`.
pub async fn read_json_detail(body: Body) -> Option<Value> {
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "failed to drain error response body");
            return None;
        }
    };
    serde_json::from_slice(&bytes).ok()
}

/// Render the detail the way it appears in logs: compact JSON or `null`.
#[must_use]
pub fn render_detail(detail: Option<&Value>) -> String {
    detail.map_or_else(|| "null".to_string(), Value::to_string)
}

/// Rebuild an error response with `detail` as its JSON body.
///
/// Status and headers (including the media type) are kept. Length and
/// transfer headers are dropped because the body changed.
#[must_use]
pub fn json_error_response(parts: axum::http::response::Parts, detail: Option<&Value>) -> Response {
    let body = render_detail(detail);
    let mut response = Response::from_parts(parts, Body::from(body));
    let headers = response.headers_mut();
    headers.remove(CONTENT_LENGTH);
    headers.remove(TRANSFER_ENCODING);
    if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    response
}

/// The fixed 500 response for a fault: the error message as a JSON string.
#[must_use]
pub fn fault_response(message: &str) -> Response {
    let body = Value::String(message.to_string()).to_string();
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Turn a panic payload into an error carrying the panic message.
#[must_use]
pub fn panic_to_error(payload: &(dyn std::any::Any + Send)) -> BoxError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_string());
    message.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_status_range() {
        assert_eq!(Outcome::classify(StatusCode::OK), Outcome::Succeeded);
        assert_eq!(Outcome::classify(StatusCode::NO_CONTENT), Outcome::Succeeded);
        assert_eq!(Outcome::classify(StatusCode::FOUND), Outcome::Succeeded);
        assert_eq!(
            Outcome::classify(StatusCode::from_u16(399).unwrap()),
            Outcome::Succeeded
        );
        assert_eq!(Outcome::classify(StatusCode::BAD_REQUEST), Outcome::ErrorHandled);
        assert_eq!(Outcome::classify(StatusCode::NOT_FOUND), Outcome::ErrorHandled);
        assert_eq!(
            Outcome::classify(StatusCode::BAD_GATEWAY),
            Outcome::ErrorHandled
        );
        assert_eq!(
            Outcome::classify(StatusCode::SWITCHING_PROTOCOLS),
            Outcome::ErrorHandled
        );
    }

    #[tokio::test]
    async fn parses_json_body() {
        let detail = read_json_detail(Body::from(r#"{"detail":"not found"}"#)).await;
        assert_eq!(detail, Some(serde_json::json!({ "detail": "not found" })));
    }

    #[tokio::test]
    async fn non_json_body_is_none() {
        assert_eq!(read_json_detail(Body::from("plain text")).await, None);
        assert_eq!(read_json_detail(Body::empty()).await, None);
        assert_eq!(read_json_detail(Body::from(vec![0xff, 0xfe])).await, None);
    }

    #[test]
    fn renders_null_for_missing_detail() {
        assert_eq!(render_detail(None), "null");
        assert_eq!(
            render_detail(Some(&serde_json::json!({ "a": 1 }))),
            r#"{"a":1}"#
        );
    }

    #[tokio::test]
    async fn rebuilt_response_keeps_status_and_headers() {
        let original = Response::builder()
            .status(StatusCode::NOT_FOUND)
            .header("x-upstream", "orders")
            .header(CONTENT_TYPE, "application/problem+json")
            .header(CONTENT_LENGTH, "999")
            .body(Body::empty())
            .unwrap();
        let (parts, _) = original.into_parts();

        let detail = serde_json::json!({ "detail": "not found" });
        let response = json_error_response(parts, Some(&detail));

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["x-upstream"], "orders");
        assert_eq!(response.headers()[CONTENT_TYPE], "application/problem+json");
        assert!(response.headers().get(CONTENT_LENGTH).is_none());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], br#"{"detail":"not found"}"#);
    }

    #[test]
    fn missing_content_type_defaults_to_json() {
        let (parts, _) = Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .body(Body::empty())
            .unwrap()
            .into_parts();
        let response = json_error_response(parts, None);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn fault_response_is_json_string() {
        let response = fault_response("database \"orders\" unavailable");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], br#""database \"orders\" unavailable""#);
    }

    #[test]
    fn panic_payloads_become_messages() {
        let from_str: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_to_error(&*from_str).to_string(), "boom");

        let from_string: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_to_error(&*from_string).to_string(), "bang");

        let opaque: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_to_error(&*opaque).to_string(), "handler panicked");
    }
}
