//! Outbound correlation-ID propagation against an in-process echo server.

mod common;

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use correlog::client::CorrelatedClient;
use correlog::context::{self, RequestContext, CORRELATION_ID_HEADER};
use correlog::error::CorrelogError;
use correlog::middleware::CorrelationLayer;
use http_body_util::BodyExt;
use serde::Deserialize;
use tower::ServiceExt;

#[derive(Debug, Deserialize)]
struct Seen {
    #[serde(rename = "correlationId")]
    correlation_id: Option<String>,
    count: usize,
}

async fn echo(headers: HeaderMap) -> Json<serde_json::Value> {
    let values: Vec<_> = headers
        .get_all(CORRELATION_ID_HEADER)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    Json(serde_json::json!({
        "correlationId": values.first(),
        "count": values.len(),
    }))
}

async fn start_echo_server() -> (SocketAddr, tokio::sync::oneshot::Sender<()>) {
    let router = Router::new().fallback(echo);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    (addr, shutdown_tx)
}

async fn seen(
    response: http::Response<hyper::body::Incoming>,
) -> Seen {
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn caller_header_takes_precedence() {
    let (addr, shutdown) = start_echo_server().await;
    let client = CorrelatedClient::new();

    let mut headers = HeaderMap::new();
    headers.insert("X-Correlation-Id", HeaderValue::from_static("caller-set"));
    let seed = RequestContext {
        correlation_id: Some("ambient".into()),
        ..RequestContext::default()
    };

    let response = context::scope_with(seed, client.get(&format!("http://{addr}/"), headers))
        .await
        .unwrap();
    let seen = seen(response).await;
    assert_eq!(seen.correlation_id.as_deref(), Some("caller-set"));
    assert_eq!(seen.count, 1);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn ambient_id_is_forwarded() {
    let (addr, shutdown) = start_echo_server().await;
    let client = CorrelatedClient::new();
    let url = format!("http://{addr}/inventory");

    let response = context::scope(async {
        context::set_correlation_id(Some("ambient-42".into()));
        client.post(&url, HeaderMap::new(), "{}").await
    })
    .await
    .unwrap();

    let seen = seen(response).await;
    assert_eq!(seen.correlation_id.as_deref(), Some("ambient-42"));

    let _ = shutdown.send(());
}

#[tokio::test]
async fn id_set_outside_any_scope_is_forwarded() {
    let (addr, shutdown) = start_echo_server().await;
    let client = CorrelatedClient::new();

    context::set_correlation_id(Some("job-1".into()));
    let response = client
        .get(&format!("http://{addr}/batch"), HeaderMap::new())
        .await
        .unwrap();
    context::set_correlation_id(None);

    let seen = seen(response).await;
    assert_eq!(seen.correlation_id.as_deref(), Some("job-1"));

    let _ = shutdown.send(());
}

#[tokio::test]
async fn fresh_id_is_generated_once_without_context() {
    let (addr, shutdown) = start_echo_server().await;
    let client = CorrelatedClient::new();

    let response = client
        .get(&format!("http://{addr}/"), HeaderMap::new())
        .await
        .unwrap();
    let seen = seen(response).await;

    assert_eq!(seen.count, 1);
    let id = seen.correlation_id.unwrap();
    assert!(uuid::Uuid::parse_str(&id).is_ok());

    let _ = shutdown.send(());
}

#[tokio::test]
async fn transport_errors_are_returned() {
    // Bind then drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = CorrelatedClient::new()
        .get(&format!("http://{addr}/"), HeaderMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CorrelogError::HttpRequest { .. }));
}

#[tokio::test]
async fn inbound_id_reaches_downstream_and_logs() {
    let (logs, _guard) = common::capture_logs("client");
    let (addr, shutdown) = start_echo_server().await;

    let downstream = format!("http://{addr}/stock");
    let app = Router::new()
        .route(
            "/orders",
            get(move || {
                let downstream = downstream.clone();
                async move {
                    let response = CorrelatedClient::new()
                        .get(&downstream, HeaderMap::new())
                        .await
                        .unwrap();
                    let seen = seen(response).await;
                    tracing::info!("downstream answered");
                    seen.correlation_id.unwrap_or_default()
                }
            }),
        )
        .layer(CorrelationLayer::new());

    let response = app
        .oneshot(Request::builder().uri("/orders").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let forwarded = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(uuid::Uuid::parse_str(&forwarded).is_ok());

    let request_lines: Vec<_> = logs
        .lines()
        .into_iter()
        .filter(|l| l.get("path").is_some())
        .collect();
    assert!(request_lines.len() >= 3);
    for line in &request_lines {
        assert_eq!(line["correlationId"], forwarded.as_str());
    }

    let _ = shutdown.send(());
}
