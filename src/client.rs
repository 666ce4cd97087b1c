//! Outbound HTTP client that forwards the correlation ID.
//!
//! [`CorrelatedClient`] wraps the connection-pooled hyper client. Before
//! each call it makes sure `x-correlation-id` is set, in this order of
//! precedence: the caller's own header, the ambient request context,
//! a freshly generated UUID v4. Header lookup is case-insensitive, the
//! same as on the inbound side. The transport's response and errors are
//! handed back as they are; there is no retry or extra timeout.

use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, Request, Response, Uri};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::context::{self, CORRELATION_ID_HEADER};
use crate::error::CorrelogError;

pub type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;
pub type HttpClient = Client<HttpsConnector, Full<Bytes>>;

#[must_use]
pub fn build_http_client() -> HttpClient {
    // When multiple rustls crypto providers are compiled in, rustls cannot
    // auto-detect which one to use. Explicitly install `ring`.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .build();
    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(30))
        .build(https)
}

/// Ensure `headers` carries a correlation ID and return the value in effect.
///
/// A non-empty caller value is left alone.
pub fn inject_correlation_header(headers: &mut HeaderMap) -> Result<HeaderValue, CorrelogError> {
    if let Some(existing) = headers
        .get(CORRELATION_ID_HEADER)
        .filter(|v| !v.is_empty())
    {
        return Ok(existing.clone());
    }

    let id = context::get_correlation_id().unwrap_or_else(context::generate_correlation_id);
    let value = HeaderValue::from_str(&id)?;
    headers.insert(
        HeaderName::from_static(CORRELATION_ID_HEADER),
        value.clone(),
    );
    Ok(value)
}

#[derive(Clone)]
pub struct CorrelatedClient {
    inner: HttpClient,
}

impl Default for CorrelatedClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrelatedClient {
    #[must_use]
    pub fn new() -> Self {
        Self::with_client(build_http_client())
    }

    #[must_use]
    pub const fn with_client(inner: HttpClient) -> Self {
        Self { inner }
    }

    pub async fn get(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> Result<Response<Incoming>, CorrelogError> {
        self.request(Method::GET, url, headers, Bytes::new()).await
    }

    pub async fn post(
        &self,
        url: &str,
        headers: HeaderMap,
        body: impl Into<Bytes>,
    ) -> Result<Response<Incoming>, CorrelogError> {
        self.request(Method::POST, url, headers, body.into()).await
    }

    pub async fn request(
        &self,
        method: Method,
        url: &str,
        mut headers: HeaderMap,
        body: Bytes,
    ) -> Result<Response<Incoming>, CorrelogError> {
        let uri: Uri = url.parse().map_err(|e| CorrelogError::UriParse {
            source: Box::new(e),
        })?;
        let correlation_id = inject_correlation_header(&mut headers)?;

        let mut request = Request::new(Full::new(body));
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        *request.headers_mut() = headers;

        tracing::debug!(
            url = %url,
            correlation_id = ?correlation_id,
            "sending outbound request"
        );

        self.inner
            .request(request)
            .await
            .map_err(|e| CorrelogError::HttpRequest {
                source: Box::new(e),
            })
    }
}
