//! Header preparation for relayed requests and responses.
//!
//! [`build_relay_headers`] clones the inbound headers, strips hop-by-hop
//! headers, rewrites `Host` for the upstream, and adds `Via` /
//! `X-Forwarded-*` metadata. The correlation header is passed through
//! untouched; the outbound client fills it in from the request context
//! when the caller did not send one.

use std::sync::LazyLock;

use axum::http::{HeaderMap, HeaderName, HeaderValue};

static HOP_BY_HOP: LazyLock<Vec<HeaderName>> = LazyLock::new(|| {
    [
        "connection",
        "keep-alive",
        "transfer-encoding",
        "te",
        "trailer",
        "upgrade",
        "proxy-authorization",
        "proxy-authenticate",
    ]
    .iter()
    .filter_map(|name| name.parse::<HeaderName>().ok())
    .collect()
});

/// Strip hop-by-hop headers and `content-length` from an upstream response.
pub fn strip_response_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove(hyper::header::CONTENT_LENGTH);
}

pub fn build_relay_headers(original: &HeaderMap, target_url: &url::Url) -> HeaderMap {
    let mut headers = original.clone();

    for header_name in HOP_BY_HOP.iter() {
        headers.remove(header_name);
    }
    // Recomputed by the client from the collected body
    headers.remove(hyper::header::CONTENT_LENGTH);

    if let Some(host) = target_url.host_str() {
        let host_value = target_url
            .port()
            .map_or_else(|| host.to_string(), |port| format!("{host}:{port}"));
        if let Ok(val) = HeaderValue::from_str(&host_value) {
            headers.insert("host", val);
        }
    }

    if let Some(original_host) = original.get("host") {
        headers.insert("x-forwarded-host", original_host.clone());
    }

    headers.insert("via", HeaderValue::from_static("1.1 correlog"));

    headers
}
