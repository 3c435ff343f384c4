//! Request ID middleware.
//!
//! Every request gets an ID that appears in the tracing span, the
//! completion log line, and the response headers, so one value links a
//! caller's report to the matching server logs.

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Header the ID is read from and echoed back on.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest inbound ID accepted before minting a fresh one.
const MAX_ID_LEN: usize = 128;

/// Request ID carried in request extensions for downstream handlers.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Take the caller-supplied ID when it is usable, otherwise mint a
/// UUID v4.
fn effective_request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= MAX_ID_LEN)
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Middleware that assigns a request ID and logs request completion
/// inside a span carrying it.
pub async fn trace_id(mut req: Request<Body>, next: Next) -> Response {
    let id = effective_request_id(req.headers());
    req.extensions_mut().insert(RequestId(id.clone()));

    let span = tracing::info_span!(
        "http_request",
        request_id = %id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        let started = Instant::now();
        let mut response = next.run(req).await;

        tracing::info!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request finished"
        );

        if let Ok(value) = HeaderValue::from_str(&id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uses_inbound_header_when_present() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("abc-123"));
        assert_eq!(effective_request_id(&headers), "abc-123");
    }

    #[test]
    fn test_mints_uuid_when_header_missing() {
        let headers = HeaderMap::new();
        let id = effective_request_id(&headers);
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_mints_uuid_when_header_empty() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static(""));
        assert!(Uuid::parse_str(&effective_request_id(&headers)).is_ok());
    }

    #[test]
    fn test_replaces_oversized_header() {
        let mut headers = HeaderMap::new();
        let long = "a".repeat(MAX_ID_LEN + 1);
        headers.insert(
            REQUEST_ID_HEADER,
            HeaderValue::from_str(&long).expect("header value"),
        );
        let id = effective_request_id(&headers);
        assert_ne!(id, long);
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
