//! Inbound operator reply webhook.
//!
//! The SMS gateway posts the operator's reply here as a form-encoded
//! body. The handler authenticates the gateway via an HMAC signature
//! over the raw body, checks the sender against the configured operator
//! identity, and only then executes the decision.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use domain::services::reply::{parse_reply, usage_text, ReplyCommand};
use shared::crypto::verify_signature;

use crate::app::AppState;
use crate::middleware::metrics::record_request_decided;

/// Header carrying the gateway's HMAC-SHA256 signature (hex).
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Inbound reply payload, form-encoded by the gateway.
#[derive(Debug, Deserialize)]
struct InboundReply {
    #[serde(rename = "From")]
    from: String,
    #[serde(rename = "Body")]
    body: String,
}

/// Process an operator reply.
///
/// POST /api/v1/reply
///
/// Callers failing the signature check get a bare 403 with no side
/// effects. Once the transport is authenticated the handler always
/// acknowledges with 200 so the gateway never retries: replies from
/// anyone but the configured operator are dropped with an empty ack,
/// and operator replies get the outcome as plain text to relay back.
pub async fn reply(State(state): State<AppState>, headers: HeaderMap, body: String) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !verify_signature(
        &state.config.security.webhook_secret,
        body.as_bytes(),
        signature,
    ) {
        warn!("Rejected reply webhook with bad signature");
        return StatusCode::FORBIDDEN.into_response();
    }

    let inbound: InboundReply = match serde_urlencoded::from_str(&body) {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!("Dropped reply webhook with unparseable body");
            return (StatusCode::OK, String::new()).into_response();
        }
    };

    let operator = &state.config.notify.operator_phone;
    if operator.is_empty() || inbound.from != *operator {
        warn!(from = %inbound.from, "Dropped reply from unauthorized sender");
        return (StatusCode::OK, String::new()).into_response();
    }

    let ack = match parse_reply(&inbound.body) {
        ReplyCommand::Approve(id) => match state.lifecycle.approve(id).await {
            Ok(approved) => {
                record_request_decided("approved");
                info!(request_id = %approved.id, "Request approved via reply");
                format!("Approved request {}. Passcode sent to requester.", approved.id)
            }
            Err(err) => {
                warn!(request_id = %id, error = %err, "Reply approval failed");
                format!("Could not approve {}: {}", id, err)
            }
        },
        ReplyCommand::Deny(id) => match state.lifecycle.deny(id).await {
            Ok(denied) => {
                record_request_decided("denied");
                info!(request_id = %denied.id, "Request denied via reply");
                format!("Denied request {}. Requester notified.", denied.id)
            }
            Err(err) => {
                warn!(request_id = %id, error = %err, "Reply denial failed");
                format!("Could not deny {}: {}", id, err)
            }
        },
        ReplyCommand::Malformed => format!("Unrecognized reply. {}", usage_text()),
        ReplyCommand::Help => usage_text().to_string(),
    };

    (StatusCode::OK, ack).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::crypto::hmac_sha256_hex;

    #[test]
    fn test_inbound_reply_parses_form_body() {
        let body = "From=%2B15550001111&Body=Y550e8400-e29b-41d4-a716-446655440000";
        let parsed: InboundReply = serde_urlencoded::from_str(body).expect("valid form");
        assert_eq!(parsed.from, "+15550001111");
        assert!(parsed.body.starts_with('Y'));
    }

    #[test]
    fn test_inbound_reply_rejects_missing_fields() {
        let body = "Body=help";
        assert!(serde_urlencoded::from_str::<InboundReply>(body).is_err());
    }

    #[test]
    fn test_signature_matches_raw_body() {
        let secret = "test-webhook-secret";
        let body = "From=%2B15550001111&Body=help";
        let signature = hmac_sha256_hex(secret, body.as_bytes());
        assert!(verify_signature(secret, body.as_bytes(), &signature));
        assert!(!verify_signature(secret, b"tampered", &signature));
    }
}
