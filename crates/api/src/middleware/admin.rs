//! Admin authentication middleware.
//!
//! Guards the operator surface with a static key supplied in the
//! `X-Admin-Key` header.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use shared::crypto::constant_time_eq;

use crate::app::AppState;

/// Header name carrying the admin key.
pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

/// Middleware that requires the configured admin key.
///
/// The comparison is constant-time so response timing does not leak
/// how much of a guessed key matched.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let presented = req
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match presented {
        Some(key) if constant_time_eq(key, &state.config.security.admin_key) => {
            next.run(req).await
        }
        _ => unauthorized_response("Invalid or missing admin key"),
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = Json(json!({
        "error": "unauthorized",
        "message": message,
    }));
    (StatusCode::UNAUTHORIZED, body).into_response()
}
