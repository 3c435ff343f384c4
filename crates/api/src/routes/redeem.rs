//! Passcode redemption route handler.
//!
//! A successful redemption consumes the passcode and streams the
//! protected file back in the same response. Failures use a
//! `{success: false, message}` body so the download form can surface
//! the message directly.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::path::Path as FilePath;
use tokio_util::io::ReaderStream;
use tracing::{error, info, warn};

use domain::models::DEFAULT_CATEGORY;
use domain::services::RedemptionError;
use shared::passcode;

use crate::app::AppState;
use crate::middleware::metrics::record_redemption;

/// Redemption request body.
#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub passcode: String,
    #[serde(default)]
    pub category: Option<String>,
}

fn failure(status: StatusCode, message: &str) -> Response {
    let body = Json(serde_json::json!({
        "success": false,
        "message": message,
    }));
    (status, body).into_response()
}

/// Redeem a passcode for the protected file.
///
/// POST /api/v1/redeem
pub async fn redeem(State(state): State<AppState>, Json(payload): Json<RedeemRequest>) -> Response {
    let code = payload.passcode.trim();
    if !passcode::is_well_formed(code) {
        record_redemption("malformed");
        return failure(
            StatusCode::BAD_REQUEST,
            "Passcode must be a 6-digit code",
        );
    }

    let category = payload
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CATEGORY)
        .to_string();

    let used = match state.gate.redeem(code, &category).await {
        Ok(request) => request,
        Err(RedemptionError::Store(err)) => {
            error!(error = %err, "Redemption failed on store error");
            record_redemption("error");
            return failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred",
            );
        }
        // One message for every rejection so callers cannot probe which
        // passcodes exist or what state a request is in.
        Err(err) => {
            warn!(category = %category, error = %err, "Redemption rejected");
            record_redemption("rejected");
            return failure(StatusCode::FORBIDDEN, "Invalid or expired passcode");
        }
    };

    let Some(path) = state.config.access.file_for(&used.category).map(String::from) else {
        error!(
            request_id = %used.id,
            category = %used.category,
            "No file configured for redeemed category"
        );
        record_redemption("error");
        return failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            "An internal error occurred",
        );
    };

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(err) => {
            error!(
                request_id = %used.id,
                path = %path,
                error = %err,
                "Failed to open protected file"
            );
            record_redemption("error");
            return failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred",
            );
        }
    };

    record_redemption("success");
    info!(
        request_id = %used.id,
        category = %used.category,
        "Passcode redeemed, streaming file"
    );

    let content_type = mime_guess::from_path(&path).first_or_octet_stream();
    let filename = FilePath::new(&path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download")
        .to_string();

    let stream = ReaderStream::new(file);
    let body = Body::from_stream(stream);

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(content_type.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redeem_request_defaults_category() {
        let parsed: RedeemRequest =
            serde_json::from_str(r#"{"passcode": "482913"}"#).expect("valid json");
        assert_eq!(parsed.passcode, "482913");
        assert!(parsed.category.is_none());
    }

    #[test]
    fn test_redeem_request_with_category() {
        let parsed: RedeemRequest =
            serde_json::from_str(r#"{"passcode": "482913", "category": "portfolio"}"#)
                .expect("valid json");
        assert_eq!(parsed.category.as_deref(), Some("portfolio"));
    }

    #[test]
    fn test_failure_body_shape() {
        let response = failure(StatusCode::FORBIDDEN, "Invalid or expired passcode");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
