//! Access request route handlers.
//!
//! Public submission plus the admin review surface.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use domain::models::{
    AccessRequestItem, AccessRequestStatus, ActionResponse, CreateAccessRequestRequest,
    CreateAccessRequestResponse, ListAccessRequestsQuery, ListAccessRequestsResponse, Pagination,
};
use domain::services::CreateAccessRequest;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::{record_request_created, record_request_decided};

/// Submit a new access request.
///
/// POST /api/v1/requests
pub async fn create_request(
    State(state): State<AppState>,
    Json(payload): Json<CreateAccessRequestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;

    let created = state
        .lifecycle
        .create(CreateAccessRequest {
            name: payload.name,
            email: payload.email,
            company: payload.company,
            reason: payload.reason,
            category: payload.category,
        })
        .await?;

    record_request_created(&created.category);
    info!(
        request_id = %created.id,
        category = %created.category,
        "Access request submitted"
    );

    let response = CreateAccessRequestResponse {
        success: true,
        request_id: created.id,
        status: created.status,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// List access requests, optionally filtered by status.
///
/// GET /api/v1/admin/requests
pub async fn list_requests(
    State(state): State<AppState>,
    Query(query): Query<ListAccessRequestsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status_filter = match query.status.as_deref() {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(parse_status(raw)?),
    };

    let (page, per_page, offset) = paging_window(query.page, query.per_page);

    let total = state.store.count(status_filter).await?;
    let requests = state.store.list(status_filter, per_page, offset).await?;

    let data: Vec<AccessRequestItem> = requests.into_iter().map(AccessRequestItem::from).collect();

    Ok(Json(ListAccessRequestsResponse {
        data,
        pagination: Pagination {
            page,
            per_page,
            total,
        },
    }))
}

/// Fetch a single access request.
///
/// GET /api/v1/admin/requests/:id
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let request = state
        .store
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Request not found".to_string()))?;

    Ok(Json(AccessRequestItem::from(request)))
}

/// Approve a pending request and deliver the passcode.
///
/// POST /api/v1/admin/requests/:id/approve
pub async fn approve_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let approved = state.lifecycle.approve(id).await?;

    record_request_decided("approved");

    Ok(Json(ActionResponse {
        success: true,
        id: approved.id,
        status: approved.status,
        responded_at: approved.approved_at,
    }))
}

/// Deny a pending request and notify the requester.
///
/// POST /api/v1/admin/requests/:id/deny
pub async fn deny_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let denied = state.lifecycle.deny(id).await?;

    record_request_decided("denied");

    Ok(Json(ActionResponse {
        success: true,
        id: denied.id,
        status: denied.status,
        responded_at: denied.denied_at,
    }))
}

/// Largest page number the listing accepts. Keeps the OFFSET
/// arithmetic far away from i64 overflow on hostile query strings.
const MAX_PAGE: i64 = 1_000_000;

/// Normalize raw paging parameters into (page, per_page, offset).
fn paging_window(page: i64, per_page: i64) -> (i64, i64, i64) {
    let page = page.clamp(1, MAX_PAGE);
    let per_page = per_page.clamp(1, 100);
    (page, per_page, (page - 1) * per_page)
}

fn parse_status(raw: &str) -> Result<AccessRequestStatus, ApiError> {
    match raw {
        "pending" => Ok(AccessRequestStatus::Pending),
        "approved" => Ok(AccessRequestStatus::Approved),
        "denied" => Ok(AccessRequestStatus::Denied),
        "used" => Ok(AccessRequestStatus::Used),
        "expired" => Ok(AccessRequestStatus::Expired),
        other => Err(ApiError::Validation(format!(
            "Unknown status filter: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_known_values() {
        assert_eq!(parse_status("pending").unwrap(), AccessRequestStatus::Pending);
        assert_eq!(parse_status("approved").unwrap(), AccessRequestStatus::Approved);
        assert_eq!(parse_status("denied").unwrap(), AccessRequestStatus::Denied);
        assert_eq!(parse_status("used").unwrap(), AccessRequestStatus::Used);
        assert_eq!(parse_status("expired").unwrap(), AccessRequestStatus::Expired);
    }

    #[test]
    fn test_parse_status_unknown_value() {
        assert!(parse_status("archived").is_err());
    }

    #[test]
    fn test_paging_window_defaults() {
        assert_eq!(paging_window(1, 20), (1, 20, 0));
        assert_eq!(paging_window(3, 20), (3, 20, 40));
    }

    #[test]
    fn test_paging_window_clamps_low_values() {
        assert_eq!(paging_window(0, 0), (1, 1, 0));
        assert_eq!(paging_window(-5, -5), (1, 1, 0));
    }

    #[test]
    fn test_paging_window_clamps_per_page_ceiling() {
        assert_eq!(paging_window(2, 1000), (2, 100, 100));
    }

    #[test]
    fn test_paging_window_survives_huge_page() {
        let (page, per_page, offset) = paging_window(i64::MAX, i64::MAX);
        assert_eq!(page, MAX_PAGE);
        assert_eq!(per_page, 100);
        assert_eq!(offset, (MAX_PAGE - 1) * 100);
        assert!(offset > 0);
    }
}
