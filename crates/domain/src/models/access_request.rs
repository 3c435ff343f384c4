//! Access request domain models for the gated document workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Category used when a requester does not name one.
pub const DEFAULT_CATEGORY: &str = "resume";

/// Status of an access request.
///
/// Transitions are one-way: `pending -> approved | denied`, then
/// `approved -> used | expired`. `denied`, `used` and `expired` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessRequestStatus {
    Pending,
    Approved,
    Denied,
    Used,
    Expired,
}

impl AccessRequestStatus {
    /// True while the request blocks a new request for the same
    /// (email, category) pair.
    pub fn is_active(self) -> bool {
        matches!(self, AccessRequestStatus::Pending | AccessRequestStatus::Approved)
    }

    /// True once no further transition is permitted.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AccessRequestStatus::Denied | AccessRequestStatus::Used | AccessRequestStatus::Expired
        )
    }
}

impl std::fmt::Display for AccessRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessRequestStatus::Pending => write!(f, "pending"),
            AccessRequestStatus::Approved => write!(f, "approved"),
            AccessRequestStatus::Denied => write!(f, "denied"),
            AccessRequestStatus::Used => write!(f, "used"),
            AccessRequestStatus::Expired => write!(f, "expired"),
        }
    }
}

/// One requester's attempt to obtain a protected document.
///
/// Records are never deleted; terminal-state rows remain as an audit
/// trail. The passcode field is set exactly when the request leaves
/// `pending` through approval, and stays set through `used`/`expired`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AccessRequest {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub category: String,
    pub status: AccessRequestStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denied_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expired_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passcode_expires_at: Option<DateTime<Utc>>,
}

impl AccessRequest {
    /// Compact summary used for operator and audit notifications.
    pub fn summary(&self) -> RequestSummary {
        RequestSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            company: self.company.clone(),
            reason: self.reason.clone(),
            category: self.category.clone(),
            created_at: self.created_at,
        }
    }
}

/// Data for inserting a new pending request.
#[derive(Debug, Clone)]
pub struct NewAccessRequest {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub reason: Option<String>,
    pub category: String,
}

/// Requester-facing view of a request passed to notification channels.
#[derive(Debug, Clone)]
pub struct RequestSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub reason: Option<String>,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// Request body for creating an access request.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateAccessRequestRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Response after creating an access request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CreateAccessRequestResponse {
    pub success: bool,
    pub request_id: Uuid,
    pub status: AccessRequestStatus,
}

/// Response after an approve or deny action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ActionResponse {
    pub success: bool,
    pub id: Uuid,
    pub status: AccessRequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
}

/// Access request for admin listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AccessRequestItem {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub category: String,
    pub status: AccessRequestStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passcode_expires_at: Option<DateTime<Utc>>,
}

impl From<AccessRequest> for AccessRequestItem {
    fn from(r: AccessRequest) -> Self {
        Self {
            id: r.id,
            name: r.name,
            email: r.email,
            company: r.company,
            reason: r.reason,
            category: r.category,
            status: r.status,
            created_at: r.created_at,
            passcode_expires_at: r.passcode_expires_at,
        }
    }
}

/// Pagination info for list responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

/// Response for listing access requests.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ListAccessRequestsResponse {
    pub data: Vec<AccessRequestItem>,
    pub pagination: Pagination,
}

/// Query parameters for listing access requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ListAccessRequestsQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    20
}
