//! Access request entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{AccessRequest, AccessRequestStatus};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for access request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "access_request_status", rename_all = "lowercase")]
pub enum AccessRequestStatusDb {
    Pending,
    Approved,
    Denied,
    Used,
    Expired,
}

impl From<AccessRequestStatusDb> for AccessRequestStatus {
    fn from(status: AccessRequestStatusDb) -> Self {
        match status {
            AccessRequestStatusDb::Pending => AccessRequestStatus::Pending,
            AccessRequestStatusDb::Approved => AccessRequestStatus::Approved,
            AccessRequestStatusDb::Denied => AccessRequestStatus::Denied,
            AccessRequestStatusDb::Used => AccessRequestStatus::Used,
            AccessRequestStatusDb::Expired => AccessRequestStatus::Expired,
        }
    }
}

impl From<AccessRequestStatus> for AccessRequestStatusDb {
    fn from(status: AccessRequestStatus) -> Self {
        match status {
            AccessRequestStatus::Pending => AccessRequestStatusDb::Pending,
            AccessRequestStatus::Approved => AccessRequestStatusDb::Approved,
            AccessRequestStatus::Denied => AccessRequestStatusDb::Denied,
            AccessRequestStatus::Used => AccessRequestStatusDb::Used,
            AccessRequestStatus::Expired => AccessRequestStatusDb::Expired,
        }
    }
}

/// Database row mapping for the access_requests table.
#[derive(Debug, Clone, FromRow)]
pub struct AccessRequestEntity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub reason: Option<String>,
    pub category: String,
    pub status: AccessRequestStatusDb,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub denied_at: Option<DateTime<Utc>>,
    pub used_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    pub passcode: Option<String>,
    pub passcode_expires_at: Option<DateTime<Utc>>,
}

impl From<AccessRequestEntity> for AccessRequest {
    fn from(e: AccessRequestEntity) -> Self {
        AccessRequest {
            id: e.id,
            name: e.name,
            email: e.email,
            company: e.company,
            reason: e.reason,
            category: e.category,
            status: e.status.into(),
            created_at: e.created_at,
            approved_at: e.approved_at,
            denied_at: e.denied_at,
            used_at: e.used_at,
            expired_at: e.expired_at,
            passcode: e.passcode,
            passcode_expires_at: e.passcode_expires_at,
        }
    }
}
