//! Passcode domain model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Single-use secret issued on approval.
///
/// A passcode has no independent lifecycle: it is created inside the
/// `pending -> approved` transition of its owning request and stops
/// authorizing downloads when that request reaches `used` or `expired`.
/// Requester identity is denormalized so a code can be audited without
/// joining back to the request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Passcode {
    pub code: String,
    pub request_id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passcode_serializes_denormalized_fields() {
        let passcode = Passcode {
            code: "123456".into(),
            request_id: Uuid::nil(),
            email: "a@x.com".into(),
            name: "Alice".into(),
            company: None,
            created_at: Utc::now(),
            expires_at: Utc::now(),
        };
        let json = serde_json::to_string(&passcode).unwrap();
        assert!(json.contains("123456"));
        assert!(json.contains("a@x.com"));
        assert!(!json.contains("company"));
    }
}
