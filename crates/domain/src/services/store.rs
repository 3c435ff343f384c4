//! Record store contract for access requests and passcodes.
//!
//! The store is the single source of truth for status transitions. Every
//! transition method is a compare-and-set: the write succeeds only if the
//! record is still in the expected prior status, so exactly one of any
//! set of concurrent callers wins a given transition. Losers receive
//! [`StoreError::Conflict`] carrying the status the winner left behind.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::{AccessRequest, AccessRequestStatus, NewAccessRequest, Passcode};

/// Errors surfaced by record store implementations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("transition refused, record is {current}")]
    Conflict { current: AccessRequestStatus },

    /// An active request for the same (email, category) pair already
    /// exists. Raised by `insert` when a concurrent create wins the
    /// race after the caller's duplicate check passed.
    #[error("an active request already exists for this pair")]
    DuplicateActive,

    #[error("passcode already allocated")]
    DuplicateCode,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Durable keyed storage for access requests and passcodes.
///
/// Constructed once at startup and passed by reference to every
/// component; there is no ambient global client.
#[async_trait]
pub trait AccessRequestStore: Send + Sync {
    /// Insert a new request with status `pending`.
    async fn insert(&self, new: NewAccessRequest) -> Result<AccessRequest, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AccessRequest>, StoreError>;

    /// Find a `pending` or `approved` request for the pair, if any.
    async fn find_active(
        &self,
        email: &str,
        category: &str,
    ) -> Result<Option<AccessRequest>, StoreError>;

    /// Find the request owning a passcode within one category.
    ///
    /// A code presented against the wrong category must not match.
    async fn find_by_passcode(
        &self,
        code: &str,
        category: &str,
    ) -> Result<Option<AccessRequest>, StoreError>;

    /// List requests newest-first, optionally filtered by status.
    async fn list(
        &self,
        status: Option<AccessRequestStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AccessRequest>, StoreError>;

    /// Count requests, optionally filtered by status.
    async fn count(&self, status: Option<AccessRequestStatus>) -> Result<i64, StoreError>;

    /// CAS `pending -> approved`; records the passcode atomically with
    /// the transition. Fails with [`StoreError::DuplicateCode`] if the
    /// code is already allocated.
    async fn mark_approved(
        &self,
        id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<AccessRequest, StoreError>;

    /// CAS `pending -> denied`.
    async fn mark_denied(&self, id: Uuid) -> Result<AccessRequest, StoreError>;

    /// CAS `approved -> used`. The serialization point for redemption.
    async fn mark_used(&self, id: Uuid) -> Result<AccessRequest, StoreError>;

    /// CAS `approved -> expired` (lazy expiry write).
    async fn mark_expired(&self, id: Uuid) -> Result<AccessRequest, StoreError>;
}

#[derive(Default)]
struct InMemoryInner {
    requests: HashMap<Uuid, AccessRequest>,
    passcodes: HashMap<String, Passcode>,
}

/// In-memory store for development and testing.
///
/// Mirrors the database semantics: CAS transitions under one lock,
/// passcode uniqueness, records never removed.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<InMemoryInner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InMemoryInner> {
        // A poisoned lock means a panic mid-transition in a test.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl AccessRequestStore for InMemoryStore {
    async fn insert(&self, new: NewAccessRequest) -> Result<AccessRequest, StoreError> {
        let mut inner = self.lock();
        if inner
            .requests
            .values()
            .any(|r| r.email == new.email && r.category == new.category && r.status.is_active())
        {
            return Err(StoreError::DuplicateActive);
        }
        let request = AccessRequest {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            company: new.company,
            reason: new.reason,
            category: new.category,
            status: AccessRequestStatus::Pending,
            created_at: Utc::now(),
            approved_at: None,
            denied_at: None,
            used_at: None,
            expired_at: None,
            passcode: None,
            passcode_expires_at: None,
        };
        inner.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AccessRequest>, StoreError> {
        Ok(self.lock().requests.get(&id).cloned())
    }

    async fn find_active(
        &self,
        email: &str,
        category: &str,
    ) -> Result<Option<AccessRequest>, StoreError> {
        Ok(self
            .lock()
            .requests
            .values()
            .find(|r| r.email == email && r.category == category && r.status.is_active())
            .cloned())
    }

    async fn find_by_passcode(
        &self,
        code: &str,
        category: &str,
    ) -> Result<Option<AccessRequest>, StoreError> {
        let inner = self.lock();
        let Some(passcode) = inner.passcodes.get(code) else {
            return Ok(None);
        };
        Ok(inner
            .requests
            .get(&passcode.request_id)
            .filter(|r| r.category == category)
            .cloned())
    }

    async fn list(
        &self,
        status: Option<AccessRequestStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AccessRequest>, StoreError> {
        let mut matching: Vec<AccessRequest> = self
            .lock()
            .requests
            .values()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count(&self, status: Option<AccessRequestStatus>) -> Result<i64, StoreError> {
        Ok(self
            .lock()
            .requests
            .values()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .count() as i64)
    }

    async fn mark_approved(
        &self,
        id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<AccessRequest, StoreError> {
        let mut inner = self.lock();
        if inner.passcodes.contains_key(code) {
            return Err(StoreError::DuplicateCode);
        }
        let request = inner.requests.get_mut(&id).ok_or(StoreError::NotFound)?;
        if request.status != AccessRequestStatus::Pending {
            return Err(StoreError::Conflict {
                current: request.status,
            });
        }
        let now = Utc::now();
        request.status = AccessRequestStatus::Approved;
        request.approved_at = Some(now);
        request.passcode = Some(code.to_string());
        request.passcode_expires_at = Some(expires_at);
        let updated = request.clone();
        inner.passcodes.insert(
            code.to_string(),
            Passcode {
                code: code.to_string(),
                request_id: updated.id,
                email: updated.email.clone(),
                name: updated.name.clone(),
                company: updated.company.clone(),
                created_at: now,
                expires_at,
            },
        );
        Ok(updated)
    }

    async fn mark_denied(&self, id: Uuid) -> Result<AccessRequest, StoreError> {
        let mut inner = self.lock();
        let request = inner.requests.get_mut(&id).ok_or(StoreError::NotFound)?;
        if request.status != AccessRequestStatus::Pending {
            return Err(StoreError::Conflict {
                current: request.status,
            });
        }
        request.status = AccessRequestStatus::Denied;
        request.denied_at = Some(Utc::now());
        Ok(request.clone())
    }

    async fn mark_used(&self, id: Uuid) -> Result<AccessRequest, StoreError> {
        let mut inner = self.lock();
        let request = inner.requests.get_mut(&id).ok_or(StoreError::NotFound)?;
        if request.status != AccessRequestStatus::Approved {
            return Err(StoreError::Conflict {
                current: request.status,
            });
        }
        request.status = AccessRequestStatus::Used;
        request.used_at = Some(Utc::now());
        Ok(request.clone())
    }

    async fn mark_expired(&self, id: Uuid) -> Result<AccessRequest, StoreError> {
        let mut inner = self.lock();
        let request = inner.requests.get_mut(&id).ok_or(StoreError::NotFound)?;
        if request.status != AccessRequestStatus::Approved {
            return Err(StoreError::Conflict {
                current: request.status,
            });
        }
        request.status = AccessRequestStatus::Expired;
        request.expired_at = Some(Utc::now());
        Ok(request.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_request(email: &str, category: &str) -> NewAccessRequest {
        NewAccessRequest {
            name: "Alice".into(),
            email: email.into(),
            company: Some("Acme".into()),
            reason: Some("eval".into()),
            category: category.into(),
        }
    }

    #[tokio::test]
    async fn test_insert_starts_pending() {
        let store = InMemoryStore::new();
        let request = store.insert(new_request("a@x.com", "resume")).await.unwrap();
        assert_eq!(request.status, AccessRequestStatus::Pending);
        assert!(request.passcode.is_none());
        let found = store.find_by_id(request.id).await.unwrap().unwrap();
        assert_eq!(found.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_insert_rejects_second_active_pair() {
        let store = InMemoryStore::new();
        store.insert(new_request("a@x.com", "resume")).await.unwrap();
        let err = store.insert(new_request("a@x.com", "resume")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateActive));
    }

    #[tokio::test]
    async fn test_find_active_respects_category() {
        let store = InMemoryStore::new();
        store.insert(new_request("a@x.com", "resume")).await.unwrap();

        assert!(store.find_active("a@x.com", "resume").await.unwrap().is_some());
        assert!(store.find_active("a@x.com", "portfolio").await.unwrap().is_none());
        assert!(store.find_active("b@x.com", "resume").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_denied_request_is_not_active() {
        let store = InMemoryStore::new();
        let request = store.insert(new_request("a@x.com", "resume")).await.unwrap();
        store.mark_denied(request.id).await.unwrap();
        assert!(store.find_active("a@x.com", "resume").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_approved_sets_passcode_fields() {
        let store = InMemoryStore::new();
        let request = store.insert(new_request("a@x.com", "resume")).await.unwrap();
        let expires = Utc::now() + Duration::days(7);

        let approved = store.mark_approved(request.id, "123456", expires).await.unwrap();
        assert_eq!(approved.status, AccessRequestStatus::Approved);
        assert_eq!(approved.passcode.as_deref(), Some("123456"));
        assert_eq!(approved.passcode_expires_at, Some(expires));
        assert!(approved.approved_at.is_some());
    }

    #[tokio::test]
    async fn test_mark_approved_rejects_duplicate_code() {
        let store = InMemoryStore::new();
        let first = store.insert(new_request("a@x.com", "resume")).await.unwrap();
        let second = store.insert(new_request("b@x.com", "resume")).await.unwrap();
        let expires = Utc::now() + Duration::days(7);

        store.mark_approved(first.id, "123456", expires).await.unwrap();
        let err = store.mark_approved(second.id, "123456", expires).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateCode));

        // The losing request is untouched and can take a fresh code.
        let retried = store.mark_approved(second.id, "654321", expires).await.unwrap();
        assert_eq!(retried.status, AccessRequestStatus::Approved);
    }

    #[tokio::test]
    async fn test_cas_refuses_non_pending_transition() {
        let store = InMemoryStore::new();
        let request = store.insert(new_request("a@x.com", "resume")).await.unwrap();
        store.mark_denied(request.id).await.unwrap();

        let err = store
            .mark_approved(request.id, "123456", Utc::now())
            .await
            .unwrap_err();
        assert!(
            matches!(err, StoreError::Conflict { current: AccessRequestStatus::Denied })
        );
    }

    #[tokio::test]
    async fn test_mark_used_only_from_approved() {
        let store = InMemoryStore::new();
        let request = store.insert(new_request("a@x.com", "resume")).await.unwrap();

        let err = store.mark_used(request.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { current: AccessRequestStatus::Pending }));

        store
            .mark_approved(request.id, "123456", Utc::now() + Duration::days(7))
            .await
            .unwrap();
        let used = store.mark_used(request.id).await.unwrap();
        assert_eq!(used.status, AccessRequestStatus::Used);
        assert!(used.used_at.is_some());

        let err = store.mark_used(request.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { current: AccessRequestStatus::Used }));
    }

    #[tokio::test]
    async fn test_find_by_passcode_scoped_to_category() {
        let store = InMemoryStore::new();
        let request = store.insert(new_request("a@x.com", "resume")).await.unwrap();
        store
            .mark_approved(request.id, "123456", Utc::now() + Duration::days(7))
            .await
            .unwrap();

        assert!(store.find_by_passcode("123456", "resume").await.unwrap().is_some());
        assert!(store.find_by_passcode("123456", "portfolio").await.unwrap().is_none());
        assert!(store.find_by_passcode("000000", "resume").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_and_count_filter_by_status() {
        let store = InMemoryStore::new();
        let first = store.insert(new_request("a@x.com", "resume")).await.unwrap();
        store.insert(new_request("b@x.com", "resume")).await.unwrap();
        store.mark_denied(first.id).await.unwrap();

        assert_eq!(store.count(None).await.unwrap(), 2);
        assert_eq!(store.count(Some(AccessRequestStatus::Pending)).await.unwrap(), 1);
        let denied = store.list(Some(AccessRequestStatus::Denied), 20, 0).await.unwrap();
        assert_eq!(denied.len(), 1);
        assert_eq!(denied[0].id, first.id);
    }

    #[tokio::test]
    async fn test_mark_not_found() {
        let store = InMemoryStore::new();
        let err = store.mark_denied(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
