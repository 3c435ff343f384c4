//! Request lifecycle manager.
//!
//! Owns the state machine for a single access request:
//!
//! ```text
//! pending --approve--> approved --redeem--> used
//! pending --deny-----> denied
//! approved --past expiry--> expired
//! ```
//!
//! Notification policy per call site: the operator alert is fatal to
//! `create`, passcode delivery is fatal to `approve`, the denial notice
//! is fatal to `deny`, and the audit notice is always advisory. A fatal
//! channel failure after the record was written leaves the record in
//! place; the caller is told the channel failed.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{AccessRequest, AccessRequestStatus, NewAccessRequest, DEFAULT_CATEGORY};
use crate::services::notification::{ChannelError, Notifier};
use crate::services::store::{AccessRequestStore, StoreError};

/// Attempts to allocate a unique passcode before giving up.
const MAX_CODE_ATTEMPTS: usize = 3;

/// Errors surfaced by lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("{0}")]
    Validation(String),

    #[error("an active request for \"{category}\" already exists for this email")]
    DuplicateActiveRequest { category: String },

    #[error("access request not found")]
    RequestNotFound,

    #[error("request is already {current}")]
    InvalidStateTransition { current: AccessRequestStatus },

    #[error("notification failed: {0}")]
    Notification(#[from] ChannelError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => LifecycleError::RequestNotFound,
            StoreError::Conflict { current } => {
                LifecycleError::InvalidStateTransition { current }
            }
            other => LifecycleError::Store(other),
        }
    }
}

/// Validated input for creating an access request.
#[derive(Debug, Clone)]
pub struct CreateAccessRequest {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub reason: Option<String>,
    pub category: Option<String>,
}

/// Drives access requests through their state machine.
pub struct RequestLifecycle {
    store: Arc<dyn AccessRequestStore>,
    notifier: Arc<dyn Notifier>,
    passcode_ttl: Duration,
}

impl RequestLifecycle {
    pub fn new(
        store: Arc<dyn AccessRequestStore>,
        notifier: Arc<dyn Notifier>,
        passcode_ttl: Duration,
    ) -> Self {
        Self {
            store,
            notifier,
            passcode_ttl,
        }
    }

    /// Create a new pending request and alert the operator.
    ///
    /// Rejects the call while a `pending` or `approved` request exists
    /// for the same (email, category) pair.
    pub async fn create(&self, input: CreateAccessRequest) -> Result<AccessRequest, LifecycleError> {
        let name = input.name.trim().to_string();
        let email = input.email.trim().to_lowercase();
        if name.is_empty() {
            return Err(LifecycleError::Validation("Name is required".into()));
        }
        if email.is_empty() || !email.contains('@') {
            return Err(LifecycleError::Validation(
                "A valid email address is required".into(),
            ));
        }
        let category = input
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        if let Some(existing) = self.store.find_active(&email, &category).await? {
            info!(
                request_id = %existing.id,
                email = %email,
                category = %category,
                "Rejected duplicate access request"
            );
            return Err(LifecycleError::DuplicateActiveRequest { category });
        }

        let request = match self
            .store
            .insert(NewAccessRequest {
                name,
                email,
                company: input.company.filter(|c| !c.trim().is_empty()),
                reason: input.reason.filter(|r| !r.trim().is_empty()),
                category: category.clone(),
            })
            .await
        {
            Ok(request) => request,
            // A concurrent create won after our duplicate check passed.
            Err(StoreError::DuplicateActive) => {
                return Err(LifecycleError::DuplicateActiveRequest { category });
            }
            Err(err) => return Err(err.into()),
        };

        let summary = request.summary();
        // Fatal: without the operator alert the request would sit
        // unanswered forever. The record itself stays persisted.
        self.notifier.notify_operator(&summary).await?;

        if let Err(err) = self.notifier.audit_record(&summary).await {
            warn!(request_id = %request.id, error = %err, "Audit notice failed");
        }

        info!(
            request_id = %request.id,
            category = %summary.category,
            "Created access request"
        );
        Ok(request)
    }

    /// Approve a pending request: issue a passcode and email it.
    pub async fn approve(&self, id: Uuid) -> Result<AccessRequest, LifecycleError> {
        let existing = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(LifecycleError::RequestNotFound)?;
        if existing.status != AccessRequestStatus::Pending {
            return Err(LifecycleError::InvalidStateTransition {
                current: existing.status,
            });
        }

        let expires_at = Utc::now() + self.passcode_ttl;
        let mut approved = None;
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = shared::passcode::generate();
            match self.store.mark_approved(id, &code, expires_at).await {
                Ok(request) => {
                    approved = Some(request);
                    break;
                }
                Err(StoreError::DuplicateCode) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        let request = approved.ok_or_else(|| {
            LifecycleError::Store(StoreError::Unavailable(
                "could not allocate a unique passcode".into(),
            ))
        })?;

        let code = request
            .passcode
            .clone()
            .ok_or_else(|| LifecycleError::Store(StoreError::Unavailable(
                "approved record is missing its passcode".into(),
            )))?;
        self.notifier
            .send_passcode(&request.email, &request.name, &code, expires_at)
            .await?;

        info!(request_id = %request.id, expires_at = %expires_at, "Approved access request");
        Ok(request)
    }

    /// Deny a pending request and notify the requester.
    pub async fn deny(&self, id: Uuid) -> Result<AccessRequest, LifecycleError> {
        let existing = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(LifecycleError::RequestNotFound)?;
        if existing.status != AccessRequestStatus::Pending {
            return Err(LifecycleError::InvalidStateTransition {
                current: existing.status,
            });
        }

        let request = self.store.mark_denied(id).await?;
        self.notifier
            .send_denial(&request.email, &request.name)
            .await?;

        info!(request_id = %request.id, "Denied access request");
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::notification::{MockNotifier, SentNotification};
    use crate::services::store::InMemoryStore;

    fn lifecycle_with(
        notifier: MockNotifier,
    ) -> (RequestLifecycle, Arc<InMemoryStore>, Arc<MockNotifier>) {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(notifier);
        let lifecycle = RequestLifecycle::new(
            store.clone(),
            notifier.clone(),
            Duration::days(7),
        );
        (lifecycle, store, notifier)
    }

    fn input(email: &str) -> CreateAccessRequest {
        CreateAccessRequest {
            name: "Alice".into(),
            email: email.into(),
            company: Some("Acme".into()),
            reason: Some("eval".into()),
            category: None,
        }
    }

    #[tokio::test]
    async fn test_create_defaults_category_and_notifies() {
        let (lifecycle, _, notifier) = lifecycle_with(MockNotifier::new());

        let request = lifecycle.create(input("a@x.com")).await.unwrap();
        assert_eq!(request.status, AccessRequestStatus::Pending);
        assert_eq!(request.category, DEFAULT_CATEGORY);

        let sent = notifier.sent();
        assert!(matches!(sent[0], SentNotification::Operator { request_id } if request_id == request.id));
        assert!(matches!(sent[1], SentNotification::Audit { .. }));
    }

    #[tokio::test]
    async fn test_create_rejects_missing_fields() {
        let (lifecycle, _, _) = lifecycle_with(MockNotifier::new());

        let mut missing_name = input("a@x.com");
        missing_name.name = "  ".into();
        assert!(matches!(
            lifecycle.create(missing_name).await,
            Err(LifecycleError::Validation(_))
        ));

        let mut bad_email = input("a@x.com");
        bad_email.email = "nope".into();
        assert!(matches!(
            lifecycle.create(bad_email).await,
            Err(LifecycleError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_active_request_rejected() {
        let (lifecycle, _, _) = lifecycle_with(MockNotifier::new());

        lifecycle.create(input("a@x.com")).await.unwrap();
        let err = lifecycle.create(input("a@x.com")).await.unwrap_err();
        match err {
            LifecycleError::DuplicateActiveRequest { category } => {
                assert_eq!(category, "resume");
                assert!(err_message_mentions_category(&category));
            }
            other => panic!("expected DuplicateActiveRequest, got {other:?}"),
        }

        // A different category for the same email is fine.
        let mut portfolio = input("a@x.com");
        portfolio.category = Some("portfolio".into());
        assert!(lifecycle.create(portfolio).await.is_ok());
    }

    fn err_message_mentions_category(category: &str) -> bool {
        LifecycleError::DuplicateActiveRequest {
            category: category.to_string(),
        }
        .to_string()
        .contains(category)
    }

    #[tokio::test]
    async fn test_duplicate_check_survives_approval() {
        let (lifecycle, _, _) = lifecycle_with(MockNotifier::new());

        let request = lifecycle.create(input("a@x.com")).await.unwrap();
        lifecycle.approve(request.id).await.unwrap();

        // Approved is still active for duplicate detection.
        assert!(matches!(
            lifecycle.create(input("a@x.com")).await,
            Err(LifecycleError::DuplicateActiveRequest { .. })
        ));
    }

    #[tokio::test]
    async fn test_denied_request_frees_the_pair() {
        let (lifecycle, _, _) = lifecycle_with(MockNotifier::new());

        let request = lifecycle.create(input("a@x.com")).await.unwrap();
        lifecycle.deny(request.id).await.unwrap();
        assert!(lifecycle.create(input("a@x.com")).await.is_ok());
    }

    #[tokio::test]
    async fn test_operator_channel_failure_fails_create_but_persists() {
        let mut notifier = MockNotifier::new();
        notifier.fail_operator = true;
        let (lifecycle, store, _) = lifecycle_with(notifier);

        let err = lifecycle.create(input("a@x.com")).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Notification(_)));

        // The record was persisted before the alert was attempted.
        let active = store.find_active("a@x.com", "resume").await.unwrap();
        assert!(active.is_some());
    }

    #[tokio::test]
    async fn test_audit_channel_failure_is_advisory() {
        let mut notifier = MockNotifier::new();
        notifier.fail_audit = true;
        let (lifecycle, _, notifier_ref) = lifecycle_with(notifier);

        let request = lifecycle.create(input("a@x.com")).await;
        assert!(request.is_ok());
        // Operator alert still went out.
        assert!(matches!(
            notifier_ref.sent()[0],
            SentNotification::Operator { .. }
        ));
    }

    #[tokio::test]
    async fn test_approve_issues_passcode_and_emails_it() {
        let (lifecycle, _, notifier) = lifecycle_with(MockNotifier::new());

        let request = lifecycle.create(input("a@x.com")).await.unwrap();
        let approved = lifecycle.approve(request.id).await.unwrap();

        assert_eq!(approved.status, AccessRequestStatus::Approved);
        let code = approved.passcode.clone().unwrap();
        assert!(shared::passcode::is_well_formed(&code));
        assert!(approved.passcode_expires_at.unwrap() > Utc::now());

        let delivered = notifier.sent().into_iter().any(|n| {
            matches!(n, SentNotification::Passcode { email, code: sent } if email == "a@x.com" && sent == code)
        });
        assert!(delivered);
    }

    #[tokio::test]
    async fn test_approve_unknown_request() {
        let (lifecycle, _, _) = lifecycle_with(MockNotifier::new());
        assert!(matches!(
            lifecycle.approve(Uuid::new_v4()).await,
            Err(LifecycleError::RequestNotFound)
        ));
    }

    #[tokio::test]
    async fn test_approve_then_deny_conflicts() {
        let (lifecycle, store, _) = lifecycle_with(MockNotifier::new());

        let request = lifecycle.create(input("a@x.com")).await.unwrap();
        lifecycle.approve(request.id).await.unwrap();

        let err = lifecycle.deny(request.id).await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidStateTransition { current: AccessRequestStatus::Approved }
        ));
        // First decision stands.
        let stored = store.find_by_id(request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AccessRequestStatus::Approved);
    }

    #[tokio::test]
    async fn test_deny_then_approve_conflicts() {
        let (lifecycle, store, _) = lifecycle_with(MockNotifier::new());

        let request = lifecycle.create(input("a@x.com")).await.unwrap();
        lifecycle.deny(request.id).await.unwrap();

        let err = lifecycle.approve(request.id).await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidStateTransition { current: AccessRequestStatus::Denied }
        ));
        let stored = store.find_by_id(request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AccessRequestStatus::Denied);
        assert!(stored.passcode.is_none());
    }

    #[tokio::test]
    async fn test_passcode_delivery_failure_fails_approve() {
        let mut notifier = MockNotifier::new();
        notifier.fail_passcode = true;
        let (lifecycle, store, _) = lifecycle_with(notifier);

        let request = lifecycle.create(input("a@x.com")).await.unwrap();
        let err = lifecycle.approve(request.id).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Notification(_)));

        // The transition itself committed; the caller knows delivery failed.
        let stored = store.find_by_id(request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AccessRequestStatus::Approved);
    }
}
