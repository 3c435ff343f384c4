//! Access request repository for database operations.
//!
//! Every status transition is a conditional update (`WHERE status = the
//! expected prior status`), so concurrent callers race on the database
//! row and exactly one wins. A `None` return from a transition means the
//! row was missing or no longer in the expected status; the store layer
//! re-reads to tell the two apart.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{AccessRequestEntity, AccessRequestStatusDb};
use crate::metrics::QueryTimer;

const REQUEST_COLUMNS: &str = r#"id, name, email, company, reason, category, status,
               created_at, approved_at, denied_at, used_at, expired_at,
               passcode, passcode_expires_at"#;

/// Repository for access request database operations.
#[derive(Clone)]
pub struct AccessRequestRepository {
    pool: PgPool,
}

impl AccessRequestRepository {
    /// Creates a new AccessRequestRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new pending request.
    ///
    /// The partial unique index on (email, category) over active rows
    /// turns a lost concurrent-create race into a unique violation.
    pub async fn create(
        &self,
        name: &str,
        email: &str,
        company: Option<&str>,
        reason: Option<&str>,
        category: &str,
    ) -> Result<AccessRequestEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_access_request");
        let result = sqlx::query_as::<_, AccessRequestEntity>(&format!(
            r#"
            INSERT INTO access_requests (name, email, company, reason, category)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {REQUEST_COLUMNS}
            "#,
        ))
        .bind(name)
        .bind(email)
        .bind(company)
        .bind(reason)
        .bind(category)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find an access request by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AccessRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_access_request_by_id");
        let result = sqlx::query_as::<_, AccessRequestEntity>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM access_requests
            WHERE id = $1
            "#,
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a pending or approved request for an (email, category) pair.
    pub async fn find_active(
        &self,
        email: &str,
        category: &str,
    ) -> Result<Option<AccessRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_active_access_request");
        let result = sqlx::query_as::<_, AccessRequestEntity>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM access_requests
            WHERE email = $1 AND category = $2 AND status IN ('pending', 'approved')
            "#,
        ))
        .bind(email)
        .bind(category)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find the request owning a passcode within one category.
    ///
    /// Resolved through the passcodes table so a code can be looked up
    /// independently of the request row; the category filter keeps codes
    /// from leaking across categories.
    pub async fn find_by_passcode(
        &self,
        code: &str,
        category: &str,
    ) -> Result<Option<AccessRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_access_request_by_passcode");
        let result = sqlx::query_as::<_, AccessRequestEntity>(
            r#"
            SELECT ar.id, ar.name, ar.email, ar.company, ar.reason, ar.category, ar.status,
                   ar.created_at, ar.approved_at, ar.denied_at, ar.used_at, ar.expired_at,
                   ar.passcode, ar.passcode_expires_at
            FROM access_requests ar
            JOIN passcodes p ON p.request_id = ar.id
            WHERE p.code = $1 AND ar.category = $2
            "#,
        )
        .bind(code)
        .bind(category)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List access requests newest-first.
    pub async fn list(
        &self,
        status_filter: Option<AccessRequestStatusDb>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AccessRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_access_requests");
        let result = if let Some(status) = status_filter {
            sqlx::query_as::<_, AccessRequestEntity>(&format!(
                r#"
                SELECT {REQUEST_COLUMNS}
                FROM access_requests
                WHERE status = $1
                ORDER BY created_at DESC
                LIMIT $2 OFFSET $3
                "#,
            ))
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, AccessRequestEntity>(&format!(
                r#"
                SELECT {REQUEST_COLUMNS}
                FROM access_requests
                ORDER BY created_at DESC
                LIMIT $1 OFFSET $2
                "#,
            ))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
        };
        timer.record();
        result
    }

    /// Count access requests.
    pub async fn count(
        &self,
        status_filter: Option<AccessRequestStatusDb>,
    ) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_access_requests");
        let result = if let Some(status) = status_filter {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM access_requests WHERE status = $1",
            )
            .bind(status)
            .fetch_one(&self.pool)
            .await
        } else {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM access_requests")
                .fetch_one(&self.pool)
                .await
        };
        timer.record();
        result
    }

    /// Approve a pending request and record its passcode, atomically.
    ///
    /// Returns `None` if the request was missing or not pending. A
    /// passcode collision surfaces as a unique violation on the
    /// passcodes insert and rolls the transition back.
    pub async fn approve(
        &self,
        id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<AccessRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("approve_access_request");
        let result = async {
            let mut tx = self.pool.begin().await?;

            let updated = sqlx::query_as::<_, AccessRequestEntity>(&format!(
                r#"
                UPDATE access_requests
                SET status = 'approved', approved_at = NOW(),
                    passcode = $2, passcode_expires_at = $3
                WHERE id = $1 AND status = 'pending'
                RETURNING {REQUEST_COLUMNS}
                "#,
            ))
            .bind(id)
            .bind(code)
            .bind(expires_at)
            .fetch_optional(&mut *tx)
            .await?;

            let Some(entity) = updated else {
                tx.rollback().await?;
                return Ok(None);
            };

            sqlx::query(
                r#"
                INSERT INTO passcodes (code, request_id, email, name, company, expires_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(code)
            .bind(entity.id)
            .bind(&entity.email)
            .bind(&entity.name)
            .bind(&entity.company)
            .bind(expires_at)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(Some(entity))
        }
        .await;
        timer.record();
        result
    }

    /// Deny a pending request. Returns `None` if not pending.
    pub async fn deny(&self, id: Uuid) -> Result<Option<AccessRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("deny_access_request");
        let result = sqlx::query_as::<_, AccessRequestEntity>(&format!(
            r#"
            UPDATE access_requests
            SET status = 'denied', denied_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {REQUEST_COLUMNS}
            "#,
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Mark an approved request used. Returns `None` if not approved.
    pub async fn mark_used(&self, id: Uuid) -> Result<Option<AccessRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("mark_access_request_used");
        let result = sqlx::query_as::<_, AccessRequestEntity>(&format!(
            r#"
            UPDATE access_requests
            SET status = 'used', used_at = NOW()
            WHERE id = $1 AND status = 'approved'
            RETURNING {REQUEST_COLUMNS}
            "#,
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Mark an approved request expired. Returns `None` if not approved.
    pub async fn mark_expired(
        &self,
        id: Uuid,
    ) -> Result<Option<AccessRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("mark_access_request_expired");
        let result = sqlx::query_as::<_, AccessRequestEntity>(&format!(
            r#"
            UPDATE access_requests
            SET status = 'expired', expired_at = NOW()
            WHERE id = $1 AND status = 'approved'
            RETURNING {REQUEST_COLUMNS}
            "#,
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}
