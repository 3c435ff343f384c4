//! Postgres-backed record store.
//!
//! Implements the domain store contract over the repositories. The
//! database is the single source of truth for transitions: a `None`
//! from a conditional update is resolved into `NotFound` or `Conflict`
//! by re-reading the row, never assumed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use domain::models::{AccessRequest, AccessRequestStatus, NewAccessRequest};
use domain::services::{AccessRequestStore, StoreError};

use crate::entities::AccessRequestEntity;
use crate::repositories::AccessRequestRepository;

/// Name of the partial unique index enforcing one active request per
/// (email, category) pair.
const ACTIVE_PAIR_INDEX: &str = "access_requests_active_pair";

/// Connection settings for the Postgres store.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// Open a connection pool sized for the store.
///
/// Idle connections are health-checked before reuse, so a database
/// restart surfaces as a reconnect rather than a dead socket error.
pub async fn connect_pool(options: &ConnectOptions) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .min_connections(options.min_connections)
        .max_connections(options.max_connections)
        .acquire_timeout(Duration::from_secs(options.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(options.idle_timeout_secs))
        .test_before_acquire(true)
        .connect(&options.url)
        .await
}

#[derive(Clone)]
pub struct PgAccessRequestStore {
    repo: AccessRequestRepository,
}

impl PgAccessRequestStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repo: AccessRequestRepository::new(pool),
        }
    }

    fn map_sql_error(err: sqlx::Error) -> StoreError {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            _ => StoreError::Unavailable(err.to_string()),
        }
    }

    /// Resolve a failed conditional update into the caller-facing error.
    async fn transition_conflict(&self, id: Uuid) -> StoreError {
        match self.repo.find_by_id(id).await {
            Ok(Some(entity)) => StoreError::Conflict {
                current: entity.status.into(),
            },
            Ok(None) => StoreError::NotFound,
            Err(err) => Self::map_sql_error(err),
        }
    }
}

fn into_model(entity: AccessRequestEntity) -> AccessRequest {
    entity.into()
}

#[async_trait]
impl AccessRequestStore for PgAccessRequestStore {
    async fn insert(&self, new: NewAccessRequest) -> Result<AccessRequest, StoreError> {
        self.repo
            .create(
                &new.name,
                &new.email,
                new.company.as_deref(),
                new.reason.as_deref(),
                &new.category,
            )
            .await
            .map(into_model)
            .map_err(|err| match &err {
                sqlx::Error::Database(db_err)
                    if db_err.code().as_deref() == Some("23505")
                        && db_err
                            .constraint()
                            .map_or(false, |c| c == ACTIVE_PAIR_INDEX) =>
                {
                    StoreError::DuplicateActive
                }
                _ => Self::map_sql_error(err),
            })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AccessRequest>, StoreError> {
        self.repo
            .find_by_id(id)
            .await
            .map(|opt| opt.map(into_model))
            .map_err(Self::map_sql_error)
    }

    async fn find_active(
        &self,
        email: &str,
        category: &str,
    ) -> Result<Option<AccessRequest>, StoreError> {
        self.repo
            .find_active(email, category)
            .await
            .map(|opt| opt.map(into_model))
            .map_err(Self::map_sql_error)
    }

    async fn find_by_passcode(
        &self,
        code: &str,
        category: &str,
    ) -> Result<Option<AccessRequest>, StoreError> {
        self.repo
            .find_by_passcode(code, category)
            .await
            .map(|opt| opt.map(into_model))
            .map_err(Self::map_sql_error)
    }

    async fn list(
        &self,
        status: Option<AccessRequestStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AccessRequest>, StoreError> {
        self.repo
            .list(status.map(Into::into), limit, offset)
            .await
            .map(|entities| entities.into_iter().map(into_model).collect())
            .map_err(Self::map_sql_error)
    }

    async fn count(&self, status: Option<AccessRequestStatus>) -> Result<i64, StoreError> {
        self.repo
            .count(status.map(Into::into))
            .await
            .map_err(Self::map_sql_error)
    }

    async fn mark_approved(
        &self,
        id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<AccessRequest, StoreError> {
        match self.repo.approve(id, code, expires_at).await {
            Ok(Some(entity)) => Ok(into_model(entity)),
            Ok(None) => Err(self.transition_conflict(id).await),
            Err(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some("23505")
                    && db_err.constraint().map_or(false, |c| c.starts_with("passcodes")) =>
            {
                Err(StoreError::DuplicateCode)
            }
            Err(err) => Err(Self::map_sql_error(err)),
        }
    }

    async fn mark_denied(&self, id: Uuid) -> Result<AccessRequest, StoreError> {
        match self.repo.deny(id).await {
            Ok(Some(entity)) => Ok(into_model(entity)),
            Ok(None) => Err(self.transition_conflict(id).await),
            Err(err) => Err(Self::map_sql_error(err)),
        }
    }

    async fn mark_used(&self, id: Uuid) -> Result<AccessRequest, StoreError> {
        match self.repo.mark_used(id).await {
            Ok(Some(entity)) => Ok(into_model(entity)),
            Ok(None) => Err(self.transition_conflict(id).await),
            Err(err) => Err(Self::map_sql_error(err)),
        }
    }

    async fn mark_expired(&self, id: Uuid) -> Result<AccessRequest, StoreError> {
        match self.repo.mark_expired(id).await {
            Ok(Some(entity)) => Ok(into_model(entity)),
            Ok(None) => Err(self.transition_conflict(id).await),
            Err(err) => Err(Self::map_sql_error(err)),
        }
    }
}
