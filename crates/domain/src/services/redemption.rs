//! Redemption gate.
//!
//! Validates a presented passcode against its request and category,
//! enforces expiry and single use, and performs the `approved -> used`
//! transition before the caller serves any file bytes. The conditional
//! update is the serialization point: of any number of concurrent
//! redemption attempts with the same passcode, exactly one wins.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::models::{AccessRequest, AccessRequestStatus};
use crate::services::store::{AccessRequestStore, StoreError};

/// Rejection reasons for a redemption attempt.
///
/// Messages are specific enough to guide the requester's next action
/// without leaking anything they do not already hold.
#[derive(Debug, thiserror::Error)]
pub enum RedemptionError {
    #[error("invalid passcode")]
    InvalidPasscode,

    #[error("this passcode has already been used")]
    AlreadyUsed,

    #[error("this request was denied")]
    RequestDenied,

    #[error("this passcode has expired; submit a new access request")]
    PasscodeExpired,

    #[error("this request cannot be redeemed yet")]
    InvalidState,

    #[error(transparent)]
    Store(StoreError),
}

/// Gate enforcing exactly-once release of a protected document.
pub struct RedemptionGate {
    store: Arc<dyn AccessRequestStore>,
}

impl RedemptionGate {
    pub fn new(store: Arc<dyn AccessRequestStore>) -> Self {
        Self { store }
    }

    /// Redeem a passcode for one category.
    ///
    /// On success the returned request is already marked `used`; the
    /// caller may release the file. Expiry is lazy: an overdue approved
    /// request is moved to `expired` here, at access time.
    pub async fn redeem(
        &self,
        code: &str,
        category: &str,
    ) -> Result<AccessRequest, RedemptionError> {
        let request = self
            .store
            .find_by_passcode(code, category)
            .await
            .map_err(RedemptionError::Store)?
            .ok_or(RedemptionError::InvalidPasscode)?;

        match request.status {
            AccessRequestStatus::Used => return Err(RedemptionError::AlreadyUsed),
            AccessRequestStatus::Denied => return Err(RedemptionError::RequestDenied),
            AccessRequestStatus::Expired => return Err(RedemptionError::PasscodeExpired),
            // Pending rows have no passcode; reaching here means bad data.
            AccessRequestStatus::Pending => return Err(RedemptionError::InvalidState),
            AccessRequestStatus::Approved => {}
        }

        let expires_at = request
            .passcode_expires_at
            .ok_or(RedemptionError::InvalidState)?;
        if expires_at < Utc::now() {
            return match self.store.mark_expired(request.id).await {
                Ok(_) => {
                    info!(request_id = %request.id, "Recorded lazy expiry");
                    Err(RedemptionError::PasscodeExpired)
                }
                // A concurrent caller changed the status first; report
                // whatever the winner left behind.
                Err(StoreError::Conflict { current }) => Err(Self::rejection_for(current)),
                Err(StoreError::NotFound) => Err(RedemptionError::InvalidPasscode),
                Err(err) => Err(RedemptionError::Store(err)),
            };
        }

        match self.store.mark_used(request.id).await {
            Ok(used) => {
                info!(
                    request_id = %used.id,
                    category = %used.category,
                    "Redeemed passcode"
                );
                Ok(used)
            }
            Err(StoreError::Conflict { current }) => Err(Self::rejection_for(current)),
            Err(StoreError::NotFound) => Err(RedemptionError::InvalidPasscode),
            Err(err) => Err(RedemptionError::Store(err)),
        }
    }

    fn rejection_for(current: AccessRequestStatus) -> RedemptionError {
        match current {
            AccessRequestStatus::Used => RedemptionError::AlreadyUsed,
            AccessRequestStatus::Expired => RedemptionError::PasscodeExpired,
            AccessRequestStatus::Denied => RedemptionError::RequestDenied,
            _ => RedemptionError::InvalidState,
        }
    }
}
