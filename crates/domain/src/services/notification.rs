//! Notification dispatcher contract.
//!
//! The core calls out to three channels: an operator alert that can carry
//! a reply-back command, requester emails (passcode and denial), and a
//! best-effort audit notice. Which failures are fatal is decided per call
//! site in the lifecycle service, not here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::RequestSummary;

/// Failure of one outbound channel. Channels fail independently.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{channel} delivery failed: {reason}")]
pub struct ChannelError {
    pub channel: &'static str,
    pub reason: String,
}

impl ChannelError {
    pub fn new(channel: &'static str, reason: impl Into<String>) -> Self {
        Self {
            channel,
            reason: reason.into(),
        }
    }
}

/// Outbound notification channels consumed by the core.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Alert the operator of a new pending request. The message carries
    /// the reply commands (`Y<id>` / `N<id>`).
    async fn notify_operator(&self, summary: &RequestSummary) -> Result<(), ChannelError>;

    /// Deliver an issued passcode to the requester.
    async fn send_passcode(
        &self,
        email: &str,
        name: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), ChannelError>;

    /// Inform the requester their request was denied.
    async fn send_denial(&self, email: &str, name: &str) -> Result<(), ChannelError>;

    /// Best-effort durable notice to the audit address. Callers must
    /// never fail the parent operation on an error from this channel.
    async fn audit_record(&self, summary: &RequestSummary) -> Result<(), ChannelError>;
}

/// Record of one delivery attempt made through [`MockNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentNotification {
    Operator { request_id: Uuid },
    Passcode { email: String, code: String },
    Denial { email: String },
    Audit { request_id: Uuid },
}

/// Mock notifier for development and testing.
///
/// Logs deliveries, records them for assertions, and can simulate
/// per-channel failures.
#[derive(Debug, Default)]
pub struct MockNotifier {
    pub fail_operator: bool,
    pub fail_passcode: bool,
    pub fail_denial: bool,
    pub fail_audit: bool,
    sent: Mutex<Vec<SentNotification>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All deliveries that went through, in order.
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, notification: SentNotification) {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification);
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify_operator(&self, summary: &RequestSummary) -> Result<(), ChannelError> {
        if self.fail_operator {
            return Err(ChannelError::new("sms", "simulated failure"));
        }
        tracing::info!(
            request_id = %summary.id,
            email = %summary.email,
            category = %summary.category,
            "Mock: would alert operator"
        );
        self.record(SentNotification::Operator {
            request_id: summary.id,
        });
        Ok(())
    }

    async fn send_passcode(
        &self,
        email: &str,
        _name: &str,
        code: &str,
        _expires_at: DateTime<Utc>,
    ) -> Result<(), ChannelError> {
        if self.fail_passcode {
            return Err(ChannelError::new("email", "simulated failure"));
        }
        tracing::info!(email = %email, "Mock: would send passcode");
        self.record(SentNotification::Passcode {
            email: email.to_string(),
            code: code.to_string(),
        });
        Ok(())
    }

    async fn send_denial(&self, email: &str, _name: &str) -> Result<(), ChannelError> {
        if self.fail_denial {
            return Err(ChannelError::new("email", "simulated failure"));
        }
        tracing::info!(email = %email, "Mock: would send denial notice");
        self.record(SentNotification::Denial {
            email: email.to_string(),
        });
        Ok(())
    }

    async fn audit_record(&self, summary: &RequestSummary) -> Result<(), ChannelError> {
        if self.fail_audit {
            return Err(ChannelError::new("audit", "simulated failure"));
        }
        self.record(SentNotification::Audit {
            request_id: summary.id,
        });
        Ok(())
    }
}
