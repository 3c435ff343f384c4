//! Notifier wiring the lifecycle's channel contract to real providers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::RequestSummary;
use domain::services::{ChannelError, Notifier};

use super::{EmailService, SmsService};

/// Production notifier: SMS to the operator, email to requesters.
pub struct CompositeNotifier {
    sms: SmsService,
    email: EmailService,
}

impl CompositeNotifier {
    pub fn new(sms: SmsService, email: EmailService) -> Self {
        Self { sms, email }
    }
}

#[async_trait]
impl Notifier for CompositeNotifier {
    async fn notify_operator(&self, summary: &RequestSummary) -> Result<(), ChannelError> {
        self.sms
            .send_operator_alert(summary)
            .await
            .map_err(|e| ChannelError {
                channel: "sms",
                reason: e.to_string(),
            })
    }

    async fn send_passcode(
        &self,
        email: &str,
        name: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), ChannelError> {
        self.email
            .send_passcode_email(email, name, code, expires_at)
            .await
            .map_err(|e| ChannelError {
                channel: "email",
                reason: e.to_string(),
            })
    }

    async fn send_denial(&self, email: &str, name: &str) -> Result<(), ChannelError> {
        self.email
            .send_denial_email(email, name)
            .await
            .map_err(|e| ChannelError {
                channel: "email",
                reason: e.to_string(),
            })
    }

    async fn audit_record(&self, summary: &RequestSummary) -> Result<(), ChannelError> {
        self.email
            .send_audit_email(summary)
            .await
            .map_err(|e| ChannelError {
                channel: "email",
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotifyConfig;
    use uuid::Uuid;

    fn console_notifier() -> CompositeNotifier {
        let config = NotifyConfig {
            operator_phone: "+15550001111".to_string(),
            ..NotifyConfig::default()
        };
        CompositeNotifier::new(SmsService::new(config.clone()), EmailService::new(config))
    }

    fn summary() -> RequestSummary {
        RequestSummary {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            company: None,
            reason: None,
            category: "resume".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_console_notifier_operator_alert() {
        let notifier = console_notifier();
        assert!(notifier.notify_operator(&summary()).await.is_ok());
    }

    #[tokio::test]
    async fn test_operator_failure_names_sms_channel() {
        let config = NotifyConfig::default(); // no operator phone
        let notifier =
            CompositeNotifier::new(SmsService::new(config.clone()), EmailService::new(config));

        let err = notifier
            .notify_operator(&summary())
            .await
            .expect_err("expected channel failure");
        assert_eq!(err.channel, "sms");
    }

    #[tokio::test]
    async fn test_passcode_delivery_console() {
        let notifier = console_notifier();
        let result = notifier
            .send_passcode("ada@example.com", "Ada", "482913", Utc::now())
            .await;
        assert!(result.is_ok());
    }
}
