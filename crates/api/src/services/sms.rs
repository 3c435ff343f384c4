//! SMS service for operator alerts.
//!
//! Supports multiple SMS providers:
//! - `console`: Logs messages to console (development)
//! - `http`: Posts to a generic HTTP SMS gateway

use crate::config::NotifyConfig;
use domain::models::RequestSummary;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Errors that can occur during SMS operations.
#[derive(Debug, Error)]
pub enum SmsError {
    #[error("SMS service not configured")]
    NotConfigured,

    #[error("Failed to send SMS: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

/// SMS service for operator-facing messages.
#[derive(Clone)]
pub struct SmsService {
    config: Arc<NotifyConfig>,
}

impl SmsService {
    /// Creates a new SmsService with the given configuration.
    pub fn new(config: NotifyConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Alert the operator about a new access request.
    ///
    /// The message carries the request id in the reply format the webhook
    /// understands, so the operator can decide directly from their phone.
    pub async fn send_operator_alert(&self, summary: &RequestSummary) -> Result<(), SmsError> {
        if self.config.operator_phone.is_empty() {
            return Err(SmsError::NotConfigured);
        }

        let company = summary
            .company
            .as_deref()
            .map(|c| format!(" ({})", c))
            .unwrap_or_default();

        let body = format!(
            "Access request for {category} from {name}{company} <{email}>. \
             Reply Y{id} to approve or N{id} to deny.",
            category = summary.category,
            name = summary.name,
            company = company,
            email = summary.email,
            id = summary.id,
        );

        self.send(&self.config.operator_phone, &body).await
    }

    /// Send an SMS message.
    pub async fn send(&self, to: &str, body: &str) -> Result<(), SmsError> {
        match self.config.sms_provider.as_str() {
            "console" => self.send_console(to, body).await,
            "http" => self.send_http(to, body).await,
            provider => {
                error!(provider = %provider, "Unknown SMS provider");
                Err(SmsError::NotConfigured)
            }
        }
    }

    /// Console provider - logs message to console (for development).
    async fn send_console(&self, to: &str, body: &str) -> Result<(), SmsError> {
        info!(
            to = %to,
            body = %body,
            "SMS (console provider)"
        );
        Ok(())
    }

    /// HTTP provider - posts to a generic SMS gateway.
    async fn send_http(&self, to: &str, body: &str) -> Result<(), SmsError> {
        if self.config.sms_gateway_url.is_empty() {
            return Err(SmsError::NotConfigured);
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .map_err(|e| SmsError::SendFailed(format!("HTTP client init failed: {}", e)))?;

        let payload = serde_json::json!({
            "to": to,
            "body": body,
        });

        let mut request = client.post(&self.config.sms_gateway_url).json(&payload);
        if !self.config.sms_gateway_token.is_empty() {
            request = request.header(
                "Authorization",
                format!("Bearer {}", self.config.sms_gateway_token),
            );
        }

        let response = request
            .send()
            .await
            .map_err(|e| SmsError::SendFailed(format!("SMS gateway request failed: {}", e)))?;

        if response.status().is_success() {
            info!(to = %to, "SMS sent via HTTP gateway");
            Ok(())
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(
                status = %status,
                error = %error_body,
                "SMS gateway error"
            );
            Err(SmsError::ProviderError(format!(
                "SMS gateway returned {}: {}",
                status, error_body
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_config() -> NotifyConfig {
        NotifyConfig {
            sms_provider: "console".to_string(),
            operator_phone: "+15550001111".to_string(),
            ..NotifyConfig::default()
        }
    }

    fn summary() -> RequestSummary {
        RequestSummary {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            company: None,
            reason: None,
            category: "resume".to_string(),
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_operator_alert_console() {
        let service = SmsService::new(test_config());
        assert!(service.send_operator_alert(&summary()).await.is_ok());
    }

    #[tokio::test]
    async fn test_operator_alert_without_phone_fails() {
        let mut config = test_config();
        config.operator_phone = String::new();
        let service = SmsService::new(config);

        let result = service.send_operator_alert(&summary()).await;
        assert!(matches!(result, Err(SmsError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_http_provider_without_url_fails() {
        let mut config = test_config();
        config.sms_provider = "http".to_string();
        let service = SmsService::new(config);

        let result = service.send("+15550001111", "hello").await;
        assert!(matches!(result, Err(SmsError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_unknown_provider_fails() {
        let mut config = test_config();
        config.sms_provider = "telegraph".to_string();
        let service = SmsService::new(config);

        let result = service.send("+15550001111", "hello").await;
        assert!(matches!(result, Err(SmsError::NotConfigured)));
    }
}
