//! Email service for passcode, denial and audit messages.
//!
//! Supports multiple email providers:
//! - `console`: Logs emails to console (development)
//! - `sendgrid`: Uses SendGrid API

use crate::config::NotifyConfig;
use chrono::{DateTime, Utc};
use domain::models::RequestSummary;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Errors that can occur during email operations.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email service not configured")]
    NotConfigured,

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

/// Email message to be sent.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    /// Recipient email address
    pub to: String,
    /// Recipient name (optional)
    pub to_name: Option<String>,
    /// Email subject
    pub subject: String,
    /// Plain text body
    pub body_text: String,
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    config: Arc<NotifyConfig>,
}

impl EmailService {
    /// Creates a new EmailService with the given configuration.
    pub fn new(config: NotifyConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Send an email message.
    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        match self.config.email_provider.as_str() {
            "console" => self.send_console(message).await,
            "sendgrid" => self.send_sendgrid(message).await,
            provider => {
                error!(provider = %provider, "Unknown email provider");
                Err(EmailError::NotConfigured)
            }
        }
    }

    /// Send the passcode email after a request is approved.
    pub async fn send_passcode_email(
        &self,
        to_email: &str,
        to_name: &str,
        passcode: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), EmailError> {
        let subject = "Your access passcode - Portfolio Gate";

        let body_text = format!(
            r#"Hi {name},

Your access request has been approved. Your passcode is:

{code}

It is valid for a single download until {expires}.

Best regards,
Portfolio Gate"#,
            name = to_name,
            code = passcode,
            expires = expires_at.format("%Y-%m-%d %H:%M UTC"),
        );

        let message = EmailMessage {
            to: to_email.to_string(),
            to_name: Some(to_name.to_string()),
            subject: subject.to_string(),
            body_text,
        };

        self.send(message).await
    }

    /// Send the denial email after a request is declined.
    pub async fn send_denial_email(
        &self,
        to_email: &str,
        to_name: &str,
    ) -> Result<(), EmailError> {
        let subject = "Your access request - Portfolio Gate";

        let body_text = format!(
            r#"Hi {name},

Thank you for your interest. Unfortunately your access request was not
approved at this time.

Best regards,
Portfolio Gate"#,
            name = to_name,
        );

        let message = EmailMessage {
            to: to_email.to_string(),
            to_name: Some(to_name.to_string()),
            subject: subject.to_string(),
            body_text,
        };

        self.send(message).await
    }

    /// Send a best-effort audit copy of a new request to the configured
    /// audit address. Returns Ok without sending when no address is set.
    pub async fn send_audit_email(&self, summary: &RequestSummary) -> Result<(), EmailError> {
        if self.config.audit_email.is_empty() {
            return Ok(());
        }

        let subject = format!("New access request: {}", summary.category);

        let body_text = format!(
            r#"Request {id}

Name:     {name}
Email:    {email}
Company:  {company}
Category: {category}
Reason:   {reason}"#,
            id = summary.id,
            name = summary.name,
            email = summary.email,
            company = summary.company.as_deref().unwrap_or("-"),
            category = summary.category,
            reason = summary.reason.as_deref().unwrap_or("-"),
        );

        let message = EmailMessage {
            to: self.config.audit_email.clone(),
            to_name: None,
            subject,
            body_text,
        };

        self.send(message).await
    }

    /// Console provider - logs email to console (for development).
    async fn send_console(&self, message: EmailMessage) -> Result<(), EmailError> {
        info!(
            to = %message.to,
            to_name = ?message.to_name,
            subject = %message.subject,
            from = %self.config.sender_email,
            from_name = %self.config.sender_name,
            "Email (console provider)"
        );

        info!(
            body_text = %message.body_text,
            "Email body (plain text)"
        );

        Ok(())
    }

    /// SendGrid provider - sends via SendGrid API.
    async fn send_sendgrid(&self, message: EmailMessage) -> Result<(), EmailError> {
        if self.config.sendgrid_api_key.is_empty() {
            return Err(EmailError::NotConfigured);
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| EmailError::SendFailed(format!("HTTP client init failed: {}", e)))?;

        let mut personalizations = serde_json::json!({
            "to": [{
                "email": message.to
            }]
        });

        if let Some(name) = &message.to_name {
            personalizations["to"][0]["name"] = serde_json::json!(name);
        }

        let body = serde_json::json!({
            "personalizations": [personalizations],
            "from": {
                "email": self.config.sender_email,
                "name": self.config.sender_name
            },
            "subject": message.subject,
            "content": [{
                "type": "text/plain",
                "value": message.body_text
            }]
        });

        let response = client
            .post("https://api.sendgrid.com/v3/mail/send")
            .header(
                "Authorization",
                format!("Bearer {}", self.config.sendgrid_api_key),
            )
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(format!("SendGrid request failed: {}", e)))?;

        if response.status().is_success() {
            info!(
                to = %message.to,
                subject = %message.subject,
                "Email sent via SendGrid"
            );
            Ok(())
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(
                status = %status,
                error = %error_body,
                "SendGrid API error"
            );
            Err(EmailError::ProviderError(format!(
                "SendGrid returned {}: {}",
                status, error_body
            )))
        }
    }
}
