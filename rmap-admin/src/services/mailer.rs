//! Transactional email via the SendGrid v3 API
//!
//! Callers use `send_detached`: delivery runs on its own task and failures
//! are only logged.

use rmap_common::config::EmailConfig;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Email is not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

pub struct Mailer {
    http_client: reqwest::Client,
    api_key: Option<String>,
    from: Option<String>,
    endpoint: String,
}

impl Mailer {
    pub fn new(config: &EmailConfig) -> Result<Self, MailerError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| MailerError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: config.sendgrid_api_key.clone(),
            from: config.from_address.clone(),
            endpoint: SENDGRID_SEND_URL.to_string(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.from.is_some()
    }

    pub async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        let (Some(api_key), Some(from)) = (&self.api_key, &self.from) else {
            return Err(MailerError::NotConfigured);
        };

        let body = json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": from },
            "subject": message.subject,
            "content": [{ "type": "text/html", "value": message.html }],
        });

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MailerError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(MailerError::ApiError(status.as_u16(), text));
        }

        tracing::info!(to = %message.to, subject = %message.subject, "Email sent");
        Ok(())
    }

    /// Fire-and-forget delivery
    pub fn send_detached(self: &Arc<Self>, message: EmailMessage) {
        if !self.is_configured() {
            tracing::debug!(to = %message.to, "Email not configured; skipping message");
            return;
        }
        let mailer = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&message).await {
                tracing::warn!(to = %message.to, "Email delivery failed: {}", e);
            }
        });
    }
}
