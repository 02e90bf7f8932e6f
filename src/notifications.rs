use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Clone, Debug, Serialize)]
pub struct OutboundMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("mail gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail gateway returned status {0}")]
    Gateway(u16),
}

/// Outbound email seam. The event processor is the only caller; failures
/// never propagate into request handling.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutboundMail) -> Result<(), MailerError>;
}

/// Posts mail as JSON to an HTTP mail gateway.
pub struct HttpMailer {
    client: reqwest::Client,
    gateway_url: String,
}

impl HttpMailer {
    pub fn new(gateway_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            gateway_url,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, mail: OutboundMail) -> Result<(), MailerError> {
        let response = self
            .client
            .post(&self.gateway_url)
            .json(&mail)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(MailerError::Gateway(response.status().as_u16()));
        }
        info!(to = %mail.to, subject = %mail.subject, "Notification email sent");
        Ok(())
    }
}

/// Logs instead of sending. Used when no gateway is configured and in tests.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, mail: OutboundMail) -> Result<(), MailerError> {
        debug!(to = %mail.to, subject = %mail.subject, "Mail gateway disabled, dropping email");
        Ok(())
    }
}
