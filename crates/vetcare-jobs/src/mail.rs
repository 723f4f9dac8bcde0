//! Transactional email delivery.

use crate::error::{Error, Result};
use reqwest::Client;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Something that can deliver an [`Email`]
pub trait Mailer: Send + Sync {
    fn send<'a>(&'a self, email: &'a Email) -> BoxFuture<'a, Result<()>>;
}

/// Settings for a Resend-compatible `POST /emails` API
#[derive(Debug, Clone)]
pub struct ResendConfig {
    pub base_url: String,
    pub api_key: String,
    /// Sender, e.g. `VetCare+ <no-reply@clinic.example>`
    pub from: String,
    pub timeout: Duration,
}

pub struct ResendMailer {
    client: Client,
    config: ResendConfig,
}

#[derive(Serialize)]
struct SendBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

impl ResendMailer {
    pub fn new(config: ResendConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    async fn deliver(&self, email: &Email) -> Result<()> {
        let url = format!("{}/emails", self.config.base_url.trim_end_matches('/'));
        let body = SendBody {
            from: &self.config.from,
            to: [&email.to],
            subject: &email.subject,
            html: &email.html,
            text: &email.text,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), to = %email.to, "email rejected");
            return Err(Error::Provider {
                status: status.as_u16(),
                body,
            });
        }
        debug!(to = %email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}

impl Mailer for ResendMailer {
    fn send<'a>(&'a self, email: &'a Email) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.deliver(email))
    }
}

/// Logs emails instead of sending them. Used when no provider key is set.
#[derive(Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send<'a>(&'a self, email: &'a Email) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            info!(to = %email.to, subject = %email.subject, "email (not sent)");
            Ok(())
        })
    }
}

/// Keeps sent emails in memory
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<Email>>,
    reject: Option<String>,
}

impl MemoryMailer {
    /// Mailer that refuses every email addressed to `to`
    pub fn rejecting(to: impl Into<String>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            reject: Some(to.into()),
        }
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Mailer for MemoryMailer {
    fn send<'a>(&'a self, email: &'a Email) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if self.reject.as_deref() == Some(email.to.as_str()) {
                return Err(Error::Provider {
                    status: 422,
                    body: "recipient rejected".to_string(),
                });
            }
            if let Ok(mut sent) = self.sent.lock() {
                sent.push(email.clone());
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(to: &str) -> Email {
        Email {
            to: to.to_string(),
            subject: "Hello".to_string(),
            html: "<p>Hello</p>".to_string(),
            text: "Hello".to_string(),
        }
    }

    #[test]
    fn test_send_body_shape() {
        let body = SendBody {
            from: "Clinic <no-reply@clinic.example>",
            to: ["ana@example.com"],
            subject: "s",
            html: "h",
            text: "t",
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["to"][0], "ana@example.com");
        assert_eq!(value["from"], "Clinic <no-reply@clinic.example>");
    }

    #[tokio::test]
    async fn test_memory_mailer() {
        let mailer = MemoryMailer::rejecting("bounce@example.com");
        mailer.send(&email("ana@example.com")).await.unwrap();
        assert!(mailer.send(&email("bounce@example.com")).await.is_err());
        assert_eq!(mailer.sent(), vec![email("ana@example.com")]);
    }

    #[tokio::test]
    async fn test_log_mailer_never_fails() {
        assert!(LogMailer.send(&email("ana@example.com")).await.is_ok());
    }
}
