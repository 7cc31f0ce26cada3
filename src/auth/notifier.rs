use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

const RESEND_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("no answer within {0:?}")]
    TimedOut(Duration),
}

/// Delivers a login code to an email address.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_code(&self, email: &str, code: &str) -> Result<(), NotifyError>;
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: String,
}

/// Sends codes through the Resend HTTP API.
#[derive(Clone)]
pub struct ResendNotifier {
    http_client: reqwest::Client,
    api_key: String,
    from: String,
    code_ttl: Duration,
}

impl ResendNotifier {
    pub fn new(api_key: String, from: String, timeout: Duration, code_ttl: Duration) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::ClientBuilder::new()
            .timeout(timeout)
            .build()?;

        Ok(ResendNotifier { http_client, api_key, from, code_ttl })
    }
}

pub(crate) fn code_email_body(code: &str, code_ttl: Duration) -> String {
    let minutes = code_ttl.as_secs().div_ceil(60);
    format!(
        "Your Bridgegram login code: {code}\n\n\
         The code is valid for {minutes} minutes.\n\n\
         If you did not ask for it, just ignore this email."
    )
}

#[async_trait]
impl Notifier for ResendNotifier {
    async fn send_code(&self, email: &str, code: &str) -> Result<(), NotifyError> {
        let response = self.http_client.post(RESEND_URL)
            .bearer_auth(&self.api_key)
            .json(&ResendRequest {
                from: &self.from,
                to: [email],
                subject: "Bridgegram login code",
                text: code_email_body(code, self.code_ttl),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status: status.as_u16(), body });
        }

        Ok(())
    }
}
