use crate::api_error::ApiError;
use crate::config::EmailConfig;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email delivery is not configured")]
    Disabled,

    #[error("Email request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Email provider rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl From<EmailError> for ApiError {
    fn from(e: EmailError) -> Self {
        match e {
            EmailError::Disabled => ApiError::ServiceUnavailable(e.to_string()),
            _ => ApiError::UpstreamError(e.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// HTML body for a notification email.
pub fn render_notification(username: &str, title: &str, message: &str) -> String {
    format!(
        "<h2>{}</h2><p>Hi {},</p><p>{}</p>",
        escape_html(title),
        escape_html(username),
        escape_html(message).replace('\n', "<br>")
    )
}

/// Client for a JSON email API that accepts `{from, to, subject, html}`
/// with a bearer key.
#[derive(Clone)]
pub struct EmailService {
    client: reqwest::Client,
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.api_key.is_some()
    }

    pub async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), EmailError> {
        let api_key = self.config.api_key.as_deref().ok_or(EmailError::Disabled)?;

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&OutgoingEmail {
                from: &self.config.from_address,
                to: [to],
                subject,
                html,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), to, "Email provider rejected message");
            return Err(EmailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(to, subject, "Email sent");
        Ok(())
    }
}
