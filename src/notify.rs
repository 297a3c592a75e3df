//! Notification sender: emails the rendered card to the athlete.
//!
//! Mail goes through an HTTP relay (JSON body, base64 attachment). When no
//! relay is configured the [`DisabledNotifier`] reports
//! [`NotifyOutcome::NotConfigured`] instead of failing.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::documents::download_name;
use crate::error::NotificationError;
use crate::record::{format_dmy, AthleteRecord};

pub const CARD_SUBJECT: &str = "Your Para Sports ID Card";

/// What happened to a notification that did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent { message_id: String },
    /// No transport is configured; nothing was sent.
    NotConfigured,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Email the card at `document` to the athlete in `record`.
    async fn send_card(
        &self,
        record: &AthleteRecord,
        document: &Path,
    ) -> Result<NotifyOutcome, NotificationError>;
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    /// Base64-encoded file content.
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<Attachment>,
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

fn card_html(record: &AthleteRecord) -> String {
    let p = &record.profile;
    let e = |s: &str| escape_html(s);
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <div style="background: #1e3c72; color: white; padding: 30px; text-align: center; border-radius: 10px 10px 0 0;">
    <h1 style="margin: 0; font-size: 28px;">Para Sports ID Card</h1>
    <p style="margin: 10px 0 0 0; font-size: 16px;">Official Player Identification</p>
  </div>
  <div style="background: #f8f9fa; padding: 30px; border-radius: 0 0 10px 10px;">
    <h2 style="color: #1e3c72; margin-top: 0;">Hello {first}!</h2>
    <p>Thank you for registering with Para Sports! Your official ID card has been generated and is attached to this email.</p>
    <ul>
      <li><strong>Player ID:</strong> {id}</li>
      <li><strong>Name:</strong> {first} {last}</li>
      <li><strong>Primary Sport:</strong> {sport}</li>
      <li><strong>Experience Level:</strong> {level}</li>
      <li><strong>Registration Date:</strong> {registered}</li>
    </ul>
    <p>Please keep this ID card safe and carry it with you during events. It is valid for official Para Sports events and competitions.</p>
  </div>
  <p style="text-align: center; color: #666; font-size: 12px;">&copy; {year} Para Sports Organization. All rights reserved.</p>
</div>"#,
        first = e(&p.first_name),
        last = e(&p.last_name),
        id = e(record.display_id.as_str()),
        sport = e(p.primary_sport.as_str()),
        level = p.experience_level.as_str(),
        registered = format_dmy(record.registered_at.date_naive()),
        year = Utc::now().year(),
    )
}

impl EmailMessage {
    /// The card email for `record` with `pdf` attached.
    pub fn id_card(record: &AthleteRecord, sender: &str, pdf: &[u8]) -> Self {
        Self {
            from: sender.to_string(),
            to: record.profile.email.clone(),
            subject: CARD_SUBJECT.to_string(),
            html: card_html(record),
            attachments: vec![Attachment {
                filename: download_name(&record.display_id),
                content_type: "application/pdf".to_string(),
                content: BASE64_STD.encode(pdf),
            }],
        }
    }
}

async fn read_document(document: &Path) -> Result<Vec<u8>, NotificationError> {
    match tokio::fs::read(document).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(NotificationError::MissingDocument(document.to_path_buf()))
        }
        Err(source) => Err(NotificationError::Read {
            path: document.to_path_buf(),
            source,
        }),
    }
}

// ---------------------------------------------------------------------------
// Implementations
// ---------------------------------------------------------------------------

/// Used when no mail relay is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send_card(
        &self,
        record: &AthleteRecord,
        _document: &Path,
    ) -> Result<NotifyOutcome, NotificationError> {
        log::info!(
            "Email not sent to {} - email service not configured",
            record.profile.email
        );
        Ok(NotifyOutcome::NotConfigured)
    }
}

#[derive(Debug, Deserialize)]
struct RelayResponse {
    #[serde(default, alias = "messageId")]
    id: Option<String>,
}

/// Sends mail by POSTing [`EmailMessage`] JSON to a relay endpoint.
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    sender: String,
}

impl HttpMailer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        sender: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            sender: sender.into(),
        })
    }

    async fn post(&self, message: &EmailMessage) -> Result<String, NotificationError> {
        let mut req = self.client.post(&self.endpoint).json(message);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let details = resp.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                details,
            });
        }
        let body = resp.text().await?;
        let id = serde_json::from_str::<RelayResponse>(&body)
            .ok()
            .and_then(|r| r.id)
            .unwrap_or_else(|| format!("relay-{}", uuid::Uuid::new_v4()));
        Ok(id)
    }
}

#[async_trait]
impl Notifier for HttpMailer {
    async fn send_card(
        &self,
        record: &AthleteRecord,
        document: &Path,
    ) -> Result<NotifyOutcome, NotificationError> {
        let pdf = read_document(document).await?;
        let message = EmailMessage::id_card(record, &self.sender, &pdf);
        let message_id = self.post(&message).await?;
        log::info!(
            "ID card for {} emailed to {} ({message_id})",
            record.display_id,
            record.profile.email
        );
        Ok(NotifyOutcome::Sent { message_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DisplayId;
    use crate::samples;

    fn record() -> AthleteRecord {
        AthleteRecord::new(
            samples::short_profile(),
            DisplayId::from("PS20260314"),
            Utc::now(),
        )
    }

    #[test]
    fn message_carries_card_attachment() {
        let msg = EmailMessage::id_card(&record(), "cards@example.org", b"%PDF-1.7");
        assert_eq!(msg.subject, CARD_SUBJECT);
        assert_eq!(msg.to, "asha.patel@example.org");
        assert_eq!(msg.attachments.len(), 1);
        assert_eq!(msg.attachments[0].filename, "Para_Sports_ID_Card_PS20260314.pdf");
        assert_eq!(
            BASE64_STD.decode(&msg.attachments[0].content).unwrap(),
            b"%PDF-1.7"
        );
        assert!(msg.html.contains("PS20260314"));
        assert!(msg.html.contains("Hello Asha!"));
    }

    #[test]
    fn message_json_shape() {
        let msg = EmailMessage::id_card(&record(), "cards@example.org", b"x");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["attachments"][0]["contentType"], "application/pdf");
        assert_eq!(json["from"], "cards@example.org");
    }

    #[test]
    fn html_is_escaped() {
        let mut rec = record();
        rec.profile.first_name = "<b>Asha</b>".into();
        let html = card_html(&rec);
        assert!(html.contains("&lt;b&gt;Asha&lt;/b&gt;"));
        assert!(!html.contains("<b>Asha"));
    }

    #[tokio::test]
    async fn disabled_notifier_reports_not_configured() {
        let out = DisabledNotifier
            .send_card(&record(), Path::new("/nonexistent.pdf"))
            .await
            .unwrap();
        assert_eq!(out, NotifyOutcome::NotConfigured);
    }

    #[tokio::test]
    async fn mailer_checks_document_before_sending() {
        let mailer = HttpMailer::new(
            "http://127.0.0.1:9/send",
            None,
            "cards@example.org",
            Duration::from_secs(1),
        )
        .unwrap();
        let err = mailer
            .send_card(&record(), Path::new("/definitely/not/here.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::MissingDocument(_)));
    }
}
