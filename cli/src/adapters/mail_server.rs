use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use email_triage::mailbox::Mailbox;
use email_triage::{RawMessage, Result, SentRecord, TriageError};

use super::imap::{self, ImapConnection};
use super::smtp;
use crate::config::{AppConfig, Credentials};

/// IMAP + SMTP account. Every call opens its own connection.
pub struct MailServer {
    config: AppConfig,
    credentials: Credentials,
}

impl MailServer {
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            credentials: config.credentials()?,
            config: config.clone(),
        })
    }

    async fn connect(&self, read_only: bool) -> Result<ImapConnection> {
        imap::connect(
            &self.config.imap.host,
            self.config.imap.port,
            &self.credentials.user,
            &self.credentials.password,
            read_only,
        )
        .await
    }
}

/// Start of a lookback window ending now. The window must be positive.
fn window_start(now: DateTime<Utc>, window: Duration) -> Result<DateTime<Utc>> {
    if window <= Duration::zero() {
        return Err(TriageError::InvalidInput(format!("lookback window must be positive, got {}", window)));
    }
    now.checked_sub_signed(window)
        .ok_or_else(|| TriageError::InvalidInput(format!("lookback window {} is out of range", window)))
}

#[async_trait]
impl Mailbox for MailServer {
    async fn fetch_inbox(&self, since: Duration) -> Result<Vec<RawMessage>> {
        let since = window_start(Utc::now(), since)?;
        let mut conn = self.connect(true).await?;
        let result = imap::inbox::fetch_inbox(&mut conn, since).await;
        conn.logout().await;
        result
    }

    async fn fetch_sent(&self, since: Duration) -> Result<Vec<SentRecord>> {
        let since = window_start(Utc::now(), since)?;
        let mut conn = self.connect(true).await?;
        let result = imap::sent::fetch_sent(&mut conn, &self.config.imap.sent_folder, since).await;
        conn.logout().await;
        result
    }

    async fn send(&self, subject: &str, body: &str, recipient: &str) -> Result<()> {
        let message = smtp::build_message(
            &self.credentials.user,
            self.config.account.display_name.as_deref(),
            recipient,
            subject,
            body,
        )?;
        smtp::send(&self.config.smtp, &self.credentials, message).await
    }

    async fn delete_matching(&self, subject: &str) -> Result<usize> {
        let mut conn = self.connect(false).await?;
        let result = imap::delete::delete_by_subject(&mut conn, subject).await;
        conn.logout().await;
        result
    }
}
