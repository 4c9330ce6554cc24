//! Outbound mail over SMTP.

use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use email_triage::TriageError;

use crate::config::{Credentials, SmtpConfig};

/// Plain-text message from the account to `recipient`.
pub fn build_message(
    from_user: &str,
    display_name: Option<&str>,
    recipient: &str,
    subject: &str,
    body: &str,
) -> Result<Message, TriageError> {
    let from_address = from_user
        .parse()
        .map_err(|e| TriageError::InvalidInput(format!("Invalid from address '{}': {}", from_user, e)))?;
    let from = Mailbox::new(display_name.map(str::to_string), from_address);

    let to: Mailbox = recipient
        .parse()
        .map_err(|e| TriageError::InvalidInput(format!("Invalid recipient '{}': {}", recipient, e)))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| TriageError::InvalidInput(format!("Failed to build email: {}", e)))
}

pub async fn send(smtp: &SmtpConfig, credentials: &Credentials, message: Message) -> Result<(), TriageError> {
    let creds = SmtpCredentials::new(credentials.user.clone(), credentials.password.clone());
    let relay_err = |e: lettre::transport::smtp::Error| TriageError::Config(format!("Invalid SMTP host: {}", e));

    // Port 465 = implicit TLS, anything else STARTTLS.
    let mailer = if smtp.port == 465 {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
            .map_err(relay_err)?
            .port(smtp.port)
            .credentials(creds)
            .build()
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
            .map_err(relay_err)?
            .port(smtp.port)
            .credentials(creds)
            .build()
    };

    debug!(host = %smtp.host, port = smtp.port, "Sending over SMTP");
    let response = mailer
        .send(message)
        .await
        .map_err(|e| TriageError::Network(format!("SMTP send failed: {}", e)))?;

    info!(code = %response.code(), "Email sent");
    Ok(())
}
