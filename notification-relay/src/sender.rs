//! Email Sender
//!
//! Sends fully built emails over SMTP. A transport is built per send from the
//! caller's credentials and dropped afterwards; nothing is pooled across
//! requests.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use relay_config::SmtpConfig;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while sending an email
#[derive(Error, Debug)]
pub enum MailError {
    #[error("SMTP credentials missing")]
    MissingCredentials,

    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Invalid content type: {0}")]
    ContentType(#[from] lettre::message::header::ContentTypeErr),

    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("Failed to fetch attachment {url}: {message}")]
    Attachment { url: String, message: String },

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Per-request SMTP login
#[derive(Clone)]
pub struct SmtpCredentials {
    pub user: String,
    pub pass: String,
}

impl SmtpCredentials {
    pub fn new(user: Option<&str>, pass: Option<&str>) -> Result<Self, MailError> {
        match (user, pass) {
            (Some(user), Some(pass)) if !user.is_empty() => Ok(Self {
                user: user.to_string(),
                pass: pass.to_string(),
            }),
            _ => Err(MailError::MissingCredentials),
        }
    }
}

impl std::fmt::Debug for SmtpCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpCredentials")
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .finish()
    }
}

/// Attachment fetched from a URL at send time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    pub filename: String,
    pub url: String,
    pub content_type: String,
}

/// A rendered email ready for the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<AttachmentRef>,
}

/// Trait for mail transports
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one email. No retry.
    async fn send(
        &self,
        credentials: &SmtpCredentials,
        email: &OutgoingEmail,
    ) -> Result<(), MailError>;
}

/// SMTP mail transport (implicit TLS relay)
pub struct SmtpMailer {
    host: String,
    port: u16,
    http: reqwest::Client,
}

impl SmtpMailer {
    /// Create a new SMTP mailer
    pub fn new(config: &SmtpConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            http: reqwest::Client::new(),
        }
    }

    async fn fetch_attachment(&self, attachment: &AttachmentRef) -> Result<SinglePart, MailError> {
        let fetch_error = |e: reqwest::Error| MailError::Attachment {
            url: attachment.url.clone(),
            message: e.to_string(),
        };

        let bytes = self
            .http
            .get(&attachment.url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(fetch_error)?
            .bytes()
            .await
            .map_err(fetch_error)?;

        debug!(
            url = %attachment.url,
            size = bytes.len(),
            "Fetched email attachment"
        );

        let content_type = ContentType::parse(&attachment.content_type)?;
        Ok(Attachment::new(attachment.filename.clone()).body(bytes.to_vec(), content_type))
    }

    /// Build the MIME message, fetching any referenced attachments
    pub async fn build_message(&self, email: &OutgoingEmail) -> Result<Message, MailError> {
        let builder = Message::builder()
            .from(email.from.parse::<Mailbox>()?)
            .to(email.to.parse::<Mailbox>()?)
            .subject(email.subject.clone());

        if email.attachments.is_empty() {
            return Ok(builder
                .header(ContentType::TEXT_HTML)
                .body(email.html.clone())?);
        }

        let mut body = MultiPart::mixed().singlepart(SinglePart::html(email.html.clone()));
        for attachment in &email.attachments {
            body = body.singlepart(self.fetch_attachment(attachment).await?);
        }

        Ok(builder.multipart(body)?)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(
        &self,
        credentials: &SmtpCredentials,
        email: &OutgoingEmail,
    ) -> Result<(), MailError> {
        let message = self.build_message(email).await?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host)?
            .port(self.port)
            .credentials(Credentials::new(
                credentials.user.clone(),
                credentials.pass.clone(),
            ))
            .build();

        let response = transport.send(message).await?;

        info!(
            to = %email.to,
            smtp_host = %self.host,
            code = %response.code(),
            "Email sent"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailer() -> SmtpMailer {
        SmtpMailer::new(&SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 465,
        })
    }

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            from: "Coordiy <sender@example.com>".to_string(),
            to: "guest@example.com".to_string(),
            subject: "You're invited".to_string(),
            html: "<p>Hello</p>".to_string(),
            attachments: vec![],
        }
    }

    #[test]
    fn test_credentials_required() {
        assert!(SmtpCredentials::new(Some("user"), Some("pass")).is_ok());
        assert!(matches!(
            SmtpCredentials::new(None, Some("pass")),
            Err(MailError::MissingCredentials)
        ));
        assert!(matches!(
            SmtpCredentials::new(Some("user"), None),
            Err(MailError::MissingCredentials)
        ));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = SmtpCredentials::new(Some("user"), Some("hunter2")).unwrap();
        let rendered = format!("{:?}", credentials);

        assert!(rendered.contains("user"));
        assert!(!rendered.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_build_message_without_attachments() {
        let message = mailer().build_message(&email()).await.unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();

        assert!(formatted.contains("Subject: You're invited"));
        assert!(formatted.contains("To: guest@example.com"));
        assert!(formatted.contains("text/html"));
    }

    #[tokio::test]
    async fn test_build_message_rejects_bad_address() {
        let mut email = email();
        email.to = "not an address".to_string();

        assert!(matches!(
            mailer().build_message(&email).await,
            Err(MailError::Address(_))
        ));
    }
}
