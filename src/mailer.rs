//! Mail transport: trait boundary plus the production SMTP implementation.
//!
//! The dispatcher hands a fully rendered [`OutgoingMail`] to a [`Mailer`];
//! delivery either succeeds or fails with a [`MailerError`]. There is no
//! retry — at-least-one-attempt-per-event is the contract, and the event loop
//! decides what to log.
//!
//! [`SmtpMailer`] delivers through an SMTP server via `lettre`, supporting
//! STARTTLS and implicit TLS. Credentials are resolved from the
//! `SMTP_USERNAME` and `SMTP_PASSWORD` environment variables; when both are
//! set they are passed to the transport, otherwise the connection is
//! unauthenticated.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::info;

/// Errors that can occur while building or delivering a message.
#[derive(Error, Debug)]
pub enum MailerError {
    /// An address does not parse as a mailbox.
    #[error("invalid mailbox '{address}': {message}")]
    InvalidMailbox {
        /// The offending address string.
        address: String,
        /// Parser detail.
        message: String,
    },

    /// The body content subtype does not form a valid `text/*` MIME type.
    #[error("invalid body type '{0}'")]
    InvalidBodyType(String),

    /// SMTP transport construction failed.
    #[error("failed to build SMTP transport: {0}")]
    Transport(String),

    /// The message could not be assembled.
    #[error("failed to build message: {0}")]
    Build(String),

    /// The SMTP server rejected or failed the delivery.
    #[error("SMTP delivery failed: {0}")]
    Smtp(String),
}

/// A fully rendered notification ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    /// Sender address.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Rendered subject line.
    pub subject: String,
    /// Rendered body content.
    pub body: String,
    /// MIME text subtype for the body, e.g. `plain` or `html`.
    pub body_type: String,
}

/// Trait boundary for notification delivery.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message, making exactly one attempt.
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailerError>;
}

/// Parses an email address into a mailbox.
///
/// Used both for config-load validation and at delivery time.
pub fn parse_mailbox(address: &str) -> Result<Mailbox, MailerError> {
    address
        .parse()
        .map_err(|e: lettre::address::AddressError| MailerError::InvalidMailbox {
            address: address.to_string(),
            message: e.to_string(),
        })
}

/// Parses a body content subtype into a `text/<subtype>` content type.
///
/// Bodies are always declared as UTF-8; the subtype only selects how the
/// receiver renders them.
pub fn parse_body_type(subtype: &str) -> Result<ContentType, MailerError> {
    ContentType::parse(&format!("text/{subtype}; charset=utf-8"))
        .map_err(|_| MailerError::InvalidBodyType(subtype.to_string()))
}

/// Delivers notifications through an SMTP server.
#[derive(Debug)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Builds an `SmtpMailer` from SMTP connection settings.
    ///
    /// Port 465 uses implicit TLS; any other port uses STARTTLS when `tls`
    /// is set and a plain connection otherwise. The port defaults to 25, the
    /// classic local-relay setup.
    pub fn from_config(host: &str, port: Option<u16>, tls: bool) -> Result<Self, MailerError> {
        let port = port.unwrap_or(25);

        let mut builder = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| MailerError::Transport(e.to_string()))?
                .port(port)
        } else if tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| MailerError::Transport(e.to_string()))?
                .port(port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port)
        };

        if let (Ok(username), Ok(password)) = (
            std::env::var("SMTP_USERNAME"),
            std::env::var("SMTP_PASSWORD"),
        ) {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait::async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailerError> {
        let from = parse_mailbox(&mail.from)?;
        let to = parse_mailbox(&mail.to)?;
        let content_type = parse_body_type(&mail.body_type)?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(&mail.subject)
            .header(content_type)
            .body(mail.body.clone())
            .map_err(|e| MailerError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailerError::Smtp(e.to_string()))?;

        info!(
            to = %mail.to,
            subject = %mail.subject,
            "notification delivered"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_mailbox() {
        assert!(parse_mailbox("alice@example.com").is_ok());
    }

    #[test]
    fn parse_mailbox_with_display_name() {
        let mailbox = parse_mailbox("Alice <alice@example.com>").unwrap();
        assert_eq!(mailbox.email.to_string(), "alice@example.com");
    }

    #[test]
    fn parse_invalid_mailbox() {
        let err = parse_mailbox("not-an-email").unwrap_err();
        assert!(matches!(err, MailerError::InvalidMailbox { ref address, .. } if address == "not-an-email"));
    }

    #[test]
    fn parse_plain_body_type() {
        assert!(parse_body_type("plain").is_ok());
        assert!(parse_body_type("html").is_ok());
    }

    #[test]
    fn parse_invalid_body_type() {
        let err = parse_body_type("not valid/either").unwrap_err();
        assert!(matches!(err, MailerError::InvalidBodyType(_)));
    }

    #[test]
    fn from_config_plain_connection() {
        assert!(SmtpMailer::from_config("localhost", None, false).is_ok());
    }

    #[test]
    fn from_config_starttls() {
        assert!(SmtpMailer::from_config("smtp.example.com", Some(587), true).is_ok());
    }

    #[test]
    fn from_config_implicit_tls_port() {
        assert!(SmtpMailer::from_config("smtp.example.com", Some(465), false).is_ok());
    }
}
