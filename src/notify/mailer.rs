//! Outbound transactional email over SMTP.
//!
//! The pipeline only sees the [`Mailer`] trait; the lettre-backed
//! implementation lives here so SMTP details (STARTTLS, credentials,
//! multipart assembly) never leak into pipeline logic, and tests can
//! substitute an in-memory double.

use async_trait::async_trait;
use lettre::message::header::{Header, HeaderName, HeaderValue};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::debug;

use crate::config::SmtpConfig;

/// A rendered email ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub text: String,
    /// HTML alternative body.
    pub html: String,
    /// Value for the `List-Unsubscribe` header, when the message concerns
    /// a list the recipient is (being) subscribed to.
    pub list_unsubscribe: Option<String>,
}

/// Errors raised while building or dispatching a message.
#[derive(Debug, Error)]
pub enum MailError {
    /// A mail address failed to parse.
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The message could not be assembled.
    #[error("could not build message: {0}")]
    Build(#[from] lettre::error::Error),

    /// The SMTP relay rejected or never received the message.
    #[error("SMTP send failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Dispatches rendered emails.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends one message. Blocking I/O from the caller's point of view.
    async fn send(&self, mail: OutboundEmail) -> Result<(), MailError>;
}

/// `List-Unsubscribe` (RFC 2369); lettre has no typed header for it.
#[derive(Debug, Clone)]
struct ListUnsubscribe(String);

impl Header for ListUnsubscribe {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("List-Unsubscribe")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(ListUnsubscribe(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

/// SMTP mailer over a STARTTLS relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Builds the mailer from relay configuration. Fails fast on a bad
    /// relay host or sender address.
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_email).parse()?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(SmtpMailer { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutboundEmail) -> Result<(), MailError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(mail.to.parse()?)
            .subject(&mail.subject);
        if let Some(value) = &mail.list_unsubscribe {
            builder = builder.header(ListUnsubscribe(value.clone()));
        }

        let message =
            builder.multipart(MultiPart::alternative_plain_html(mail.text, mail.html))?;

        self.transport.send(message).await?;
        debug!(to = %mail.to, subject = %mail.subject, "email dispatched");
        Ok(())
    }
}
