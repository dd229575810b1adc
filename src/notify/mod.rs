//! Transactional notifications: rendering and SMTP dispatch.

pub mod mailer;
pub mod messages;

pub use mailer::{MailError, Mailer, OutboundEmail, SmtpMailer};
