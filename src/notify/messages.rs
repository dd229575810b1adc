//! Rendering of the three transactional message kinds.
//!
//! Plain string templates; a full template engine and localized string
//! tables are external collaborators, so only the English built-ins ship
//! here. Every subscriber-facing message carries both a plain-text and an
//! HTML body plus a `List-Unsubscribe` header.

use crate::lists::MailingList;
use crate::types::Action;

use super::mailer::OutboundEmail;

/// Builds the invitation asking the visitor to confirm their request.
pub fn confirm_invitation(
    action: Action,
    list: &MailingList,
    email: &str,
    name: Option<&str>,
    confirm_url: &str,
    unsubscribe_url: &str,
) -> OutboundEmail {
    let greeting = match name {
        Some(name) => format!("Hello {name},"),
        None => "Hello,".to_string(),
    };
    let (verb, subject) = match action {
        Action::Subscribe => (
            "subscribe to",
            format!("Confirm your subscription to {}", list.name),
        ),
        Action::Unsubscribe => (
            "unsubscribe from",
            format!("Confirm your unsubscription from {}", list.name),
        ),
    };

    let text = format!(
        "{greeting}\n\n\
         A request was made to {verb} the mailing list {address}\n\
         ({description}) with your address.\n\n\
         To confirm, open this link:\n\n    {confirm_url}\n\n\
         The link is valid for 24 hours and works exactly once.\n\
         If you did not make this request, simply ignore this message;\n\
         nothing will change.\n",
        address = list.address,
        description = list.description,
    );
    let html = format!(
        "<p>{greeting}</p>\
         <p>A request was made to {verb} the mailing list <b>{address}</b> \
         ({description}) with your address.</p>\
         <p><a href=\"{url}\">Confirm this request</a></p>\
         <p>The link is valid for 24 hours and works exactly once. \
         If you did not make this request, simply ignore this message; \
         nothing will change.</p>",
        greeting = escape(&greeting),
        address = escape(list.address.as_str()),
        description = escape(&list.description),
        url = escape(confirm_url),
    );

    OutboundEmail {
        to: email.to_string(),
        subject,
        text,
        html,
        list_unsubscribe: Some(format!("<{unsubscribe_url}>")),
    }
}

/// Builds the notice sent after the membership change was applied.
pub fn completion(
    action: Action,
    list: &MailingList,
    email: &str,
    unsubscribe_url: &str,
) -> OutboundEmail {
    let (subject, line) = match action {
        Action::Subscribe => (
            format!("Welcome to {}", list.name),
            format!(
                "Your address is now subscribed to {}. Welcome aboard!",
                list.address
            ),
        ),
        Action::Unsubscribe => (
            format!("Unsubscribed from {}", list.name),
            format!(
                "Your address has been removed from {}. You will receive no further mail.",
                list.address
            ),
        ),
    };

    let text = format!("Hello,\n\n{line}\n");
    let html = format!("<p>Hello,</p><p>{}</p>", escape(&line));

    OutboundEmail {
        to: email.to_string(),
        subject,
        text,
        html,
        list_unsubscribe: Some(format!("<{unsubscribe_url}>")),
    }
}

/// Builds the operator warning emitted at subscriber-count milestones.
pub fn milestone_warning(operator: &str, list: &MailingList, delta: i64) -> OutboundEmail {
    let subject = format!("{}: {delta} net new subscribers", list.address);
    let text = format!(
        "The mailing list {address} has gained {delta} subscribers net\n\
         since this gateway started (warning step: {step}).\n",
        address = list.address,
        step = list.warn_every,
    );
    let html = format!(
        "<p>The mailing list <b>{address}</b> has gained {delta} subscribers net \
         since this gateway started (warning step: {step}).</p>",
        address = escape(list.address.as_str()),
        step = list.warn_every,
    );

    OutboundEmail {
        to: operator.to_string(),
        subject,
        text,
        html,
        list_unsubscribe: None,
    }
}

/// Minimal HTML escaping for interpolated values.
fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
