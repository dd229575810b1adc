//! Terminal outcomes of the subscription pipeline.
//!
//! Every inbound request resolves to exactly one of these values; the HTTP
//! layer renders them but never inspects intermediate pipeline state. The
//! duplicate-state variants (`AlreadySubscribed`, `NotSubscribed`,
//! `ConfirmationPending`) are defined results, not errors.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::ListAddress;

/// The logical membership change a visitor is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Add the address to the list.
    Subscribe,
    /// Remove the address from the list.
    Unsubscribe,
}

impl Action {
    /// Returns the lowercase wire/word form of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Subscribe => "subscribe",
            Action::Unsubscribe => "unsubscribe",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a form submission (`POST /subscribe` or `POST /unsubscribe`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A confirmation token was issued and the invitation email was sent.
    ConfirmationSent,

    /// The address is already a member of the list (subscribe short-circuit).
    AlreadySubscribed,

    /// The address is not a member of the list (unsubscribe short-circuit).
    NotSubscribed,

    /// A confirmation of the same type is already outstanding for this
    /// address; no second token or email is produced.
    ConfirmationPending,

    /// Malformed email, unknown list, or tripped honeypot. Rendered as a
    /// generic "invalid request" so automated probes learn nothing.
    InvalidRequest,

    /// The client IP exceeded the sliding-window request ceiling.
    RateLimited,

    /// The CSRF token was missing, expired, or bound to a different IP.
    CsrfRejected,

    /// The action queue is full; the client may retry shortly.
    QueueFull,

    /// The confirmation email could not be sent, so no link was issued.
    /// The token stays live until expiry; a resubmission within the TTL
    /// resolves to `ConfirmationPending`.
    EmailFailed(String),

    /// The backend could not be consulted for the duplicate check.
    BackendFailed(String),

    /// An internal fault (e.g. a worker died mid-request). No state change
    /// is guaranteed or denied.
    Internal,
}

/// Outcome of visiting a confirmation link (`GET /confirm`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The membership change was applied on the backend.
    Completed {
        /// Which change was applied.
        action: Action,
        /// The list that was changed.
        list: ListAddress,
    },

    /// Unsubscribe confirmed, but the backend reported the address was not
    /// a member (HTTP 404). Treated as already-absent, not a hard error.
    AlreadyAbsent {
        /// The list the address was absent from.
        list: ListAddress,
    },

    /// The token was missing, expired, of the wrong type, or already
    /// consumed. Nothing happened; the visitor must restart the flow.
    TokenInvalid,

    /// The backend rejected the change after the token was consumed. The
    /// visitor must restart the flow from the form.
    BackendFailed {
        /// Best-effort provider error message.
        message: String,
    },

    /// The confirmation queue is full; the visitor may retry the same link
    /// shortly (the token has not been consumed).
    QueueFull,

    /// An internal fault (e.g. a worker died mid-request).
    Internal,
}
