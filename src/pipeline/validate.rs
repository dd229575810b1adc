//! Cheap request validation run before any state is created.

use regex::Regex;
use std::sync::LazyLock;

/// RFC-shaped address check. Deliberately a heuristic: the definitive
/// judgement belongs to the backend; this only has to keep obvious garbage
/// from reaching it.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._%+-]*@[A-Za-z0-9][A-Za-z0-9.-]*\.[A-Za-z]{2,}$")
        .expect("email pattern is a valid regex")
});

/// Character pairs that mark an address as malformed even when the overall
/// shape matches.
const DOUBLED: [&str; 4] = ["..", "@@", "__", "--"];

/// Returns true if `email` looks like a deliverable address.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > 254 {
        return false;
    }
    if DOUBLED.iter().any(|pair| email.contains(pair)) {
        return false;
    }
    EMAIL_RE.is_match(email)
}

/// Returns true if the hidden honeypot field was filled in, marking the
/// submission as automated abuse.
pub fn honeypot_triggered(website: &str) -> bool {
    !website.trim().is_empty()
}
