//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of different identifier kinds (e.g.
//! using a backend name where a list address is expected) and make the code
//! more self-documenting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The address of a mailing list (e.g. `users@lists.example.org`).
///
/// The address is the unique key of a list across the whole process; two
/// backends never serve the same address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListAddress(pub String);

impl ListAddress {
    /// Creates a new list address from a string.
    pub fn new(s: impl Into<String>) -> Self {
        ListAddress(s.into())
    }

    /// Returns the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ListAddress {
    fn from(s: &str) -> Self {
        ListAddress(s.to_string())
    }
}

/// The name of a configured list-provider backend (e.g. `main-mailman`).
///
/// Lists reference their backend by name; the pipeline resolves the name to
/// an adapter instance at call time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendName(pub String);

impl BackendName {
    /// Creates a new backend name from a string.
    pub fn new(s: impl Into<String>) -> Self {
        BackendName(s.into())
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BackendName {
    fn from(s: &str) -> Self {
        BackendName(s.to_string())
    }
}

/// An opaque confirmation or CSRF token key.
///
/// Keys are the URL-safe base64 encoding of 32 random bytes; they appear in
/// confirmation URLs and form fields but are never parsed, only compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenKey(pub String);

impl TokenKey {
    /// Creates a token key from an existing string (e.g. a URL parameter).
    pub fn new(s: impl Into<String>) -> Self {
        TokenKey(s.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Keys are sensitive: only a short prefix is ever logged.
        write!(f, "{}…", self.0.get(..8).unwrap_or(&self.0))
    }
}
