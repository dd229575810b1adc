//! Single-use token store.
//!
//! Tokens are opaque random keys carrying a typed payload and an expiry.
//! The store owns the only map of live tokens; all mutation goes through
//! its methods so the at-most-once consumption invariant is enforced in
//! one place.
//!
//! # Critical Invariant
//!
//! `consume` is a single atomic check-and-remove under the store lock: of
//! any number of concurrent callers presenting the same key, exactly one
//! receives the payload and every other caller observes `None`. This is
//! what prevents a confirmation link from being actioned twice.
//!
//! Expiry is evaluated lazily at access time. Expired entries are garbage:
//! they are dropped when touched, and [`TokenStore::prune`] sweeps the rest
//! opportunistically. Neither affects correctness.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

use crate::config::TokenTtl;
use crate::types::{ListAddress, TokenKey};

/// Number of random bytes in a token key (256 bits).
const KEY_BYTES: usize = 32;

/// The type of a stored token.
///
/// Confirmation tokens are consumed exactly once; CSRF tokens are only ever
/// peeked and stay valid until expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Form anti-forgery token, bound to the issuing IP.
    Csrf,
    /// Confirms a pending subscribe request.
    SubscribeConfirm,
    /// Confirms a pending unsubscribe request.
    UnsubscribeConfirm,
}

/// Payload of a confirmation token: the pending request it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPayload {
    /// Subscriber address.
    pub email: String,
    /// Optional display name supplied on the form.
    pub name: Option<String>,
    /// The list the request targets.
    pub list: ListAddress,
}

/// Typed payload stored with a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenPayload {
    /// CSRF tokens carry the IP they were issued to.
    Csrf {
        /// Issuing client IP.
        ip: IpAddr,
    },
    /// Confirmation tokens carry the pending request.
    Confirm(ConfirmPayload),
}

#[derive(Debug, Clone)]
struct TokenEntry {
    kind: TokenKind,
    payload: TokenPayload,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TokenEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    fn matches(&self, expected: Option<TokenKind>) -> bool {
        expected.is_none_or(|kind| self.kind == kind)
    }
}

/// Process-wide store of live tokens.
///
/// Internally a single mutex around the key map. The lock is only held for
/// map operations, never across I/O.
pub struct TokenStore {
    entries: Mutex<HashMap<TokenKey, TokenEntry>>,
    ttl: TokenTtl,
}

impl TokenStore {
    /// Creates an empty store with the given lifetimes.
    pub fn new(ttl: TokenTtl) -> Self {
        TokenStore {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Creates a token of `kind` with `payload`, returning the fresh key.
    ///
    /// Key collisions are cryptographically negligible; if one occurs
    /// anyway the key is regenerated rather than overwriting a live entry.
    pub fn create(&self, kind: TokenKind, payload: TokenPayload) -> TokenKey {
        self.create_at(kind, payload, Utc::now())
    }

    fn create_at(&self, kind: TokenKind, payload: TokenPayload, now: DateTime<Utc>) -> TokenKey {
        let ttl = match kind {
            TokenKind::Csrf => self.ttl.csrf,
            TokenKind::SubscribeConfirm | TokenKind::UnsubscribeConfirm => self.ttl.confirm,
        };
        let entry = TokenEntry {
            kind,
            payload,
            created_at: now,
            expires_at: now + Duration::seconds(ttl.as_secs() as i64),
        };

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            let key = generate_key();
            match entries.entry(key.clone()) {
                std::collections::hash_map::Entry::Occupied(_) => continue,
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert(entry);
                    return key;
                }
            }
        }
    }

    /// Returns the payload without removing the token, iff it is present,
    /// unexpired, and of the expected kind (when one is given).
    pub fn peek(&self, key: &TokenKey, expected: Option<TokenKind>) -> Option<TokenPayload> {
        self.peek_at(key, expected, Utc::now())
    }

    fn peek_at(
        &self,
        key: &TokenKey,
        expected: Option<TokenKind>,
        now: DateTime<Utc>,
    ) -> Option<TokenPayload> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let (live, matched) = match entries.get(key) {
            None => return None,
            Some(entry) => (entry.is_live(now), entry.matches(expected)),
        };
        if !live {
            // Lazy expiry: drop the garbage entry while we hold the lock.
            entries.remove(key);
            return None;
        }
        if !matched {
            return None;
        }
        entries.get(key).map(|entry| entry.payload.clone())
    }

    /// Atomically returns and removes the token payload.
    ///
    /// A second caller with the same key observes `None`, no matter how the
    /// calls interleave.
    pub fn consume(&self, key: &TokenKey, expected: Option<TokenKind>) -> Option<TokenPayload> {
        self.consume_at(key, expected, Utc::now())
    }

    fn consume_at(
        &self,
        key: &TokenKey,
        expected: Option<TokenKind>,
        now: DateTime<Utc>,
    ) -> Option<TokenPayload> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        // Check-and-remove in one critical section. A kind mismatch must not
        // destroy the entry: the token stays valid for its intended consumer.
        let (live, matched) = match entries.get(key) {
            None => return None,
            Some(entry) => (entry.is_live(now), entry.matches(expected)),
        };
        if !live {
            entries.remove(key);
            return None;
        }
        if !matched {
            return None;
        }
        entries.remove(key).map(|entry| entry.payload)
    }

    /// Returns true if a live confirmation token of `kind` exists for
    /// `email`. Used to suppress duplicate confirmation emails while one is
    /// already outstanding.
    pub fn has_pending(&self, email: &str, kind: TokenKind) -> bool {
        self.has_pending_at(email, kind, Utc::now())
    }

    fn has_pending_at(&self, email: &str, kind: TokenKind, now: DateTime<Utc>) -> bool {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.values().any(|entry| {
            entry.kind == kind
                && entry.is_live(now)
                && matches!(
                    &entry.payload,
                    TokenPayload::Confirm(payload) if payload.email == email
                )
        })
    }

    /// Returns the key of a live CSRF token bound to `ip`, if one exists.
    pub fn find_csrf(&self, ip: IpAddr) -> Option<TokenKey> {
        self.find_csrf_at(ip, Utc::now())
    }

    fn find_csrf_at(&self, ip: IpAddr, now: DateTime<Utc>) -> Option<TokenKey> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().find_map(|(key, entry)| {
            (entry.kind == TokenKind::Csrf
                && entry.is_live(now)
                && matches!(entry.payload, TokenPayload::Csrf { ip: bound } if bound == ip))
                .then(|| key.clone())
        })
    }

    /// Removes every expired entry, returning how many were dropped.
    ///
    /// Purely opportunistic; lazy expiry already keeps the store correct.
    pub fn prune(&self) -> usize {
        self.prune_at(Utc::now())
    }

    fn prune_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Number of stored entries, live or not.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Generates a fresh URL-safe key with 256 bits of OS entropy.
fn generate_key() -> TokenKey {
    let mut bytes = [0u8; KEY_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    TokenKey::new(URL_SAFE_NO_PAD.encode(bytes))
}
