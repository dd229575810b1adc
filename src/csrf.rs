//! CSRF token gate for the subscription forms.
//!
//! CSRF tokens live in the shared token store like every other token, but
//! their validation deliberately uses `peek`, not `consume`: the same token
//! stays usable across repeated page loads and form re-submissions within
//! its lifetime. Only confirmation tokens are single-use.

use std::net::IpAddr;
use std::sync::Arc;

use crate::store::{TokenKind, TokenPayload, TokenStore};
use crate::types::TokenKey;

/// Issues and validates per-IP CSRF tokens.
#[derive(Clone)]
pub struct CsrfGate {
    store: Arc<TokenStore>,
}

impl CsrfGate {
    /// Creates a gate over the shared token store.
    pub fn new(store: Arc<TokenStore>) -> Self {
        CsrfGate { store }
    }

    /// Returns a live CSRF token for `ip`, reusing an existing unexpired
    /// one when possible so repeated page loads share a key.
    pub fn issue_or_reuse(&self, ip: IpAddr) -> TokenKey {
        match self.store.find_csrf(ip) {
            Some(key) => key,
            None => self.store.create(TokenKind::Csrf, TokenPayload::Csrf { ip }),
        }
    }

    /// Returns true iff `key` resolves to a live CSRF token bound to `ip`.
    /// The token is not consumed.
    pub fn validate(&self, key: &TokenKey, ip: IpAddr) -> bool {
        matches!(
            self.store.peek(key, Some(TokenKind::Csrf)),
            Some(TokenPayload::Csrf { ip: bound }) if bound == ip
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenTtl;
    use std::net::Ipv4Addr;

    fn gate() -> CsrfGate {
        CsrfGate::new(Arc::new(TokenStore::new(TokenTtl::default())))
    }

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 0, 2, last))
    }

    #[test]
    fn issue_twice_reuses_same_key() {
        let gate = gate();
        let first = gate.issue_or_reuse(ip(1));
        let second = gate.issue_or_reuse(ip(1));
        assert_eq!(first, second);
    }

    #[test]
    fn different_ips_get_different_keys() {
        let gate = gate();
        assert_ne!(gate.issue_or_reuse(ip(1)), gate.issue_or_reuse(ip(2)));
    }

    #[test]
    fn validate_accepts_issuing_ip_only() {
        let gate = gate();
        let key = gate.issue_or_reuse(ip(1));
        assert!(gate.validate(&key, ip(1)));
        assert!(!gate.validate(&key, ip(2)));
    }

    #[test]
    fn validate_does_not_consume() {
        let gate = gate();
        let key = gate.issue_or_reuse(ip(1));
        assert!(gate.validate(&key, ip(1)));
        assert!(gate.validate(&key, ip(1)));
    }

    #[test]
    fn validate_rejects_unknown_key() {
        let gate = gate();
        assert!(!gate.validate(&TokenKey::new("bogus"), ip(1)));
    }

    #[test]
    fn validate_rejects_confirmation_token() {
        let store = Arc::new(TokenStore::new(TokenTtl::default()));
        let gate = CsrfGate::new(Arc::clone(&store));
        let key = store.create(
            TokenKind::SubscribeConfirm,
            TokenPayload::Confirm(crate::store::ConfirmPayload {
                email: "a@example.org".to_string(),
                name: None,
                list: crate::types::ListAddress::new("users@example.org"),
            }),
        );
        assert!(!gate.validate(&key, ip(1)));
    }
}
