//! Shared in-memory fakes for unit and integration tests.
//!
//! [`MemoryBackend`] holds membership in a set and mirrors the adapter's
//! classification rules (including 404-as-`not_found` on unsubscribe);
//! [`MemoryMailer`] records sent mail. Both can be switched into failure
//! mode to exercise error paths.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::backend::{BackendError, FetchedList, MailingListBackend, Outcome};
use crate::notify::{MailError, Mailer, OutboundEmail};
use crate::types::ListAddress;

/// An in-memory list backend.
#[derive(Default)]
pub struct MemoryBackend {
    members: Mutex<HashSet<(String, String)>>,
    lists: Mutex<Vec<FetchedList>>,
    /// When set, membership-changing calls fail hard.
    pub fail_changes: AtomicBool,
    /// When set, lookups and list fetches return a transport-shaped error.
    pub fail_reads: AtomicBool,
    /// Number of `subscribe` calls performed.
    pub subscribe_calls: AtomicUsize,
    /// Number of `unsubscribe` calls performed.
    pub unsubscribe_calls: AtomicUsize,
}

impl MemoryBackend {
    /// Creates a backend serving the given lists.
    pub fn with_lists(lists: Vec<FetchedList>) -> Self {
        MemoryBackend {
            lists: Mutex::new(lists),
            ..Default::default()
        }
    }

    /// Creates a backend serving one plain list with the given address.
    pub fn with_list(address: &str) -> Self {
        Self::with_lists(vec![FetchedList {
            address: address.to_string(),
            name: address.split('@').next().unwrap_or(address).to_string(),
            description: "A test list".to_string(),
            locale: "en".to_string(),
        }])
    }

    /// Pre-seeds a membership.
    pub fn add_member(&self, list: &str, email: &str) {
        self.members
            .lock()
            .unwrap()
            .insert((list.to_string(), email.to_string()));
    }

    /// Returns whether the membership exists right now.
    pub fn is_member(&self, list: &str, email: &str) -> bool {
        self.members
            .lock()
            .unwrap()
            .contains(&(list.to_string(), email.to_string()))
    }

    fn read_failure() -> BackendError {
        BackendError::UnexpectedStatus {
            status: 503,
            message: "HTTP 503: backend down".to_string(),
        }
    }
}

#[async_trait]
impl MailingListBackend for MemoryBackend {
    async fn subscribe(&self, list: &ListAddress, email: &str, _name: Option<&str>) -> Outcome {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_changes.load(Ordering::SeqCst) {
            return Outcome::failed("HTTP 500: backend exploded");
        }
        self.members
            .lock()
            .unwrap()
            .insert((list.as_str().to_string(), email.to_string()));
        Outcome::ok()
    }

    async fn unsubscribe(&self, list: &ListAddress, email: &str) -> Outcome {
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_changes.load(Ordering::SeqCst) {
            return Outcome::failed("HTTP 500: backend exploded");
        }
        let removed = self
            .members
            .lock()
            .unwrap()
            .remove(&(list.as_str().to_string(), email.to_string()));
        if removed {
            Outcome::ok()
        } else {
            Outcome::not_found("HTTP 404: member not found")
        }
    }

    async fn check_subscribed(
        &self,
        list: &ListAddress,
        email: &str,
    ) -> Result<bool, BackendError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::read_failure());
        }
        Ok(self.is_member(list.as_str(), email))
    }

    async fn fetch_lists(&self) -> Result<Vec<FetchedList>, BackendError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::read_failure());
        }
        Ok(self.lists.lock().unwrap().clone())
    }
}

/// An in-memory mailer recording every dispatched message.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutboundEmail>>,
    /// When set, every send fails.
    pub fail_sends: AtomicBool,
}

impl MemoryMailer {
    /// Returns a snapshot of everything sent so far.
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of messages sent so far.
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: OutboundEmail) -> Result<(), MailError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(MailError::Address(
                "relay refused".parse::<lettre::Address>().unwrap_err(),
            ));
        }
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}
