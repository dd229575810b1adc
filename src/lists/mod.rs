//! Cached registry of served mailing lists.
//!
//! The registry is a read-mostly map keyed by list address, populated by a
//! startup fetch from the configured backends and replaced wholesale on each
//! refresh. The only in-place mutation is the per-list subscriber-delta
//! counter, which survives refreshes for lists whose address persists (the
//! counter never resets while the process lives).

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::info;

use crate::types::{BackendName, ListAddress};

/// A mailing list as served by this gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailingList {
    /// Unique list address.
    pub address: ListAddress,
    /// Human-readable list name.
    pub name: String,
    /// Short description shown on forms and in mail.
    pub description: String,
    /// The backend that holds this list's membership.
    pub backend: BackendName,
    /// BCP 47 language tag of the list's audience.
    pub locale: String,
    /// Net membership change since process start. May go negative.
    pub subscriber_delta: i64,
    /// Positive multiple of this step at which the operator is warned.
    pub warn_every: u64,
}

/// Result of a counter update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterUpdate {
    /// The delta after the update.
    pub delta: i64,
    /// True when the post-increment delta is a positive multiple of the
    /// list's `warn_every` step.
    pub milestone: bool,
}

/// Process-wide registry of lists.
pub struct ListRegistry {
    lists: RwLock<HashMap<ListAddress, MailingList>>,
}

impl ListRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        ListRegistry {
            lists: RwLock::new(HashMap::new()),
        }
    }

    /// Returns a snapshot of the list with `address`, if served.
    pub fn get(&self, address: &ListAddress) -> Option<MailingList> {
        self.lists
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(address)
            .cloned()
    }

    /// Returns snapshots of all served lists, ordered by address.
    pub fn all(&self) -> Vec<MailingList> {
        let lists = self.lists.read().unwrap_or_else(|e| e.into_inner());
        let mut all: Vec<_> = lists.values().cloned().collect();
        all.sort_by(|a, b| a.address.as_str().cmp(b.address.as_str()));
        all
    }

    /// Number of served lists.
    pub fn len(&self) -> usize {
        self.lists.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns true if no lists are served.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replaces the whole view with a freshly fetched one.
    ///
    /// Counters of lists whose address survives the refresh are carried
    /// over; lists that disappeared drop together with their counters.
    pub fn replace_all(&self, fetched: Vec<MailingList>) {
        let mut lists = self.lists.write().unwrap_or_else(|e| e.into_inner());
        let mut next: HashMap<ListAddress, MailingList> = fetched
            .into_iter()
            .map(|list| (list.address.clone(), list))
            .collect();
        for (address, list) in next.iter_mut() {
            if let Some(previous) = lists.get(address) {
                list.subscriber_delta = previous.subscriber_delta;
            }
        }
        let (old, new) = (lists.len(), next.len());
        *lists = next;
        info!(previous = old, current = new, "list registry replaced");
    }

    /// Applies a membership change of `step` (+1 or -1) to the list's
    /// counter, in place. Returns `None` if the list is not served.
    pub fn record_delta(&self, address: &ListAddress, step: i64) -> Option<CounterUpdate> {
        let mut lists = self.lists.write().unwrap_or_else(|e| e.into_inner());
        let list = lists.get_mut(address)?;
        list.subscriber_delta += step;
        let delta = list.subscriber_delta;
        let milestone = step > 0
            && delta > 0
            && list.warn_every > 0
            && (delta as u64).is_multiple_of(list.warn_every);
        Some(CounterUpdate { delta, milestone })
    }
}

impl Default for ListRegistry {
    fn default() -> Self {
        Self::new()
    }
}
