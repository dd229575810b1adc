//! listgate: a double opt-in subscription gateway for mailing lists.
//!
//! A web submission triggers a confirmation email; only a follow-up click
//! on the one-time emailed link performs the actual membership change on
//! the remote list provider. This library holds the whole core: the
//! confirmation-token lifecycle, the anti-abuse gates, the pluggable
//! provider adapters, and the per-action queue/worker discipline.

pub mod backend;
pub mod config;
pub mod csrf;
pub mod lists;
pub mod notify;
pub mod pipeline;
pub mod server;
pub mod store;
pub mod test_utils;
pub mod types;
