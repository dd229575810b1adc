//! Core domain types for the subscription gateway.
//!
//! This module contains the fundamental types used throughout the
//! application, designed to encode invariants via the type system.

pub mod ids;
pub mod outcome;

// Re-export commonly used types at the module level
pub use ids::{BackendName, ListAddress, TokenKey};
pub use outcome::{Action, ConfirmOutcome, SubmitOutcome};
