//! Pluggable list-provider backends.
//!
//! [`descriptor`] describes each provider's API dialect as data; [`adapter`]
//! executes descriptor-built requests and normalizes responses into the
//! uniform subscribe/unsubscribe/check capability set.

pub mod adapter;
pub mod descriptor;

pub use adapter::{BackendError, HttpBackend, MailingListBackend, Outcome};
pub use descriptor::{BackendDescriptor, FetchedList, PayloadEncoding, ProviderFlavor, Verb};
