//! Process-wide shared stores.
//!
//! Each store owns its map behind its own lock; invariants are enforced by
//! the store's methods and nowhere else. Locks are never held across await
//! points.

pub mod limiter;
pub mod token;

pub use limiter::RateLimiter;
pub use token::{ConfirmPayload, TokenKind, TokenPayload, TokenStore};
