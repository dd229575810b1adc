//! HTTP surface of the gateway.
//!
//! The server owns parsing and rendering only; given parsed form fields
//! and the client IP it calls the pipeline and renders its terminal
//! outcome. Endpoints:
//!
//! - `POST /subscribe` - request a subscription (form-encoded)
//! - `POST /unsubscribe` - request an unsubscription (form-encoded)
//! - `GET /confirm?token=...` - resolve a confirmation link
//! - `GET /csrf` - issue or reuse the caller's form token
//! - `GET /lists` - served lists, for the form renderer
//! - `GET /health` - liveness probe

use std::sync::Arc;

use crate::pipeline::Pipeline;

pub mod handlers;
pub mod health;

pub use handlers::{confirm_handler, csrf_handler, lists_handler, subscribe_handler, unsubscribe_handler};
pub use health::health_handler;

/// Shared application state, passed to all handlers via Axum's `State`
/// extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pipeline: Pipeline,
}

impl AppState {
    /// Wraps the running pipeline for handler access.
    pub fn new(pipeline: Pipeline) -> Self {
        AppState {
            inner: Arc::new(AppStateInner { pipeline }),
        }
    }

    /// Returns the pipeline.
    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/subscribe", post(subscribe_handler))
        .route("/unsubscribe", post(unsubscribe_handler))
        .route("/confirm", get(confirm_handler))
        .route("/csrf", get(csrf_handler))
        .route("/lists", get(lists_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}
