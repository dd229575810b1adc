//! Backend adapter: executes descriptor-built requests and classifies
//! responses into the uniform [`Outcome`] shape.
//!
//! The classification rules are fixed across providers:
//!
//! - 2xx → success
//! - 404 on unsubscribe → `not_found` (already absent, not a hard error)
//! - any other non-2xx, or a transport failure → `success = false` with a
//!   best-effort human-readable message extracted from the response body
//!
//! Network I/O happens here and only here; callers never hold a store lock
//! across these calls.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::BackendConfig;
use crate::types::{Action, ListAddress};

use super::descriptor::{
    AuthScheme, BackendDescriptor, FetchedList, PayloadEncoding, RequestParts, Verb,
};

/// Fixed basic-auth user for providers using [`AuthScheme::Basic`].
const BASIC_AUTH_USER: &str = "restadmin";

/// Maximum length of a provider message surfaced to logs and users.
const MESSAGE_LIMIT: usize = 200;

/// Uniform result of a membership-changing backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// The change was applied.
    pub success: bool,
    /// The backend reported the member as absent (404 on unsubscribe).
    pub not_found: bool,
    /// Human-readable detail; empty on success.
    pub message: String,
}

impl Outcome {
    /// Successful change.
    pub fn ok() -> Self {
        Outcome {
            success: true,
            not_found: false,
            message: String::new(),
        }
    }

    /// Member was already absent.
    pub fn not_found(message: impl Into<String>) -> Self {
        Outcome {
            success: false,
            not_found: true,
            message: message.into(),
        }
    }

    /// Hard failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Outcome {
            success: false,
            not_found: false,
            message: message.into(),
        }
    }
}

/// Errors from read-only backend operations (check, fetch-lists).
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("backend transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a status the descriptor cannot interpret.
    #[error("backend returned HTTP {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Extracted provider message.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("backend response could not be decoded: {0}")]
    Decode(String),
}

/// The capability set every list backend provides.
///
/// One implementation speaks real provider HTTP ([`HttpBackend`]); tests
/// substitute an in-memory double.
#[async_trait]
pub trait MailingListBackend: Send + Sync {
    /// Adds `email` to `list`.
    async fn subscribe(&self, list: &ListAddress, email: &str, name: Option<&str>) -> Outcome;

    /// Removes `email` from `list`.
    async fn unsubscribe(&self, list: &ListAddress, email: &str) -> Outcome;

    /// Returns whether `email` is currently a member of `list`.
    async fn check_subscribed(&self, list: &ListAddress, email: &str)
    -> Result<bool, BackendError>;

    /// Enumerates the lists this backend serves.
    async fn fetch_lists(&self) -> Result<Vec<FetchedList>, BackendError>;
}

/// A backend adapter speaking a provider's HTTP API via its descriptor.
pub struct HttpBackend {
    descriptor: BackendDescriptor,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Builds an adapter for one configured backend.
    pub fn new(
        config: &BackendConfig,
        timeout: std::time::Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpBackend {
            descriptor: BackendDescriptor::from_config(config),
            client,
        })
    }

    /// Executes one descriptor-built request, returning status and body.
    async fn execute(&self, parts: &RequestParts) -> Result<(u16, String), reqwest::Error> {
        let method = match parts.verb {
            Verb::Get => reqwest::Method::GET,
            Verb::Post => reqwest::Method::POST,
            Verb::Delete => reqwest::Method::DELETE,
        };
        let mut request = self.client.request(method, &parts.url);

        request = match self.descriptor.auth() {
            AuthScheme::Basic => {
                request.basic_auth(BASIC_AUTH_USER, Some(&self.descriptor.api_key))
            }
            AuthScheme::TokenHeader => request.header(
                reqwest::header::AUTHORIZATION,
                format!("token {}", self.descriptor.api_key),
            ),
        };

        if !parts.params.is_empty() {
            request = match parts.encoding {
                PayloadEncoding::Form => request.form(&parts.params),
                PayloadEncoding::Json => {
                    let body: serde_json::Map<String, serde_json::Value> = parts
                        .params
                        .iter()
                        .map(|(k, v)| ((*k).to_string(), serde_json::Value::String(v.clone())))
                        .collect();
                    request.json(&body)
                }
            };
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        debug!(
            backend = %self.descriptor.name,
            url = %parts.url,
            status,
            "backend call finished"
        );
        Ok((status, body))
    }

    async fn change_membership(&self, action: Action, parts: RequestParts) -> Outcome {
        match self.execute(&parts).await {
            Ok((status, body)) => classify_change_response(action, status, &body),
            Err(e) => {
                error!(
                    backend = %self.descriptor.name,
                    action = %action,
                    error = %e,
                    "backend transport failure"
                );
                Outcome::failed(format!("backend unreachable: {e}"))
            }
        }
    }
}

#[async_trait]
impl MailingListBackend for HttpBackend {
    async fn subscribe(&self, list: &ListAddress, email: &str, name: Option<&str>) -> Outcome {
        let parts = self.descriptor.subscribe_request(list, email, name);
        self.change_membership(Action::Subscribe, parts).await
    }

    async fn unsubscribe(&self, list: &ListAddress, email: &str) -> Outcome {
        let parts = self.descriptor.unsubscribe_request(list, email);
        self.change_membership(Action::Unsubscribe, parts).await
    }

    async fn check_subscribed(
        &self,
        list: &ListAddress,
        email: &str,
    ) -> Result<bool, BackendError> {
        let parts = self.descriptor.check_request(list, email);
        let (status, body) = self.execute(&parts).await?;
        self.descriptor
            .is_subscribed(status, &body)
            .ok_or_else(|| BackendError::UnexpectedStatus {
                status,
                message: extract_message(status, &body),
            })
    }

    async fn fetch_lists(&self) -> Result<Vec<FetchedList>, BackendError> {
        let parts = self.descriptor.lists_request();
        let (status, body) = self.execute(&parts).await?;
        if !(200..300).contains(&status) {
            return Err(BackendError::UnexpectedStatus {
                status,
                message: extract_message(status, &body),
            });
        }
        self.descriptor
            .parse_lists(&body)
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}

/// Classifies a membership-change response per the fixed rules.
fn classify_change_response(action: Action, status: u16, body: &str) -> Outcome {
    match status {
        200..=299 => Outcome::ok(),
        404 if action == Action::Unsubscribe => Outcome::not_found(extract_message(status, body)),
        _ => Outcome::failed(extract_message(status, body)),
    }
}

/// Pulls a human-readable message out of a provider error body.
///
/// Providers wrap errors differently (`message`, `error`, `detail`, or raw
/// text); the extraction is best-effort and always bounded in length.
fn extract_message(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error", "detail"].iter().find_map(|field| {
                value
                    .get(field)
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| truncated(body));

    if detail.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {detail}")
    }
}

fn truncated(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= MESSAGE_LIMIT {
        trimmed.to_string()
    } else {
        let cut = trimmed
            .char_indices()
            .take_while(|(i, _)| *i < MESSAGE_LIMIT)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}…", &trimmed[..cut])
    }
}
