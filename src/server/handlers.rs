//! Form and confirmation handlers.
//!
//! The handlers own only parsing and rendering: given the parsed form
//! fields and the client IP they call into the pipeline and translate its
//! terminal outcome into a status code and a human-readable line. All
//! policy lives in the pipeline.

use std::net::{IpAddr, SocketAddr};

use axum::Form;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};

use crate::pipeline::Submission;
use crate::types::{Action, ConfirmOutcome, ListAddress, SubmitOutcome, TokenKey};

use super::AppState;

/// Proxy header consulted for the real client IP before falling back to
/// the socket address.
const HEADER_FORWARDED_FOR: &str = "x-forwarded-for";

/// Fields of the subscribe/unsubscribe form.
#[derive(Debug, Deserialize)]
pub struct SubscriptionForm {
    /// Subscriber address.
    pub email: String,
    /// Optional display name; empty submits become `None`.
    #[serde(default)]
    pub name: String,
    /// Target list address.
    pub list: String,
    /// CSRF token issued for this client.
    pub token: String,
    /// Honeypot field, hidden from humans. Must stay empty.
    #[serde(default)]
    pub website: String,
}

impl SubscriptionForm {
    fn into_submission(self) -> Submission {
        let name = self.name.trim();
        Submission {
            email: self.email.trim().to_string(),
            name: (!name.is_empty()).then(|| name.to_string()),
            list: ListAddress::new(self.list.trim()),
            csrf_token: TokenKey::new(self.token),
            website: self.website,
        }
    }
}

/// Query parameters of the confirmation link.
#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    /// The one-time token from the emailed link.
    pub token: String,
}

/// Response body of `GET /csrf`.
#[derive(Debug, Serialize)]
pub struct CsrfResponse {
    /// Token to place in the form's `token` field.
    pub token: String,
}

/// One list as shown to the form renderer by `GET /lists`.
#[derive(Debug, Serialize)]
pub struct ListView {
    /// List address (the form's `list` field value).
    pub address: String,
    /// Display name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Audience language tag.
    pub locale: String,
}

/// `POST /subscribe` handler.
pub async fn subscribe_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Form(form): Form<SubscriptionForm>,
) -> (StatusCode, String) {
    submit(state, Action::Subscribe, form, client_ip(&headers, peer)).await
}

/// `POST /unsubscribe` handler.
pub async fn unsubscribe_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Form(form): Form<SubscriptionForm>,
) -> (StatusCode, String) {
    submit(state, Action::Unsubscribe, form, client_ip(&headers, peer)).await
}

async fn submit(
    state: AppState,
    action: Action,
    form: SubscriptionForm,
    ip: IpAddr,
) -> (StatusCode, String) {
    let outcome = state
        .pipeline()
        .submit(action, form.into_submission(), ip)
        .await;
    render_submit(&outcome)
}

/// `GET /confirm?token=...` handler.
pub async fn confirm_handler(
    State(state): State<AppState>,
    Query(query): Query<ConfirmQuery>,
) -> (StatusCode, String) {
    let outcome = state.pipeline().confirm(TokenKey::new(query.token)).await;
    render_confirm(&outcome)
}

/// `GET /csrf` handler: issues (or reuses) the client's form token.
pub async fn csrf_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> axum::Json<CsrfResponse> {
    let key = state.pipeline().csrf_token(client_ip(&headers, peer));
    axum::Json(CsrfResponse {
        token: key.as_str().to_string(),
    })
}

/// `GET /lists` handler: the served lists, for the form renderer.
pub async fn lists_handler(State(state): State<AppState>) -> axum::Json<Vec<ListView>> {
    let lists = state
        .pipeline()
        .services()
        .registry
        .all()
        .into_iter()
        .map(|list| ListView {
            address: list.address.as_str().to_string(),
            name: list.name,
            description: list.description,
            locale: list.locale,
        })
        .collect();
    axum::Json(lists)
}

/// Extracts the client IP, preferring the first `X-Forwarded-For` hop.
fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> IpAddr {
    headers
        .get(HEADER_FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|first| first.trim().parse().ok())
        .unwrap_or_else(|| peer.ip())
}

/// Maps a submission outcome to its response.
///
/// Validation and abuse rejections share deliberately terse wordings so
/// automated probes learn nothing about which gate fired.
fn render_submit(outcome: &SubmitOutcome) -> (StatusCode, String) {
    match outcome {
        SubmitOutcome::ConfirmationSent => (
            StatusCode::OK,
            "A confirmation link is on its way to your address. Please check your inbox.".into(),
        ),
        SubmitOutcome::AlreadySubscribed => (
            StatusCode::OK,
            "This address is already subscribed to the list.".into(),
        ),
        SubmitOutcome::NotSubscribed => (
            StatusCode::OK,
            "This address is not subscribed to the list.".into(),
        ),
        SubmitOutcome::ConfirmationPending => (
            StatusCode::OK,
            "A confirmation link was already sent. Please check your inbox.".into(),
        ),
        SubmitOutcome::InvalidRequest => (StatusCode::BAD_REQUEST, "Invalid request.".into()),
        SubmitOutcome::RateLimited => (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests. Please try again later.".into(),
        ),
        SubmitOutcome::CsrfRejected => (
            StatusCode::FORBIDDEN,
            "The form has expired. Please reload the page and try again.".into(),
        ),
        SubmitOutcome::QueueFull => (
            StatusCode::SERVICE_UNAVAILABLE,
            "The service is busy. Please try again in a moment.".into(),
        ),
        SubmitOutcome::EmailFailed(_) => (
            StatusCode::BAD_GATEWAY,
            "The confirmation email could not be sent. Please try again later.".into(),
        ),
        SubmitOutcome::BackendFailed(_) => (
            StatusCode::BAD_GATEWAY,
            "The mailing list service is currently unavailable. Please try again later.".into(),
        ),
        SubmitOutcome::Internal => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal error. Please try again later.".into(),
        ),
    }
}

/// Maps a confirmation outcome to its response.
fn render_confirm(outcome: &ConfirmOutcome) -> (StatusCode, String) {
    match outcome {
        ConfirmOutcome::Completed {
            action: Action::Subscribe,
            list,
        } => (StatusCode::OK, format!("You are now subscribed to {list}.")),
        ConfirmOutcome::Completed {
            action: Action::Unsubscribe,
            list,
        } => (
            StatusCode::OK,
            format!("You have been unsubscribed from {list}."),
        ),
        ConfirmOutcome::AlreadyAbsent { list } => (
            StatusCode::OK,
            format!("This address was not subscribed to {list}; nothing was changed."),
        ),
        ConfirmOutcome::TokenInvalid => (
            StatusCode::GONE,
            "This confirmation link is invalid, expired, or was already used. \
             Please restart from the subscription form."
                .into(),
        ),
        ConfirmOutcome::BackendFailed { message } => (
            StatusCode::BAD_GATEWAY,
            format!(
                "The mailing list service rejected the request ({message}). \
                 Please restart from the subscription form."
            ),
        ),
        ConfirmOutcome::QueueFull => (
            StatusCode::SERVICE_UNAVAILABLE,
            "The service is busy. Please open the confirmation link again in a moment.".into(),
        ),
        ConfirmOutcome::Internal => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal error. Please try again later.".into(),
        ),
    }
}
