//! End-to-end double opt-in flows over in-memory fakes.
//!
//! These tests drive the public pipeline API exactly the way the HTTP
//! layer does: issue a CSRF token, submit the form, pull the confirmation
//! link out of the recorded email, visit it, and check the observable
//! results on the fake backend and mailer.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::sync::atomic::Ordering;

use listgate::backend::MailingListBackend;
use listgate::config::{RateLimitConfig, TokenTtl};
use listgate::csrf::CsrfGate;
use listgate::lists::ListRegistry;
use listgate::notify::{Mailer, OutboundEmail};
use listgate::pipeline::{Pipeline, Services, Submission};
use listgate::store::{RateLimiter, TokenStore};
use listgate::test_utils::{MemoryBackend, MemoryMailer};
use listgate::types::{Action, BackendName, ConfirmOutcome, ListAddress, SubmitOutcome, TokenKey};

const LIST: &str = "users@example.org";

struct Gateway {
    pipeline: Pipeline,
    backend: Arc<MemoryBackend>,
    mailer: Arc<MemoryMailer>,
}

async fn gateway() -> Gateway {
    let backend = Arc::new(MemoryBackend::with_list(LIST));
    let mailer = Arc::new(MemoryMailer::default());
    let tokens = Arc::new(TokenStore::new(TokenTtl::default()));

    let services = Arc::new(Services {
        tokens: Arc::clone(&tokens),
        limiter: Arc::new(RateLimiter::new(RateLimitConfig::default())),
        csrf: CsrfGate::new(Arc::clone(&tokens)),
        registry: Arc::new(ListRegistry::new()),
        backends: HashMap::from([(
            BackendName::new("mem"),
            Arc::clone(&backend) as Arc<dyn MailingListBackend>,
        )]),
        mailer: Arc::clone(&mailer) as Arc<dyn Mailer>,
        public_url: "https://lists.example.org".to_string(),
        operator_email: Some("ops@example.org".to_string()),
        warn_every: 100,
        list_filter: Vec::new(),
    });
    services.refresh_registry().await;

    Gateway {
        pipeline: Pipeline::start(services, 10),
        backend,
        mailer,
    }
}

fn ip() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(203, 0, 113, 1))
}

fn form(gateway: &Gateway, email: &str) -> Submission {
    Submission {
        email: email.to_string(),
        name: Some("Ada Lovelace".to_string()),
        list: ListAddress::new(LIST),
        csrf_token: gateway.pipeline.csrf_token(ip()),
        website: String::new(),
    }
}

/// Extracts the confirmation token from the last recorded invitation.
fn emailed_token(mailer: &MemoryMailer) -> TokenKey {
    let mail: OutboundEmail = mailer.sent().last().cloned().expect("an email was sent");
    let key = mail
        .text
        .split("token=")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .expect("invitation carries a confirmation URL");
    TokenKey::new(key)
}

#[tokio::test]
async fn full_subscribe_flow() {
    let gw = gateway().await;

    // Valid submission: under the rate limit, valid CSRF, empty honeypot,
    // not currently subscribed.
    let outcome = gw
        .pipeline
        .submit(Action::Subscribe, form(&gw, "a@example.com"), ip())
        .await;
    assert_eq!(outcome, SubmitOutcome::ConfirmationSent);
    assert_eq!(gw.mailer.sent_count(), 1);
    assert!(
        !gw.backend.is_member(LIST, "a@example.com"),
        "nothing changes before the link is visited"
    );

    let invitation = &gw.mailer.sent()[0];
    assert_eq!(invitation.to, "a@example.com");
    assert!(invitation.list_unsubscribe.is_some());

    // Visiting the link applies the change exactly once.
    let key = emailed_token(&gw.mailer);
    let confirmed = gw.pipeline.confirm(key.clone()).await;
    assert_eq!(
        confirmed,
        ConfirmOutcome::Completed {
            action: Action::Subscribe,
            list: ListAddress::new(LIST),
        }
    );
    assert!(gw.backend.is_member(LIST, "a@example.com"));
    assert_eq!(gw.backend.subscribe_calls.load(Ordering::SeqCst), 1);

    // A completion notice went out on top of the invitation.
    assert_eq!(gw.mailer.sent_count(), 2);

    // Replaying the same link is a confirmation error and changes nothing.
    let replay = gw.pipeline.confirm(key).await;
    assert_eq!(replay, ConfirmOutcome::TokenInvalid);
    assert_eq!(gw.backend.subscribe_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn full_unsubscribe_flow() {
    let gw = gateway().await;
    gw.backend.add_member(LIST, "a@example.com");

    let outcome = gw
        .pipeline
        .submit(Action::Unsubscribe, form(&gw, "a@example.com"), ip())
        .await;
    assert_eq!(outcome, SubmitOutcome::ConfirmationSent);

    let key = emailed_token(&gw.mailer);
    let confirmed = gw.pipeline.confirm(key).await;
    assert_eq!(
        confirmed,
        ConfirmOutcome::Completed {
            action: Action::Unsubscribe,
            list: ListAddress::new(LIST),
        }
    );
    assert!(!gw.backend.is_member(LIST, "a@example.com"));
    assert_eq!(gw.backend.unsubscribe_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn duplicate_submission_sends_no_second_email() {
    let gw = gateway().await;

    let first = gw
        .pipeline
        .submit(Action::Subscribe, form(&gw, "a@example.com"), ip())
        .await;
    let second = gw
        .pipeline
        .submit(Action::Subscribe, form(&gw, "a@example.com"), ip())
        .await;

    assert_eq!(first, SubmitOutcome::ConfirmationSent);
    assert_eq!(second, SubmitOutcome::ConfirmationPending);
    assert_eq!(gw.mailer.sent_count(), 1);
}

#[tokio::test]
async fn csrf_token_is_reused_and_ip_bound() {
    let gw = gateway().await;

    // Two quick issuances for the same IP share one key.
    let first = gw.pipeline.csrf_token(ip());
    let second = gw.pipeline.csrf_token(ip());
    assert_eq!(first, second);

    // A different IP presenting that key is rejected.
    let other_ip = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 2));
    let mut submission = form(&gw, "a@example.com");
    submission.csrf_token = first;
    let outcome = gw
        .pipeline
        .submit(Action::Subscribe, submission, other_ip)
        .await;
    assert_eq!(outcome, SubmitOutcome::CsrfRejected);
}

#[tokio::test]
async fn ghost_unsubscribe_renders_already_absent() {
    let gw = gateway().await;
    gw.backend.add_member(LIST, "ghost@example.com");

    let outcome = gw
        .pipeline
        .submit(Action::Unsubscribe, form(&gw, "ghost@example.com"), ip())
        .await;
    assert_eq!(outcome, SubmitOutcome::ConfirmationSent);
    let key = emailed_token(&gw.mailer);

    // The member disappears behind our back before the link is visited;
    // the backend then answers 404 and the pipeline renders it distinctly
    // from a hard backend error.
    gw.backend
        .unsubscribe(&ListAddress::new(LIST), "ghost@example.com")
        .await;

    let confirmed = gw.pipeline.confirm(key).await;
    assert_eq!(
        confirmed,
        ConfirmOutcome::AlreadyAbsent {
            list: ListAddress::new(LIST),
        }
    );
}

#[tokio::test]
async fn concurrent_confirm_applies_exactly_once() {
    let gw = gateway().await;
    gw.pipeline
        .submit(Action::Subscribe, form(&gw, "a@example.com"), ip())
        .await;
    let key = emailed_token(&gw.mailer);

    // Both visits race; the worker consumes atomically, so exactly one
    // backend call happens.
    let (first, second) = tokio::join!(
        gw.pipeline.confirm(key.clone()),
        gw.pipeline.confirm(key.clone()),
    );

    let completed = [&first, &second]
        .iter()
        .filter(|outcome| matches!(outcome, ConfirmOutcome::Completed { .. }))
        .count();
    let rejected = [&first, &second]
        .iter()
        .filter(|outcome| matches!(outcome, ConfirmOutcome::TokenInvalid))
        .count();
    assert_eq!(completed, 1);
    assert_eq!(rejected, 1);
    assert_eq!(gw.backend.subscribe_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn shutdown_stops_workers() {
    let gw = gateway().await;

    // A submission after shutdown fails closed instead of hanging.
    gw.pipeline.shutdown().await;
    let outcome = gw
        .pipeline
        .submit(Action::Subscribe, form(&gw, "a@example.com"), ip())
        .await;
    assert!(matches!(
        outcome,
        SubmitOutcome::Internal | SubmitOutcome::QueueFull
    ));
}
