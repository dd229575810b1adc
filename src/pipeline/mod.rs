//! The confirmation pipeline.
//!
//! Every subscription intent moves through the same stations: abuse gates
//! (rate limit, CSRF, honeypot, address shape), duplicate checks against
//! backend state and outstanding tokens, token issuance plus the invitation
//! email, and, once the link is visited, atomic token consumption followed
//! by the backend call, counter update, and completion notice.
//!
//! The gates run inline in the request handler; everything that performs
//! I/O runs on one of four per-action worker tasks fed by bounded queues
//! (see [`queue`]), so processing within each action type is strictly
//! ordered and never overlapping. Jobs report their terminal outcome back
//! through a oneshot channel, which keeps failures user-visible without
//! giving up the queue discipline.

pub mod queue;
pub mod validate;
mod worker;

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backend::MailingListBackend;
use crate::csrf::CsrfGate;
use crate::lists::{ListRegistry, MailingList};
use crate::notify::{Mailer, messages};
use crate::store::{ConfirmPayload, RateLimiter, TokenKind, TokenPayload, TokenStore};
use crate::types::{Action, BackendName, ConfirmOutcome, ListAddress, SubmitOutcome, TokenKey};

use queue::{ActionQueues, ConfirmJob, EnqueueError, SubmitJob, SubmitRequest, action_queues};

/// A parsed form submission as received from the HTTP layer.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Subscriber address as typed into the form.
    pub email: String,
    /// Optional display name.
    pub name: Option<String>,
    /// Target list address.
    pub list: ListAddress,
    /// CSRF token from the hidden form field.
    pub csrf_token: TokenKey,
    /// Honeypot field; humans leave it empty.
    pub website: String,
}

/// The shared collaborators and configuration snapshot the pipeline works
/// against. One instance per process, shared by handlers and workers.
pub struct Services {
    /// Single-use token store.
    pub tokens: Arc<TokenStore>,
    /// Per-IP admission control.
    pub limiter: Arc<RateLimiter>,
    /// CSRF issue/validate gate.
    pub csrf: CsrfGate,
    /// Served lists and their counters.
    pub registry: Arc<ListRegistry>,
    /// Provider adapters keyed by backend name.
    pub backends: HashMap<BackendName, Arc<dyn MailingListBackend>>,
    /// Outbound email dispatch.
    pub mailer: Arc<dyn Mailer>,
    /// Public base URL confirmation links are built against.
    pub public_url: String,
    /// Operator address for milestone warnings; `None` disables them.
    pub operator_email: Option<String>,
    /// Default warning step applied to fetched lists.
    pub warn_every: u64,
    /// If non-empty, only these list addresses are served.
    pub list_filter: Vec<ListAddress>,
}

impl Services {
    fn confirm_url(&self, key: &TokenKey) -> String {
        format!("{}/confirm?token={}", self.public_url, key.as_str())
    }

    fn unsubscribe_url(&self) -> String {
        format!("{}/unsubscribe", self.public_url)
    }

    fn backend_for(&self, list: &MailingList) -> Option<&Arc<dyn MailingListBackend>> {
        let backend = self.backends.get(&list.backend);
        if backend.is_none() {
            error!(
                list = %list.address,
                backend = %list.backend,
                "list references an unconfigured backend"
            );
        }
        backend
    }

    /// Worker-side handling of a queued submission: duplicate checks, token
    /// issuance, invitation email.
    pub(crate) async fn process_submission(
        &self,
        action: Action,
        request: &SubmitRequest,
    ) -> SubmitOutcome {
        // The registry may have refreshed since intake; re-resolve.
        let Some(list) = self.registry.get(&request.list) else {
            debug!(list = %request.list, "list vanished between intake and processing");
            return SubmitOutcome::InvalidRequest;
        };
        let Some(backend) = self.backend_for(&list) else {
            return SubmitOutcome::Internal;
        };

        let subscribed = match backend.check_subscribed(&list.address, &request.email).await {
            Ok(subscribed) => subscribed,
            Err(e) => {
                error!(list = %list.address, error = %e, "membership lookup failed");
                return SubmitOutcome::BackendFailed(e.to_string());
            }
        };
        match action {
            Action::Subscribe if subscribed => return SubmitOutcome::AlreadySubscribed,
            Action::Unsubscribe if !subscribed => return SubmitOutcome::NotSubscribed,
            _ => {}
        }

        let kind = confirm_kind(action);
        if self.tokens.has_pending(&request.email, kind) {
            debug!(action = %action, "confirmation already outstanding");
            return SubmitOutcome::ConfirmationPending;
        }

        let key = self.tokens.create(
            kind,
            TokenPayload::Confirm(ConfirmPayload {
                email: request.email.clone(),
                name: request.name.clone(),
                list: list.address.clone(),
            }),
        );
        let mail = messages::confirm_invitation(
            action,
            &list,
            &request.email,
            request.name.as_deref(),
            &self.confirm_url(&key),
            &self.unsubscribe_url(),
        );

        match self.mailer.send(mail).await {
            Ok(()) => {
                info!(action = %action, list = %list.address, "confirmation invitation sent");
                SubmitOutcome::ConfirmationSent
            }
            Err(e) => {
                // The token stays live until natural expiry; a resubmission
                // within the TTL resolves to ConfirmationPending.
                error!(action = %action, error = %e, "invitation email failed");
                SubmitOutcome::EmailFailed(e.to_string())
            }
        }
    }

    /// Worker-side handling of a confirmation visit: atomic consume,
    /// backend call, counter update, completion notice.
    pub(crate) async fn process_confirmation(
        &self,
        action: Action,
        key: &TokenKey,
    ) -> ConfirmOutcome {
        let kind = confirm_kind(action);
        let Some(TokenPayload::Confirm(payload)) = self.tokens.consume(key, Some(kind)) else {
            // Missing, expired, wrong type, or lost the consume race.
            warn!(token = %key, action = %action, "confirmation token rejected");
            return ConfirmOutcome::TokenInvalid;
        };

        let Some(list) = self.registry.get(&payload.list) else {
            error!(list = %payload.list, "confirmed token for a list no longer served");
            return ConfirmOutcome::BackendFailed {
                message: format!("the list {} is no longer served", payload.list),
            };
        };
        let Some(backend) = self.backend_for(&list) else {
            return ConfirmOutcome::Internal;
        };

        let outcome = match action {
            Action::Subscribe => {
                backend
                    .subscribe(&list.address, &payload.email, payload.name.as_deref())
                    .await
            }
            Action::Unsubscribe => backend.unsubscribe(&list.address, &payload.email).await,
        };

        if outcome.success {
            self.apply_success(action, &list, &payload.email).await;
            ConfirmOutcome::Completed {
                action,
                list: list.address,
            }
        } else if outcome.not_found {
            info!(list = %list.address, "unsubscribe target was already absent");
            ConfirmOutcome::AlreadyAbsent { list: list.address }
        } else {
            // The token is gone; the visitor must restart from the form.
            error!(
                list = %list.address,
                action = %action,
                message = %outcome.message,
                "backend rejected confirmed request"
            );
            ConfirmOutcome::BackendFailed {
                message: outcome.message,
            }
        }
    }

    /// Counter update and follow-up notifications after a successful
    /// membership change. Notification failures are logged but never affect
    /// the already-applied change.
    async fn apply_success(&self, action: Action, list: &MailingList, email: &str) {
        let step = match action {
            Action::Subscribe => 1,
            Action::Unsubscribe => -1,
        };
        let update = self.registry.record_delta(&list.address, step);

        if let Some(update) = update {
            info!(
                list = %list.address,
                action = %action,
                delta = update.delta,
                "membership change applied"
            );
            if update.milestone {
                if let Some(operator) = &self.operator_email {
                    let mail = messages::milestone_warning(operator, list, update.delta);
                    if let Err(e) = self.mailer.send(mail).await {
                        warn!(error = %e, "milestone warning failed to send");
                    }
                }
            }
        }

        let mail = messages::completion(action, list, email, &self.unsubscribe_url());
        if let Err(e) = self.mailer.send(mail).await {
            warn!(error = %e, "completion notice failed to send");
        }
    }

    /// Fetches lists from every backend and replaces the registry view.
    ///
    /// A backend that fails to answer keeps its previous lists, so a
    /// transient provider outage never un-serves its lists.
    pub async fn refresh_registry(&self) {
        let mut fetched: Vec<MailingList> = Vec::new();

        for (name, backend) in &self.backends {
            match backend.fetch_lists().await {
                Ok(lists) => {
                    fetched.extend(lists.into_iter().map(|list| MailingList {
                        address: ListAddress::new(list.address),
                        name: list.name,
                        description: list.description,
                        backend: name.clone(),
                        locale: list.locale,
                        subscriber_delta: 0,
                        warn_every: self.warn_every,
                    }));
                }
                Err(e) => {
                    error!(backend = %name, error = %e, "list fetch failed; keeping previous lists");
                    fetched.extend(
                        self.registry
                            .all()
                            .into_iter()
                            .filter(|list| &list.backend == name),
                    );
                }
            }
        }

        if !self.list_filter.is_empty() {
            fetched.retain(|list| self.list_filter.contains(&list.address));
        }
        self.registry.replace_all(fetched);
    }
}

/// Maps an action to the token kind confirming it.
fn confirm_kind(action: Action) -> TokenKind {
    match action {
        Action::Subscribe => TokenKind::SubscribeConfirm,
        Action::Unsubscribe => TokenKind::UnsubscribeConfirm,
    }
}

/// The running pipeline: shared services plus the four worker tasks.
pub struct Pipeline {
    services: Arc<Services>,
    queues: ActionQueues,
    shutdown: CancellationToken,
    workers: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Pipeline {
    /// Spawns the per-action workers and returns the running pipeline.
    pub fn start(services: Arc<Services>, queue_capacity: usize) -> Self {
        let (queues, receivers) = action_queues(queue_capacity);
        let shutdown = CancellationToken::new();
        let workers = worker::spawn_workers(Arc::clone(&services), receivers, shutdown.clone());
        Pipeline {
            services,
            queues,
            shutdown,
            workers: std::sync::Mutex::new(workers),
        }
    }

    /// Returns the shared services (for background refresh/prune tasks).
    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    /// Issues or reuses a CSRF token for `ip`.
    pub fn csrf_token(&self, ip: IpAddr) -> TokenKey {
        self.services.csrf.issue_or_reuse(ip)
    }

    /// Handles a form submission from `ip`, returning its terminal outcome.
    ///
    /// The abuse gates run inline; everything that does I/O runs on the
    /// action's worker while this call awaits the reply.
    pub async fn submit(&self, action: Action, submission: Submission, ip: IpAddr) -> SubmitOutcome {
        if !self.services.limiter.admit(ip) {
            warn!(%ip, action = %action, "submission rejected by rate limiter");
            return SubmitOutcome::RateLimited;
        }
        if !self.services.csrf.validate(&submission.csrf_token, ip) {
            warn!(%ip, action = %action, "submission rejected by CSRF gate");
            return SubmitOutcome::CsrfRejected;
        }
        if validate::honeypot_triggered(&submission.website) {
            warn!(%ip, action = %action, "honeypot field filled; dropping submission");
            return SubmitOutcome::InvalidRequest;
        }
        if !validate::is_valid_email(&submission.email) {
            debug!(action = %action, "malformed subscriber address");
            return SubmitOutcome::InvalidRequest;
        }
        if self.services.registry.get(&submission.list).is_none() {
            debug!(list = %submission.list, "submission for unknown list");
            return SubmitOutcome::InvalidRequest;
        }

        let (reply, rx) = oneshot::channel();
        let job = SubmitJob {
            request: SubmitRequest {
                email: submission.email,
                name: submission.name,
                list: submission.list,
            },
            reply,
        };
        match self.queues.enqueue_submit(action, job) {
            Ok(()) => {}
            Err(EnqueueError::Full) => return SubmitOutcome::QueueFull,
            Err(EnqueueError::Closed) => return SubmitOutcome::Internal,
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => SubmitOutcome::Internal,
        }
    }

    /// Handles a confirmation-link visit, returning its terminal outcome.
    pub async fn confirm(&self, key: TokenKey) -> ConfirmOutcome {
        // Route by token type without consuming; the consume itself happens
        // on the worker, where its atomicity settles concurrent visits.
        let action = if self
            .services
            .tokens
            .peek(&key, Some(TokenKind::SubscribeConfirm))
            .is_some()
        {
            Action::Subscribe
        } else if self
            .services
            .tokens
            .peek(&key, Some(TokenKind::UnsubscribeConfirm))
            .is_some()
        {
            Action::Unsubscribe
        } else {
            return ConfirmOutcome::TokenInvalid;
        };

        let (reply, rx) = oneshot::channel();
        match self.queues.enqueue_confirm(action, ConfirmJob { key, reply }) {
            Ok(()) => {}
            Err(EnqueueError::Full) => return ConfirmOutcome::QueueFull,
            Err(EnqueueError::Closed) => return ConfirmOutcome::Internal,
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => ConfirmOutcome::Internal,
        }
    }

    /// Signals the workers to stop and waits for them to finish their
    /// current job. Queued jobs that were not started are dropped; their
    /// submitters observe an internal error, not silence.
    pub async fn shutdown(&self) {
        info!("shutting down pipeline workers");
        self.shutdown.cancel();
        let workers = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(|e| e.into_inner()),
        );
        for handle in workers {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RateLimitConfig, TokenTtl};
    use crate::notify::OutboundEmail;
    use crate::test_utils::{MemoryBackend, MemoryMailer};
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::Ordering;

    const LIST: &str = "users@example.org";

    struct Harness {
        pipeline: Pipeline,
        backend: Arc<MemoryBackend>,
        mailer: Arc<MemoryMailer>,
    }

    async fn harness() -> Harness {
        harness_with(RateLimitConfig::default(), 100).await
    }

    async fn harness_with(rate_limit: RateLimitConfig, warn_every: u64) -> Harness {
        let backend = Arc::new(MemoryBackend::with_list(LIST));
        let mailer = Arc::new(MemoryMailer::default());
        let tokens = Arc::new(TokenStore::new(TokenTtl::default()));

        let services = Arc::new(Services {
            tokens: Arc::clone(&tokens),
            limiter: Arc::new(RateLimiter::new(rate_limit)),
            csrf: CsrfGate::new(Arc::clone(&tokens)),
            registry: Arc::new(ListRegistry::new()),
            backends: HashMap::from([(
                BackendName::new("mem"),
                Arc::clone(&backend) as Arc<dyn MailingListBackend>,
            )]),
            mailer: Arc::clone(&mailer) as Arc<dyn Mailer>,
            public_url: "https://lists.example.org".to_string(),
            operator_email: Some("ops@example.org".to_string()),
            warn_every,
            list_filter: Vec::new(),
        });
        services.refresh_registry().await;

        Harness {
            pipeline: Pipeline::start(services, 10),
            backend,
            mailer,
        }
    }

    fn ip() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))
    }

    fn submission(pipeline: &Pipeline, email: &str) -> Submission {
        Submission {
            email: email.to_string(),
            name: Some("Ada".to_string()),
            list: ListAddress::new(LIST),
            csrf_token: pipeline.csrf_token(ip()),
            website: String::new(),
        }
    }

    /// Pulls the token key out of the confirmation URL in a sent mail.
    fn token_in(mail: &OutboundEmail) -> TokenKey {
        let key = mail
            .text
            .split("token=")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .expect("invitation contains a confirmation URL");
        TokenKey::new(key)
    }

    // ─── Intake gates ───

    #[tokio::test]
    async fn csrf_mismatch_is_rejected_before_any_state() {
        let h = harness().await;
        let mut submission = submission(&h.pipeline, "a@example.org");
        submission.csrf_token = TokenKey::new("forged");

        let outcome = h.pipeline.submit(Action::Subscribe, submission, ip()).await;
        assert_eq!(outcome, SubmitOutcome::CsrfRejected);
        assert_eq!(h.mailer.sent_count(), 0);
    }

    #[tokio::test]
    async fn honeypot_content_is_rejected() {
        let h = harness().await;
        let mut submission = submission(&h.pipeline, "a@example.org");
        submission.website = "https://spam.example".to_string();

        let outcome = h.pipeline.submit(Action::Subscribe, submission, ip()).await;
        assert_eq!(outcome, SubmitOutcome::InvalidRequest);
    }

    #[tokio::test]
    async fn malformed_email_is_rejected() {
        let h = harness().await;
        let submission = submission(&h.pipeline, "a..b@example.org");

        let outcome = h.pipeline.submit(Action::Subscribe, submission, ip()).await;
        assert_eq!(outcome, SubmitOutcome::InvalidRequest);
    }

    #[tokio::test]
    async fn unknown_list_is_rejected() {
        let h = harness().await;
        let mut submission = submission(&h.pipeline, "a@example.org");
        submission.list = ListAddress::new("ghost@example.org");

        let outcome = h.pipeline.submit(Action::Subscribe, submission, ip()).await;
        assert_eq!(outcome, SubmitOutcome::InvalidRequest);
    }

    #[tokio::test]
    async fn over_ceiling_submission_is_rate_limited() {
        let h = harness_with(
            RateLimitConfig {
                max_requests: 1,
                window: std::time::Duration::from_secs(3600),
            },
            100,
        )
        .await;

        let first = submission(&h.pipeline, "a@example.org");
        let second = submission(&h.pipeline, "a@example.org");
        assert_eq!(
            h.pipeline.submit(Action::Subscribe, first, ip()).await,
            SubmitOutcome::ConfirmationSent
        );
        assert_eq!(
            h.pipeline.submit(Action::Subscribe, second, ip()).await,
            SubmitOutcome::RateLimited
        );
    }

    // ─── Duplicate checks ───

    #[tokio::test]
    async fn subscribe_short_circuits_when_already_member() {
        let h = harness().await;
        h.backend.add_member(LIST, "a@example.org");

        let outcome = h
            .pipeline
            .submit(Action::Subscribe, submission(&h.pipeline, "a@example.org"), ip())
            .await;
        assert_eq!(outcome, SubmitOutcome::AlreadySubscribed);
        assert_eq!(h.mailer.sent_count(), 0);
    }

    #[tokio::test]
    async fn unsubscribe_short_circuits_when_not_member() {
        let h = harness().await;

        let outcome = h
            .pipeline
            .submit(Action::Unsubscribe, submission(&h.pipeline, "a@example.org"), ip())
            .await;
        assert_eq!(outcome, SubmitOutcome::NotSubscribed);
        assert_eq!(h.mailer.sent_count(), 0);
    }

    #[tokio::test]
    async fn pending_confirmation_suppresses_second_email() {
        let h = harness().await;

        let first = h
            .pipeline
            .submit(Action::Subscribe, submission(&h.pipeline, "a@example.org"), ip())
            .await;
        let second = h
            .pipeline
            .submit(Action::Subscribe, submission(&h.pipeline, "a@example.org"), ip())
            .await;

        assert_eq!(first, SubmitOutcome::ConfirmationSent);
        assert_eq!(second, SubmitOutcome::ConfirmationPending);
        assert_eq!(h.mailer.sent_count(), 1);
    }

    #[tokio::test]
    async fn membership_lookup_failure_is_surfaced() {
        let h = harness().await;
        h.backend.fail_reads.store(true, Ordering::SeqCst);

        let outcome = h
            .pipeline
            .submit(Action::Subscribe, submission(&h.pipeline, "a@example.org"), ip())
            .await;
        assert!(matches!(outcome, SubmitOutcome::BackendFailed(_)));
    }

    // ─── Invitation email policy ───

    #[tokio::test]
    async fn failed_invitation_is_reported_and_token_stays_live() {
        let h = harness().await;
        h.mailer.fail_sends.store(true, Ordering::SeqCst);

        let outcome = h
            .pipeline
            .submit(Action::Subscribe, submission(&h.pipeline, "a@example.org"), ip())
            .await;
        assert!(matches!(outcome, SubmitOutcome::EmailFailed(_)));

        // Policy: the issued token stays live until expiry, so a retry
        // surfaces the pending state instead of issuing a second token.
        h.mailer.fail_sends.store(false, Ordering::SeqCst);
        let retry = h
            .pipeline
            .submit(Action::Subscribe, submission(&h.pipeline, "a@example.org"), ip())
            .await;
        assert_eq!(retry, SubmitOutcome::ConfirmationPending);
    }

    // ─── Confirmation ───

    #[tokio::test]
    async fn backend_failure_on_confirm_consumes_the_token() {
        let h = harness().await;
        h.pipeline
            .submit(Action::Subscribe, submission(&h.pipeline, "a@example.org"), ip())
            .await;
        let key = token_in(&h.mailer.sent()[0]);

        h.backend.fail_changes.store(true, Ordering::SeqCst);
        let outcome = h.pipeline.confirm(key.clone()).await;
        assert!(matches!(outcome, ConfirmOutcome::BackendFailed { .. }));

        // The token was consumed; the flow must be restarted from the form.
        h.backend.fail_changes.store(false, Ordering::SeqCst);
        assert_eq!(h.pipeline.confirm(key).await, ConfirmOutcome::TokenInvalid);
        assert!(!h.backend.is_member(LIST, "a@example.org"));
    }

    #[tokio::test]
    async fn milestone_warning_reaches_the_operator() {
        let h = harness_with(RateLimitConfig::default(), 1).await;
        h.pipeline
            .submit(Action::Subscribe, submission(&h.pipeline, "a@example.org"), ip())
            .await;
        let key = token_in(&h.mailer.sent()[0]);

        let outcome = h.pipeline.confirm(key).await;
        assert!(matches!(outcome, ConfirmOutcome::Completed { .. }));

        let to_operator: Vec<_> = h
            .mailer
            .sent()
            .into_iter()
            .filter(|mail| mail.to == "ops@example.org")
            .collect();
        assert_eq!(to_operator.len(), 1);
        assert!(to_operator[0].subject.contains(LIST));
    }

    #[tokio::test]
    async fn completion_email_failure_keeps_the_subscription() {
        let h = harness().await;
        h.pipeline
            .submit(Action::Subscribe, submission(&h.pipeline, "a@example.org"), ip())
            .await;
        let key = token_in(&h.mailer.sent()[0]);

        h.mailer.fail_sends.store(true, Ordering::SeqCst);
        let outcome = h.pipeline.confirm(key).await;

        // The membership change was applied; only the notice failed.
        assert!(matches!(outcome, ConfirmOutcome::Completed { .. }));
        assert!(h.backend.is_member(LIST, "a@example.org"));
    }

    // ─── Registry refresh ───

    #[tokio::test]
    async fn refresh_keeps_lists_of_a_failing_backend() {
        let h = harness().await;
        assert_eq!(h.pipeline.services().registry.len(), 1);

        h.backend.fail_reads.store(true, Ordering::SeqCst);
        h.pipeline.services().refresh_registry().await;

        // The provider outage must not un-serve its lists.
        assert_eq!(h.pipeline.services().registry.len(), 1);
    }

    #[tokio::test]
    async fn list_filter_restricts_served_lists() {
        let backend = Arc::new(MemoryBackend::with_lists(vec![
            crate::backend::FetchedList {
                address: "a@example.org".to_string(),
                name: "A".to_string(),
                description: String::new(),
                locale: "en".to_string(),
            },
            crate::backend::FetchedList {
                address: "b@example.org".to_string(),
                name: "B".to_string(),
                description: String::new(),
                locale: "en".to_string(),
            },
        ]));
        let tokens = Arc::new(TokenStore::new(TokenTtl::default()));
        let services = Arc::new(Services {
            tokens: Arc::clone(&tokens),
            limiter: Arc::new(RateLimiter::new(RateLimitConfig::default())),
            csrf: CsrfGate::new(Arc::clone(&tokens)),
            registry: Arc::new(ListRegistry::new()),
            backends: HashMap::from([(
                BackendName::new("mem"),
                backend as Arc<dyn MailingListBackend>,
            )]),
            mailer: Arc::new(MemoryMailer::default()) as Arc<dyn Mailer>,
            public_url: "https://lists.example.org".to_string(),
            operator_email: None,
            warn_every: 100,
            list_filter: vec![ListAddress::new("b@example.org")],
        });

        services.refresh_registry().await;
        assert_eq!(services.registry.len(), 1);
        assert!(services.registry.get(&ListAddress::new("b@example.org")).is_some());
    }
}
