//! Per-action worker tasks.
//!
//! Exactly one worker drains each action queue, so jobs of the same action
//! type are processed strictly in arrival order and never overlap. Workers
//! observe the shutdown token between dequeues only; an in-flight backend
//! call is never interrupted, because the remote side effect could not be
//! undone anyway.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::types::Action;

use super::Services;
use super::queue::{ActionReceivers, ConfirmJob, SubmitJob};

/// Spawns the four per-action workers.
pub(super) fn spawn_workers(
    services: Arc<Services>,
    receivers: ActionReceivers,
    cancel: CancellationToken,
) -> Vec<JoinHandle<()>> {
    vec![
        tokio::spawn(submit_worker(
            Arc::clone(&services),
            Action::Subscribe,
            receivers.submit_subscribe,
            cancel.clone(),
        )),
        tokio::spawn(submit_worker(
            Arc::clone(&services),
            Action::Unsubscribe,
            receivers.submit_unsubscribe,
            cancel.clone(),
        )),
        tokio::spawn(confirm_worker(
            Arc::clone(&services),
            Action::Subscribe,
            receivers.confirm_subscribe,
            cancel.clone(),
        )),
        tokio::spawn(confirm_worker(
            services,
            Action::Unsubscribe,
            receivers.confirm_unsubscribe,
            cancel,
        )),
    ]
}

async fn submit_worker(
    services: Arc<Services>,
    action: Action,
    mut rx: mpsc::Receiver<SubmitJob>,
    cancel: CancellationToken,
) {
    info!(worker = %format!("{action}-submit"), "worker started");
    loop {
        tokio::select! {
            // Check shutdown before taking another job, never mid-job.
            biased;
            _ = cancel.cancelled() => break,
            job = rx.recv() => match job {
                None => break,
                Some(job) => {
                    let outcome = services.process_submission(action, &job.request).await;
                    // A dropped receiver means the submitter went away;
                    // the work is already done either way.
                    if job.reply.send(outcome).is_err() {
                        debug!(action = %action, "submitter gone before reply");
                    }
                }
            },
        }
    }
    info!(worker = %format!("{action}-submit"), "worker stopped");
}

async fn confirm_worker(
    services: Arc<Services>,
    action: Action,
    mut rx: mpsc::Receiver<ConfirmJob>,
    cancel: CancellationToken,
) {
    info!(worker = %format!("{action}-confirm"), "worker started");
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            job = rx.recv() => match job {
                None => break,
                Some(job) => {
                    let outcome = services.process_confirmation(action, &job.key).await;
                    if job.reply.send(outcome).is_err() {
                        debug!(action = %action, "visitor gone before reply");
                    }
                }
            },
        }
    }
    info!(worker = %format!("{action}-confirm"), "worker stopped");
}
