//! Bounded per-action work queues.
//!
//! Slow email/API I/O is decoupled from the request handler by four bounded
//! FIFO queues, one per action type (subscribe, unsubscribe, and their
//! confirmations), each drained by exactly one worker. Ordering and
//! non-overlap therefore hold within each action type.
//!
//! A full queue rejects the producer with a retryable error instead of
//! blocking the HTTP handler; a request is never silently dropped. Each job
//! carries a oneshot reply channel so the handler still reports the job's
//! terminal outcome to the submitter.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::types::{Action, ConfirmOutcome, ListAddress, SubmitOutcome, TokenKey};

/// The data of a validated form submission, handed to a submit worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    /// Subscriber address (already shape-validated).
    pub email: String,
    /// Optional display name.
    pub name: Option<String>,
    /// Target list (already known to the registry at intake time).
    pub list: ListAddress,
}

/// A queued form submission with its reply channel.
#[derive(Debug)]
pub struct SubmitJob {
    /// The validated request.
    pub request: SubmitRequest,
    /// Channel the worker reports the terminal outcome on.
    pub reply: oneshot::Sender<SubmitOutcome>,
}

/// A queued confirmation-link visit with its reply channel.
#[derive(Debug)]
pub struct ConfirmJob {
    /// The token key from the visited URL. Not yet consumed.
    pub key: TokenKey,
    /// Channel the worker reports the terminal outcome on.
    pub reply: oneshot::Sender<ConfirmOutcome>,
}

/// Why a job could not be enqueued.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnqueueError {
    /// The queue is at capacity; the caller may retry shortly.
    #[error("action queue is full")]
    Full,

    /// The worker is gone (shutdown in progress).
    #[error("action queue is closed")]
    Closed,
}

/// Producer halves of the four action queues.
#[derive(Clone)]
pub struct ActionQueues {
    submit_subscribe: mpsc::Sender<SubmitJob>,
    submit_unsubscribe: mpsc::Sender<SubmitJob>,
    confirm_subscribe: mpsc::Sender<ConfirmJob>,
    confirm_unsubscribe: mpsc::Sender<ConfirmJob>,
}

/// Consumer halves of the four action queues, owned by the workers.
pub struct ActionReceivers {
    /// Submit queue receivers, keyed by action.
    pub submit_subscribe: mpsc::Receiver<SubmitJob>,
    /// See `submit_subscribe`.
    pub submit_unsubscribe: mpsc::Receiver<SubmitJob>,
    /// Confirmation queue receivers, keyed by action.
    pub confirm_subscribe: mpsc::Receiver<ConfirmJob>,
    /// See `confirm_subscribe`.
    pub confirm_unsubscribe: mpsc::Receiver<ConfirmJob>,
}

/// Creates the four bounded queues with the given per-queue capacity.
pub fn action_queues(capacity: usize) -> (ActionQueues, ActionReceivers) {
    let (submit_subscribe_tx, submit_subscribe_rx) = mpsc::channel(capacity);
    let (submit_unsubscribe_tx, submit_unsubscribe_rx) = mpsc::channel(capacity);
    let (confirm_subscribe_tx, confirm_subscribe_rx) = mpsc::channel(capacity);
    let (confirm_unsubscribe_tx, confirm_unsubscribe_rx) = mpsc::channel(capacity);

    (
        ActionQueues {
            submit_subscribe: submit_subscribe_tx,
            submit_unsubscribe: submit_unsubscribe_tx,
            confirm_subscribe: confirm_subscribe_tx,
            confirm_unsubscribe: confirm_unsubscribe_tx,
        },
        ActionReceivers {
            submit_subscribe: submit_subscribe_rx,
            submit_unsubscribe: submit_unsubscribe_rx,
            confirm_subscribe: confirm_subscribe_rx,
            confirm_unsubscribe: confirm_unsubscribe_rx,
        },
    )
}

impl ActionQueues {
    /// Enqueues a form submission on the queue for `action`.
    pub fn enqueue_submit(&self, action: Action, job: SubmitJob) -> Result<(), EnqueueError> {
        let sender = match action {
            Action::Subscribe => &self.submit_subscribe,
            Action::Unsubscribe => &self.submit_unsubscribe,
        };
        into_enqueue_result(sender.try_send(job))
    }

    /// Enqueues a confirmation visit on the queue for `action`.
    pub fn enqueue_confirm(&self, action: Action, job: ConfirmJob) -> Result<(), EnqueueError> {
        let sender = match action {
            Action::Subscribe => &self.confirm_subscribe,
            Action::Unsubscribe => &self.confirm_unsubscribe,
        };
        into_enqueue_result(sender.try_send(job))
    }
}

fn into_enqueue_result<T>(result: Result<(), mpsc::error::TrySendError<T>>) -> Result<(), EnqueueError> {
    match result {
        Ok(()) => Ok(()),
        Err(mpsc::error::TrySendError::Full(_)) => Err(EnqueueError::Full),
        Err(mpsc::error::TrySendError::Closed(_)) => Err(EnqueueError::Closed),
    }
}
