//! Background worker that owns the chat session.
//!
//! The UI never awaits the model. It sends [`WorkerRequest`]s over a bounded
//! channel and drains [`WorkerResponse`]s on every frame. Events are handled
//! one at a time, in the order they were sent.

use parley_core::{ChatSession, Progress, SessionEvent, SessionView};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Requests from the UI to the worker.
#[derive(Debug)]
pub enum WorkerRequest {
    Event(SessionEvent),
    Shutdown,
}

/// Responses from the worker to the UI.
#[derive(Debug, Clone)]
pub enum WorkerResponse {
    /// A streamed piece of the reply being generated.
    Fragment(String),
    /// The latest session state. `done` is false for the snapshot sent ahead
    /// of a model call and true once the event has been handled.
    View { view: SessionView, done: bool },
    /// The model call failed; the user turn was rolled back.
    Failed { message: String, view: SessionView },
    /// The event was refused and the session is unchanged.
    Rejected(String),
}

impl WorkerResponse {
    /// Whether this response ends the handling of an event.
    pub fn is_final(&self) -> bool {
        match self {
            WorkerResponse::Fragment(_) => false,
            WorkerResponse::View { done, .. } => *done,
            WorkerResponse::Failed { .. } | WorkerResponse::Rejected(_) => true,
        }
    }
}

/// Spawn the worker task. Returns the channel ends and the initial view.
pub fn spawn_worker(
    session: ChatSession,
) -> (
    mpsc::Sender<WorkerRequest>,
    mpsc::Receiver<WorkerResponse>,
    SessionView,
) {
    let (request_tx, request_rx) = mpsc::channel(8);
    let (response_tx, response_rx) = mpsc::channel(64);

    let initial_view = session.view();
    tokio::spawn(worker_loop(session, request_rx, response_tx));

    (request_tx, response_rx, initial_view)
}

async fn worker_loop(
    mut session: ChatSession,
    mut request_rx: mpsc::Receiver<WorkerRequest>,
    response_tx: mpsc::Sender<WorkerResponse>,
) {
    loop {
        match request_rx.recv().await {
            Some(WorkerRequest::Event(event)) => {
                process_event(&mut session, event, &response_tx).await;
            }
            Some(WorkerRequest::Shutdown) | None => {
                debug!("worker shutting down");
                break;
            }
        }
    }
}

async fn process_event(
    session: &mut ChatSession,
    event: SessionEvent,
    response_tx: &mpsc::Sender<WorkerResponse>,
) {
    let variant = session.variant();
    let stream_tx = response_tx.clone();

    let result = session
        .handle(event, |progress| {
            let response = match progress {
                Progress::Snapshot(view) => WorkerResponse::View { view, done: false },
                Progress::Fragment(text) => WorkerResponse::Fragment(text.to_string()),
            };
            // Intermediate updates are best-effort; the final view always follows.
            let _ = stream_tx.try_send(response);
        })
        .await;

    let response = match result {
        Ok(()) => WorkerResponse::View {
            view: session.view(),
            done: true,
        },
        Err(e) if e.is_model_failure() => {
            warn!(error = %e, "model call failed");
            WorkerResponse::Failed {
                message: e.user_message(variant),
                view: session.view(),
            }
        }
        Err(e) => {
            debug!(error = %e, "event rejected");
            WorkerResponse::Rejected(e.user_message(variant))
        }
    };
    let _ = response_tx.send(response).await;
}
