//! Session controller
//!
//! Owns the lifecycle of one streaming lookup: opens the transport, pumps
//! chunks through the feed pipeline on a single task and hands events to
//! the subscriber. At most one session runs per controller.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cancellation::SessionCancellation;
use super::events::{FeedRenderer, SessionEnd, SessionEvent, SessionSummary};
use crate::feed::{FeedPipeline, ProtocolEvent};
use crate::transport::FeedTransport;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a lookup for {target} is still running; cancel it first")]
    SessionInFlight { target: String },
}

struct ActiveSession {
    id: u64,
    target: String,
    cancellation: SessionCancellation,
    task: JoinHandle<()>,
}

impl ActiveSession {
    fn is_running(&self) -> bool {
        !self.task.is_finished() && !self.cancellation.is_cancelled()
    }
}

/// Subscriber side of a session
pub struct SessionHandle {
    id: u64,
    target: String,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    cancellation: SessionCancellation,
}

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Next event, or `None` once the session is over or was cancelled
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        if self.cancellation.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => None,
            event = self.events.recv() => event,
        }
    }

    /// Feed every event to `renderer`; returns the terminal event, if any
    pub async fn drive<R: FeedRenderer + ?Sized>(
        &mut self,
        renderer: &mut R,
    ) -> Option<SessionEvent> {
        while let Some(event) = self.next_event().await {
            renderer.render(&event);
            if event.is_terminal() {
                return Some(event);
            }
        }
        None
    }
}

/// Nobody is left to receive events, so the session stops
impl Drop for SessionHandle {
    fn drop(&mut self) {
        if self.cancellation.cancel() {
            debug!("Session #{} handle dropped, cancelling", self.id);
        }
    }
}

/// Starts, tracks and cancels feed sessions
pub struct SessionController<T: FeedTransport> {
    transport: Arc<T>,
    strict: bool,
    active: Option<ActiveSession>,
    /// Cancelled sessions whose tasks may still be unwinding
    retired: Vec<(u64, JoinHandle<()>)>,
    next_id: u64,
}

impl<T: FeedTransport> SessionController<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            strict: false,
            active: None,
            retired: Vec::new(),
            next_id: 0,
        }
    }

    /// Report protocol violations as decode errors
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Whether a session is running and not cancelled
    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(ActiveSession::is_running)
    }

    /// Start a lookup for `target`. Rejected while another one is running.
    pub fn start(&mut self, target: impl Into<String>) -> Result<SessionHandle, SessionError> {
        let target = target.into();
        if let Some(active) = self.active.as_ref().filter(|a| a.is_running()) {
            warn!(
                "Refusing to start {} while session #{} ({}) is running",
                target, active.id, active.target
            );
            return Err(SessionError::SessionInFlight {
                target: active.target.clone(),
            });
        }

        if let Some(previous) = self.active.take() {
            if !previous.task.is_finished() {
                debug!("Session #{} still shutting down", previous.id);
                self.retired.push((previous.id, previous.task));
            }
        }
        self.retired.retain(|(_, task)| !task.is_finished());

        self.next_id += 1;
        let id = self.next_id;
        let cancellation = SessionCancellation::new();
        let (tx, rx) = mpsc::unbounded_channel();

        let session = FeedSession {
            id,
            target: target.clone(),
            pipeline: FeedPipeline::new().with_strict(self.strict),
            tx,
            cancellation: cancellation.clone(),
        };
        let task = tokio::spawn(session.run(Arc::clone(&self.transport)));
        info!("Session #{} started for {}", id, target);

        self.active = Some(ActiveSession {
            id,
            target: target.clone(),
            cancellation: cancellation.clone(),
            task,
        });

        Ok(SessionHandle {
            id,
            target,
            events: rx,
            cancellation,
        })
    }

    /// Cancel the session behind `handle`. Returns false if it already was.
    pub fn cancel(&mut self, handle: &SessionHandle) -> bool {
        let cancelled = handle.cancellation.cancel();
        if cancelled {
            info!("Session #{} cancelled", handle.id);
        }
        cancelled
    }

    /// Wait until every session task has exited and released its transport
    pub async fn join(&mut self) {
        let tasks = self
            .retired
            .drain(..)
            .chain(self.active.take().map(|active| (active.id, active.task)));
        for (id, task) in tasks.collect::<Vec<_>>() {
            if let Err(e) = task.await {
                warn!("Session #{} task failed: {}", id, e);
            }
        }
    }
}

/// State owned by a running session task
struct FeedSession {
    id: u64,
    target: String,
    pipeline: FeedPipeline,
    tx: mpsc::UnboundedSender<SessionEvent>,
    cancellation: SessionCancellation,
}

impl FeedSession {
    async fn run<T: FeedTransport>(mut self, transport: Arc<T>) {
        let started = Instant::now();

        let opened = tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => {
                debug!("Session #{} cancelled before the feed opened", self.id);
                return;
            }
            opened = transport.open(&self.target) => opened,
        };

        // Dropped on every return path below, which releases the transport
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(err) => {
                warn!("Session #{} failed to open feed: {}", self.id, err);
                self.emit(SessionEvent::Failed(err));
                return;
            }
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancellation.cancelled() => {
                    info!("Session #{} releasing feed after cancellation", self.id);
                    return;
                }
                _ = self.tx.closed() => {
                    info!("Session #{} releasing feed, subscriber went away", self.id);
                    return;
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    let events = self.pipeline.feed(&chunk);
                    if !self.dispatch(events) {
                        return;
                    }
                }
                Some(Err(err)) => {
                    warn!("Session #{} transport error: {}", self.id, err);
                    let events = self.pipeline.abort(&err.user_message());
                    if self.dispatch(events) {
                        self.emit(SessionEvent::Failed(err));
                    }
                    return;
                }
                None => {
                    let events = self.pipeline.finish();
                    if self.dispatch(events) {
                        let summary = self.summary(started);
                        info!(
                            "Session #{} finished ({:?}): {}",
                            self.id, summary.end, summary.verdict
                        );
                        self.emit(SessionEvent::Finished(summary));
                    }
                    return;
                }
            }
        }
    }

    fn summary(&self, started: Instant) -> SessionSummary {
        let outcome = self.pipeline.outcome();
        SessionSummary {
            target: self.target.clone(),
            items: outcome.items,
            verdict: outcome.verdict,
            end: if outcome.complete {
                SessionEnd::Complete
            } else {
                SessionEnd::Incomplete
            },
            truncated_record: outcome.truncated.is_some(),
            decode_errors: outcome.decode_errors,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Returns false once nothing more should be sent
    fn dispatch(&self, events: Vec<ProtocolEvent>) -> bool {
        events
            .into_iter()
            .all(|event| self.emit(SessionEvent::Protocol(event)))
    }

    fn emit(&self, event: SessionEvent) -> bool {
        if self.cancellation.is_cancelled() {
            return false;
        }
        if self.tx.send(event).is_err() {
            debug!("Session #{} subscriber went away", self.id);
            return false;
        }
        true
    }
}
