//! Session events
//!
//! What a subscriber sees: protocol events while the feed is parsed, then
//! exactly one terminal event.

use serde::Serialize;

use crate::feed::{ItemView, ProtocolEvent, Verdict};
use crate::transport::TransportError;

/// How the feed ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEnd {
    /// The end-of-results sentinel was received
    Complete,
    /// Transport ended before the sentinel; pending sources were given up on
    Incomplete,
}

/// Final state of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub target: String,
    pub items: Vec<ItemView>,
    pub verdict: Verdict,
    pub end: SessionEnd,
    /// A half-delivered trailing record was discarded
    pub truncated_record: bool,
    pub decode_errors: usize,
    pub elapsed_ms: u64,
}

impl SessionSummary {
    /// Sources that reported an error (including synthetic ones)
    pub fn errored(&self) -> impl Iterator<Item = &ItemView> {
        self.items
            .iter()
            .filter(|item| item.result.as_ref().is_some_and(|r| r.error.is_some()))
    }

    /// Sources that reported the target as archived
    pub fn archived(&self) -> impl Iterator<Item = &ItemView> {
        self.items
            .iter()
            .filter(|item| item.result.as_ref().is_some_and(|r| r.archived))
    }
}

/// Events delivered to a session subscriber, in feed order
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Protocol(ProtocolEvent),
    /// Terminal: the transport ended (normally or early)
    Finished(SessionSummary),
    /// Terminal: the transport failed
    Failed(TransportError),
}

impl SessionEvent {
    pub fn is_terminal(&self) -> bool {
        match self {
            SessionEvent::Protocol(_) => false,
            SessionEvent::Finished(_) | SessionEvent::Failed(_) => true,
        }
    }
}

/// Consumer of session events (terminal UI, JSON writer, ...)
pub trait FeedRenderer {
    fn render(&mut self, event: &SessionEvent);
}
