//! JSON renderers

use std::io::Write;

use serde_json::json;

use capsearch_core::{FeedRenderer, SessionEvent};

use super::write_line;

/// Prints the final summary (or the failure) as one JSON document
pub struct JsonRenderer<W: Write> {
    out: W,
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> FeedRenderer for JsonRenderer<W> {
    fn render(&mut self, event: &SessionEvent) {
        let document = match event {
            SessionEvent::Protocol(_) => return,
            SessionEvent::Finished(summary) => serde_json::to_value(summary),
            SessionEvent::Failed(err) => Ok(json!({
                "error": err.to_string(),
                "message": err.user_message(),
            })),
        };
        match document.and_then(|doc| serde_json::to_string_pretty(&doc)) {
            Ok(text) => write_line(&mut self.out, &text),
            Err(e) => tracing::warn!("Failed to serialize summary: {}", e),
        }
    }
}

/// Writes every protocol event as a JSON line
pub struct EventLogRenderer<W: Write> {
    out: W,
}

impl<W: Write> EventLogRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> FeedRenderer for EventLogRenderer<W> {
    fn render(&mut self, event: &SessionEvent) {
        let line = match event {
            SessionEvent::Protocol(event) => serde_json::to_string(event),
            SessionEvent::Finished(summary) => serde_json::to_string(&json!({
                "type": "finished",
                "end": summary.end,
                "verdict": summary.verdict,
            })),
            SessionEvent::Failed(err) => serde_json::to_string(&json!({
                "type": "failed",
                "error": err.to_string(),
            })),
        };
        match line {
            Ok(line) => write_line(&mut self.out, &line),
            Err(e) => tracing::warn!("Failed to serialize event: {}", e),
        }
    }
}
