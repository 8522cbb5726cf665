//! Framer -> decoder -> state machine, one chunk at a time

use std::time::Instant;

use tracing::{debug, info, trace, warn};

use super::events::ProtocolEvent;
use super::framer::{LineFramer, TruncatedRecord};
use super::machine::{FeedMachine, ItemView, Phase};
use super::record::{decode_preparation_record, decode_record};
use super::types::Verdict;

/// Where a feed ended up once input stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedOutcome {
    pub verdict: Verdict,
    /// The sentinel was received before input stopped
    pub complete: bool,
    pub truncated: Option<TruncatedRecord>,
    pub decode_errors: usize,
    pub items: Vec<ItemView>,
}

/// Processes one session's feed synchronously, chunk by chunk
#[derive(Debug)]
pub struct FeedPipeline {
    framer: LineFramer,
    machine: FeedMachine,
    /// When the first chunk was processed
    stream_start: Option<Instant>,
    /// Lines handed to the decoder
    record_count: usize,
    decode_errors: usize,
    truncated: Option<TruncatedRecord>,
}

impl Default for FeedPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedPipeline {
    pub fn new() -> Self {
        Self {
            framer: LineFramer::new(),
            machine: FeedMachine::new(),
            stream_start: None,
            record_count: 0,
            decode_errors: 0,
            truncated: None,
        }
    }

    /// Report protocol violations as `DecodeError` events
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.machine = self.machine.with_strict(strict);
        self
    }

    /// Process a chunk completely and return the events it produced
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ProtocolEvent> {
        self.stream_start.get_or_insert_with(Instant::now);

        let mut events = Vec::new();
        for line in self.framer.feed(chunk) {
            self.process_line(&line, &mut events);
        }
        events
    }

    fn process_line(&mut self, line: &str, events: &mut Vec<ProtocolEvent>) {
        if !self.machine.accepts_records() {
            trace!("Ignoring line after verdict: {} bytes", line.len());
            return;
        }

        self.record_count += 1;
        let decoded = match self.machine.phase() {
            Phase::Preparation => decode_preparation_record(line),
            Phase::Generation | Phase::Verdict(_) => decode_record(line),
        };
        match decoded {
            Ok(record) => {
                debug!("Record #{}: {}", self.record_count, record.kind());
                events.extend(self.machine.apply(record, line));
            }
            Err(e) => {
                self.decode_errors += 1;
                warn!("Failed to decode record #{}: {}", self.record_count, e);
                events.push(ProtocolEvent::DecodeError {
                    raw: line.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Transport signalled end-of-data
    pub fn finish(&mut self) -> Vec<ProtocolEvent> {
        self.truncated = self.framer.finish();
        let events = self.machine.end_of_stream();
        info!(
            "Feed finished after {:?}: {} records, {} bytes, {} decode errors, verdict {}",
            self.stream_start.map(|s| s.elapsed()).unwrap_or_default(),
            self.record_count,
            self.framer.bytes_received(),
            self.decode_errors,
            self.machine.verdict()
        );
        events
    }

    /// Transport failed mid-stream; pending sources get `message`
    pub fn abort(&mut self, message: &str) -> Vec<ProtocolEvent> {
        warn!(
            "Feed aborted after {} records: {}",
            self.record_count, message
        );
        self.framer.finish();
        self.machine.abort(message)
    }

    pub fn outcome(&self) -> FeedOutcome {
        FeedOutcome {
            verdict: self.machine.verdict(),
            complete: !self.machine.accepts_records(),
            truncated: self.truncated,
            decode_errors: self.decode_errors,
            items: self.machine.items(),
        }
    }
}
