//! Feed protocol state machine
//!
//! Preparation -> Generation -> Verdict, never backwards. The preparation
//! record announces every source; generation records resolve them one by
//! one; the `null` sentinel closes the feed and fixes the verdict.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use super::events::ProtocolEvent;
use super::record::{LinkRecord, ServiceRecord, WireRecord};
use super::types::{AnnouncedItem, ItemKey, LinkEntry, ResultRecord, Verdict};

/// Synthetic error for sources the feed never answered
pub const NO_RESULT_RECEIVED: &str = "Did not receive a result from the server.";

/// Top-level protocol phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the source list
    Preparation,
    /// Receiving per-source results and links
    Generation,
    /// Sentinel received; trailing records are ignored
    Verdict(Verdict),
}

/// Per-source state. Pending -> Resolved happens exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    Resolved(ResultRecord),
}

/// Owned view of one source, in display order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemView {
    pub key: ItemKey,
    pub title: String,
    /// `None` while the source is still pending
    pub result: Option<ResultRecord>,
}

#[derive(Debug)]
struct Item {
    key: ItemKey,
    title: String,
    state: ItemState,
    /// Links that arrived before the source's result
    pending_links: Vec<LinkEntry>,
}

/// Records that break the protocol. Ignored, never fatal.
#[derive(Debug, Error)]
enum Violation {
    #[error("{0} record received before the source list")]
    BeforeAnnouncement(&'static str),
    #[error("second preparation record")]
    SecondAnnouncement,
    #[error("record for unannounced source `{0}`")]
    UnknownKey(ItemKey),
    #[error("duplicate result for source `{0}`")]
    DuplicateResult(ItemKey),
}

/// Interprets decoded records against the current phase
#[derive(Debug)]
pub struct FeedMachine {
    phase: Phase,
    items: Vec<Item>,
    index: HashMap<ItemKey, usize>,
    /// Sources that could still resolve as "found"
    affirmative_remaining: usize,
    /// Surface protocol violations as decode errors
    strict: bool,
}

impl Default for FeedMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedMachine {
    pub fn new() -> Self {
        Self {
            phase: Phase::Preparation,
            items: Vec::new(),
            index: HashMap::new(),
            affirmative_remaining: 0,
            strict: false,
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// False once the sentinel was seen
    pub fn accepts_records(&self) -> bool {
        !matches!(self.phase, Phase::Verdict(_))
    }

    pub fn affirmative_remaining(&self) -> usize {
        self.affirmative_remaining
    }

    pub fn pending_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.state == ItemState::Pending)
            .count()
    }

    pub fn state_of(&self, key: &ItemKey) -> Option<&ItemState> {
        self.index.get(key).map(|&idx| &self.items[idx].state)
    }

    /// Verdict reached, or the one the current counts imply
    pub fn verdict(&self) -> Verdict {
        match self.phase {
            Phase::Verdict(verdict) => verdict,
            Phase::Preparation | Phase::Generation => {
                Verdict::from_count(self.affirmative_remaining)
            }
        }
    }

    pub fn items(&self) -> Vec<ItemView> {
        self.items
            .iter()
            .map(|item| ItemView {
                key: item.key.clone(),
                title: item.title.clone(),
                result: match &item.state {
                    ItemState::Pending => None,
                    ItemState::Resolved(result) => Some(result.clone()),
                },
            })
            .collect()
    }

    /// Apply one decoded record; `raw` is only used to report violations
    pub fn apply(&mut self, record: WireRecord, raw: &str) -> Vec<ProtocolEvent> {
        let mut events = Vec::new();

        let outcome = match (self.phase, record) {
            (Phase::Preparation, WireRecord::Announcement(items)) => {
                self.announce(items, &mut events);
                Ok(())
            }
            (Phase::Preparation, other) => Err(Violation::BeforeAnnouncement(other.kind())),
            (Phase::Generation, WireRecord::Sentinel) => {
                self.enter_verdict(&mut events);
                Ok(())
            }
            (Phase::Generation, WireRecord::Service(record)) => self.resolve(record, &mut events),
            (Phase::Generation, WireRecord::Link(record)) => self.add_link(record, &mut events),
            (Phase::Generation, WireRecord::Announcement(_)) => {
                Err(Violation::SecondAnnouncement)
            }
            (Phase::Verdict(_), other) => {
                trace!("Ignoring trailing {} record after verdict", other.kind());
                Ok(())
            }
        };

        if let Err(violation) = outcome {
            warn!("Protocol violation ignored: {}", violation);
            if self.strict {
                events.push(ProtocolEvent::DecodeError {
                    raw: raw.to_string(),
                    reason: violation.to_string(),
                });
            }
        }

        events
    }

    /// Transport reached end-of-data. Sources still pending get a synthetic
    /// "no result received" result.
    pub fn end_of_stream(&mut self) -> Vec<ProtocolEvent> {
        if let Phase::Verdict(_) = self.phase {
            return Vec::new();
        }
        info!(
            "Feed ended in {:?} with {} of {} sources pending",
            self.phase,
            self.pending_count(),
            self.items.len()
        );
        self.abort(NO_RESULT_RECEIVED)
    }

    /// Resolve every pending source with `message` (transport failure)
    pub fn abort(&mut self, message: &str) -> Vec<ProtocolEvent> {
        let mut events = Vec::new();
        self.resolve_pending(message, &mut events);
        events
    }

    fn announce(&mut self, announced: Vec<AnnouncedItem>, events: &mut Vec<ProtocolEvent>) {
        let mut listed = Vec::with_capacity(announced.len());
        for item in announced {
            if self.index.contains_key(&item.key) {
                continue;
            }
            self.index.insert(item.key.clone(), self.items.len());
            self.items.push(Item {
                key: item.key.clone(),
                title: item.title.clone(),
                state: ItemState::Pending,
                pending_links: Vec::new(),
            });
            listed.push(item);
        }

        self.affirmative_remaining = self.items.len();
        self.phase = Phase::Generation;
        info!("Feed announced {} sources", self.items.len());
        events.push(ProtocolEvent::AnnounceItems { items: listed });
    }

    fn lookup(&self, key: &ItemKey) -> Result<usize, Violation> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| Violation::UnknownKey(key.clone()))
    }

    fn resolve(
        &mut self,
        record: ServiceRecord,
        events: &mut Vec<ProtocolEvent>,
    ) -> Result<(), Violation> {
        let idx = self.lookup(&record.key)?;
        let item = &mut self.items[idx];
        if let ItemState::Resolved(_) = item.state {
            return Err(Violation::DuplicateResult(record.key));
        }

        let mut result = record.result;
        result.links = std::mem::take(&mut item.pending_links);
        self.settle(idx, result, events);
        Ok(())
    }

    fn add_link(
        &mut self,
        record: LinkRecord,
        events: &mut Vec<ProtocolEvent>,
    ) -> Result<(), Violation> {
        let idx = self.lookup(&record.key)?;
        let item = &mut self.items[idx];
        match &mut item.state {
            ItemState::Pending => item.pending_links.push(record.link.clone()),
            ItemState::Resolved(result) => result.links.push(record.link.clone()),
        }

        debug!("Link for {}: {}", record.key, record.link.url);
        events.push(ProtocolEvent::ItemLink {
            key: record.key,
            link: record.link,
        });
        Ok(())
    }

    fn settle(&mut self, idx: usize, result: ResultRecord, events: &mut Vec<ProtocolEvent>) {
        if !result.is_affirmative() {
            self.affirmative_remaining = self.affirmative_remaining.saturating_sub(1);
        }

        let item = &mut self.items[idx];
        debug!(
            "Result for {}: archived={}, error={:?} ({} could still be found)",
            item.key, result.archived, result.error, self.affirmative_remaining
        );
        item.state = ItemState::Resolved(result.clone());
        events.push(ProtocolEvent::ItemResult {
            key: item.key.clone(),
            result,
        });
    }

    fn resolve_pending(&mut self, message: &str, events: &mut Vec<ProtocolEvent>) {
        for idx in 0..self.items.len() {
            if self.items[idx].state != ItemState::Pending {
                continue;
            }
            let mut result = ResultRecord::synthetic_error(message);
            result.links = std::mem::take(&mut self.items[idx].pending_links);
            self.settle(idx, result, events);
        }
    }

    fn enter_verdict(&mut self, events: &mut Vec<ProtocolEvent>) {
        // No results can follow the sentinel
        self.resolve_pending(NO_RESULT_RECEIVED, events);

        let verdict = Verdict::from_count(self.affirmative_remaining);
        info!("Feed verdict: {}", verdict);
        self.phase = Phase::Verdict(verdict);
        events.push(ProtocolEvent::StreamEnd { verdict });
    }
}
