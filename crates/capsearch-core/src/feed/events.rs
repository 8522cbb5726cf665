//! Protocol events produced while a feed is being parsed

use serde::{Deserialize, Serialize};

use super::types::{AnnouncedItem, ItemKey, LinkEntry, ResultRecord, Verdict};

/// Events emitted by the feed state machine, in record arrival order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProtocolEvent {
    /// Sources the server is going to check, in display order
    #[serde(rename = "announce_items")]
    AnnounceItems { items: Vec<AnnouncedItem> },

    /// A source finished (or was given up on)
    #[serde(rename = "item_result")]
    ItemResult { key: ItemKey, result: ResultRecord },

    /// A link to archived material for a source
    #[serde(rename = "item_link")]
    ItemLink { key: ItemKey, link: LinkEntry },

    /// The feed sent its end-of-results sentinel
    #[serde(rename = "stream_end")]
    StreamEnd { verdict: Verdict },

    /// A line could not be decoded, or broke the protocol in strict mode
    #[serde(rename = "decode_error")]
    DecodeError { raw: String, reason: String },
}

impl ProtocolEvent {
    /// Key of the source this event is about, if any
    pub fn key(&self) -> Option<&ItemKey> {
        match self {
            ProtocolEvent::ItemResult { key, .. } | ProtocolEvent::ItemLink { key, .. } => {
                Some(key)
            }
            ProtocolEvent::AnnounceItems { .. }
            | ProtocolEvent::StreamEnd { .. }
            | ProtocolEvent::DecodeError { .. } => None,
        }
    }
}
