//! Incremental result feed
//!
//! bytes -> [`LineFramer`] -> text lines -> [`decode_record`] -> [`WireRecord`]
//! -> [`FeedMachine`] -> [`ProtocolEvent`]s. [`FeedPipeline`] wires the
//! stages together for one session.

mod events;
mod framer;
mod machine;
mod pipeline;
mod record;
mod types;

pub use events::ProtocolEvent;
pub use framer::{LineFramer, TruncatedRecord};
pub use machine::{FeedMachine, ItemState, ItemView, Phase, NO_RESULT_RECEIVED};
pub use pipeline::{FeedOutcome, FeedPipeline};
pub use record::{decode_preparation_record, decode_record, DecodeError, LinkRecord, ServiceRecord, WireRecord};
pub use types::{AnnouncedItem, ContentFlags, ItemKey, LinkEntry, ResultRecord, Verdict};
