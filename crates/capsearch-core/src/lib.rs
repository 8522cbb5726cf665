//! capsearch-core: incremental archive lookup client
//!
//! Turns the chunked JSON-lines feed of a lookup service into typed protocol
//! events while the answer is still arriving, and manages the lifecycle of a
//! single streaming session.

pub mod config;
pub mod feed;
pub mod session;
pub mod target;
pub mod transport;

pub use config::FinderConfig;
pub use feed::{
    AnnouncedItem, ContentFlags, FeedPipeline, ItemKey, LinkEntry, Phase, ProtocolEvent,
    ResultRecord, Verdict,
};
pub use session::{
    FeedRenderer, SessionController, SessionEnd, SessionError, SessionEvent, SessionHandle,
    SessionSummary,
};
pub use target::extract_video_id;
pub use transport::{FeedTransport, HttpTransport, ReplayTransport, TransportError};
