//! Streaming lookup sessions
//!
//! One session per query: the controller owns the transport stream, the
//! subscriber owns a [`SessionHandle`] and receives [`SessionEvent`]s.

mod cancellation;
mod controller;
mod events;

pub use cancellation::SessionCancellation;
pub use controller::{SessionController, SessionError, SessionHandle};
pub use events::{FeedRenderer, SessionEnd, SessionEvent, SessionSummary};
