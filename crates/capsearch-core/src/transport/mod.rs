//! Feed transports
//!
//! A transport turns a target identifier into a stream of raw byte chunks.
//! Non-success responses are classified before any byte is parsed.

mod http;
mod replay;

pub use http::HttpTransport;
pub use replay::ReplayTransport;

use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

/// Raw feed chunks, in arrival order
pub type ChunkStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Transport-level failures. Always terminal for the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("unsupported API version (HTTP {0})")]
    UnsupportedVersion(u16),
    #[error("rate limited (HTTP 429)")]
    RateLimited,
    #[error("internal server error (HTTP 500)")]
    InternalError,
    #[error("server is down (HTTP 502)")]
    ServerDown,
    #[error("service unavailable (HTTP 503)")]
    ServiceUnavailable,
    #[error("unknown status code {0}")]
    UnknownStatus(u16),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Classify an HTTP status; `None` means the feed can be read
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200 => None,
            404 | 410 => Some(TransportError::UnsupportedVersion(status)),
            429 => Some(TransportError::RateLimited),
            500 => Some(TransportError::InternalError),
            502 => Some(TransportError::ServerDown),
            503 => Some(TransportError::ServiceUnavailable),
            other => Some(TransportError::UnknownStatus(other)),
        }
    }

    /// Message suitable for showing to the person who ran the search
    pub fn user_message(&self) -> String {
        match self {
            TransportError::UnsupportedVersion(_) => {
                "API version is not supported - this should never happen, please report this"
                    .to_string()
            }
            TransportError::RateLimited => {
                "You have been rate limited - please slow down".to_string()
            }
            TransportError::InternalError => {
                "Internal server error - this is not your fault, please try again".to_string()
            }
            TransportError::ServerDown => {
                "The server is currently down - please wait a minute and try again".to_string()
            }
            TransportError::ServiceUnavailable => {
                "The video finder is currently unavailable. Please check back later.".to_string()
            }
            TransportError::UnknownStatus(code) => {
                format!("Received unknown status code {}", code)
            }
            TransportError::Connection(e) => format!(
                "A connection error occurred while receiving data ({}). Please try again.",
                e
            ),
            TransportError::InvalidRequest(e) => format!("Could not build the request: {}", e),
        }
    }
}

/// Opens the result feed for one target
#[async_trait::async_trait]
pub trait FeedTransport: Send + Sync + 'static {
    async fn open(&self, target: &str) -> Result<ChunkStream, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_taxonomy() {
        assert_eq!(TransportError::from_status(200), None);
        assert_eq!(
            TransportError::from_status(404),
            Some(TransportError::UnsupportedVersion(404))
        );
        assert_eq!(
            TransportError::from_status(410),
            Some(TransportError::UnsupportedVersion(410))
        );
        assert_eq!(
            TransportError::from_status(429),
            Some(TransportError::RateLimited)
        );
        assert_eq!(
            TransportError::from_status(500),
            Some(TransportError::InternalError)
        );
        assert_eq!(
            TransportError::from_status(502),
            Some(TransportError::ServerDown)
        );
        assert_eq!(
            TransportError::from_status(503),
            Some(TransportError::ServiceUnavailable)
        );
        assert_eq!(
            TransportError::from_status(418),
            Some(TransportError::UnknownStatus(418))
        );
    }

    #[test]
    fn test_user_messages_are_distinct() {
        let kinds = [
            TransportError::UnsupportedVersion(410),
            TransportError::RateLimited,
            TransportError::InternalError,
            TransportError::ServerDown,
            TransportError::ServiceUnavailable,
            TransportError::UnknownStatus(418),
        ];
        let mut messages: Vec<_> = kinds.iter().map(|k| k.user_message()).collect();
        messages.sort();
        messages.dedup();
        assert_eq!(messages.len(), kinds.len());
        assert!(TransportError::UnknownStatus(418).user_message().contains("418"));
    }
}
