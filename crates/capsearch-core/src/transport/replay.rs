//! Replay transport - serves a captured feed from memory
//!
//! Used by `capsearch --replay` to inspect saved feeds offline, and by tests
//! to drive sessions through fragmentation, failures and hung servers.

use std::path::Path;

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tracing::info;

use super::{ChunkStream, FeedTransport, TransportError};

const DEFAULT_CHUNK_SIZE: usize = 1024;

#[derive(Debug, Clone)]
pub struct ReplayTransport {
    data: Bytes,
    chunk_size: usize,
    /// Returned by `open` instead of a stream
    reject: Option<TransportError>,
    /// Yielded after the last chunk
    fail_with: Option<TransportError>,
    /// Never signal end-of-data after the last chunk
    hold_open: bool,
}

impl ReplayTransport {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            reject: None,
            fail_with: None,
            hold_open: false,
        }
    }

    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        Ok(Self::new(std::fs::read(path)?))
    }

    /// A transport whose request fails before any byte arrives
    pub fn rejecting(err: TransportError) -> Self {
        Self {
            reject: Some(err),
            ..Self::new(Bytes::new())
        }
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    pub fn fail_with(mut self, err: TransportError) -> Self {
        self.fail_with = Some(err);
        self
    }

    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }
}

#[async_trait::async_trait]
impl FeedTransport for ReplayTransport {
    async fn open(&self, target: &str) -> Result<ChunkStream, TransportError> {
        if let Some(err) = &self.reject {
            return Err(err.clone());
        }
        info!(
            "Replaying {} bytes for {} in {} byte chunks",
            self.data.len(),
            target,
            self.chunk_size
        );

        let mut items: Vec<Result<Bytes, TransportError>> = Vec::new();
        let mut offset = 0;
        while offset < self.data.len() {
            let end = (offset + self.chunk_size).min(self.data.len());
            items.push(Ok(self.data.slice(offset..end)));
            offset = end;
        }
        if let Some(err) = &self.fail_with {
            items.push(Err(err.clone()));
        }

        let chunks = stream::iter(items);
        if self.hold_open {
            Ok(chunks.chain(stream::pending()).boxed())
        } else {
            Ok(chunks.boxed())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replay_chunks() {
        let transport = ReplayTransport::new(&b"null\nnull\n"[..]).chunk_size(4);
        let chunks: Vec<_> = transport.open("x").await.unwrap().collect().await;
        let chunks: Vec<Bytes> = chunks.into_iter().map(Result::unwrap).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), b"null\nnull\n");
    }

    #[tokio::test]
    async fn test_replay_failure_after_data() {
        let transport = ReplayTransport::new(&b"abc"[..])
            .fail_with(TransportError::Connection("reset".to_string()));
        let chunks: Vec<_> = transport.open("x").await.unwrap().collect().await;
        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].is_err());
    }

    #[tokio::test]
    async fn test_rejecting() {
        let transport = ReplayTransport::rejecting(TransportError::RateLimited);
        assert_eq!(
            transport.open("x").await.err(),
            Some(TransportError::RateLimited)
        );
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.jsonl");
        std::fs::write(&path, "{\"a\":\"A\"}\nnull\n").unwrap();
        let transport = ReplayTransport::from_file(&path).unwrap();
        assert_eq!(transport.data.len(), 15);
    }
}
