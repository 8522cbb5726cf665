//! HTTP transport - streams the lookup service's chunked response body

use std::time::Duration;

use futures::StreamExt;
use tracing::{info, warn};
use url::Url;

use super::{ChunkStream, FeedTransport, TransportError};
use crate::config::FinderConfig;

/// Reads `{base_url}/api/v{N}/youtube/{id}?stream`
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    api_version: u32,
}

impl HttpTransport {
    pub fn new(config: &FinderConfig) -> Result<Self, TransportError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| TransportError::InvalidRequest(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::InvalidRequest(format!(
                "{} cannot be used as a base URL",
                config.base_url
            )));
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_version: config.api_version,
        })
    }

    /// Feed URL for a target
    pub fn feed_url(&self, target: &str) -> Url {
        let version = format!("v{}", self.api_version);
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", version.as_str(), "youtube", target]);
        }
        url.set_query(Some("stream"));
        url
    }
}

#[async_trait::async_trait]
impl FeedTransport for HttpTransport {
    async fn open(&self, target: &str) -> Result<ChunkStream, TransportError> {
        let url = self.feed_url(target);
        info!("Opening feed: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let status = response.status().as_u16();
        if let Some(err) = TransportError::from_status(status) {
            warn!("Feed request rejected: {}", err);
            return Err(err);
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::Connection(e.to_string())));
        Ok(stream.boxed())
    }
}
