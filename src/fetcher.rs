use crate::parser;
use crate::types::{FeedResource, FetchConfig, Post, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Fetch seam for the sync run, so tests can substitute a canned listing.
#[async_trait]
pub trait FetchFeed: Send + Sync {
    async fn fetch_posts(&self, resource: FeedResource) -> Result<Vec<Post>>;
}

/// One-shot listing fetch. Reads a single page of the remote listing at
/// call time; no retry and no pagination loop, since retry policy belongs
/// to the caller, and the listing's own order is the chronological contract.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { client, config })
    }

    fn listing_url(&self, resource: FeedResource) -> String {
        format!("{}/{}.json?raw_json=1", self.config.base_url, resource)
    }
}

#[async_trait]
impl FetchFeed for Fetcher {
    async fn fetch_posts(&self, resource: FeedResource) -> Result<Vec<Post>> {
        let url = self.listing_url(resource);
        info!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let response = response.error_for_status()?;
        let body = response.text().await?;
        debug!("listing response: {} bytes", body.len());

        parser::parse_listing(&body)
    }
}
