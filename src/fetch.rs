//! Page fetching.
//!
//! The crawler and extractor consume pages through the [`Fetcher`] trait so
//! the pipeline can run against a real HTTP transport in production and a
//! static page map in tests.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

/// The result of fetching one URL.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub status: u16,
    pub bytes: Vec<u8>,
}

impl Fetched {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability to fetch raw page bytes for a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Fetched>;
}

/// HTTP fetcher backed by a shared reqwest client.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Fetched> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("reading response body from {url} failed"))?
            .to_vec();

        Ok(Fetched { status, bytes })
    }
}

/// In-memory fetcher serving a fixed URL-to-body map. Unknown URLs return 404.
///
/// Used by integration tests to exercise the full pipeline without a network.
#[derive(Default)]
pub struct StaticFetcher {
    pages: HashMap<String, Vec<u8>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.pages.insert(url.to_string(), body.into());
        self
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Fetched> {
        match self.pages.get(url) {
            Some(bytes) => Ok(Fetched {
                status: 200,
                bytes: bytes.clone(),
            }),
            None => Ok(Fetched {
                status: 404,
                bytes: Vec::new(),
            }),
        }
    }
}
