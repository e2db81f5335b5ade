//! Embedding provider client.
//!
//! Wraps the Cohere embeddings API behind the [`Embedder`] trait. Ingestion
//! embeds chunks in `document` mode and queries embed the question in `query`
//! mode; providers may return mode-tuned vectors.
//!
//! # Retry Strategy
//!
//! Transient errors use exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use crate::config::EmbeddingConfig;

const COHERE_API_BASE: &str = "https://api.cohere.com";

/// Which embedding variant to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedMode {
    /// Embedding of stored content, used at ingest time.
    Document,
    /// Embedding of a search query, used at retrieval time.
    Query,
}

impl EmbedMode {
    fn input_type(self) -> &'static str {
        match self {
            EmbedMode::Document => "search_document",
            EmbedMode::Query => "search_query",
        }
    }
}

/// Capability to embed a batch of texts into fixed-length vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed `texts`, returning one vector per input in input order.
    ///
    /// Every returned vector has length [`dims`](Self::dims); a provider
    /// returning a different length is a fatal configuration error.
    async fn embed(&self, texts: &[String], mode: EmbedMode) -> Result<Vec<Vec<f32>>>;

    /// The fixed vector dimensionality this embedder produces.
    fn dims(&self) -> usize;
}

/// Embedding client for the Cohere API (`POST /v1/embed`).
pub struct CohereEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dims: usize,
    max_retries: u32,
}

impl CohereEmbedder {
    pub fn new(config: &EmbeddingConfig, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build embedding HTTP client")?;

        Ok(Self {
            client,
            base_url: COHERE_API_BASE.to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dims: config.dims,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Embedder for CohereEmbedder {
    async fn embed(&self, texts: &[String], mode: EmbedMode) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "model": self.model,
            "texts": texts,
            "input_type": mode.input_type(),
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(format!("{}/v1/embed", self.base_url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        let vectors = parse_embed_response(&json)?;
                        validate_dims(&vectors, texts.len(), self.dims)?;
                        return Ok(vectors);
                    }

                    // Rate limited or server error: retry.
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err =
                            Some(anyhow::anyhow!("embedding API error {}: {}", status, body_text));
                        continue;
                    }

                    // Client error (not 429): don't retry.
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("embedding API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("embedding failed after retries")))
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

/// Parse the Cohere embeddings response, extracting `embeddings[]` in order.
fn parse_embed_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("invalid embedding response: missing embeddings array"))?;

    let mut vectors = Vec::with_capacity(data.len());
    for item in data {
        let embedding = item
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("invalid embedding response: embedding is not an array"))?;
        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        vectors.push(vec);
    }

    Ok(vectors)
}

/// Check the provider returned one vector per input, each of length `dims`.
fn validate_dims(vectors: &[Vec<f32>], expected_count: usize, dims: usize) -> Result<()> {
    if vectors.len() != expected_count {
        bail!(
            "embedding provider returned {} vectors for {} inputs",
            vectors.len(),
            expected_count
        );
    }
    for v in vectors {
        if v.len() != dims {
            bail!(
                "embedding dimensionality mismatch: provider returned {} dims, collection is configured for {}",
                v.len(),
                dims
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_maps_to_provider_input_type() {
        assert_eq!(EmbedMode::Document.input_type(), "search_document");
        assert_eq!(EmbedMode::Query.input_type(), "search_query");
    }

    #[test]
    fn parses_embeddings_in_order() {
        let json = serde_json::json!({
            "embeddings": [[0.1, 0.2], [0.3, 0.4]],
        });
        let vectors = parse_embed_response(&json).unwrap();
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[test]
    fn missing_embeddings_array_is_an_error() {
        let json = serde_json::json!({ "message": "bad request" });
        assert!(parse_embed_response(&json).is_err());
    }

    #[test]
    fn dimension_mismatch_is_fatal() {
        let vectors = vec![vec![0.1, 0.2, 0.3]];
        assert!(validate_dims(&vectors, 1, 3).is_ok());
        let err = validate_dims(&vectors, 1, 1024).unwrap_err();
        assert!(err.to_string().contains("dimensionality mismatch"));
    }

    #[test]
    fn vector_count_mismatch_is_fatal() {
        let vectors = vec![vec![0.1]];
        assert!(validate_dims(&vectors, 2, 1).is_err());
    }
}
