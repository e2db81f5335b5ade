//! Qdrant REST gateway.
//!
//! Talks to Qdrant's HTTP API with a shared reqwest client: collection
//! creation (`PUT /collections/{name}`), point upsert
//! (`PUT /collections/{name}/points`), and similarity search
//! (`POST /collections/{name}/points/search`). The optional API key is sent
//! in the `api-key` header.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use tracing::info;

use crate::config::QdrantConfig;
use crate::models::{Point, PointPayload};

use super::{SearchHit, VectorStore};

pub struct QdrantStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
}

impl QdrantStore {
    pub fn new(config: &QdrantConfig, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build vector store HTTP client")?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            collection: config.collection.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            builder = builder.header("api-key", key);
        }
        builder
    }

    fn collection_path(&self, suffix: &str) -> String {
        format!("/collections/{}{}", self.collection, suffix)
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self, dims: usize) -> Result<()> {
        let response = self
            .request(Method::GET, &self.collection_path(""))
            .send()
            .await
            .context("vector store unreachable")?;

        match response.status() {
            status if status.is_success() => {
                let json: serde_json::Value = response.json().await?;
                let existing = json
                    .pointer("/result/config/params/vectors/size")
                    .and_then(|v| v.as_u64());
                match existing {
                    Some(size) if size == dims as u64 => Ok(()),
                    Some(size) => bail!(
                        "collection '{}' already exists with dimensionality {} (configured {}); \
                         refusing to reuse it",
                        self.collection,
                        size,
                        dims
                    ),
                    None => bail!(
                        "collection '{}' exists but its vector configuration could not be read",
                        self.collection
                    ),
                }
            }
            StatusCode::NOT_FOUND => {
                let body = serde_json::json!({
                    "vectors": { "size": dims, "distance": "Cosine" },
                });
                let response = self
                    .request(Method::PUT, &self.collection_path(""))
                    .json(&body)
                    .send()
                    .await
                    .context("collection creation request failed")?;
                let status = response.status();
                if !status.is_success() {
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("creating collection failed with {}: {}", status, body_text);
                }
                info!(collection = %self.collection, dims, "created vector collection");
                Ok(())
            }
            status => {
                let body_text = response.text().await.unwrap_or_default();
                bail!("vector store error {}: {}", status, body_text);
            }
        }
    }

    async fn upsert(&self, points: &[Point]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let body = serde_json::json!({
            "points": points
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "id": p.id,
                        "vector": p.vector,
                        "payload": p.payload,
                    })
                })
                .collect::<Vec<_>>(),
        });

        let response = self
            .request(Method::PUT, &format!("{}?wait=true", self.collection_path("/points")))
            .json(&body)
            .send()
            .await
            .context("point upsert request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("point upsert failed with {}: {}", status, body_text);
        }
        Ok(())
    }

    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        let body = serde_json::json!({
            "vector": vector,
            "limit": top_k,
            "with_payload": true,
        });

        let response = self
            .request(Method::POST, &self.collection_path("/points/search"))
            .json(&body)
            .send()
            .await
            .context("vector search request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("vector search failed with {}: {}", status, body_text);
        }

        let json: serde_json::Value = response
            .json()
            .await
            .context("reading search response failed")?;
        parse_search_response(&json)
    }

    async fn health(&self) -> bool {
        let resp = self.request(Method::GET, "/collections").send().await;
        matches!(resp, Ok(r) if r.status().is_success())
    }
}

/// Parse Qdrant's search response into hits, preserving the store's order.
fn parse_search_response(json: &serde_json::Value) -> Result<Vec<SearchHit>> {
    let results = json
        .get("result")
        .and_then(|r| r.as_array())
        .ok_or_else(|| anyhow::anyhow!("invalid search response: missing result array"))?;

    let mut hits = Vec::with_capacity(results.len());
    for hit in results {
        // Point ids come back as strings or integers depending on how they
        // were stored.
        let id = match hit.get("id") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => bail!("invalid search response: hit without id"),
        };
        let score = hit.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0) as f32;
        let payload = hit
            .get("payload")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));
        let payload: PointPayload =
            serde_json::from_value(payload).unwrap_or_else(|_| PointPayload {
                content: String::new(),
                source_url: String::new(),
                title: String::new(),
            });
        hits.push(SearchHit { id, score, payload });
    }

    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hits_with_payload_and_score() {
        let json = serde_json::json!({
            "result": [
                {
                    "id": "7f2c1c6e-0000-0000-0000-000000000001",
                    "score": 0.93,
                    "payload": {
                        "content": "chunk text",
                        "source_url": "https://docs.example/guide",
                        "title": "Guide",
                    },
                },
                { "id": 42, "score": 0.5, "payload": {} },
            ],
        });

        let hits = parse_search_response(&json).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].payload.source_url, "https://docs.example/guide");
        assert!((hits[0].score - 0.93).abs() < 1e-6);
        assert_eq!(hits[1].id, "42");
        assert_eq!(hits[1].payload.content, "");
    }

    #[test]
    fn missing_result_array_is_an_error() {
        let json = serde_json::json!({ "status": "error" });
        assert!(parse_search_response(&json).is_err());
    }
}
