//! Vector store gateway.
//!
//! Defines the [`VectorStore`] trait consumed by the ingestion and query
//! pipelines, with two implementations:
//! - [`qdrant::QdrantStore`]: REST gateway to a Qdrant collection.
//! - [`memory::InMemoryStore`]: brute-force cosine store for tests.
//!
//! The collection's vector dimensionality is fixed at creation time; any
//! later mismatch fails fast rather than being silently tolerated. Upserts
//! are keyed by point id (insert-or-replace) and are not retried internally;
//! retry policy belongs to the caller.

pub mod memory;
pub mod qdrant;

pub use memory::InMemoryStore;
pub use qdrant::QdrantStore;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Point, PointPayload};

/// A hit returned from top-k similarity search, descending by score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub payload: PointPayload,
}

/// Operations the pipelines need from the vector index.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection with cosine similarity if absent. Idempotent;
    /// fails if the collection exists with a different dimensionality.
    async fn ensure_collection(&self, dims: usize) -> Result<()>;

    /// Insert-or-replace points keyed by id.
    async fn upsert(&self, points: &[Point]) -> Result<()>;

    /// Return the `top_k` nearest points by cosine similarity with payloads,
    /// descending by score.
    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>>;

    /// Whether the store is reachable.
    async fn health(&self) -> bool;
}
