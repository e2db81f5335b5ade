//! Core data models used throughout doc-query.
//!
//! These types represent the documents, chunks, and answers that flow through
//! the ingestion and query pipelines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A fetched, cleaned documentation page.
///
/// Produced once per successfully fetched, non-empty page and immutable
/// after creation.
#[derive(Debug, Clone)]
pub struct Document {
    pub url: String,
    pub title: String,
    pub text: String,
    pub fetched_at: DateTime<Utc>,
}

/// A bounded, overlapping window of a document's normalized text.
///
/// `index` is contiguous and increasing within a document, starting at 0.
/// The id is deterministic (derived from the document URL, chunk index, and
/// chunk text), so re-ingesting the same content upserts in place instead of
/// storing duplicate points.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_url: String,
    pub text: String,
    pub index: usize,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// The payload stored alongside each vector point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointPayload {
    pub content: String,
    pub source_url: String,
    pub title: String,
}

/// The persisted unit in the vector store: one point per chunk.
#[derive(Debug, Clone)]
pub struct Point {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

/// A chunk retrieved for a query, ranked by cosine similarity.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedContext {
    pub id: String,
    pub content: String,
    pub source_url: String,
    pub similarity_score: f32,
    pub title: String,
}

/// The answer produced for a single query. Transient: returned to the
/// caller and not persisted.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedAnswer {
    pub id: String,
    pub text: String,
    pub confidence_score: f32,
    pub sources: Vec<String>,
    /// Advisory groundedness signal: whether the answer appears to be
    /// supported by the retrieved contexts. Never blocks the answer.
    pub grounded: bool,
    pub timestamp: DateTime<Utc>,
    pub query_id: String,
}
