//! In-memory [`VectorStore`] implementation for tests.
//!
//! Uses a `Vec` behind `std::sync::RwLock`; search is brute-force cosine
//! similarity over all stored points. Behaves like the real gateway for the
//! invariants that matter: a fixed dimensionality set at collection
//! creation, upsert keyed by point id, and descending-score search results.

use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::Point;

use super::{SearchHit, VectorStore};

#[derive(Default)]
struct Inner {
    dims: Option<usize>,
    points: Vec<Point>,
}

/// In-memory store for tests.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored points.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all stored points, in insertion order.
    pub fn points(&self) -> Vec<Point> {
        self.inner.read().unwrap().points.clone()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn ensure_collection(&self, dims: usize) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        match inner.dims {
            None => {
                inner.dims = Some(dims);
                Ok(())
            }
            Some(existing) if existing == dims => Ok(()),
            Some(existing) => bail!(
                "collection already exists with dimensionality {existing} (configured {dims}); \
                 refusing to reuse it"
            ),
        }
    }

    async fn upsert(&self, points: &[Point]) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let Some(dims) = inner.dims else {
            bail!("collection does not exist");
        };
        for point in points {
            if point.vector.len() != dims {
                bail!(
                    "point vector has {} dims, collection is configured for {}",
                    point.vector.len(),
                    dims
                );
            }
        }
        for point in points {
            inner.points.retain(|p| p.id != point.id);
            inner.points.push(point.clone());
        }
        Ok(())
    }

    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        let inner = self.inner.read().unwrap();
        if inner.dims.is_none() {
            bail!("collection does not exist");
        }

        let mut hits: Vec<SearchHit> = inner
            .points
            .iter()
            .map(|p| SearchHit {
                id: p.id.clone(),
                score: cosine_similarity(vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn health(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PointPayload;

    fn point(id: &str, vector: Vec<f32>, content: &str) -> Point {
        Point {
            id: id.to_string(),
            vector,
            payload: PointPayload {
                content: content.to_string(),
                source_url: format!("https://docs.example/{id}"),
                title: "Doc".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn stored_vector_is_its_own_top_hit() {
        let store = InMemoryStore::new();
        store.ensure_collection(3).await.unwrap();
        store
            .upsert(&[
                point("a", vec![1.0, 0.0, 0.0], "alpha"),
                point("b", vec![0.0, 1.0, 0.0], "beta"),
                point("c", vec![0.7, 0.7, 0.0], "gamma"),
            ])
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn ensure_collection_is_idempotent() {
        let store = InMemoryStore::new();
        store.ensure_collection(4).await.unwrap();
        store.ensure_collection(4).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn differing_dimensionality_is_rejected() {
        let store = InMemoryStore::new();
        store.ensure_collection(1024).await.unwrap();
        let err = store.ensure_collection(1536).await.unwrap_err();
        assert!(err.to_string().contains("dimensionality 1024"));
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let store = InMemoryStore::new();
        store.ensure_collection(2).await.unwrap();
        store.upsert(&[point("a", vec![1.0, 0.0], "v1")]).await.unwrap();
        store.upsert(&[point("a", vec![0.0, 1.0], "v2")]).await.unwrap();

        assert_eq!(store.len(), 1);
        let hits = store.search(&[0.0, 1.0], 1).await.unwrap();
        assert_eq!(hits[0].payload.content, "v2");
    }

    #[tokio::test]
    async fn wrong_vector_length_is_rejected() {
        let store = InMemoryStore::new();
        store.ensure_collection(3).await.unwrap();
        let err = store.upsert(&[point("a", vec![1.0], "short")]).await.unwrap_err();
        assert!(err.to_string().contains("dims"));
    }

    #[tokio::test]
    async fn search_on_missing_collection_fails() {
        let store = InMemoryStore::new();
        assert!(store.search(&[1.0], 3).await.is_err());
    }
}
