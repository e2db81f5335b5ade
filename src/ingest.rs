//! Ingestion pipeline orchestration.
//!
//! Coordinates the full ingest flow: crawl → extract → chunk → embed →
//! upsert. Per-URL failures (fetch, extraction, embedding) are logged and
//! skipped so one bad page never aborts the run; vector store failures
//! propagate, since every subsequent page would hit the same error.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::crawl;
use crate::embedding::{EmbedMode, Embedder};
use crate::extract::extract_document;
use crate::fetch::Fetcher;
use crate::models::{Point, PointPayload};
use crate::store::VectorStore;

/// Default page cap for an ingest run.
pub const DEFAULT_PAGE_LIMIT: usize = 10;

/// Counters describing a completed ingest run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub urls_discovered: usize,
    pub pages_ingested: usize,
    pub pages_skipped: usize,
    pub chunks_stored: usize,
}

/// Run one ingest pass over the configured target site, capped at `limit`
/// pages.
///
/// # Errors
///
/// Fails when the collection cannot be ensured, when no URLs are discovered
/// (nothing to ingest), or when the vector store rejects an upsert. Per-page
/// fetch, extraction, and embedding failures are logged and counted as
/// skipped instead.
pub async fn run_ingest(
    config: &Config,
    fetcher: &dyn Fetcher,
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    limit: usize,
) -> Result<IngestReport> {
    store
        .ensure_collection(config.embedding.dims)
        .await
        .context("ensuring the vector collection failed")?;

    let mut urls = crawl::discover_urls(fetcher, &config.target_url).await;
    if urls.is_empty() {
        bail!(
            "no URLs discovered from {}; nothing to ingest",
            config.target_url
        );
    }
    let urls_discovered = urls.len();
    urls.truncate(limit);

    info!(
        target = %config.target_url,
        discovered = urls_discovered,
        processing = urls.len(),
        "starting ingest run"
    );

    let mut report = IngestReport {
        urls_discovered,
        ..Default::default()
    };

    for url in &urls {
        let page = match fetcher.fetch(url).await {
            Ok(page) if page.is_success() => page,
            Ok(page) => {
                warn!(url, status = page.status, "page fetch failed, skipping");
                report.pages_skipped += 1;
                continue;
            }
            Err(err) => {
                warn!(url, error = %format!("{err:#}"), "page fetch failed, skipping");
                report.pages_skipped += 1;
                continue;
            }
        };

        let Some(doc) = extract_document(url, &page.bytes) else {
            debug!(url, "no content extracted, skipping");
            report.pages_skipped += 1;
            continue;
        };

        let chunks = chunk_text(
            &doc.url,
            &doc.title,
            &doc.text,
            config.chunking.size,
            config.chunking.overlap,
        )?;
        if chunks.is_empty() {
            report.pages_skipped += 1;
            continue;
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = match embedder.embed(&texts, EmbedMode::Document).await {
            Ok(vectors) => vectors,
            Err(err) => {
                warn!(url, error = %format!("{err:#}"), "embedding failed, skipping page");
                report.pages_skipped += 1;
                continue;
            }
        };

        let points: Vec<Point> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| Point {
                id: chunk.id,
                vector,
                payload: PointPayload {
                    content: chunk.text,
                    source_url: chunk.document_url,
                    title: chunk.title,
                },
            })
            .collect();

        let stored = points.len();
        store
            .upsert(&points)
            .await
            .with_context(|| format!("storing points for {url} failed"))?;

        report.pages_ingested += 1;
        report.chunks_stored += stored;
        debug!(url, chunks = stored, "page ingested");
    }

    info!(
        pages = report.pages_ingested,
        skipped = report.pages_skipped,
        chunks = report.chunks_stored,
        "ingest run finished"
    );

    Ok(report)
}
