//! # Doc Query
//!
//! A retrieval-augmented question answering service for documentation
//! websites.
//!
//! Doc Query crawls a documentation site, extracts readable text, chunks it
//! with overlap, embeds the chunks, and stores them in a Qdrant collection.
//! Questions are answered by embedding the query, retrieving the nearest
//! chunks by cosine similarity, and asking a completion model to answer from
//! those chunks only.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────┐   ┌─────────┐   ┌───────┐   ┌─────────┐   ┌────────┐
//! │  Crawl  │──▶│ Extract │──▶│ Chunk │──▶│  Embed  │──▶│ Qdrant │
//! └─────────┘   └─────────┘   └───────┘   └─────────┘   └───┬────┘
//!                                                           │
//!                                     question ──▶ embed ──▶│ search
//!                                                           ▼
//!                                                    ┌────────────┐
//!                                                    │ Completion │──▶ answer
//!                                                    └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! dq ingest --limit 10          # crawl, chunk, embed, store
//! dq query "How do I install?"  # answer a question
//! dq serve                      # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Environment-sourced configuration |
//! | [`models`] | Core data types |
//! | [`fetch`] | HTTP page fetching abstraction |
//! | [`crawl`] | URL discovery (links + sitemap) |
//! | [`extract`] | HTML to plain text extraction |
//! | [`chunk`] | Overlapping text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`llm`] | Completion provider abstraction |
//! | [`store`] | Vector store gateway (Qdrant, in-memory) |
//! | [`ingest`] | Ingestion pipeline orchestration |
//! | [`jobs`] | Observable ingestion jobs |
//! | [`rag`] | Retrieval-augmented answering |
//! | [`server`] | HTTP API server |

pub mod chunk;
pub mod config;
pub mod crawl;
pub mod embedding;
pub mod extract;
pub mod fetch;
pub mod ingest;
pub mod jobs;
pub mod llm;
pub mod models;
pub mod rag;
pub mod server;
pub mod store;
