//! # Doc Query CLI (`dq`)
//!
//! The `dq` binary drives the documentation question answering service. All
//! settings come from the environment (`TARGET_URL`, `QDRANT_URL`,
//! `COHERE_API_KEY`, `EMBEDDING_DIMS`, `OPENAI_API_KEY`, ...).
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dq ingest` | Crawl the target site, chunk, embed, and store |
//! | `dq query "<question>"` | Answer a question from the indexed documentation |
//! | `dq serve` | Start the HTTP API server |

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use doc_query::config::Config;
use doc_query::ingest::{self, DEFAULT_PAGE_LIMIT};
use doc_query::rag::{self, DEFAULT_TOP_K};
use doc_query::server::{self, AppState};

/// Doc Query CLI: retrieval-augmented question answering over a
/// documentation website.
#[derive(Parser)]
#[command(
    name = "dq",
    about = "Retrieval-augmented question answering over a documentation website",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the target site and index its content.
    ///
    /// Discovers pages from the configured seed URL (links plus sitemap),
    /// extracts readable text, chunks it with overlap, embeds the chunks,
    /// and upserts them into the Qdrant collection. Re-running is
    /// idempotent for unchanged content.
    Ingest {
        /// Maximum number of pages to process.
        #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
        limit: usize,
    },

    /// Answer a question from the indexed documentation.
    Query {
        /// The question to answer.
        question: String,

        /// Number of context chunks to retrieve.
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },

    /// Start the HTTP API server.
    ///
    /// Binds to `BIND_ADDR` (default `0.0.0.0:8000`) and serves the ingest,
    /// query, and health endpoints.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let state = AppState::from_config(config)?;

    match cli.command {
        Commands::Ingest { limit } => {
            let report = ingest::run_ingest(
                &state.config,
                state.fetcher.as_ref(),
                state.embedder.as_ref(),
                state.store.as_ref(),
                limit,
            )
            .await?;
            println!(
                "Ingested {} pages ({} skipped), {} chunks stored.",
                report.pages_ingested, report.pages_skipped, report.chunks_stored
            );
        }
        Commands::Query { question, top_k } => {
            let outcome = rag::answer_question(
                state.embedder.as_ref(),
                state.store.as_ref(),
                state.llm.as_ref(),
                &question,
                top_k,
            )
            .await?;
            println!("{}", outcome.answer.text);
            if !outcome.answer.sources.is_empty() {
                println!("\nSources:");
                for source in &outcome.answer.sources {
                    println!("  {source}");
                }
            }
        }
        Commands::Serve => {
            server::run_server(state).await?;
        }
    }

    Ok(())
}
