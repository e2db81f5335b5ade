//! HTTP API server.
//!
//! Exposes the ingestion and query pipelines over a JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ingest?limit=N` | Start an ingest run; returns a job id immediately |
//! | `GET`  | `/ingest/{id}` | Poll an ingest job's status and report |
//! | `POST` | `/query` | Answer a question from the indexed documentation |
//! | `GET`  | `/health` | Reachability of the vector store and the completion provider |
//!
//! # Error Contract
//!
//! All error responses follow the same schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Query failures always return an explicit error status and message, never
//! a partial answer.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! documentation frontends.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::embedding::{CohereEmbedder, Embedder};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::ingest;
use crate::jobs::{IngestJob, JobRegistry};
use crate::llm::{CompletionProvider, OpenAiCompletions};
use crate::models::{GeneratedAnswer, RetrievedContext};
use crate::rag;
use crate::store::{QdrantStore, VectorStore};

/// Shared application state. All clients are built once at startup and
/// reused across requests.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub fetcher: Arc<dyn Fetcher>,
    pub embedder: Arc<dyn Embedder>,
    pub store: Arc<dyn VectorStore>,
    pub llm: Arc<dyn CompletionProvider>,
    pub jobs: JobRegistry,
}

impl AppState {
    /// Build production state: reqwest-backed fetcher, Cohere embedder,
    /// Qdrant gateway, and OpenAI completions.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let timeout = config.http_timeout_secs;
        let fetcher = Arc::new(HttpFetcher::new(timeout)?);
        let embedder = Arc::new(CohereEmbedder::new(&config.embedding, timeout)?);
        let store = Arc::new(QdrantStore::new(&config.qdrant, timeout)?);
        let llm = Arc::new(OpenAiCompletions::new(&config.completion, timeout)?);

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            embedder,
            store,
            llm,
            jobs: JobRegistry::new(),
        })
    }
}

/// Starts the HTTP server on the configured bind address. Runs until the
/// process is terminated.
pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let bind_addr = state.config.bind_addr.clone();
    let app = router(state);

    info!(%bind_addr, "API server listening");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the application router. Separated from [`run_server`] so tests can
/// drive the API without binding a socket.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ingest", post(handle_start_ingest))
        .route("/ingest/{id}", get(handle_ingest_status))
        .route("/query", post(handle_query))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g. `"bad_request"`, `"not_found"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

/// Maps a query pipeline failure to the most descriptive error code. The
/// pipeline surfaces one error per query; the step that failed is named in
/// the error chain.
fn classify_query_error(err: anyhow::Error) -> AppError {
    let message = format!("{err:#}");
    let code = if message.contains("embedding") {
        "embedding_failed"
    } else if message.contains("search") || message.contains("collection") {
        "vector_store_error"
    } else if message.contains("generation") || message.contains("completion") {
        "generation_failed"
    } else {
        "internal"
    };
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: code.to_string(),
        message,
    }
}

// ============ POST /ingest ============

#[derive(Deserialize)]
struct IngestParams {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct IngestAccepted {
    job_id: String,
    status: String,
    limit: usize,
}

/// Starts an ingest run over the configured target site. Returns
/// immediately with a job id; progress is observable via
/// `GET /ingest/{id}`.
async fn handle_start_ingest(
    State(state): State<AppState>,
    Query(params): Query<IngestParams>,
) -> Result<(StatusCode, Json<IngestAccepted>), AppError> {
    let limit = params.limit.unwrap_or(ingest::DEFAULT_PAGE_LIMIT);
    if limit == 0 {
        return Err(bad_request("limit must be >= 1"));
    }

    let config = state.config.clone();
    let fetcher = state.fetcher.clone();
    let embedder = state.embedder.clone();
    let store = state.store.clone();

    let job_id = state.jobs.spawn(limit, async move {
        ingest::run_ingest(
            &config,
            fetcher.as_ref(),
            embedder.as_ref(),
            store.as_ref(),
            limit,
        )
        .await
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(IngestAccepted {
            job_id,
            status: "accepted".to_string(),
            limit,
        }),
    ))
}

// ============ GET /ingest/{id} ============

async fn handle_ingest_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<IngestJob>, AppError> {
    state
        .jobs
        .get(&id)
        .map(Json)
        .ok_or_else(|| not_found(format!("no ingest job with id: {id}")))
}

// ============ POST /query ============

#[derive(Deserialize)]
struct QueryRequest {
    question: String,
    top_k: Option<usize>,
}

#[derive(Serialize)]
struct QueryResponse {
    query_id: String,
    question: String,
    answer: GeneratedAnswer,
    retrieved_contexts: Vec<RetrievedContext>,
    processing_time_ms: u64,
    status: String,
}

/// Runs the retrieval-augmented answer flow synchronously: embed the
/// question, retrieve the nearest chunks, generate a grounded answer.
async fn handle_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    if request.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    let top_k = request.top_k.unwrap_or(rag::DEFAULT_TOP_K);
    if top_k == 0 {
        return Err(bad_request("top_k must be >= 1"));
    }

    let started = Instant::now();
    let outcome = rag::answer_question(
        state.embedder.as_ref(),
        state.store.as_ref(),
        state.llm.as_ref(),
        &request.question,
        top_k,
    )
    .await
    .map_err(classify_query_error)?;

    Ok(Json(QueryResponse {
        query_id: outcome.answer.query_id.clone(),
        question: request.question,
        answer: outcome.answer,
        retrieved_contexts: outcome.contexts,
        processing_time_ms: started.elapsed().as_millis() as u64,
        status: "success".to_string(),
    }))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    components: HealthComponents,
}

#[derive(Serialize)]
struct HealthComponents {
    vector_store: String,
    generation: String,
}

/// Reports whether the vector store and the completion provider are
/// reachable.
async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let vector_store_ok = state.store.health().await;
    let generation_ok = state.llm.health().await;

    let status = if vector_store_ok && generation_ok {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        components: HealthComponents {
            vector_store: component_status(vector_store_ok),
            generation: component_status(generation_ok),
        },
    })
}

fn component_status(ok: bool) -> String {
    if ok { "ok" } else { "unreachable" }.to_string()
}
