use std::io::Result as IoResult;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Query, Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::{Next, from_fn};
use axum::response::{IntoResponse as _, Response};
use axum::routing::get;
use axum::{Json, Router};
use embedgraph_core::{ChunkSimilarity, TextChunk};
use embedgraph_store::{Store, StoreError};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// Envelope around every API payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request succeeded
    pub success: bool,
    /// Payload on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Message on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn failure(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// A chunk as drawn in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Chunk id
    pub id: i64,
    /// Chunk text
    pub text: String,
    /// Position in the document
    pub index: usize,
    /// Short topic label
    pub summary: String,
}

/// A similarity record as drawn in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
    /// Id of the first chunk
    pub source: i64,
    /// Id of the second chunk
    pub target: i64,
    /// Euclidean distance
    pub distance: f64,
    /// Cosine similarity
    pub similarity: f64,
}

/// Nodes and links of the similarity graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    /// One node per chunk
    pub nodes: Vec<GraphNode>,
    /// One link per similarity record that passed the filter
    pub links: Vec<GraphLink>,
}

#[derive(Debug, Deserialize)]
struct GraphParams {
    min_similarity: Option<String>,
}

#[derive(Clone)]
struct AppState {
    db_path: Arc<PathBuf>,
}

/// Project chunks and already filtered similarity records into a graph.
pub fn build_graph(chunks: Vec<TextChunk>, similarities: Vec<ChunkSimilarity>) -> GraphData {
    let nodes = chunks
        .into_iter()
        .map(|chunk| GraphNode {
            id: chunk.id.unwrap_or_default(),
            text: chunk.text,
            index: chunk.chunk_index,
            summary: chunk.summary,
        })
        .collect();

    let links = similarities
        .into_iter()
        .map(|record| GraphLink {
            source: record.chunk_id_1,
            target: record.chunk_id_2,
            distance: record.distance,
            similarity: record.similarity,
        })
        .collect();

    GraphData { nodes, links }
}

/// Threshold from the raw query value; missing or unparsable means 0.
fn parse_min_similarity(raw: Option<&str>) -> f64 {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| !value.is_nan())
        .unwrap_or(0.0)
}

/// Routes of the query API over the database at `db_path`.
pub fn router(db_path: PathBuf) -> Router {
    let state = AppState {
        db_path: Arc::new(db_path),
    };

    Router::new()
        .route("/api/chunks", get(chunks_handler))
        .route("/api/similarities", get(similarities_handler))
        .route("/api/graph", get(graph_handler))
        .route("/healthz", get(healthz))
        .layer(from_fn(cors))
        .with_state(state)
}

/// Serve the query API until the process is stopped.
///
/// # Errors
/// Returns an error if the address cannot be bound
pub async fn serve(db_path: PathBuf, address: SocketAddr) -> IoResult<()> {
    let listener = TcpListener::bind(address).await?;
    tracing::info!(
        "Serving {} on http://{}",
        db_path.display(),
        listener.local_addr()?
    );
    axum::serve(listener, router(db_path)).await
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn chunks_handler(State(state): State<AppState>) -> Response {
    respond(load_chunks(&state.db_path).await)
}

async fn similarities_handler(State(state): State<AppState>) -> Response {
    respond(load_similarities(&state.db_path).await)
}

async fn graph_handler(
    State(state): State<AppState>,
    Query(params): Query<GraphParams>,
) -> Response {
    let min_similarity = parse_min_similarity(params.min_similarity.as_deref());
    respond(load_graph(&state.db_path, min_similarity).await)
}

async fn load_chunks(db_path: &Path) -> Result<Vec<TextChunk>, StoreError> {
    let store = Store::open(db_path).await?;
    let chunks = store.all_chunks().await;
    store.close().await;
    chunks
}

async fn load_similarities(db_path: &Path) -> Result<Vec<ChunkSimilarity>, StoreError> {
    let store = Store::open(db_path).await?;
    let similarities = store.all_similarities().await;
    store.close().await;
    similarities
}

async fn load_graph(db_path: &Path, min_similarity: f64) -> Result<GraphData, StoreError> {
    let store = Store::open(db_path).await?;
    let graph = query_graph(&store, min_similarity).await;
    store.close().await;
    graph
}

async fn query_graph(store: &Store, min_similarity: f64) -> Result<GraphData, StoreError> {
    let chunks = store.all_chunks().await?;
    let similarities = store.similarities_at_least(min_similarity).await?;
    Ok(build_graph(chunks, similarities))
}

fn respond<T: Serialize>(result: Result<T, StoreError>) -> Response {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::ok(data))).into_response(),
        Err(err) => {
            tracing::error!("Query failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::failure(err.to_string())),
            )
                .into_response()
        }
    }
}

async fn cors(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };
    add_cors_headers(response.headers_mut());
    response
}

fn add_cors_headers(headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
}
