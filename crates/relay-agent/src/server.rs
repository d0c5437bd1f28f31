//! The HTTP API in front of the agent.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use relay_agent_core::tool::ToolSummary;
use relay_agent_core::{Agent, AgentError, ChatRequest, ChatResponse};
use relay_agent_retrieval::Metadata;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;

type SharedAgent = Arc<Agent>;

/// Builds the router serving every API route.
pub fn router(agent: SharedAgent) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/chat/rag", post(chat_with_retrieval))
        .route("/api/rag/add", post(add_document))
        .route("/api/rag/import", post(import_documents))
        .route("/api/rag/search", post(search))
        .route("/api/tools", get(list_tools))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(agent)
}

/// An error reply carrying `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request<S: Into<String>>(message: S) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        error!("request failed: {err}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("rejected request body: {rejection}");
        let reason = rejection.body_text();
        Self::bad_request(format!("invalid request body: {reason}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// A JSON body whose rejections are reported as `400 Bad Request`.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
struct JsonBody<T>(T);

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn chat(
    State(agent): State<SharedAgent>,
    JsonBody(req): JsonBody<ChatRequest>,
) -> ApiResult<ChatResponse> {
    debug!(conversation = ?req.conversation_id, "chat request");
    Ok(Json(agent.chat(req).await?))
}

async fn chat_with_retrieval(
    State(agent): State<SharedAgent>,
    JsonBody(req): JsonBody<ChatRequest>,
) -> ApiResult<ChatResponse> {
    debug!(conversation = ?req.conversation_id, "retrieval chat request");
    Ok(Json(agent.chat_with_retrieval(req).await?))
}

#[derive(Deserialize)]
struct AddDocumentRequest {
    #[serde(default)]
    id: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    chunks: Vec<String>,
    #[serde(default)]
    metadata: Metadata,
}

#[derive(Serialize)]
struct DocumentCountResponse {
    success: bool,
    document_count: usize,
}

async fn add_document(
    State(agent): State<SharedAgent>,
    JsonBody(req): JsonBody<AddDocumentRequest>,
) -> ApiResult<DocumentCountResponse> {
    if req.id.is_empty() {
        return Err(ApiError::bad_request("Document ID is required"));
    }
    if !req.chunks.is_empty() {
        agent
            .add_document_chunks(&req.id, req.chunks, req.metadata)
            .await?;
    } else if !req.content.is_empty() {
        agent
            .add_document(&req.id, &req.content, req.metadata)
            .await?;
    } else {
        return Err(ApiError::bad_request("Content or chunks is required"));
    }
    Ok(Json(DocumentCountResponse {
        success: true,
        document_count: agent.document_count()?,
    }))
}

#[derive(Deserialize)]
struct ImportRequest {
    #[serde(default)]
    dir: String,
}

async fn import_documents(
    State(agent): State<SharedAgent>,
    JsonBody(req): JsonBody<ImportRequest>,
) -> ApiResult<DocumentCountResponse> {
    if req.dir.is_empty() {
        return Err(ApiError::bad_request("Directory path is required"));
    }
    info!(dir = %req.dir, "importing documents");
    agent.load_documents_from_dir(&req.dir).await?;
    Ok(Json(DocumentCountResponse {
        success: true,
        document_count: agent.document_count()?,
    }))
}

#[derive(Deserialize)]
struct SearchRequest {
    #[serde(default)]
    query: String,
}

#[derive(Serialize)]
struct SearchHit {
    id: String,
    content: String,
    score: f32,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    metadata: Metadata,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
    count: usize,
}

async fn search(
    State(agent): State<SharedAgent>,
    JsonBody(req): JsonBody<SearchRequest>,
) -> ApiResult<SearchResponse> {
    if req.query.is_empty() {
        return Err(ApiError::bad_request("Query is required"));
    }
    let results: Vec<_> = agent
        .search(&req.query)
        .await?
        .into_iter()
        .map(|result| SearchHit {
            id: result.chunk.id.clone(),
            content: result.chunk.content.clone(),
            score: result.score,
            metadata: result.chunk.metadata.clone(),
        })
        .collect();
    Ok(Json(SearchResponse {
        count: results.len(),
        results,
    }))
}

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolSummary>,
    count: usize,
}

async fn list_tools(
    State(agent): State<SharedAgent>,
) -> Json<ToolListResponse> {
    let tools = agent.list_tools();
    Json(ToolListResponse {
        count: tools.len(),
        tools,
    })
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
