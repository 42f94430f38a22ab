//! Mock backend endpoint handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::state::{MockBackend, Rejection};
use crate::api::models::*;

type Shared = State<Arc<Mutex<MockBackend>>>;
type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorBody>)>;

fn reject(rejection: Rejection) -> (StatusCode, Json<ErrorBody>) {
    let (status, detail) = match rejection {
        Rejection::Invalid(detail) => (StatusCode::UNPROCESSABLE_ENTITY, detail),
        Rejection::Conflict(detail) => (StatusCode::CONFLICT, detail),
        Rejection::NotFound(detail) => (StatusCode::NOT_FOUND, detail),
        Rejection::Forbidden(detail) => (StatusCode::FORBIDDEN, detail),
    };
    (status, Json(ErrorBody { detail }))
}

/// POST /query
pub async fn query(State(backend): Shared, Json(req): Json<QueryRequest>) -> ApiResult<QueryResponse> {
    let mut backend = backend.lock().await;
    backend.answer(req).map(Json).map_err(reject)
}

/// POST /sessions?approach=
pub async fn create_session(
    State(backend): Shared,
    Query(param): Query<ApproachParam>,
) -> Json<SessionCreated> {
    let mut backend = backend.lock().await;
    let created = backend.create_session(param.approach);
    info!(session = %created.session_id, approach = %param.approach, "session created");
    Json(created)
}

/// GET /sessions?approach=
pub async fn list_sessions(
    State(backend): Shared,
    Query(param): Query<ApproachParam>,
) -> Json<SessionList> {
    let backend = backend.lock().await;
    Json(backend.session_list(param.approach))
}

/// GET /sessions/:id?approach=
pub async fn session_history(
    State(backend): Shared,
    Path(id): Path<String>,
    Query(param): Query<ApproachParam>,
) -> ApiResult<SessionHistory> {
    let backend = backend.lock().await;
    backend
        .session_history(&id, param.approach)
        .map(Json)
        .map_err(reject)
}

/// POST /clear-session
pub async fn clear_session(
    State(backend): Shared,
    Json(req): Json<ClearSessionRequest>,
) -> StatusCode {
    let mut backend = backend.lock().await;
    backend.clear_session(&req.session_id, req.approach);
    StatusCode::NO_CONTENT
}

/// GET /mcp-servers
pub async fn list_servers(State(backend): Shared) -> Json<ServerListing> {
    let backend = backend.lock().await;
    Json(backend.server_listing())
}

/// POST /mcp-servers
pub async fn add_server(
    State(backend): Shared,
    Json(config): Json<ServerConfig>,
) -> ApiResult<ServerMutation> {
    let mut backend = backend.lock().await;
    let name = config.name.clone();
    let response = backend.add_server(config).map_err(reject)?;
    info!(server = %name, "server registered");
    Ok(Json(response))
}

/// DELETE /mcp-servers/:name
pub async fn delete_server(
    State(backend): Shared,
    Path(name): Path<String>,
) -> ApiResult<ServerMutation> {
    let mut backend = backend.lock().await;
    let response = backend.delete_server(&name).map_err(reject)?;
    info!(server = %name, "server removed");
    Ok(Json(response))
}

/// GET /agents
pub async fn list_agents(State(backend): Shared) -> Json<AgentListing> {
    let backend = backend.lock().await;
    Json(backend.agent_listing())
}

/// POST /agents
pub async fn add_agent(
    State(backend): Shared,
    Json(config): Json<AgentConfig>,
) -> ApiResult<AgentMutation> {
    let mut backend = backend.lock().await;
    let name = config.name.clone();
    let response = backend.add_agent(config).map_err(reject)?;
    info!(agent = %name, "agent registered");
    Ok(Json(response))
}

/// DELETE /agents/:name
pub async fn delete_agent(
    State(backend): Shared,
    Path(name): Path<String>,
) -> ApiResult<AgentMutation> {
    let mut backend = backend.lock().await;
    let response = backend.delete_agent(&name).map_err(reject)?;
    info!(agent = %name, "agent removed");
    Ok(Json(response))
}
