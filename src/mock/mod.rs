//! In-process mock of the orchestration backend, built on the shared contract

pub mod handlers;
pub mod state;

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::api::paths;
use crate::config::MockConfig;
pub use state::MockBackend;

/// Create the mock backend router
pub fn create_router(backend: Arc<Mutex<MockBackend>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let query = format!("/{}", paths::QUERY);
    let sessions = format!("/{}", paths::SESSIONS);
    let session = format!("/{}/:id", paths::SESSIONS);
    let clear_session = format!("/{}", paths::CLEAR_SESSION);
    let servers = format!("/{}", paths::MCP_SERVERS);
    let server = format!("/{}/:name", paths::MCP_SERVERS);
    let agents = format!("/{}", paths::AGENTS);
    let agent = format!("/{}/:name", paths::AGENTS);

    Router::new()
        .route(&query, post(handlers::query))
        .route(
            &sessions,
            post(handlers::create_session).get(handlers::list_sessions),
        )
        .route(&session, get(handlers::session_history))
        .route(&clear_session, post(handlers::clear_session))
        .route(&servers, get(handlers::list_servers).post(handlers::add_server))
        .route(&server, delete(handlers::delete_server))
        .route(&agents, get(handlers::list_agents).post(handlers::add_agent))
        .route(&agent, delete(handlers::delete_agent))
        .layer(cors)
        .with_state(backend)
}

/// Serve a fresh mock backend on an already bound listener
pub async fn serve(listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let router = create_router(Arc::new(Mutex::new(MockBackend::new())));
    axum::serve(listener, router).await?;
    Ok(())
}

/// Start the mock backend
pub async fn start_server(config: &MockConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "mock backend listening");
    serve(listener).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::api::models::{ErrorBody, ServerListing};

    fn router() -> Router {
        create_router(Arc::new(Mutex::new(MockBackend::new())))
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_empty_server_listing() {
        let response = router()
            .oneshot(
                Request::get("/mcp-servers")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listing: ServerListing = body_json(response).await;
        assert!(listing.servers.is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_server_returns_detail() {
        let response = router()
            .oneshot(
                Request::delete("/mcp-servers/ghost")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: ErrorBody = body_json(response).await;
        assert_eq!(body.detail, "Server 'ghost' not found");
    }

    #[tokio::test]
    async fn test_add_server_with_legacy_endpoint_field_is_rejected() {
        let response = router()
            .oneshot(
                Request::post("/mcp-servers")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"name":"x","type":"http","endpoint":"http://old"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_empty_query_is_unprocessable() {
        let response = router()
            .oneshot(
                Request::post("/query")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"query":"   ","approach":"approach1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: ErrorBody = body_json(response).await;
        assert_eq!(body.detail, "Query must not be empty");
    }
}
