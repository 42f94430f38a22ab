//! Integration tests for mcpdash
//!
//! Each test starts its own backend on an ephemeral local port: either the
//! in-memory mock or a small router that always fails.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::process::Command;

use axum::{http::StatusCode, Router};
use pretty_assertions::assert_eq;

use mcpdash::api::models::*;
use mcpdash::api::{GatewayClient, GatewayError};
use mcpdash::form::ServerForm;
use mcpdash::mock;

/// Start the mock backend and return a client pointed at it
async fn mock_client() -> GatewayClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = mock::serve(listener).await;
    });
    GatewayClient::new(&format!("http://{}", addr)).unwrap()
}

/// Serve `router` and return a client pointed at it
async fn client_for(router: Router) -> GatewayClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    GatewayClient::new(&format!("http://{}", addr)).unwrap()
}

/// Router answering every request with the same status and body
fn failing_router(status: StatusCode, body: &'static str) -> Router {
    Router::new().fallback(move || async move { (status, body) })
}

fn message_of(err: GatewayError) -> String {
    match err {
        GatewayError::RequestFailed { message, .. } => message,
        other => panic!("expected a request failure, got {:?}", other),
    }
}

fn slack() -> ServerConfig {
    ServerConfig {
        name: "slack".to_string(),
        transport: ServerTransport::Command {
            command: "npx".to_string(),
            args: vec!["-y".to_string(), "@pkg/slack".to_string()],
        },
        description: None,
        env: BTreeMap::new(),
    }
}

#[tokio::test]
async fn test_add_server_then_list_includes_it() {
    let client = mock_client().await;

    let added = client.add_server(&slack()).await.unwrap();
    assert!(added.success);
    assert!(!added.message.is_empty());

    let listing = client.list_servers().await.unwrap();
    assert!(listing.servers.contains(&"slack".to_string()));
    let info = &listing.details["slack"];
    assert_eq!(info.kind, ServerKind::Command);
    assert_eq!(info.command.as_deref(), Some("npx"));
    assert_eq!(info.url, None);
}

#[tokio::test]
async fn test_delete_server_then_list_excludes_it() {
    let client = mock_client().await;
    client.add_server(&slack()).await.unwrap();

    let deleted = client.delete_server("slack").await.unwrap();
    assert!(deleted.success);

    let listing = client.list_servers().await.unwrap();
    assert!(!listing.servers.contains(&"slack".to_string()));
    assert!(listing.details.is_empty());
}

#[tokio::test]
async fn test_http_server_and_encoded_name() {
    let client = mock_client().await;
    let config = ServerConfig {
        name: "crm tools/eu".to_string(),
        transport: ServerTransport::Http {
            url: "https://mcp.example.com".to_string(),
        },
        description: Some("HubSpot".to_string()),
        env: BTreeMap::from([("TOKEN".to_string(), "secret".to_string())]),
    };
    client.add_server(&config).await.unwrap();

    let listing = client.list_servers().await.unwrap();
    let info = &listing.details["crm tools/eu"];
    assert_eq!(info.kind, ServerKind::Http);
    assert_eq!(info.url.as_deref(), Some("https://mcp.example.com"));
    assert_eq!(info.description, "HubSpot");

    client.delete_server("crm tools/eu").await.unwrap();
    assert!(client.list_servers().await.unwrap().servers.is_empty());
}

#[tokio::test]
async fn test_duplicate_server_reports_backend_detail() {
    let client = mock_client().await;
    client.add_server(&slack()).await.unwrap();

    let err = client.add_server(&slack()).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::CONFLICT));
    assert_eq!(message_of(err), "Server 'slack' already exists");
}

#[tokio::test]
async fn test_delete_missing_server_reports_detail() {
    let client = mock_client().await;
    let err = client.delete_server("ghost").await.unwrap_err();
    assert_eq!(message_of(err), "Server 'ghost' not found");
}

#[tokio::test]
async fn test_query_assigns_session_and_accepts_it_back() {
    let client = mock_client().await;

    let first = client
        .submit_query("list my deals", None, Approach::Approach2)
        .await
        .unwrap();
    let session_id = first.session_id.clone().expect("server assigns a session");
    assert_eq!(first.success, Some(true));
    assert!(first.result.is_some());
    assert!(first.agents_used.is_some());

    let second = client
        .submit_query("and my channels", Some(&session_id), Approach::Approach2)
        .await
        .unwrap();
    assert_eq!(second.session_id.as_deref(), Some(session_id.as_str()));

    let history = client
        .session_history(&session_id, Approach::Approach2)
        .await
        .unwrap();
    assert_eq!(history.messages.len(), 4);
    assert_eq!(history.messages[2].content, "and my channels");
}

#[tokio::test]
async fn test_query_error_uses_detail() {
    let client = client_for(failing_router(
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"detail":"orchestrator unavailable"}"#,
    ))
    .await;

    let err = client
        .submit_query("list my deals", None, Approach::Approach2)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(message_of(err), "orchestrator unavailable");
}

#[tokio::test]
async fn test_detail_applies_to_every_operation() {
    let client = client_for(failing_router(
        StatusCode::BAD_REQUEST,
        r#"{"detail":"nope"}"#,
    ))
    .await;

    assert_eq!(message_of(client.list_servers().await.unwrap_err()), "nope");
    assert_eq!(
        message_of(client.create_session(Approach::Approach1).await.unwrap_err()),
        "nope"
    );
    assert_eq!(
        message_of(client.delete_agent("x").await.unwrap_err()),
        "nope"
    );
}

#[tokio::test]
async fn test_unparseable_error_body_uses_fallbacks() {
    let client = client_for(failing_router(
        StatusCode::BAD_GATEWAY,
        "<html>bad gateway</html>",
    ))
    .await;
    let approach = Approach::Approach2;

    let agent = AgentConfig {
        name: "a".to_string(),
        display_name: "A".to_string(),
        description: String::new(),
        instructions: String::new(),
        capabilities: Vec::new(),
        requires_mcp: false,
        mcp_server: None,
    };

    let cases: Vec<(Result<(), GatewayError>, &str)> = vec![
        (
            client.submit_query("q", None, approach).await.map(drop),
            "Failed to process query",
        ),
        (
            client.create_session(approach).await.map(drop),
            "Failed to create session",
        ),
        (
            client.clear_session("s", approach).await,
            "Failed to clear session",
        ),
        (
            client.session_history("s", approach).await.map(drop),
            "Failed to fetch session",
        ),
        (
            client.list_sessions(approach).await.map(drop),
            "Failed to fetch sessions",
        ),
        (
            client.list_servers().await.map(drop),
            "Failed to fetch servers",
        ),
        (
            client.add_server(&slack()).await.map(drop),
            "Failed to add server",
        ),
        (
            client.delete_server("slack").await.map(drop),
            "Failed to delete server",
        ),
        (
            client.list_agents().await.map(drop),
            "Failed to fetch agents",
        ),
        (
            client.add_agent(&agent).await.map(drop),
            "Failed to add agent",
        ),
        (
            client.delete_agent("a").await.map(drop),
            "Failed to delete agent",
        ),
    ];

    for (result, expected) in cases {
        assert_eq!(message_of(result.unwrap_err()), expected);
    }
}

#[tokio::test]
async fn test_undecodable_success_body_is_a_failure() {
    let client = client_for(failing_router(StatusCode::OK, r#"{"servers": 5}"#)).await;
    let err = client.list_servers().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::OK));
    assert!(message_of(err).starts_with("Failed to fetch servers: "));
}

#[tokio::test]
async fn test_connection_refused_has_no_status() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    drop(listener);

    let client = GatewayClient::new(&format!("http://{}", addr)).unwrap();
    let err = client.list_servers().await.unwrap_err();
    assert_eq!(err.status(), None);
    assert!(!message_of(err).is_empty());
}

#[tokio::test]
async fn test_session_lifecycle() {
    let client = mock_client().await;

    let created = client.create_session(Approach::Approach1).await.unwrap();
    let listed = client.list_sessions(Approach::Approach1).await.unwrap();
    assert_eq!(listed.sessions, vec![created.session_id.clone()]);
    assert!(client
        .list_sessions(Approach::Approach2)
        .await
        .unwrap()
        .sessions
        .is_empty());

    client
        .clear_session(&created.session_id, Approach::Approach1)
        .await
        .unwrap();
    let err = client
        .session_history(&created.session_id, Approach::Approach1)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn test_agent_registry_round() {
    let client = mock_client().await;
    client.add_server(&slack()).await.unwrap();

    let agent = AgentConfig {
        name: "slack_agent".to_string(),
        display_name: "Slack Agent".to_string(),
        description: "Reads channels".to_string(),
        instructions: "Answer questions about channels".to_string(),
        capabilities: vec!["channel".to_string()],
        requires_mcp: true,
        mcp_server: Some("slack".to_string()),
    };
    let added = client.add_agent(&agent).await.unwrap();
    assert!(added.message.contains("slack_agent"));

    let listing = client.list_agents().await.unwrap();
    let info = &listing.details["slack_agent"];
    assert_eq!(info.source, AgentSource::Database);
    assert_eq!(info.mcp_server.as_deref(), Some("slack"));
    assert_eq!(listing.details["orchestrator"].source, AgentSource::Code);

    let answer = client
        .submit_query("which channel is busiest", None, Approach::Approach1)
        .await
        .unwrap();
    assert_eq!(answer.agents_used, Some(vec!["slack_agent".to_string()]));

    client.delete_agent("slack_agent").await.unwrap();
    let err = client.delete_agent("orchestrator").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
    assert!(!client
        .list_agents()
        .await
        .unwrap()
        .agents
        .contains(&"slack_agent".to_string()));
}

#[tokio::test]
async fn test_form_resets_on_success_and_keeps_fields_on_failure() {
    let client = mock_client().await;

    let mut form = ServerForm::new();
    form.name = "slack".to_string();
    form.command = "npx".to_string();
    form.set_arg(0, "-y");

    form.submit(&client).await.unwrap();
    assert_eq!(form, ServerForm::default());

    form.name = "slack".to_string();
    form.command = "npx".to_string();
    let before = form.clone();
    let err = form.submit(&client).await.unwrap_err();
    assert_eq!(err.to_string(), "Server 'slack' already exists");
    assert_eq!(form, before);
}

#[test]
fn test_mcpdash_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_mcpdash"))
        .arg("--help")
        .output()
        .expect("Failed to run mcpdash");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Operator console for an MCP orchestration backend"),
        "Help should contain description: {}",
        stdout
    );
}
