//! Typed HTTP client for the orchestration backend.
//!
//! Every method issues exactly one request. Nothing is retried, cached or
//! deduplicated; failures are returned to the caller as
//! [`GatewayError::RequestFailed`].

use std::time::Duration;

use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::{GatewayError, Result};
use super::models::*;
use super::paths;
use crate::config::GatewayConfig;

const QUERY_FAILED: &str = "Failed to process query";
const CREATE_SESSION_FAILED: &str = "Failed to create session";
const CLEAR_SESSION_FAILED: &str = "Failed to clear session";
const FETCH_SESSION_FAILED: &str = "Failed to fetch session";
const FETCH_SESSIONS_FAILED: &str = "Failed to fetch sessions";
const FETCH_SERVERS_FAILED: &str = "Failed to fetch servers";
const ADD_SERVER_FAILED: &str = "Failed to add server";
const DELETE_SERVER_FAILED: &str = "Failed to delete server";
const FETCH_AGENTS_FAILED: &str = "Failed to fetch agents";
const ADD_AGENT_FAILED: &str = "Failed to add agent";
const DELETE_AGENT_FAILED: &str = "Failed to delete agent";

#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: Url,
}

impl GatewayClient {
    /// Client without a request timeout
    pub fn new(base_url: &str) -> Result<Self> {
        Self::build(base_url, None)
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        Self::build(
            &config.base_url,
            config.request_timeout_secs.map(Duration::from_secs),
        )
    }

    fn build(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| GatewayError::Config(format!("invalid base url '{}': {}", base_url, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(GatewayError::Config(format!(
                "base url '{}' cannot carry a path",
                base_url
            )));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: parsed,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append percent-encoded path segments to the base URL
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send the request and turn any non-2xx status into a failure
    async fn execute(&self, request: RequestBuilder, fallback: &str) -> Result<reqwest::Response> {
        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "{}: transport error", fallback);
            GatewayError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let message = error_message(&body, fallback);
        warn!(%status, %message, "gateway request failed");
        Err(GatewayError::request_failed(message, Some(status)))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, fallback: &str) -> Result<T> {
        let response = self.execute(request, fallback).await?;
        let status = response.status();
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| {
            GatewayError::request_failed(format!("{}: {}", fallback, e), Some(status))
        })
    }

    /// POST /query
    pub async fn submit_query(
        &self,
        query: &str,
        session_id: Option<&str>,
        approach: Approach,
    ) -> Result<QueryResponse> {
        debug!(%approach, session = ?session_id, "submitting query");
        let body = QueryRequest {
            query: query.to_string(),
            session_id: session_id.map(str::to_string),
            approach,
        };
        let request = self.http.post(self.url(&[paths::QUERY])).json(&body);
        self.send(request, QUERY_FAILED).await
    }

    /// POST /sessions?approach=
    pub async fn create_session(&self, approach: Approach) -> Result<SessionCreated> {
        let request = self
            .http
            .post(self.url(&[paths::SESSIONS]))
            .query(&ApproachParam { approach });
        self.send(request, CREATE_SESSION_FAILED).await
    }

    /// POST /clear-session
    pub async fn clear_session(&self, session_id: &str, approach: Approach) -> Result<()> {
        let body = ClearSessionRequest {
            session_id: session_id.to_string(),
            approach,
        };
        let request = self.http.post(self.url(&[paths::CLEAR_SESSION])).json(&body);
        self.execute(request, CLEAR_SESSION_FAILED).await?;
        Ok(())
    }

    /// GET /sessions/{id}?approach=
    pub async fn session_history(
        &self,
        session_id: &str,
        approach: Approach,
    ) -> Result<SessionHistory> {
        let request = self
            .http
            .get(self.url(&[paths::SESSIONS, session_id]))
            .query(&ApproachParam { approach });
        self.send(request, FETCH_SESSION_FAILED).await
    }

    /// GET /sessions?approach=
    pub async fn list_sessions(&self, approach: Approach) -> Result<SessionList> {
        let request = self
            .http
            .get(self.url(&[paths::SESSIONS]))
            .query(&ApproachParam { approach });
        self.send(request, FETCH_SESSIONS_FAILED).await
    }

    /// GET /mcp-servers
    pub async fn list_servers(&self) -> Result<ServerListing> {
        let request = self.http.get(self.url(&[paths::MCP_SERVERS]));
        self.send(request, FETCH_SERVERS_FAILED).await
    }

    /// POST /mcp-servers
    pub async fn add_server(&self, config: &ServerConfig) -> Result<ServerMutation> {
        debug!(server = %config.name, kind = config.transport.kind().as_str(), "adding server");
        let request = self.http.post(self.url(&[paths::MCP_SERVERS])).json(config);
        self.send(request, ADD_SERVER_FAILED).await
    }

    /// DELETE /mcp-servers/{name}
    pub async fn delete_server(&self, name: &str) -> Result<ServerMutation> {
        debug!(server = %name, "deleting server");
        let request = self.http.delete(self.url(&[paths::MCP_SERVERS, name]));
        self.send(request, DELETE_SERVER_FAILED).await
    }

    /// GET /agents
    pub async fn list_agents(&self) -> Result<AgentListing> {
        let request = self.http.get(self.url(&[paths::AGENTS]));
        self.send(request, FETCH_AGENTS_FAILED).await
    }

    /// POST /agents
    pub async fn add_agent(&self, config: &AgentConfig) -> Result<AgentMutation> {
        debug!(agent = %config.name, "adding agent");
        let request = self.http.post(self.url(&[paths::AGENTS])).json(config);
        self.send(request, ADD_AGENT_FAILED).await
    }

    /// DELETE /agents/{name}
    pub async fn delete_agent(&self, name: &str) -> Result<AgentMutation> {
        debug!(agent = %name, "deleting agent");
        let request = self.http.delete(self.url(&[paths::AGENTS, name]));
        self.send(request, DELETE_AGENT_FAILED).await
    }
}

/// `detail` from an error body, or the fallback when there is none
fn error_message(body: &[u8], fallback: &str) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .map(|b| b.detail)
        .filter(|detail| !detail.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_segments() {
        let client = GatewayClient::new("http://localhost:8000").unwrap();
        assert_eq!(
            client.url(&[paths::MCP_SERVERS]).as_str(),
            "http://localhost:8000/mcp-servers"
        );
    }

    #[test]
    fn test_url_keeps_base_path() {
        let client = GatewayClient::new("http://gw.local/api/").unwrap();
        assert_eq!(
            client.url(&[paths::AGENTS, "planner"]).as_str(),
            "http://gw.local/api/agents/planner"
        );
    }

    #[test]
    fn test_url_encodes_names() {
        let client = GatewayClient::new("http://localhost:8000").unwrap();
        assert_eq!(
            client.url(&[paths::MCP_SERVERS, "my server/1"]).as_str(),
            "http://localhost:8000/mcp-servers/my%20server%2F1"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = GatewayClient::new("not a url").unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
        let err = GatewayClient::new("mailto:ops@example.com").unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }

    #[test]
    fn test_error_message_prefers_detail() {
        assert_eq!(
            error_message(br#"{"detail":"no such server"}"#, ADD_SERVER_FAILED),
            "no such server"
        );
    }

    #[test]
    fn test_error_message_falls_back() {
        assert_eq!(error_message(b"<html>", ADD_SERVER_FAILED), ADD_SERVER_FAILED);
        assert_eq!(error_message(b"", QUERY_FAILED), QUERY_FAILED);
        assert_eq!(
            error_message(br#"{"detail":""}"#, QUERY_FAILED),
            QUERY_FAILED
        );
        assert_eq!(
            error_message(br#"{"error":"x"}"#, FETCH_SERVERS_FAILED),
            FETCH_SERVERS_FAILED
        );
    }
}
