//! In-memory registries behind the mock backend

use std::collections::{BTreeMap, HashMap};

use serde_json::json;

use crate::api::models::*;

/// Status reported for every server the mock knows about
pub const SERVER_STATUS: &str = "configured";

/// Name of the built-in agent answering queries no other agent claims
pub const ORCHESTRATOR_AGENT: &str = "orchestrator";

#[derive(Debug, Clone)]
struct StoredAgent {
    config: AgentConfig,
    source: AgentSource,
}

/// Why a registry operation was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Invalid(String),
    Conflict(String),
    NotFound(String),
    Forbidden(String),
}

pub struct MockBackend {
    servers: BTreeMap<String, ServerConfig>,
    agents: BTreeMap<String, StoredAgent>,
    sessions: HashMap<Approach, BTreeMap<String, Vec<HistoryEntry>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Backend with the code-defined orchestrator agent and nothing else
    pub fn new() -> Self {
        let orchestrator = AgentConfig {
            name: ORCHESTRATOR_AGENT.to_string(),
            display_name: "Orchestrator".to_string(),
            description: "Plans queries and delegates to specialist agents".to_string(),
            instructions: "Break the query into steps and route each step.".to_string(),
            capabilities: vec!["planning".to_string()],
            requires_mcp: false,
            mcp_server: None,
        };
        let mut agents = BTreeMap::new();
        agents.insert(
            orchestrator.name.clone(),
            StoredAgent {
                config: orchestrator,
                source: AgentSource::Code,
            },
        );

        Self {
            servers: BTreeMap::new(),
            agents,
            sessions: HashMap::new(),
        }
    }

    pub fn server_listing(&self) -> ServerListing {
        ServerListing {
            servers: self.servers.keys().cloned().collect(),
            details: self
                .servers
                .iter()
                .map(|(name, config)| (name.clone(), ServerInfo::from_config(config, SERVER_STATUS)))
                .collect(),
        }
    }

    pub fn add_server(&mut self, config: ServerConfig) -> Result<ServerMutation, Rejection> {
        validate_server(&config)?;
        if self.servers.contains_key(&config.name) {
            return Err(Rejection::Conflict(format!(
                "Server '{}' already exists",
                config.name
            )));
        }
        let message = format!("Server '{}' added", config.name);
        self.servers.insert(config.name.clone(), config);
        Ok(ServerMutation {
            message,
            success: true,
        })
    }

    pub fn delete_server(&mut self, name: &str) -> Result<ServerMutation, Rejection> {
        if self.servers.remove(name).is_none() {
            return Err(Rejection::NotFound(format!("Server '{}' not found", name)));
        }
        Ok(ServerMutation {
            message: format!("Server '{}' deleted", name),
            success: true,
        })
    }

    pub fn agent_listing(&self) -> AgentListing {
        AgentListing {
            agents: self.agents.keys().cloned().collect(),
            details: self
                .agents
                .iter()
                .map(|(name, stored)| {
                    (
                        name.clone(),
                        AgentInfo::from_config(&stored.config, stored.source),
                    )
                })
                .collect(),
        }
    }

    pub fn add_agent(&mut self, config: AgentConfig) -> Result<AgentMutation, Rejection> {
        if config.name.trim().is_empty() {
            return Err(Rejection::Invalid("Agent name is required".to_string()));
        }
        if config.requires_mcp {
            match &config.mcp_server {
                Some(server) if self.servers.contains_key(server) => {}
                Some(server) => {
                    return Err(Rejection::Invalid(format!(
                        "MCP server '{}' is not registered",
                        server
                    )))
                }
                None => {
                    return Err(Rejection::Invalid(
                        "Agent requires an MCP server but none was given".to_string(),
                    ))
                }
            }
        }
        if self.agents.contains_key(&config.name) {
            return Err(Rejection::Conflict(format!(
                "Agent '{}' already exists",
                config.name
            )));
        }
        let message = format!("Agent '{}' added", config.name);
        self.agents.insert(
            config.name.clone(),
            StoredAgent {
                config,
                source: AgentSource::Database,
            },
        );
        Ok(AgentMutation { message })
    }

    pub fn delete_agent(&mut self, name: &str) -> Result<AgentMutation, Rejection> {
        match self.agents.get(name) {
            None => Err(Rejection::NotFound(format!("Agent '{}' not found", name))),
            Some(stored) if stored.source == AgentSource::Code => Err(Rejection::Forbidden(
                format!("Agent '{}' is defined in code and cannot be deleted", name),
            )),
            Some(_) => {
                self.agents.remove(name);
                Ok(AgentMutation {
                    message: format!("Agent '{}' deleted", name),
                })
            }
        }
    }

    pub fn create_session(&mut self, approach: Approach) -> SessionCreated {
        let session_id = uuid::Uuid::new_v4().to_string();
        self.sessions
            .entry(approach)
            .or_default()
            .insert(session_id.clone(), Vec::new());
        SessionCreated { session_id }
    }

    /// Forget a session's history. Unknown ids are accepted.
    pub fn clear_session(&mut self, session_id: &str, approach: Approach) {
        if let Some(sessions) = self.sessions.get_mut(&approach) {
            sessions.remove(session_id);
        }
    }

    pub fn session_history(
        &self,
        session_id: &str,
        approach: Approach,
    ) -> Result<SessionHistory, Rejection> {
        self.sessions
            .get(&approach)
            .and_then(|sessions| sessions.get(session_id))
            .map(|messages| SessionHistory {
                session_id: session_id.to_string(),
                approach,
                messages: messages.clone(),
            })
            .ok_or_else(|| Rejection::NotFound(format!("Session '{}' not found", session_id)))
    }

    pub fn session_list(&self, approach: Approach) -> SessionList {
        SessionList {
            sessions: self
                .sessions
                .get(&approach)
                .map(|sessions| sessions.keys().cloned().collect())
                .unwrap_or_default(),
        }
    }

    /// Answer a query. Agents whose name or a capability appears in the query
    /// text are reported as used; the orchestrator covers everything else.
    pub fn answer(&mut self, request: QueryRequest) -> Result<QueryResponse, Rejection> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(Rejection::Invalid("Query must not be empty".to_string()));
        }

        let lowered = query.to_lowercase();
        let mut agents_used: Vec<String> = self
            .agents
            .values()
            .filter(|stored| stored.source == AgentSource::Database)
            .filter(|stored| {
                lowered.contains(&stored.config.name.to_lowercase())
                    || stored
                        .config
                        .capabilities
                        .iter()
                        .any(|c| !c.is_empty() && lowered.contains(&c.to_lowercase()))
            })
            .map(|stored| stored.config.name.clone())
            .collect();
        if agents_used.is_empty() {
            agents_used.push(ORCHESTRATOR_AGENT.to_string());
        }

        let result = format!(
            "Handled \"{}\" with {} via {}",
            query,
            agents_used.join(", "),
            request.approach
        );
        let plan = json!({
            "steps": agents_used
                .iter()
                .enumerate()
                .map(|(i, agent)| json!({"step": i + 1, "agent": agent}))
                .collect::<Vec<_>>()
        });

        let session_id = request
            .session_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let history = self
            .sessions
            .entry(request.approach)
            .or_default()
            .entry(session_id.clone())
            .or_default();
        history.push(HistoryEntry {
            role: Role::User,
            content: query.to_string(),
        });
        history.push(HistoryEntry {
            role: Role::Assistant,
            content: result.clone(),
        });

        Ok(QueryResponse {
            result: Some(result),
            agents_used: Some(agents_used),
            plan: Some(plan),
            session_id: Some(session_id),
            success: Some(true),
            query: Some(query.to_string()),
            ..Default::default()
        })
    }
}

fn validate_server(config: &ServerConfig) -> Result<(), Rejection> {
    if config.name.trim().is_empty() {
        return Err(Rejection::Invalid("Server name is required".to_string()));
    }
    match &config.transport {
        ServerTransport::Command { command, .. } if command.trim().is_empty() => Err(
            Rejection::Invalid("Command servers need a command".to_string()),
        ),
        ServerTransport::Http { url } if url.trim().is_empty() => {
            Err(Rejection::Invalid("HTTP servers need a url".to_string()))
        }
        _ => Ok(()),
    }
}
