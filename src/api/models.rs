//! Request and response models shared by the gateway client and the mock backend

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which orchestration implementation handles a request
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Approach {
    Approach1,
    #[default]
    Approach2,
}

impl Approach {
    pub fn as_str(&self) -> &'static str {
        match self {
            Approach::Approach1 => "approach1",
            Approach::Approach2 => "approach2",
        }
    }

    /// The other approach, used by the dashboard toggle
    pub fn toggled(self) -> Self {
        match self {
            Approach::Approach1 => Approach::Approach2,
            Approach::Approach2 => Approach::Approach1,
        }
    }
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who authored a chat or history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

// ---------------------------------------------------------------------------
// Servers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ServerKind {
    Command,
    Http,
}

impl ServerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerKind::Command => "command",
            ServerKind::Http => "http",
        }
    }
}

/// How the backend reaches a server. The wire `type` field selects the variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerTransport {
    /// Launch a local process
    Command {
        command: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// Talk to an already running HTTP endpoint
    Http { url: String },
}

impl ServerTransport {
    pub fn kind(&self) -> ServerKind {
        match self {
            ServerTransport::Command { .. } => ServerKind::Command,
            ServerTransport::Http { .. } => ServerKind::Http,
        }
    }
}

/// Body of `POST /mcp-servers`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    #[serde(flatten)]
    pub transport: ServerTransport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Environment passed to the server; values are often secrets
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

/// Read projection of a registered server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ServerKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tools_count: u32,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl ServerInfo {
    pub fn from_config(config: &ServerConfig, status: impl Into<String>) -> Self {
        let (url, command) = match &config.transport {
            ServerTransport::Command { command, .. } => (None, Some(command.clone())),
            ServerTransport::Http { url } => (Some(url.clone()), None),
        };
        Self {
            name: config.name.clone(),
            kind: config.transport.kind(),
            description: config.description.clone().unwrap_or_default(),
            tools_count: 0,
            status: status.into(),
            url,
            command,
        }
    }
}

/// Response of `GET /mcp-servers`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerListing {
    #[serde(default)]
    pub servers: Vec<String>,
    #[serde(default)]
    pub details: BTreeMap<String, ServerInfo>,
}

impl ServerListing {
    /// Details in the order the backend listed the names
    pub fn ordered(&self) -> Vec<&ServerInfo> {
        self.servers
            .iter()
            .filter_map(|name| self.details.get(name))
            .collect()
    }
}

/// Response of server registry mutations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMutation {
    pub message: String,
    #[serde(default)]
    pub success: bool,
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// Where an agent definition lives on the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentSource {
    Code,
    Database,
}

impl AgentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentSource::Code => "code",
            AgentSource::Database => "database",
        }
    }
}

/// Body of `POST /agents`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub instructions: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub requires_mcp: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_server: Option<String>,
}

/// Read projection of a registered agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub requires_mcp: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_server: Option<String>,
    pub source: AgentSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl AgentInfo {
    pub fn from_config(config: &AgentConfig, source: AgentSource) -> Self {
        Self {
            name: config.name.clone(),
            display_name: config.display_name.clone(),
            description: config.description.clone(),
            capabilities: config.capabilities.clone(),
            requires_mcp: config.requires_mcp,
            mcp_server: config.mcp_server.clone(),
            source,
            instructions: Some(config.instructions.clone()),
        }
    }
}

/// Response of `GET /agents`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentListing {
    #[serde(default)]
    pub agents: Vec<String>,
    #[serde(default)]
    pub details: BTreeMap<String, AgentInfo>,
}

impl AgentListing {
    pub fn ordered(&self) -> Vec<&AgentInfo> {
        self.agents
            .iter()
            .filter_map(|name| self.details.get(name))
            .collect()
    }
}

/// Response of agent registry mutations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMutation {
    pub message: String,
}

// ---------------------------------------------------------------------------
// Queries and sessions
// ---------------------------------------------------------------------------

/// Body of `POST /query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub approach: Approach,
}

/// Response of `POST /query`.
///
/// Every field is optional because the two approaches answer with different
/// shapes; `plan`, `selected_tools` and `extracted_data` are opaque.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agents_used: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_tools: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<StructuredData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl QueryResponse {
    /// Structured payload: the tagged `structured` field when the backend sent
    /// one, otherwise whatever `extracted_data` classifies as.
    pub fn structured_data(&self) -> Option<StructuredData> {
        if let Some(structured) = &self.structured {
            return Some(structured.clone());
        }
        self.extracted_data
            .as_ref()
            .and_then(StructuredData::from_extracted)
    }
}

/// Response of `POST /sessions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCreated {
    pub session_id: String,
}

/// Body of `POST /clear-session`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearSessionRequest {
    pub session_id: String,
    #[serde(default)]
    pub approach: Approach,
}

/// `?approach=` query parameter
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ApproachParam {
    #[serde(default)]
    pub approach: Approach,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

/// Response of `GET /sessions/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHistory {
    pub session_id: String,
    #[serde(default)]
    pub approach: Approach,
    #[serde(default)]
    pub messages: Vec<HistoryEntry>,
}

/// Response of `GET /sessions`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionList {
    #[serde(default)]
    pub sessions: Vec<String>,
}

/// Body of every non-2xx response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

// ---------------------------------------------------------------------------
// Structured query data
// ---------------------------------------------------------------------------

/// Text field that tolerates numbers and booleans; other shapes read as absent
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

fn lenient_purpose<'de, D>(deserializer: D) -> Result<Option<ChannelPurpose>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .and_then(|value| serde_json::from_value(value).ok()))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    #[serde(default, deserialize_with = "lenient_text")]
    pub dealname: Option<String>,
    /// HubSpot sends amounts as strings, other sources as numbers
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub dealstage: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub closedate: Option<String>,
}

impl Deal {
    /// Parsed amount, zero when missing or without a leading number.
    /// `"1500 USD"` reads as 1500.
    pub fn amount_value(&self) -> f64 {
        match &self.amount {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => leading_number(s).unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

/// Longest prefix of `raw` (after leading whitespace) that parses as a float
fn leading_number(raw: &str) -> Option<f64> {
    let raw = raw.trim_start();
    let candidate_len = raw
        .find(|c: char| !matches!(c, '0'..='9' | '+' | '-' | '.' | 'e' | 'E'))
        .unwrap_or(raw.len());
    (1..=candidate_len)
        .rev()
        .find_map(|end| raw[..end].parse::<f64>().ok())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPurpose {
    #[serde(default, deserialize_with = "lenient_name")]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default, deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "lenient_purpose",
        skip_serializing_if = "Option::is_none"
    )]
    pub purpose: Option<ChannelPurpose>,
}

/// Explicitly tagged structured result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StructuredData {
    Deals { items: Vec<Deal> },
    Channels { items: Vec<Channel> },
    Text { text: String },
}

impl StructuredData {
    /// Classify an untagged `extracted_data` object.
    ///
    /// Takes the first block, in the order the backend sent them, carrying
    /// both `data` and a string `data_type`. A type containing "deal" yields
    /// deals, "channel" yields channels, and anything else yields nothing.
    /// Items that do not look like the expected shape are kept with empty
    /// fields.
    pub fn from_extracted(extracted: &Value) -> Option<Self> {
        let block = extracted.as_object()?.values().find(|block| {
            let has_data = block.get("data").is_some_and(|d| !d.is_null());
            let has_type = block
                .get("data_type")
                .and_then(Value::as_str)
                .is_some_and(|t| !t.is_empty());
            has_data && has_type
        })?;

        let data_type = block.get("data_type")?.as_str()?.to_lowercase();
        let items: Vec<&Value> = match block.get("data")? {
            Value::Array(values) => values.iter().collect(),
            single => vec![single],
        };

        if data_type.contains("deal") {
            let items = items
                .into_iter()
                .map(|v| serde_json::from_value(v.clone()).unwrap_or_default())
                .collect();
            return Some(StructuredData::Deals { items });
        }
        if data_type.contains("channel") {
            let items = items
                .into_iter()
                .map(|v| serde_json::from_value(v.clone()).unwrap_or_default())
                .collect();
            return Some(StructuredData::Channels { items });
        }
        None
    }
}
