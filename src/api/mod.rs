//! Backend contract and the gateway client that speaks it

pub mod client;
pub mod error;
pub mod models;

pub use client::GatewayClient;
pub use error::GatewayError;

/// Path segments of every endpoint, shared by the client and the mock backend
pub mod paths {
    pub const QUERY: &str = "query";
    pub const SESSIONS: &str = "sessions";
    pub const CLEAR_SESSION: &str = "clear-session";
    pub const MCP_SERVERS: &str = "mcp-servers";
    pub const AGENTS: &str = "agents";
}
