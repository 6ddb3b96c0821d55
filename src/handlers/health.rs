use serde::Serialize;

use super::SERVER_NAME;

/// Identity document served on `GET <endpoint>`. Not part of JSON-RPC.
#[derive(Debug, Clone, Serialize)]
pub struct ServerIdentity {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
}

pub fn identity() -> ServerIdentity {
    ServerIdentity {
        name: SERVER_NAME,
        version: env!("CARGO_PKG_VERSION"),
        description: "MCP server for Reader URL to LLM-friendly conversion",
    }
}

/// Liveness probe body.
pub fn health() -> serde_json::Value {
    serde_json::json!({ "status": "ok" })
}
