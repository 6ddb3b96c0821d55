use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use super::response::{JsonRpcError, JsonRpcResponse};

/// JSON-RPC 2.0 ID: a number, a string, or an explicit `null`.
///
/// Numbers are kept as parsed so large and fractional ids echo unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcId {
    Number(Number),
    Str(String),
    Null,
}

impl std::fmt::Display for RpcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Null => f.write_str("null"),
        }
    }
}

/// JSON-RPC 2.0 request envelope.
///
/// `id` is `None` when the member is absent, which makes the message a
/// notification. An explicit `"id": null` is `Some(RpcId::Null)`.
#[derive(Debug, Clone)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<RpcId>,
    pub method: String,
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<RpcId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// The id to echo in a response (`null` for notifications).
    pub fn response_id(&self) -> RpcId {
        self.id.clone().unwrap_or(RpcId::Null)
    }
}

impl From<i64> for RpcId {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<i32> for RpcId {
    fn from(n: i32) -> Self {
        Self::Number(n.into())
    }
}

impl From<&str> for RpcId {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for RpcId {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

/// Decode a raw HTTP body into a request envelope.
///
/// Malformed JSON yields a `-32700` response with a `null` id. Well-formed
/// JSON that is not a valid envelope yields `-32600`, echoing the id when it
/// could be read.
pub fn decode(body: &[u8]) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let raw: Value = serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "Failed to parse JSON-RPC body");
        JsonRpcResponse::error(RpcId::Null, JsonRpcError::parse_error())
    })?;

    let Value::Object(mut obj) = raw else {
        return Err(JsonRpcResponse::error(
            RpcId::Null,
            JsonRpcError::invalid_request_with("Request must be a single JSON-RPC object"),
        ));
    };

    let id = match obj.remove("id") {
        None => None,
        Some(Value::Null) => Some(RpcId::Null),
        Some(Value::String(s)) => Some(RpcId::Str(s)),
        Some(Value::Number(n)) => Some(RpcId::Number(n)),
        Some(_) => {
            return Err(JsonRpcResponse::error(
                RpcId::Null,
                JsonRpcError::invalid_request_with("Request id must be a number, string or null"),
            ));
        }
    };
    let echo = id.clone().unwrap_or(RpcId::Null);

    match obj.get("jsonrpc").and_then(Value::as_str) {
        Some("2.0") => {}
        _ => {
            return Err(JsonRpcResponse::error(echo, JsonRpcError::invalid_request()));
        }
    }

    let method = match obj.remove("method") {
        Some(Value::String(m)) => m,
        _ => {
            return Err(JsonRpcResponse::error(
                echo,
                JsonRpcError::invalid_request_with("Missing or non-string method"),
            ));
        }
    };

    Ok(JsonRpcRequest {
        jsonrpc: "2.0".into(),
        id,
        method,
        params: obj.remove("params"),
    })
}

/// MCP `initialize` params.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitializeParams {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: Option<String>,
    #[serde(rename = "clientInfo")]
    pub client_info: Option<ClientInfo>,
}

/// Client information sent during `initialize`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfo {
    pub name: Option<String>,
    pub version: Option<String>,
}

/// Parameters for `tools/call`.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}
