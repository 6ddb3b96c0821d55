pub mod fetch;
pub mod health;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId, ToolCallParams, ToolResult,
    PROTOCOL_VERSION,
};
use crate::registry::ToolRegistry;
use crate::schema::{ArgumentValidator, SchemaValidationError};
use crate::upstream::ReaderFetch;

pub const SERVER_NAME: &str = "reader-mcp";

/// Everything the dispatcher needs, built once at startup and shared
/// read-only across requests.
pub struct McpContext {
    pub registry: ToolRegistry,
    pub validator: ArgumentValidator,
    pub reader: Arc<dyn ReaderFetch>,
}

impl McpContext {
    pub fn new(reader: Arc<dyn ReaderFetch>) -> Result<Self, SchemaValidationError> {
        Ok(Self {
            registry: ToolRegistry::reader_tools(),
            validator: ArgumentValidator::new()?,
            reader,
        })
    }
}

/// Dispatch with a panic boundary: a panic while handling one request
/// becomes a `-32603` response for that request only.
pub async fn dispatch_guarded(req: &JsonRpcRequest, ctx: &McpContext) -> Option<JsonRpcResponse> {
    match AssertUnwindSafe(dispatch(req, ctx)).catch_unwind().await {
        Ok(resp) => resp,
        Err(_) => {
            error!(method = %req.method, "Handler panicked");
            if req.is_notification() {
                None
            } else {
                Some(JsonRpcResponse::error(
                    req.response_id(),
                    JsonRpcError::internal_error(),
                ))
            }
        }
    }
}

/// Dispatch a JSON-RPC request to the appropriate handler.
///
/// Returns `None` for notifications (no response required).
pub async fn dispatch(req: &JsonRpcRequest, ctx: &McpContext) -> Option<JsonRpcResponse> {
    if req.is_notification() {
        debug!(method = %req.method, "Notification received, nothing to answer");
        return None;
    }
    let id = req.response_id();

    let resp = match req.method.as_str() {
        "initialize" => JsonRpcResponse::success(id, initialize_result()),

        "ping" => JsonRpcResponse::success(id, serde_json::json!({})),

        "tools/list" => {
            let result = serde_json::json!({ "tools": ctx.registry.list() });
            JsonRpcResponse::success(id, result)
        }

        "tools/call" => handle_tools_call(id, req.params.as_ref(), ctx).await,

        method => {
            warn!(method, "Unknown method");
            JsonRpcResponse::error(id, JsonRpcError::method_not_found(method))
        }
    };
    Some(resp)
}

/// Fixed capabilities document; request params do not influence it.
pub fn initialize_result() -> Value {
    serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": { "listChanged": false }
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

async fn handle_tools_call(id: RpcId, params: Option<&Value>, ctx: &McpContext) -> JsonRpcResponse {
    let params: ToolCallParams = match params {
        Some(v @ Value::Object(_)) => match serde_json::from_value(v.clone()) {
            Ok(p) => p,
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params(format!("Invalid tools/call params: {e}")),
                );
            }
        },
        _ => {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_params("Missing params for tools/call"),
            );
        }
    };

    let Some(tool) = ctx.registry.resolve(&params.name) else {
        warn!(tool = %params.name, "Unknown tool");
        return JsonRpcResponse::error(id, JsonRpcError::unknown_tool(&params.name));
    };

    let arguments = params.arguments.unwrap_or_else(|| Value::Object(Default::default()));
    let url = match ctx.validator.validate(&arguments) {
        Ok(url) => url,
        Err(e) => {
            warn!(tool = %tool.name, error = %e, "Rejected tool arguments");
            return JsonRpcResponse::error(id, JsonRpcError::invalid_params(e.to_string()));
        }
    };

    let result: ToolResult = fetch::handle(tool, &url, ctx).await.into();
    match serde_json::to_value(&result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => {
            error!(error = %e, "Failed to serialize tool result");
            JsonRpcResponse::error(id, JsonRpcError::internal_error())
        }
    }
}
