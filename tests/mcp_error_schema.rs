use std::time::Duration;

use jsonschema::validator_for;
use serde_json::Value;

use reader_mcp_server::protocol::{JsonRpcError, JsonRpcResponse, RpcId, ToolOutcome, ToolResult};
use reader_mcp_server::upstream::FetchError;

/// JSON-RPC 2.0 error envelope, as emitted by this server.
const ERROR_ENVELOPE_SCHEMA: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "title": "JSON-RPC 2.0 Error Response",
  "type": "object",
  "required": ["jsonrpc", "id", "error"],
  "additionalProperties": false,
  "properties": {
    "jsonrpc": { "const": "2.0" },
    "id": { "type": ["number", "string", "null"] },
    "error": {
      "type": "object",
      "required": ["code", "message"],
      "properties": {
        "code": { "enum": [-32700, -32600, -32601, -32602, -32603] },
        "message": { "type": "string", "minLength": 1 }
      }
    }
  }
}"#;

/// MCP tool result carrying an application error.
const TOOL_ERROR_SCHEMA: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "title": "MCP Tool Error Result",
  "type": "object",
  "required": ["content", "isError"],
  "additionalProperties": false,
  "properties": {
    "isError": { "const": true },
    "content": {
      "type": "array",
      "minItems": 1,
      "maxItems": 1,
      "items": {
        "type": "object",
        "required": ["type", "text"],
        "additionalProperties": false,
        "properties": {
          "type": { "const": "text" },
          "text": { "type": "string", "pattern": "^Error: " }
        }
      }
    }
  }
}"#;

fn schema(s: &str) -> jsonschema::Validator {
    let schema_json: Value = serde_json::from_str(s).unwrap();
    validator_for(&schema_json).unwrap()
}

#[test]
fn every_protocol_error_satisfies_envelope_schema() {
    let validator = schema(ERROR_ENVELOPE_SCHEMA);
    let errors = [
        JsonRpcError::parse_error(),
        JsonRpcError::invalid_request(),
        JsonRpcError::invalid_request_with("Missing Mcp-Session-Id header"),
        JsonRpcError::method_not_found("resources/list"),
        JsonRpcError::unknown_tool("nonexistent_tool"),
        JsonRpcError::invalid_params("Invalid arguments: missing required field 'url'"),
        JsonRpcError::internal_error(),
    ];
    let ids = [
        RpcId::Null,
        RpcId::from(7),
        RpcId::Number(serde_json::Number::from_f64(2.5).unwrap()),
        RpcId::Str("req-1".into()),
    ];
    for id in ids {
        for error in &errors {
            let value = serde_json::to_value(JsonRpcResponse::error(id.clone(), error.clone())).unwrap();
            assert!(validator.is_valid(&value), "envelope must satisfy schema: {value}");
        }
    }
}

#[test]
fn fetch_failures_satisfy_tool_error_schema() {
    let validator = schema(TOOL_ERROR_SCHEMA);
    let failures = [
        FetchError::Timeout { after: Duration::from_secs(60) },
        FetchError::Unreachable { cause: "connection refused".into() },
        FetchError::Upstream { status: 502, body: "bad gateway".into() },
        FetchError::InvalidRequest { cause: "relative URL without a base".into() },
    ];
    for failure in failures {
        let result = ToolResult::from(ToolOutcome::AppError(format!("Error: {failure}")));
        let value = serde_json::to_value(&result).unwrap();
        assert!(validator.is_valid(&value), "tool error must satisfy schema: {value}");
    }
}

#[test]
fn golden_unknown_tool_error() {
    let response = JsonRpcResponse::error(RpcId::from(4), JsonRpcError::unknown_tool("nonexistent_tool"));
    let json_str = serde_json::to_string_pretty(&response).unwrap();

    // Golden snapshot (byte-identical, stable)
    let expected = r#"{
  "jsonrpc": "2.0",
  "id": 4,
  "error": {
    "code": -32601,
    "message": "Unknown tool: nonexistent_tool"
  }
}"#;

    assert_eq!(json_str.trim(), expected.trim(), "JSON-RPC error snapshot mismatch");
}

#[test]
fn golden_upstream_failure_result() {
    let failure = FetchError::Upstream { status: 500, body: "reader blew up".into() };
    let result = ToolResult::from(ToolOutcome::AppError(format!("Error: {failure}")));
    let json_str = serde_json::to_string_pretty(&result).unwrap();

    let expected = r#"{
  "content": [
    {
      "type": "text",
      "text": "Error: request failed with status 500: reader blew up"
    }
  ],
  "isError": true
}"#;

    assert_eq!(json_str.trim(), expected.trim(), "tool error snapshot mismatch");
}
