//! Determinism regression test.
//!
//! The static parts of the protocol surface must be byte-identical across:
//! - repeated requests on one context
//! - freshly built contexts (i.e. server restarts)

use std::sync::Arc;

use async_trait::async_trait;
use reader_mcp_server::handlers::{self, McpContext};
use reader_mcp_server::protocol::JsonRpcRequest;
use reader_mcp_server::registry::ResponseFormat;
use reader_mcp_server::upstream::{FetchError, ReaderFetch};
use sha2::{Digest, Sha256};

struct EchoReader;

#[async_trait]
impl ReaderFetch for EchoReader {
    async fn fetch(&self, url: &str, format: ResponseFormat) -> Result<String, FetchError> {
        Ok(format!("{format}:{url}"))
    }
}

fn context() -> McpContext {
    McpContext::new(Arc::new(EchoReader)).unwrap()
}

/// Dispatch and serialize to JSON (same path as the HTTP handler).
async fn dispatch_to_json(ctx: &McpContext, method: &str) -> String {
    let req = JsonRpcRequest::new(1, method, None);
    let resp = handlers::dispatch(&req, ctx).await.unwrap();
    serde_json::to_string(&resp).unwrap()
}

fn digest(s: &str) -> String {
    Sha256::digest(s.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[tokio::test]
async fn tools_list_is_identical_across_calls() {
    let ctx = context();
    let first = dispatch_to_json(&ctx, "tools/list").await;
    for _ in 0..10 {
        assert_eq!(
            first,
            dispatch_to_json(&ctx, "tools/list").await,
            "tools/list must be byte-identical on every call"
        );
    }
}

#[tokio::test]
async fn tools_list_is_identical_across_contexts() {
    let hashes: Vec<String> = {
        let mut out = Vec::new();
        for _ in 0..3 {
            out.push(digest(&dispatch_to_json(&context(), "tools/list").await));
        }
        out
    };
    assert!(
        hashes.windows(2).all(|w| w[0] == w[1]),
        "fresh contexts must advertise the same tools: {hashes:?}"
    );
}

#[tokio::test]
async fn initialize_is_identical_across_contexts() {
    let a = dispatch_to_json(&context(), "initialize").await;
    let b = dispatch_to_json(&context(), "initialize").await;
    assert_eq!(digest(&a), digest(&b));
}

#[tokio::test]
async fn tool_call_relays_the_same_body_each_time() {
    let ctx = context();
    let req = JsonRpcRequest::new(
        3,
        "tools/call",
        Some(serde_json::json!({
            "name": "fetch_text",
            "arguments": { "url": "https://example.com" }
        })),
    );

    let a = serde_json::to_string(&handlers::dispatch(&req, &ctx).await.unwrap()).unwrap();
    let b = serde_json::to_string(&handlers::dispatch(&req, &ctx).await.unwrap()).unwrap();
    assert_eq!(a, b);

    let value: serde_json::Value = serde_json::from_str(&a).unwrap();
    assert_eq!(value["result"]["content"][0]["text"], "text:https://example.com");
}
