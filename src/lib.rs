//! MCP server for the Reader service.
//!
//! Exposes `fetch_markdown`, `fetch_html`, `fetch_text`, `fetch_screenshot`
//! and `fetch_pageshot` tools over JSON-RPC 2.0 streamable HTTP. Each call is
//! forwarded to the reader with an `X-Respond-With` header and the raw body
//! is returned as the tool result.

pub mod config;
pub mod handlers;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod upstream;

pub mod schema;
