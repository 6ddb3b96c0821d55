use tracing::{info, warn};

use super::McpContext;
use crate::protocol::ToolOutcome;
use crate::registry::ToolDescriptor;

/// Handle a call to one of the `fetch_*` tools.
///
/// `url` has already been validated. The reader is asked for the tool's
/// response format and its body is relayed untouched. Any fetch failure is
/// an application error: the model sees the error text, the JSON-RPC call
/// itself succeeds.
pub async fn handle(tool: &ToolDescriptor, url: &str, ctx: &McpContext) -> ToolOutcome {
    info!(tool = %tool.name, url, format = %tool.response_format, "Tool called");

    match ctx.reader.fetch(url, tool.response_format).await {
        Ok(body) => {
            info!(tool = %tool.name, bytes = body.len(), "Tool succeeded");
            ToolOutcome::Content(body)
        }
        Err(e) => {
            warn!(tool = %tool.name, error = %e, "Fetch failed");
            ToolOutcome::AppError(format!("Error: {e}"))
        }
    }
}
