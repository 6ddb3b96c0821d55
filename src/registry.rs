//! Static registry of the fetch tools exposed through `tools/list`.

use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};

/// Representation requested from the reader via `X-Respond-With`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseFormat {
    Markdown,
    Html,
    Text,
    Screenshot,
    Pageshot,
}

impl ResponseFormat {
    pub const ALL: [ResponseFormat; 5] = [
        Self::Markdown,
        Self::Html,
        Self::Text,
        Self::Screenshot,
        Self::Pageshot,
    ];

    /// Header token understood by the reader.
    pub fn as_token(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Text => "text",
            Self::Screenshot => "screenshot",
            Self::Pageshot => "pageshot",
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// A single tool as advertised to MCP clients.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(skip)]
    pub response_format: ResponseFormat,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDescriptor {
    fn new(name: &str, description: &str, response_format: ResponseFormat, url_help: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            response_format,
            input_schema: url_input_schema(url_help),
        }
    }
}

/// The object schema shared by every tool: a single required string `url`.
pub fn url_input_schema(url_description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "url": {
                "type": "string",
                "description": url_description
            }
        },
        "required": ["url"]
    })
}

/// Ordered, read-only tool table built once at startup.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    /// The five reader tools, one per response format.
    pub fn reader_tools() -> Self {
        Self {
            tools: vec![
                ToolDescriptor::new(
                    "fetch_markdown",
                    "Fetch a webpage and return its content as Markdown (bypasses readability processing)",
                    ResponseFormat::Markdown,
                    "The URL to fetch and convert to Markdown",
                ),
                ToolDescriptor::new(
                    "fetch_html",
                    "Fetch a webpage and return its HTML (documentElement.outerHTML)",
                    ResponseFormat::Html,
                    "The URL to fetch as HTML",
                ),
                ToolDescriptor::new(
                    "fetch_text",
                    "Fetch a webpage and return its text content (document.body.innerText)",
                    ResponseFormat::Text,
                    "The URL to fetch as plain text",
                ),
                ToolDescriptor::new(
                    "fetch_screenshot",
                    "Fetch a screen-size screenshot of a webpage (returns the URL of the screenshot)",
                    ResponseFormat::Screenshot,
                    "The URL to screenshot",
                ),
                ToolDescriptor::new(
                    "fetch_pageshot",
                    "Fetch a full-page screenshot of a webpage (returns the URL of the screenshot)",
                    ResponseFormat::Pageshot,
                    "The URL to take a full-page screenshot of",
                ),
            ],
        }
    }

    /// Tools in registration order.
    pub fn list(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn resolve(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::reader_tools()
    }
}
