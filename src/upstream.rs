//! Client for the upstream reader service.
//!
//! One tool call maps to exactly one `GET <base>/<url>` with an
//! `X-Respond-With` header selecting the representation. There is no retry;
//! the calling agent decides whether to try again.
//!
//! Failures are classified into [`FetchError`] variants, which the dispatcher
//! reports as tool content with `isError: true` rather than JSON-RPC errors.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::config::ReaderConfig;
use crate::registry::ResponseFormat;

/// Header the reader uses to pick a representation.
pub const RESPOND_WITH_HEADER: &str = "X-Respond-With";

/// Classified failure of a single upstream fetch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request to reader timed out after {}s", .after.as_secs_f64())]
    Timeout { after: Duration },

    #[error("failed to reach reader: {cause}")]
    Unreachable { cause: String },

    #[error("request failed with status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("failed to create request: {cause}")]
    InvalidRequest { cause: String },
}

/// Anything that can fetch a URL in a given representation.
///
/// The dispatcher only depends on this trait so tests and alternative
/// transports can substitute their own implementation.
#[async_trait]
pub trait ReaderFetch: Send + Sync {
    async fn fetch(&self, url: &str, format: ResponseFormat) -> Result<String, FetchError>;
}

/// reqwest-backed reader client with a pooled connection set.
///
/// `Clone` is cheap; clones share the pool.
#[derive(Debug, Clone)]
pub struct ReaderClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ReaderClient {
    pub fn new(config: &ReaderConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .tcp_nodelay(true)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
        })
    }

    /// Outbound URL: the target is appended verbatim, not percent-encoded.
    pub fn request_url(&self, url: &str) -> String {
        format!("{}/{}", self.base_url, url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout { after: self.timeout }
        } else if err.is_builder() {
            FetchError::InvalidRequest { cause: err.to_string() }
        } else {
            FetchError::Unreachable { cause: error_chain(&err) }
        }
    }
}

#[async_trait]
impl ReaderFetch for ReaderClient {
    async fn fetch(&self, url: &str, format: ResponseFormat) -> Result<String, FetchError> {
        let request_url = self.request_url(url);
        debug!(url, format = %format, request_url = %request_url, "Fetching through reader");

        let response = self
            .client
            .get(&request_url)
            .header(RESPOND_WITH_HEADER, format.as_token())
            .send()
            .await
            .map_err(|e| {
                warn!(url, error = %e, "Reader request failed");
                self.classify(e)
            })?;

        let status = response.status();
        debug!(status = status.as_u16(), "Reader responded");

        let body = response.text().await.map_err(|e| {
            warn!(url, error = %e, "Failed to read reader response body");
            self.classify(e)
        })?;

        if status != StatusCode::OK {
            warn!(url, status = status.as_u16(), "Reader returned non-200 status");
            return Err(FetchError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        info!(url, format = %format, bytes = body.len(), "Fetched through reader");
        Ok(body)
    }
}

/// Flatten an error and its sources into one line ("a: b: c").
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = inner.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ReaderClient {
        ReaderClient::new(&ReaderConfig {
            base_url: base.to_string(),
            ..ReaderConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn request_url_appends_target_verbatim() {
        let c = client("http://reader:3000/");
        assert_eq!(
            c.request_url("https://example.com/a b?q=1&r=%20"),
            "http://reader:3000/https://example.com/a b?q=1&r=%20"
        );
        assert_eq!(c.base_url(), "http://reader:3000");
    }

    #[test]
    fn error_messages_carry_status_and_body() {
        let err = FetchError::Upstream {
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(err.to_string(), "request failed with status 500: boom");

        let err = FetchError::Timeout {
            after: Duration::from_secs(60),
        };
        assert_eq!(err.to_string(), "request to reader timed out after 60s");
    }
}
