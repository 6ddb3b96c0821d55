use std::str::FromStr;
use std::time::Duration;

/// Default reader base URL.
const DEFAULT_READER_ENDPOINT: &str = "http://localhost:3000";

/// Default listen port.
const DEFAULT_PORT: u16 = 8080;

/// Default timeout for one upstream fetch (60 seconds).
const DEFAULT_READER_TIMEOUT_SECS: u64 = 60;

/// Default connect timeout for the reader (10 seconds).
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Idle time after which a session is dropped (30 minutes).
const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;

/// Maximum bytes per JSON-RPC message (1 MiB).
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got '{value}'")]
    InvalidValue {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

fn invalid(name: &'static str, expected: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        expected,
        value: value.to_string(),
    }
}

/// How the MCP endpoint binds HTTP requests to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    /// One POST, one response; no session header.
    #[default]
    Stateless,
    /// `initialize` opens a session tracked by `Mcp-Session-Id`.
    Session,
}

impl FromStr for TransportMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stateless" => Ok(Self::Stateless),
            "session" | "stateful" => Ok(Self::Session),
            _ => Err(invalid("MCP_TRANSPORT", "'stateless' or 'session'", s)),
        }
    }
}

/// Upstream reader settings.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_READER_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_READER_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_host: String,
    pub port: u16,
    pub endpoint_path: String,
    pub transport: TransportMode,
    pub max_body_bytes: usize,
    /// Session mode only: idle sessions older than this are forgotten.
    pub session_ttl: Duration,
    pub reader: ReaderConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            endpoint_path: "/mcp".to_string(),
            transport: TransportMode::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            reader: ReaderConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment.
    ///
    /// - `READER_ENDPOINT` (or `READER_URL`, optional, default `http://localhost:3000`): reader base URL
    /// - `PORT` (optional, default 8080): listen port
    /// - `MCP_BIND_HOST` (optional, default `0.0.0.0`): listen address
    /// - `MCP_ENDPOINT_PATH` (optional, default `/mcp`): path of the MCP endpoint
    /// - `MCP_TRANSPORT` (optional, `stateless` or `session`, default `stateless`)
    /// - `READER_TIMEOUT_SECS` (optional, default 60): max seconds per upstream fetch
    /// - `MCP_MAX_BODY_BYTES` (optional, default 1048576): max request body size
    /// - `MCP_SESSION_TTL_SECS` (optional, default 1800): idle session lifetime
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let base_url = lookup("READER_ENDPOINT")
            .or_else(|| lookup("READER_URL"))
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.reader.base_url);
        match reqwest::Url::parse(&base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(invalid("READER_ENDPOINT", "an absolute http(s) URL", &base_url)),
        }

        let port = match lookup("PORT") {
            Some(val) => val
                .trim()
                .parse::<u16>()
                .map_err(|_| invalid("PORT", "a port number", &val))?,
            None => defaults.port,
        };

        let bind_host = lookup("MCP_BIND_HOST").unwrap_or(defaults.bind_host);

        let endpoint_path = match lookup("MCP_ENDPOINT_PATH") {
            Some(path) if path.starts_with('/') => path,
            Some(path) => return Err(invalid("MCP_ENDPOINT_PATH", "a path starting with '/'", &path)),
            None => defaults.endpoint_path,
        };

        let transport = match lookup("MCP_TRANSPORT") {
            Some(val) => val.parse()?,
            None => defaults.transport,
        };

        let timeout = match lookup("READER_TIMEOUT_SECS") {
            Some(val) => match val.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(invalid("READER_TIMEOUT_SECS", "a positive integer", &val)),
            },
            None => defaults.reader.timeout,
        };

        let max_body_bytes = match lookup("MCP_MAX_BODY_BYTES") {
            Some(val) => match val.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(invalid("MCP_MAX_BODY_BYTES", "a positive integer", &val)),
            },
            None => defaults.max_body_bytes,
        };

        let session_ttl = match lookup("MCP_SESSION_TTL_SECS") {
            Some(val) => match val.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(invalid("MCP_SESSION_TTL_SECS", "a positive integer", &val)),
            },
            None => defaults.session_ttl,
        };

        Ok(Self {
            bind_host,
            port,
            endpoint_path,
            transport,
            max_body_bytes,
            session_ttl,
            reader: ReaderConfig {
                base_url,
                timeout,
                connect_timeout: defaults.reader.connect_timeout,
            },
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}
