use reader_mcp_server::config::ServerConfig;
use reader_mcp_server::server::McpServer;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = match ServerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("reader-mcp-server: configuration error: {e}");
            std::process::exit(1);
        }
    };

    let server = match McpServer::new(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("reader-mcp-server: startup error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "fatal error");
        std::process::exit(1);
    }
}
