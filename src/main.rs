mod config;
mod dispatcher;
mod documents;
mod error;
mod ocr_client;
mod protocol;
mod server;
mod tools;

use anyhow::Result;
use config::{Config, DEFAULT_CONFIG_PATH};
use dispatcher::Dispatcher;
use server::McpServer;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Load configuration (file is optional, API_TOKEN comes from the environment)
    let config_path = std::env::var("HANDWRITING_OCR_CONFIG")
        .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;

    // Initialize logging; stdout is reserved for the protocol
    init_logging(&config.logging.level);
    log::info!("Starting Handwriting OCR MCP server v{}", env!("CARGO_PKG_VERSION"));
    log::info!("API endpoint: {}", config.api.base_url);

    let server = McpServer::new(Dispatcher::new(&config));

    // The blocking stdin reader would keep the runtime alive, so exit explicitly
    if let Err(e) = server.run_stdio(shutdown_signal()).await {
        log::error!("[MCP Error] {:#}", e);
        std::process::exit(1);
    }

    log::info!("Server stopped");
    std::process::exit(0);
}

/// `config.logging.level` is the default filter; `RUST_LOG` takes precedence.
fn init_logging(level: &str) {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.parse_filters(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("Received Ctrl+C, shutting down"),
        _ = terminate => log::info!("Received SIGTERM, shutting down"),
    }
}
