use clap::Parser;
use log::{error, info};
use server::command_log::MemoryStorage;
use server::config::ServerConfig;
use server::network::Server;
use std::sync::Arc;

/// Main-method of the relay server.
/// Parses command-line arguments, binds the listener, then serves until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ServerConfig::parse();
    let storage = Arc::new(MemoryStorage::new());
    let server = Server::bind(&config, storage).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
