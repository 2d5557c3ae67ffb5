use clap::Parser;

/// Admin World relay server
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,

    /// Server port to listen on (0 picks a free port)
    #[arg(short, long, default_value = "5000")]
    pub port: u16,

    /// Path of the WebSocket endpoint
    #[arg(long, default_value = shared::WS_PATH)]
    pub ws_path: String,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            ws_path: shared::WS_PATH.to_string(),
        }
    }
}
