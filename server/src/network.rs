//! Server network layer: HTTP listener, WebSocket sessions and routing

use crate::api;
use crate::command_log::LogStorage;
use crate::config::ServerConfig;
use crate::relay::Relay;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, FromRef, State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// State shared by every route
#[derive(Clone)]
pub struct AppState {
    pub relay: Relay,
    pub storage: Arc<dyn LogStorage>,
}

impl FromRef<AppState> for Relay {
    fn from_ref(state: &AppState) -> Self {
        state.relay.clone()
    }
}

impl FromRef<AppState> for Arc<dyn LogStorage> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.storage)
    }
}

/// Builds the router serving the relay endpoint and the command log API.
pub fn router(state: AppState, ws_path: &str) -> Router {
    Router::new()
        .route(ws_path, get(ws_upgrade))
        .route(
            shared::LOGS_PATH,
            get(api::list_logs).post(api::create_log),
        )
        .with_state(state)
}

async fn ws_upgrade(
    State(relay): State<Relay>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_session(socket, relay, addr))
}

/// Drives one WebSocket connection until it closes
///
/// Outbound frames come from the connection's queue and are written by a
/// dedicated task, so a slow socket only delays its own queue. Inbound text
/// frames are handed to the relay one at a time, which preserves the order
/// of this connection's messages at every destination.
async fn run_session(socket: WebSocket, relay: Relay, addr: SocketAddr) {
    let (connection_id, mut outbound) = relay.connect(addr).await;
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => relay.handle_frame(connection_id, text.as_str()).await,
            Ok(Message::Close(_)) => break,
            Ok(Message::Binary(_)) => {
                debug!("Dropping binary frame from connection {}", connection_id);
            }
            Ok(_) => {}
            Err(e) => {
                debug!("Connection {} read error: {}", connection_id, e);
                break;
            }
        }
    }

    // Removing the entry drops the outbound queue, which ends the writer
    relay.on_disconnect(connection_id).await;
    let _ = writer.await;
}

/// Relay server bound to a listening socket
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    relay: Relay,
    storage: Arc<dyn LogStorage>,
    ws_path: String,
}

impl Server {
    pub async fn bind(
        config: &ServerConfig,
        storage: Arc<dyn LogStorage>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(config.address()).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        Ok(Server {
            listener,
            local_addr,
            relay: Relay::new(),
            storage,
            ws_path: config.ws_path.clone(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn relay(&self) -> Relay {
        self.relay.clone()
    }

    /// Serves connections until the listener fails
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let state = AppState {
            relay: self.relay,
            storage: self.storage,
        };
        let app = router(state, &self.ws_path);

        info!(
            "Relay endpoint ws://{}{}, logs at http://{}{}",
            self.local_addr,
            self.ws_path,
            self.local_addr,
            shared::LOGS_PATH
        );

        axum::serve(
            self.listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;

        Ok(())
    }
}
