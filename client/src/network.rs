//! WebSocket connection to the relay

use futures_util::{SinkExt, StreamExt};
use log::{debug, info};
use shared::{ClientMessage, ServerMessage};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

pub struct RelayClient {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl RelayClient {
    /// Opens a connection to a relay endpoint such as `ws://127.0.0.1:5000/ws`.
    pub async fn connect(url: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let (socket, _) = connect_async(url).await?;
        info!("Connected to {}", url);
        Ok(RelayClient { socket })
    }

    pub async fn send(&mut self, message: &ClientMessage) -> Result<(), Box<dyn std::error::Error>> {
        let frame = message.to_json()?;
        self.socket.send(Message::Text(frame)).await?;
        Ok(())
    }

    /// Sends a raw text frame, bypassing the typed protocol.
    pub async fn send_raw(&mut self, frame: &str) -> Result<(), Box<dyn std::error::Error>> {
        self.socket.send(Message::Text(frame.to_string())).await?;
        Ok(())
    }

    /// Waits for the next decodable server message.
    ///
    /// Frames that do not decode are skipped. Returns `None` once the
    /// connection is closed. Safe to use inside `tokio::select!`.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        loop {
            match self.socket.next().await {
                Some(Ok(Message::Text(text))) => match ServerMessage::from_json(&text) {
                    Ok(message) => return Some(message),
                    Err(e) => debug!("Skipping undecodable frame: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => return None,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Connection error: {}", e);
                    return None;
                }
            }
        }
    }

    /// Like [`recv`](Self::recv) but gives up after `timeout`.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<ServerMessage> {
        tokio::time::timeout(timeout, self.recv()).await.ok().flatten()
    }

    pub async fn close(mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.socket.close(None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_refused() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let result = tokio_test::block_on(RelayClient::connect(&format!(
            "ws://127.0.0.1:{}/ws",
            port
        )));

        assert!(result.is_err());
    }

    #[test]
    fn test_connect_rejects_bad_url() {
        assert!(tokio_test::block_on(RelayClient::connect("not a url")).is_err());
    }
}
