//! Connects to a running relay, announces a player, says hello and prints
//! every frame received for a few seconds.

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use shared::{ChatPayload, ClientMessage, PlayerState, Rank, ServerMessage};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Relay WebSocket URL
    #[arg(short, long, default_value = "ws://127.0.0.1:5000/ws")]
    url: String,

    /// Display name to announce
    #[arg(short, long, default_value = "probe")]
    name: String,

    /// Seconds to keep listening
    #[arg(short, long, default_value = "5")]
    listen: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("Connecting to {}", args.url);
    let (mut socket, _) = connect_async(args.url.as_str()).await?;

    let state = PlayerState::new(&format!("probe-{}", std::process::id()), &args.name, Rank::Guest);
    let hello = ClientMessage::ChatMessage(ChatPayload {
        name: args.name.clone(),
        text: "hello from test_client".to_string(),
    });

    for message in [ClientMessage::PlayerState(state), hello] {
        println!("-> {}", message.kind());
        socket.send(Message::Text(message.to_json()?)).await?;
    }

    let deadline = Instant::now() + Duration::from_secs(args.listen);
    loop {
        tokio::select! {
            frame = socket.next() => match frame {
                Some(Ok(Message::Text(text))) => match ServerMessage::from_json(&text) {
                    Ok(message) => println!("<- {:?}", message),
                    Err(_) => println!("<- (undecodable) {}", text),
                },
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    println!("Connection error: {}", e);
                    break;
                }
                None => {
                    println!("Connection closed by server");
                    break;
                }
            },
            _ = sleep_until(deadline) => break,
        }
    }

    socket.close(None).await?;
    Ok(())
}
