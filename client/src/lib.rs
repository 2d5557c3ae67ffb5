//! # Admin World Client Library
//!
//! This library provides the client side of Admin World. The client owns
//! its avatar outright: it moves it, grows it, toggles its effects and
//! reports the result to the relay, which forwards it to everyone else.
//!
//! ## Architecture Overview
//!
//! ### Self-Reported State
//! There is no server simulation. The client keeps the only copy of its own
//! avatar and sends a fresh `PLAYER_STATE` snapshot whenever it changes.
//! Remote avatars are whatever their owners last reported.
//!
//! ### Client-Side Privileges
//! Ranks gate slash commands locally. When the relay forwards a rank change
//! the client applies it to its own state and every later command is checked
//! against the new rank.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! Local world state:
//! - Own avatar, speed, size and stats
//! - Remote players keyed by id
//! - NPC spawning, drifting and eating
//! - Bounded chat history and announcements
//!
//! ### Commands Module (`commands`)
//! Turns typed lines into chat frames or slash commands, enforces rank
//! requirements and produces command-log records.
//!
//! ### Network Module (`network`)
//! WebSocket connection to the relay with typed send and receive.
//!
//! ### Logs Module (`logs`)
//! Uploads command-log records over HTTP.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::commands::handle_line;
//! use client::game::ClientGameState;
//! use client::network::RelayClient;
//! use shared::Rank;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut rng = rand::thread_rng();
//!     let mut game = ClientGameState::new("hero-1", "Alice", Rank::Owner);
//!     let mut relay = RelayClient::connect("ws://127.0.0.1:5000/ws").await?;
//!
//!     if let Some(state) = game.take_snapshot_if_changed() {
//!         relay.send(&shared::ClientMessage::PlayerState(state)).await?;
//!     }
//!
//!     let outcome = handle_line(&mut game, "/kick Bob", &mut rng);
//!     if let Some(message) = outcome.outbound {
//!         relay.send(&message).await?;
//!     }
//!
//!     while let Some(message) = relay.recv().await {
//!         if let Some(exit) = game.apply_server_message(message) {
//!             println!("removed: {}", exit.destination());
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod game;
pub mod logs;
pub mod network;
