//! # Admin World Relay Server
//!
//! This library provides the server side of Admin World: a WebSocket relay
//! that fans player state, chat and moderation messages out between
//! connected clients, plus a small HTTP API for the command log.
//!
//! ## Core Responsibilities
//!
//! ### Fan-out Relay
//! The server does not simulate the game. Clients own their own state and
//! report it; the relay forwards each report to everyone else and keeps the
//! latest one per player so moderation commands can find players by name.
//!
//! ### Connection Management
//! Handles the lifecycle of every WebSocket connection:
//! - Registration when the socket is accepted
//! - Identity binding on the first state report
//! - Removal and a leave notification when the socket closes
//!
//! ### Command Log
//! Clients report every slash command they run. The log is append-only and
//! exposed over `POST /api/logs` and `GET /api/logs`.
//!
//! ## Message Routing
//!
//! | Inbound        | Outbound       | Recipients                         |
//! |----------------|----------------|------------------------------------|
//! | `PLAYER_STATE` | `PLAYER_STATE` | every open connection but sender   |
//! | `CHAT_MESSAGE` | `CHAT_MESSAGE` | every open connection              |
//! | `KICK_PLAYER`  | `KICK_ALL`     | name matches, or all for wildcard  |
//! | `UPDATE_RANK`  | `UPDATE_RANK`  | name matches, or all for wildcard  |
//! | socket close   | `PLAYER_LEAVE` | every remaining connection         |
//!
//! Malformed frames are dropped without closing the connection.
//!
//! ## Concurrency Model
//!
//! Each connection runs a reader loop and a writer task. All registry
//! changes and every broadcast go through one `RwLock`, and sends only
//! try to enqueue onto the destination's bounded queue. A client that stops
//! reading misses frames once its queue is full and never holds up delivery
//! to others.
//!
//! ## Module Organization
//!
//! ### Registry Module (`registry`)
//! The connection table: binding, lookup by player id or name, fan-out.
//!
//! ### Relay Module (`relay`)
//! Decodes frames and applies the routing rules above.
//!
//! ### Network Module (`network`)
//! axum router, WebSocket sessions and the listening server.
//!
//! ### Command Log Modules (`command_log`, `api`)
//! Storage trait with an in-memory backend, and the HTTP handlers.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::command_log::MemoryStorage;
//! use server::config::ServerConfig;
//! use server::network::Server;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let server = Server::bind(&config, Arc::new(MemoryStorage::new())).await?;
//!     println!("listening on {}", server.local_addr());
//!     server.run().await
//! }
//! ```
//!
//! ## Security Considerations
//!
//! Player identifiers and display names are chosen by clients and are not
//! verified. A client can claim another player's id (the newer connection
//! takes it over) or reuse a name to attract moderation commands meant for
//! someone else. Rank checks happen only in clients.

pub mod api;
pub mod command_log;
pub mod config;
pub mod network;
pub mod registry;
pub mod relay;
