//! Connection registry for the relay
//!
//! This module tracks every open WebSocket connection together with the
//! player identity it has bound, including:
//! - Connection lifecycle (open, bind on first state, close)
//! - The last state snapshot each player reported
//! - Target resolution for moderation and rank commands
//! - Non-blocking fan-out through per-connection outbound queues
//!
//! The registry itself is a plain owned table. Callers share it behind a
//! single lock so that mutation and broadcast iteration never interleave.

use log::{debug, info, warn};
use shared::{names_match, PlayerState, WILDCARD_TARGET};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Frames a connection may have waiting before further frames to it are dropped
pub const OUTBOUND_CAPACITY: usize = 1024;

/// Queue feeding one connection's socket writer task.
pub type OutboundSender = mpsc::Sender<String>;
pub type OutboundReceiver = mpsc::Receiver<String>;

/// Creates the bounded outbound queue for a new connection
pub fn outbound_queue() -> (OutboundSender, OutboundReceiver) {
    mpsc::channel(OUTBOUND_CAPACITY)
}

/// Represents one open connection and the player bound to it
///
/// Each connection maintains:
/// - Connection metadata (ID, peer address, open time)
/// - The outbound queue drained by its writer task
/// - The player identity bound by its first state update, if any
#[derive(Debug)]
pub struct Connection {
    /// Relay-assigned connection identifier
    pub id: u32,
    /// Peer address, for logging
    pub addr: SocketAddr,
    /// When the socket was accepted
    pub connected_at: Instant,
    /// Player identifier bound by the first state update
    pub player_id: Option<String>,
    /// Most recent state reported over this connection
    pub last_state: Option<PlayerState>,
    /// Set once another connection took over this one's identifier
    pub displaced: bool,
    sender: OutboundSender,
}

impl Connection {
    pub fn new(id: u32, addr: SocketAddr, sender: OutboundSender) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            player_id: None,
            last_state: None,
            displaced: false,
            sender,
        }
    }

    /// Queues a frame for this connection without waiting on the socket.
    ///
    /// Returns false if the writer has gone away or its queue is full; in
    /// the latter case this frame is dropped for this peer only.
    pub fn send(&self, frame: &str) -> bool {
        match self.sender.try_send(frame.to_string()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Connection {} outbound queue full, dropping frame", self.id);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Display name from the last reported state
    pub fn display_name(&self) -> Option<&str> {
        self.last_state.as_ref().map(|state| state.name.as_str())
    }

    pub fn is_bound(&self) -> bool {
        self.player_id.is_some()
    }

    /// True once the connection has bound an identifier, even if it lost it since
    fn has_claimed(&self) -> bool {
        self.is_bound() || self.displaced
    }
}

/// Result of recording a state update against a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// First state on this connection; identity is now bound
    Bound,
    /// Identity was already claimed; only the stored state changed
    Updated,
    /// First state on this connection, and it took the identifier over
    /// from another live connection
    Displaced { previous_connection: u32 },
    /// No such connection
    Unknown,
}

/// Tracks all open connections and their bound players
///
/// The registry provides the relay with one authoritative view of who is
/// connected. It guarantees at most one live binding per player identifier
/// and drops a connection's entry as soon as it closes.
pub struct ConnectionRegistry {
    /// Open connections indexed by connection ID
    connections: HashMap<u32, Connection>,
    /// Next connection ID to hand out
    next_connection_id: u32,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    /// Creates an empty registry
    ///
    /// Connection IDs start from 1 and increment for each accepted socket.
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
            next_connection_id: 1,
        }
    }

    /// Registers a newly accepted socket
    ///
    /// The connection starts unbound; it receives broadcasts right away but
    /// has no player identity until its first state update arrives.
    pub fn add_connection(&mut self, addr: SocketAddr, sender: OutboundSender) -> u32 {
        let connection_id = self.next_connection_id;
        self.next_connection_id += 1;

        info!("Connection {} opened from {}", connection_id, addr);
        self.connections
            .insert(connection_id, Connection::new(connection_id, addr, sender));

        connection_id
    }

    /// Removes a connection, returning its entry if it was still registered
    ///
    /// Dropping the entry also drops its outbound queue, which lets the
    /// writer task flush and exit.
    pub fn remove_connection(&mut self, connection_id: u32) -> Option<Connection> {
        let removed = self.connections.remove(&connection_id);
        if let Some(connection) = &removed {
            info!(
                "Connection {} closed (player {:?}, open for {:?})",
                connection.id,
                connection.player_id,
                connection.connected_at.elapsed()
            );
        }
        removed
    }

    /// Records a state snapshot reported over a connection
    ///
    /// The first snapshot binds `state.id` to the connection for the rest of
    /// its lifetime; later snapshots only replace the stored state, even if
    /// they carry a different identifier. When a new binding collides with
    /// an identifier already bound elsewhere, the newer connection wins and
    /// the older one stays unbound until it closes.
    pub fn record_state(&mut self, connection_id: u32, state: PlayerState) -> BindOutcome {
        let claimed = match self.connections.get(&connection_id) {
            Some(connection) => connection.has_claimed(),
            None => return BindOutcome::Unknown,
        };

        if claimed {
            if let Some(connection) = self.connections.get_mut(&connection_id) {
                connection.last_state = Some(state);
            }
            return BindOutcome::Updated;
        }

        let previous = self.find_by_player_id(&state.id);
        if let Some(previous_id) = previous {
            warn!(
                "Player id {:?} claimed by connection {} while bound to connection {}; unbinding the older connection",
                state.id, connection_id, previous_id
            );
            if let Some(old) = self.connections.get_mut(&previous_id) {
                old.player_id = None;
                old.last_state = None;
                old.displaced = true;
            }
        }

        let player_id = state.id.clone();
        if let Some(connection) = self.connections.get_mut(&connection_id) {
            info!("Connection {} bound to player {:?}", connection_id, player_id);
            connection.player_id = Some(player_id);
            connection.last_state = Some(state);
        }

        match previous {
            Some(previous_connection) => BindOutcome::Displaced {
                previous_connection,
            },
            None => BindOutcome::Bound,
        }
    }

    /// Finds the connection currently bound to a player identifier
    pub fn find_by_player_id(&self, player_id: &str) -> Option<u32> {
        self.connections
            .values()
            .find(|connection| connection.player_id.as_deref() == Some(player_id))
            .map(|connection| connection.id)
    }

    /// Finds every connection whose last display name matches `name`
    ///
    /// Matching is case-insensitive and exact. Display names are not unique,
    /// so more than one connection may match.
    pub fn find_by_name(&self, name: &str) -> Vec<u32> {
        let mut matches: Vec<u32> = self
            .connections
            .values()
            .filter(|connection| {
                connection
                    .display_name()
                    .map(|display| names_match(display, name))
                    .unwrap_or(false)
            })
            .map(|connection| connection.id)
            .collect();
        matches.sort_unstable();
        matches
    }

    /// Resolves a moderation target to connection IDs
    ///
    /// The wildcard addresses every open connection, bound or not; anything
    /// else is matched by display name.
    pub fn resolve_target(&self, target: &str) -> Vec<u32> {
        if target == WILDCARD_TARGET {
            self.connection_ids()
        } else {
            self.find_by_name(target)
        }
    }

    /// Queues a frame for one connection. Returns false if it was not delivered.
    pub fn send_to(&self, connection_id: u32, frame: &str) -> bool {
        match self.connections.get(&connection_id) {
            Some(connection) => {
                let sent = connection.send(frame);
                if !sent {
                    debug!("Skipping connection {}: frame not queued", connection_id);
                }
                sent
            }
            None => false,
        }
    }

    /// Queues a frame for each listed connection, returning how many accepted it
    ///
    /// A failure on one connection never stops delivery to the rest.
    pub fn send_to_many(&self, connection_ids: &[u32], frame: &str) -> usize {
        connection_ids
            .iter()
            .filter(|connection_id| self.send_to(**connection_id, frame))
            .count()
    }

    /// Queues a frame for every open connection except `exclude`
    pub fn broadcast(&self, frame: &str, exclude: Option<u32>) -> usize {
        let targets: Vec<u32> = self
            .connections
            .keys()
            .copied()
            .filter(|connection_id| Some(*connection_id) != exclude)
            .collect();
        self.send_to_many(&targets, frame)
    }

    pub fn get(&self, connection_id: u32) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// IDs of all open connections, in ascending order
    pub fn connection_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.connections.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Player identifiers currently bound
    pub fn bound_players(&self) -> Vec<String> {
        self.connections
            .values()
            .filter_map(|connection| connection.player_id.clone())
            .collect()
    }

    /// Returns the number of open connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns true if no connections are open
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
