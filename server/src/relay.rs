//! Message routing between connected players
//!
//! The relay interprets inbound frames and fans the resulting server
//! messages out over the shared [`ConnectionRegistry`]. Every operation takes
//! the registry write lock once and performs its mutation and its fan-out
//! inside that critical section, so a connection that has been removed is
//! never a broadcast target afterwards. Enqueueing never waits on a socket,
//! which keeps the lock hold short regardless of slow peers.

use crate::registry::{outbound_queue, BindOutcome, ConnectionRegistry, OutboundReceiver};
use log::{debug, error, info};
use shared::{
    decode_client_message, forward_state_frame, ChatPayload, ClientMessage, KickNotice, KickPayload, LeavePayload,
    PlayerState, RankNotice, RankUpdate, ServerMessage,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct Relay {
    registry: Arc<RwLock<ConnectionRegistry>>,
}

fn encode(message: &ServerMessage) -> Option<String> {
    match message.to_json() {
        Ok(frame) => Some(frame),
        Err(e) => {
            error!("Failed to encode outbound message: {}", e);
            None
        }
    }
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an accepted socket and hands back its outbound queue.
    pub async fn connect(&self, addr: SocketAddr) -> (u32, OutboundReceiver) {
        let (sender, receiver) = outbound_queue();
        let connection_id = self.registry.write().await.add_connection(addr, sender);
        (connection_id, receiver)
    }

    /// Decodes one text frame and routes it. Malformed frames are dropped.
    ///
    /// State frames are forwarded with the sender's payload text intact.
    pub async fn handle_frame(&self, connection_id: u32, text: &str) {
        match decode_client_message(text) {
            Ok(ClientMessage::PlayerState(state)) => match forward_state_frame(text) {
                Ok(frame) => self.relay_state(connection_id, state, frame).await,
                Err(e) => error!("Failed to re-wrap state frame: {}", e),
            },
            Ok(message) => self.dispatch(connection_id, message).await,
            Err(e) => debug!(
                "Dropping malformed frame from connection {}: {}",
                connection_id, e
            ),
        }
    }

    pub async fn dispatch(&self, connection_id: u32, message: ClientMessage) {
        match message {
            ClientMessage::PlayerState(state) => self.on_state_update(connection_id, state).await,
            ClientMessage::ChatMessage(chat) => self.on_chat_message(connection_id, chat).await,
            ClientMessage::KickPlayer(kick) => {
                self.on_moderation_command(connection_id, kick).await
            }
            ClientMessage::UpdateRank(update) => self.on_rank_update(connection_id, update).await,
        }
    }

    /// Stores the sender's state and forwards it to every other connection.
    pub async fn on_state_update(&self, connection_id: u32, state: PlayerState) {
        let Some(frame) = encode(&ServerMessage::PlayerState(state.clone())) else {
            return;
        };
        self.relay_state(connection_id, state, frame).await;
    }

    async fn relay_state(&self, connection_id: u32, state: PlayerState, frame: String) {
        let mut registry = self.registry.write().await;
        if registry.record_state(connection_id, state) == BindOutcome::Unknown {
            debug!("State update from closed connection {}", connection_id);
            return;
        }
        registry.broadcast(&frame, Some(connection_id));
    }

    /// Forwards a chat line to every connection, the sender included.
    pub async fn on_chat_message(&self, connection_id: u32, chat: ChatPayload) {
        let Some(frame) = encode(&ServerMessage::ChatMessage(chat)) else {
            return;
        };

        let registry = self.registry.read().await;
        let delivered = registry.broadcast(&frame, None);
        debug!(
            "Chat from connection {} delivered to {} connections",
            connection_id, delivered
        );
    }

    /// Sends a disconnect instruction to every connection matching the target.
    ///
    /// The reason is forwarded as given; what it means is up to the client.
    pub async fn on_moderation_command(&self, connection_id: u32, kick: KickPayload) {
        let Some(frame) = encode(&ServerMessage::KickAll(KickNotice {
            reason: kick.reason.clone(),
        })) else {
            return;
        };

        let registry = self.registry.read().await;
        let targets = registry.resolve_target(&kick.target);
        let delivered = registry.send_to_many(&targets, &frame);
        info!(
            "Connection {} issued {:?} against {:?}: {} recipients",
            connection_id, kick.reason, kick.target, delivered
        );
    }

    /// Sends a rank-change instruction to every connection matching the target.
    pub async fn on_rank_update(&self, connection_id: u32, update: RankUpdate) {
        let Some(frame) = encode(&ServerMessage::UpdateRank(RankNotice { rank: update.rank }))
        else {
            return;
        };

        let registry = self.registry.read().await;
        let targets = registry.resolve_target(&update.target);
        let delivered = registry.send_to_many(&targets, &frame);
        info!(
            "Connection {} set rank {} for {:?}: {} recipients",
            connection_id, update.rank, update.target, delivered
        );
    }

    /// Drops the connection and tells everyone left that its player is gone.
    pub async fn on_disconnect(&self, connection_id: u32) {
        let mut registry = self.registry.write().await;
        let Some(connection) = registry.remove_connection(connection_id) else {
            return;
        };

        if let Some(player_id) = connection.player_id {
            if let Some(frame) = encode(&ServerMessage::PlayerLeave(LeavePayload { id: player_id }))
            {
                registry.broadcast(&frame, None);
            }
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.registry.read().await.len()
    }

    pub async fn bound_players(&self) -> Vec<String> {
        self.registry.read().await.bound_players()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Rank;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    fn drain(rx: &mut OutboundReceiver) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            messages.push(ServerMessage::from_json(&frame).unwrap());
        }
        messages
    }

    fn state_frame(id: &str, name: &str) -> String {
        ClientMessage::PlayerState(PlayerState::new(id, name, Rank::Player))
            .to_json()
            .unwrap()
    }

    /// Three connected and bound clients, with their queues drained.
    async fn three_players(
        relay: &Relay,
    ) -> Vec<(u32, OutboundReceiver)> {
        let mut clients = Vec::new();
        for _ in 0..3 {
            clients.push(relay.connect(test_addr()).await);
        }
        for ((conn, _), (id, name)) in clients.iter().zip([("a", "A"), ("b", "B"), ("c", "C")]) {
            relay.handle_frame(*conn, &state_frame(id, name)).await;
        }
        for (_, rx) in clients.iter_mut() {
            drain(rx);
        }
        clients
    }

    #[tokio::test]
    async fn test_state_update_excludes_sender() {
        let relay = Relay::new();
        let (a, mut rx_a) = relay.connect(test_addr()).await;
        let (_b, mut rx_b) = relay.connect(test_addr()).await;
        let (_c, mut rx_c) = relay.connect(test_addr()).await;

        relay.handle_frame(a, &state_frame("a", "A")).await;

        assert!(drain(&mut rx_a).is_empty());
        for rx in [&mut rx_b, &mut rx_c] {
            let messages = drain(rx);
            assert_eq!(messages.len(), 1);
            match &messages[0] {
                ServerMessage::PlayerState(state) => assert_eq!(state.id, "a"),
                other => panic!("Unexpected message: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_chat_includes_sender() {
        let relay = Relay::new();
        let mut clients = three_players(&relay).await;
        let frame = r#"{"type":"CHAT_MESSAGE","payload":{"name":"A","text":"hi"}}"#;

        relay.handle_frame(clients[0].0, frame).await;

        for (_, rx) in clients.iter_mut() {
            let messages = drain(rx);
            assert_eq!(
                messages,
                vec![ServerMessage::ChatMessage(ChatPayload {
                    name: "A".to_string(),
                    text: "hi".to_string(),
                })]
            );
        }
    }

    #[tokio::test]
    async fn test_disconnect_broadcasts_single_leave() {
        let relay = Relay::new();
        let mut clients = three_players(&relay).await;
        let b = clients[1].0;

        relay.on_disconnect(b).await;
        relay.on_disconnect(b).await;

        let leave = ServerMessage::PlayerLeave(LeavePayload {
            id: "b".to_string(),
        });
        assert_eq!(drain(&mut clients[0].1), vec![leave.clone()]);
        assert_eq!(drain(&mut clients[2].1), vec![leave]);
        assert_eq!(relay.connection_count().await, 2);
    }

    #[tokio::test]
    async fn test_disconnect_of_unbound_connection_is_silent() {
        let relay = Relay::new();
        let (a, mut rx_a) = relay.connect(test_addr()).await;
        let (b, _rx_b) = relay.connect(test_addr()).await;
        relay.handle_frame(a, &state_frame("a", "A")).await;

        relay.on_disconnect(b).await;

        assert!(drain(&mut rx_a).is_empty());
    }

    #[tokio::test]
    async fn test_state_after_disconnect_is_not_broadcast() {
        let relay = Relay::new();
        let mut clients = three_players(&relay).await;
        let a = clients[0].0;

        relay.on_disconnect(a).await;
        drain(&mut clients[1].1);
        relay.handle_frame(a, &state_frame("a", "A")).await;

        assert!(drain(&mut clients[1].1).is_empty());
        assert!(drain(&mut clients[2].1).is_empty());
    }

    #[tokio::test]
    async fn test_kick_by_name_reaches_only_target() {
        let relay = Relay::new();
        let mut clients = three_players(&relay).await;
        let frame = r#"{"type":"KICK_PLAYER","payload":{"target":"b","reason":"kick"}}"#;

        relay.handle_frame(clients[0].0, frame).await;

        assert!(drain(&mut clients[0].1).is_empty());
        assert_eq!(
            drain(&mut clients[1].1),
            vec![ServerMessage::KickAll(KickNotice {
                reason: "kick".to_string()
            })]
        );
        assert!(drain(&mut clients[2].1).is_empty());
    }

    #[tokio::test]
    async fn test_kick_everyone_reaches_all() {
        let relay = Relay::new();
        let mut clients = three_players(&relay).await;
        let frame = r#"{"type":"KICK_PLAYER","payload":{"target":"@everyone","reason":"kill"}}"#;

        relay.handle_frame(clients[0].0, frame).await;

        for (_, rx) in clients.iter_mut() {
            assert_eq!(
                drain(rx),
                vec![ServerMessage::KickAll(KickNotice {
                    reason: "kill".to_string()
                })]
            );
        }
    }

    #[tokio::test]
    async fn test_kick_unknown_name_is_noop() {
        let relay = Relay::new();
        let mut clients = three_players(&relay).await;
        let frame = r#"{"type":"KICK_PLAYER","payload":{"target":"nobody","reason":"kick"}}"#;

        relay.handle_frame(clients[0].0, frame).await;

        for (_, rx) in clients.iter_mut() {
            assert!(drain(rx).is_empty());
        }
        assert_eq!(relay.connection_count().await, 3);
    }

    #[tokio::test]
    async fn test_rank_update_reaches_only_matching_names() {
        let relay = Relay::new();
        let mut clients = three_players(&relay).await;
        let frame = r#"{"type":"UPDATE_RANK","payload":{"target":"C","rank":"Admin"}}"#;

        relay.handle_frame(clients[0].0, frame).await;

        assert!(drain(&mut clients[0].1).is_empty());
        assert!(drain(&mut clients[1].1).is_empty());
        assert_eq!(
            drain(&mut clients[2].1),
            vec![ServerMessage::UpdateRank(RankNotice { rank: Rank::Admin })]
        );
    }

    #[tokio::test]
    async fn test_malformed_frames_are_dropped() {
        let relay = Relay::new();
        let mut clients = three_players(&relay).await;

        for frame in ["garbage", "{}", r#"{"type":"CHAT_MESSAGE","payload":5}"#] {
            relay.handle_frame(clients[0].0, frame).await;
        }

        for (_, rx) in clients.iter_mut() {
            assert!(drain(rx).is_empty());
        }
        assert_eq!(relay.connection_count().await, 3);
    }

    #[tokio::test]
    async fn test_closed_peer_does_not_block_broadcast() {
        let relay = Relay::new();
        let (a, _rx_a) = relay.connect(test_addr()).await;
        let (_b, rx_b) = relay.connect(test_addr()).await;
        let (_c, mut rx_c) = relay.connect(test_addr()).await;
        drop(rx_b);

        relay.handle_frame(a, &state_frame("a", "A")).await;

        assert_eq!(drain(&mut rx_c).len(), 1);
    }

    #[tokio::test]
    async fn test_messages_from_one_origin_keep_order() {
        let relay = Relay::new();
        let (a, _rx_a) = relay.connect(test_addr()).await;
        let (_b, mut rx_b) = relay.connect(test_addr()).await;

        for i in 0..20 {
            let frame = ClientMessage::ChatMessage(ChatPayload {
                name: "A".to_string(),
                text: i.to_string(),
            })
            .to_json()
            .unwrap();
            relay.handle_frame(a, &frame).await;
        }

        let texts: Vec<String> = drain(&mut rx_b)
            .into_iter()
            .map(|message| match message {
                ServerMessage::ChatMessage(chat) => chat.text,
                other => panic!("Unexpected message: {:?}", other),
            })
            .collect();
        let expected: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        assert_eq!(texts, expected);
    }

    #[tokio::test]
    async fn test_displaced_connection_does_not_reclaim_id() {
        let relay = Relay::new();
        let (old, _rx_old) = relay.connect(test_addr()).await;
        let (new, mut rx_new) = relay.connect(test_addr()).await;
        let (_watcher, mut rx_watcher) = relay.connect(test_addr()).await;

        relay.handle_frame(old, &state_frame("a", "A")).await;
        relay.handle_frame(new, &state_frame("a", "A")).await;
        relay.handle_frame(old, &state_frame("a", "A")).await;

        let owner = relay.registry.read().await.find_by_player_id("a");
        assert_eq!(owner, Some(new));
        // The displaced connection is still relayed, just never bound again
        assert_eq!(drain(&mut rx_new).len(), 2);
        assert_eq!(drain(&mut rx_watcher).len(), 3);

        // Closing the displaced connection announces nothing
        relay.on_disconnect(old).await;
        assert!(drain(&mut rx_watcher).is_empty());

        relay.on_disconnect(new).await;
        assert_eq!(
            drain(&mut rx_watcher),
            vec![ServerMessage::PlayerLeave(LeavePayload {
                id: "a".to_string()
            })]
        );
    }

    #[tokio::test]
    async fn test_state_payload_forwarded_verbatim() {
        let relay = Relay::new();
        let (a, _rx_a) = relay.connect(test_addr()).await;
        let (_b, mut rx_b) = relay.connect(test_addr()).await;
        let frame = r#"{"type":"PLAYER_STATE","payload":{"id":"a","pos":{"x":0,"y":0},"name":"A","secondsPlayed":-1,"npcsEaten":1.5}}"#;

        relay.handle_frame(a, frame).await;

        let forwarded = rx_b.try_recv().unwrap();
        let value: serde_json::Value = serde_json::from_str(&forwarded).unwrap();
        assert_eq!(value["type"], "PLAYER_STATE");
        assert_eq!(value["payload"]["secondsPlayed"], -1);
        assert_eq!(value["payload"]["npcsEaten"], 1.5);
        assert!(value["payload"].get("rank").is_none());
        assert!(value["payload"].get("size").is_none());
        assert_eq!(relay.bound_players().await, vec!["a".to_string()]);
    }

    #[test]
    fn test_bound_players_tracks_identity() {
        tokio_test::block_on(async {
            let relay = Relay::new();
            let (a, _rx) = relay.connect(test_addr()).await;
            relay.handle_frame(a, &state_frame("a", "A")).await;
            assert_eq!(relay.bound_players().await, vec!["a".to_string()]);
        });
    }
}
