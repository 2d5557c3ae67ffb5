//! JSON text-frame protocol spoken over the `/ws` endpoint.
//!
//! Every frame is `{"type": ..., "payload": ...}`. Inbound and outbound kinds
//! are kept in separate enums so the relay can only ever emit server messages.

use crate::{PlayerState, Rank};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatPayload {
    pub name: String,
    pub text: String,
}

fn default_reason() -> String {
    "kick".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct KickPayload {
    pub target: String,
    #[serde(default = "default_reason")]
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RankUpdate {
    pub target: String,
    pub rank: Rank,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LeavePayload {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct KickNotice {
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RankNotice {
    pub rank: Rank,
}

/// Frames a client may send to the relay.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    #[serde(rename = "PLAYER_STATE")]
    PlayerState(PlayerState),
    #[serde(rename = "CHAT_MESSAGE")]
    ChatMessage(ChatPayload),
    #[serde(rename = "KICK_PLAYER")]
    KickPlayer(KickPayload),
    #[serde(rename = "UPDATE_RANK")]
    UpdateRank(RankUpdate),
}

/// Frames the relay sends to clients.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    #[serde(rename = "PLAYER_STATE")]
    PlayerState(PlayerState),
    #[serde(rename = "PLAYER_LEAVE")]
    PlayerLeave(LeavePayload),
    #[serde(rename = "CHAT_MESSAGE")]
    ChatMessage(ChatPayload),
    #[serde(rename = "KICK_ALL")]
    KickAll(KickNotice),
    #[serde(rename = "UPDATE_RANK")]
    UpdateRank(RankNotice),
}

impl ClientMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::PlayerState(_) => "PLAYER_STATE",
            ClientMessage::ChatMessage(_) => "CHAT_MESSAGE",
            ClientMessage::KickPlayer(_) => "KICK_PLAYER",
            ClientMessage::UpdateRank(_) => "UPDATE_RANK",
        }
    }
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Decodes one inbound text frame.
///
/// Any structural problem (bad JSON, unknown `type`, missing or ill-typed
/// payload fields) is reported as an error; callers drop such frames.
pub fn decode_client_message(text: &str) -> Result<ClientMessage, serde_json::Error> {
    serde_json::from_str(text)
}

#[derive(Deserialize)]
struct InboundPayload<'a> {
    #[serde(borrow)]
    payload: &'a RawValue,
}

#[derive(Serialize)]
struct OutboundState<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    payload: &'a RawValue,
}

/// Re-wraps an inbound `PLAYER_STATE` frame for forwarding.
///
/// The payload text is copied byte for byte, so fields the reader of
/// [`PlayerState`] would default or never look at reach peers unchanged.
pub fn forward_state_frame(text: &str) -> Result<String, serde_json::Error> {
    let inbound: InboundPayload = serde_json::from_str(text)?;
    serde_json::to_string(&OutboundState {
        kind: "PLAYER_STATE",
        payload: inbound.payload,
    })
}
