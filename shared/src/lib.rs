use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod logs;
pub mod protocol;

pub use logs::{CommandLog, NewCommandLog, ValidationError};
pub use protocol::{
    decode_client_message, forward_state_frame, ChatPayload, ClientMessage, KickNotice,
    KickPayload, LeavePayload, RankNotice, RankUpdate, ServerMessage,
};

pub const MAP_WIDTH: f64 = 2000.0;
pub const MAP_HEIGHT: f64 = 2000.0;
pub const PLAYER_SIZE: f64 = 40.0;
pub const MOVEMENT_SPEED_BASE: f64 = 5.0;
pub const WS_PATH: &str = "/ws";
pub const LOGS_PATH: &str = "/api/logs";

/// Moderation target that addresses every open connection.
pub const WILDCARD_TARGET: &str = "@everyone";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Rank {
    #[default]
    Guest,
    Player,
    Moderator,
    Admin,
    SuperAdmin,
    Owner,
}

impl Rank {
    pub const ALL: [Rank; 6] = [
        Rank::Guest,
        Rank::Player,
        Rank::Moderator,
        Rank::Admin,
        Rank::SuperAdmin,
        Rank::Owner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::Guest => "Guest",
            Rank::Player => "Player",
            Rank::Moderator => "Moderator",
            Rank::Admin => "Admin",
            Rank::SuperAdmin => "SuperAdmin",
            Rank::Owner => "Owner",
        }
    }

    /// True when this rank is at least `required`.
    pub fn permits(&self, required: Rank) -> bool {
        *self >= required
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRank(pub String);

impl fmt::Display for UnknownRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown rank: {}", self.0)
    }
}

impl std::error::Error for UnknownRank {}

impl FromStr for Rank {
    type Err = UnknownRank;

    // Rank names are matched exactly, as they appear on the wire.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rank::ALL
            .iter()
            .copied()
            .find(|rank| rank.as_str() == s)
            .ok_or_else(|| UnknownRank(s.to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Fly,
    God,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

fn default_size() -> f64 {
    PLAYER_SIZE
}

/// Snapshot a client reports about its own avatar.
///
/// The relay never checks these values. It keeps the decoded snapshot for
/// target lookup but forwards the payload exactly as the client sent it, so
/// the defaults below only apply to readers of this struct.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub id: String,
    pub pos: Position,
    #[serde(default)]
    pub rank: Rank,
    #[serde(default = "default_size")]
    pub size: f64,
    pub name: String,
    #[serde(default)]
    pub effects: Vec<Effect>,
    #[serde(default)]
    pub seconds_played: f64,
    #[serde(default)]
    pub npcs_eaten: f64,
}

impl PlayerState {
    pub fn new(id: &str, name: &str, rank: Rank) -> Self {
        Self {
            id: id.to_string(),
            pos: Position {
                x: MAP_WIDTH / 2.0,
                y: MAP_HEIGHT / 2.0,
            },
            rank,
            size: PLAYER_SIZE,
            name: name.to_string(),
            effects: Vec::new(),
            seconds_played: 0.0,
            npcs_eaten: 0.0,
        }
    }

    pub fn has_effect(&self, effect: Effect) -> bool {
        self.effects.contains(&effect)
    }

    /// Adds the effect if missing, removes it otherwise. Returns whether it is now active.
    pub fn toggle_effect(&mut self, effect: Effect) -> bool {
        if self.has_effect(effect) {
            self.effects.retain(|e| *e != effect);
            false
        } else {
            self.effects.push(effect);
            true
        }
    }
}

/// Case-insensitive display-name comparison used for moderation targets.
pub fn names_match(name: &str, target: &str) -> bool {
    name.to_lowercase() == target.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_rank_ordering() {
        assert!(Rank::Guest < Rank::Player);
        assert!(Rank::Player < Rank::Moderator);
        assert!(Rank::Moderator < Rank::Admin);
        assert!(Rank::Admin < Rank::SuperAdmin);
        assert!(Rank::SuperAdmin < Rank::Owner);
    }

    #[test]
    fn test_rank_permits() {
        assert!(Rank::Owner.permits(Rank::Admin));
        assert!(Rank::Admin.permits(Rank::Admin));
        assert!(!Rank::Moderator.permits(Rank::Admin));
        assert!(Rank::Guest.permits(Rank::Guest));
    }

    #[test]
    fn test_rank_from_str_is_exact() {
        assert_eq!("SuperAdmin".parse::<Rank>(), Ok(Rank::SuperAdmin));
        assert_eq!("Owner".parse::<Rank>(), Ok(Rank::Owner));
        assert!("owner".parse::<Rank>().is_err());
        assert!("Root".parse::<Rank>().is_err());
    }

    #[test]
    fn test_player_state_defaults() {
        let state = PlayerState::new("hero-1", "Alice", Rank::Owner);
        assert_eq!(state.id, "hero-1");
        assert_eq!(state.name, "Alice");
        assert_approx_eq!(state.pos.x, MAP_WIDTH / 2.0);
        assert_approx_eq!(state.pos.y, MAP_HEIGHT / 2.0);
        assert_approx_eq!(state.size, PLAYER_SIZE);
        assert!(state.effects.is_empty());
    }

    #[test]
    fn test_player_state_wire_field_names() {
        let state = PlayerState::new("hero-1", "Alice", Rank::Admin);
        let value = serde_json::to_value(&state).unwrap();

        assert_eq!(value["id"], "hero-1");
        assert_eq!(value["rank"], "Admin");
        assert!(value["pos"]["x"].is_number());
        assert!(value.get("secondsPlayed").is_some());
        assert!(value.get("npcsEaten").is_some());
    }

    #[test]
    fn test_player_state_optional_fields_default() {
        let json = r#"{"id":"a","pos":{"x":1,"y":2},"name":"A"}"#;
        let state: PlayerState = serde_json::from_str(json).unwrap();

        assert_eq!(state.rank, Rank::Guest);
        assert_approx_eq!(state.size, PLAYER_SIZE);
        assert_approx_eq!(state.seconds_played, 0.0);
        assert!(state.effects.is_empty());
    }

    #[test]
    fn test_player_state_rejects_unknown_effect() {
        let json = r#"{"id":"a","pos":{"x":1,"y":2},"name":"A","effects":["noclip"]}"#;
        assert!(serde_json::from_str::<PlayerState>(json).is_err());
    }

    #[test]
    fn test_toggle_effect() {
        let mut state = PlayerState::new("a", "A", Rank::Owner);

        assert!(state.toggle_effect(Effect::Fly));
        assert!(state.has_effect(Effect::Fly));
        assert!(state.toggle_effect(Effect::God));
        assert!(!state.toggle_effect(Effect::Fly));
        assert_eq!(state.effects, vec![Effect::God]);
    }

    #[test]
    fn test_names_match_ignores_case() {
        assert!(names_match("Alice", "alice"));
        assert!(names_match("BOB", "bob"));
        assert!(!names_match("Alice", "Alic"));
        assert!(!names_match("Alice", " alice"));
    }
}
