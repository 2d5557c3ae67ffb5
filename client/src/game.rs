//! Client-side world state: own avatar, remote players, NPCs and chat

use log::{debug, info};
use rand::Rng;
use shared::{
    Effect, PlayerState, Position, Rank, ServerMessage, MAP_HEIGHT, MAP_WIDTH,
    MOVEMENT_SPEED_BASE,
};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Number of chat lines kept for display
pub const CHAT_HISTORY: usize = 20;
pub const ANNOUNCEMENT_DURATION: Duration = Duration::from_secs(5);
pub const NPC_GROWTH: f64 = 5.0;
pub const NPC_SPEED_BONUS: f64 = 0.02;
const NPC_MARGIN: f64 = 50.0;
const NPC_DRIFT_CHANCE: f64 = 0.05;
const NPC_DRIFT: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Info,
    Error,
    Chat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub text: String,
    pub kind: ChatKind,
}

#[derive(Debug, Clone)]
pub struct Npc {
    pub id: String,
    pub name: String,
    pub pos: Position,
    /// Hue in degrees, used for display colour
    pub hue: u16,
}

/// How the relay told us to leave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Kicked,
    Killed,
}

impl Exit {
    /// "kill" sends the player to the killed page; any other reason is a kick.
    pub fn from_reason(reason: &str) -> Self {
        if reason == "kill" {
            Exit::Killed
        } else {
            Exit::Kicked
        }
    }

    pub fn destination(&self) -> &'static str {
        match self {
            Exit::Kicked => "/kicked.html",
            Exit::Killed => "/killed.html",
        }
    }
}

/// Unit direction for one movement step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Direction {
    pub dx: i8,
    pub dy: i8,
}

impl Direction {
    pub const UP: Direction = Direction { dx: 0, dy: -1 };
    pub const DOWN: Direction = Direction { dx: 0, dy: 1 };
    pub const LEFT: Direction = Direction { dx: -1, dy: 0 };
    pub const RIGHT: Direction = Direction { dx: 1, dy: 0 };

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "up" | "w" => Some(Direction::UP),
            "down" | "s" => Some(Direction::DOWN),
            "left" | "a" => Some(Direction::LEFT),
            "right" | "d" => Some(Direction::RIGHT),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Announcement {
    pub text: String,
    pub expires_at: Instant,
}

pub struct ClientGameState {
    pub player: PlayerState,
    pub speed: f64,
    pub others: HashMap<String, PlayerState>,
    pub npcs: Vec<Npc>,
    pub chat: VecDeque<ChatLine>,
    pub announcement: Option<Announcement>,
    unread: usize,
    npc_serial: u64,
    last_sent: Option<PlayerState>,
}

impl ClientGameState {
    pub fn new(id: &str, name: &str, rank: Rank) -> Self {
        Self {
            player: PlayerState::new(id, name, rank),
            speed: MOVEMENT_SPEED_BASE,
            others: HashMap::new(),
            npcs: Vec::new(),
            chat: VecDeque::with_capacity(CHAT_HISTORY),
            announcement: None,
            unread: 0,
            npc_serial: 0,
            last_sent: None,
        }
    }

    pub fn add_chat(&mut self, text: impl Into<String>, kind: ChatKind) {
        if self.chat.len() == CHAT_HISTORY {
            self.chat.pop_front();
        }
        self.chat.push_back(ChatLine {
            text: text.into(),
            kind,
        });
        self.unread = (self.unread + 1).min(self.chat.len());
    }

    /// Lines added since the last call, oldest first.
    pub fn take_new_lines(&mut self) -> Vec<ChatLine> {
        let skip = self.chat.len() - self.unread;
        self.unread = 0;
        self.chat.iter().skip(skip).cloned().collect()
    }

    /// Applies a relay message. Returns `Some` when the relay told us to leave.
    pub fn apply_server_message(&mut self, message: ServerMessage) -> Option<Exit> {
        match message {
            ServerMessage::PlayerState(state) => {
                if state.id != self.player.id {
                    self.others.insert(state.id.clone(), state);
                }
            }
            ServerMessage::PlayerLeave(leave) => {
                if self.others.remove(&leave.id).is_some() {
                    debug!("Player {} left", leave.id);
                }
            }
            ServerMessage::ChatMessage(chat) => {
                self.add_chat(format!("{}: {}", chat.name, chat.text), ChatKind::Chat);
            }
            ServerMessage::KickAll(notice) => {
                let exit = Exit::from_reason(&notice.reason);
                info!("Removed by relay (reason {:?})", notice.reason);
                return Some(exit);
            }
            ServerMessage::UpdateRank(notice) => {
                self.player.rank = notice.rank;
                self.add_chat(
                    format!("SYSTEM: Your rank has been updated to {}", notice.rank),
                    ChatKind::Info,
                );
            }
        }
        None
    }

    pub fn has_permission(&self, required: Rank) -> bool {
        self.player.rank.permits(required)
    }

    pub fn spawn_npcs<R: Rng>(&mut self, count: usize, rng: &mut R) {
        for _ in 0..count {
            self.npc_serial += 1;
            let npc = Npc {
                id: format!("npc-{}", self.npc_serial),
                name: format!("NPC_{}", rng.gen_range(0..1000)),
                pos: Position {
                    x: rng.gen_range(NPC_MARGIN..MAP_WIDTH - NPC_MARGIN),
                    y: rng.gen_range(NPC_MARGIN..MAP_HEIGHT - NPC_MARGIN),
                },
                hue: rng.gen_range(0..360),
            };
            self.npcs.push(npc);
        }
    }

    /// Moves the avatar one step, twice as far while flying, clamped to the map.
    pub fn step(&mut self, direction: Direction) {
        let speed = if self.player.has_effect(Effect::Fly) {
            self.speed * 2.0
        } else {
            self.speed
        };
        let size = self.player.size;

        let pos = &mut self.player.pos;
        pos.x = (pos.x + f64::from(direction.dx) * speed).clamp(0.0, (MAP_WIDTH - size).max(0.0));
        pos.y = (pos.y + f64::from(direction.dy) * speed).clamp(0.0, (MAP_HEIGHT - size).max(0.0));
    }

    pub fn teleport(&mut self, x: f64, y: f64) {
        self.player.pos = Position { x, y };
    }

    /// Eats every NPC closer than the avatar's size. Returns how many were eaten.
    pub fn eat_nearby_npcs(&mut self) -> usize {
        let origin = self.player.pos;
        let reach = self.player.size;
        let before = self.npcs.len();

        self.npcs.retain(|npc| {
            let dx = npc.pos.x - origin.x;
            let dy = npc.pos.y - origin.y;
            (dx * dx + dy * dy).sqrt() >= reach
        });

        let eaten = before - self.npcs.len();
        if eaten > 0 {
            self.player.size += NPC_GROWTH * eaten as f64;
            self.speed += NPC_SPEED_BONUS * eaten as f64;
            self.player.npcs_eaten += eaten as f64;
        }
        eaten
    }

    pub fn drift_npcs<R: Rng>(&mut self, rng: &mut R) {
        for npc in &mut self.npcs {
            if rng.gen_bool(NPC_DRIFT_CHANCE) {
                let dx = rng.gen_range(-NPC_DRIFT..=NPC_DRIFT);
                let dy = rng.gen_range(-NPC_DRIFT..=NPC_DRIFT);
                npc.pos.x = (npc.pos.x + dx).clamp(0.0, MAP_WIDTH);
                npc.pos.y = (npc.pos.y + dy).clamp(0.0, MAP_HEIGHT);
            }
        }
    }

    pub fn tick_second(&mut self) {
        self.player.seconds_played += 1.0;
    }

    pub fn announce(&mut self, text: &str, now: Instant) {
        self.announcement = Some(Announcement {
            text: text.to_string(),
            expires_at: now + ANNOUNCEMENT_DURATION,
        });
        self.add_chat(format!("ANNOUNCEMENT: {}", text), ChatKind::Info);
    }

    pub fn expire_announcement(&mut self, now: Instant) {
        if let Some(announcement) = &self.announcement {
            if now >= announcement.expires_at {
                self.announcement = None;
            }
        }
    }

    /// Returns the avatar state if it differs from the last one handed out.
    pub fn take_snapshot_if_changed(&mut self) -> Option<PlayerState> {
        if self.last_sent.as_ref() == Some(&self.player) {
            return None;
        }
        self.last_sent = Some(self.player.clone());
        Some(self.player.clone())
    }
}
