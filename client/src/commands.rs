//! Chat-line interpreter: plain text becomes chat, `/command args` runs locally
//!
//! Rank checks here are the only ones in the system; the relay forwards
//! whatever it is sent. Every slash command, including denied and unknown
//! ones, yields a command-log record.

use crate::game::{ChatKind, ClientGameState, Direction};
use rand::Rng;
use shared::{
    ChatPayload, ClientMessage, Effect, KickPayload, NewCommandLog, Rank, RankUpdate,
    WILDCARD_TARGET,
};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Chat(String),
    Command { name: String, args: Vec<String> },
}

/// Splits a typed line. Command names are lower-cased; arguments are not.
pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }

    match line.strip_prefix('/') {
        Some(rest) => {
            let mut parts = rest.split_whitespace();
            let name = parts.next().unwrap_or_default().to_lowercase();
            let args = parts.map(str::to_string).collect();
            Input::Command { name, args }
        }
        None => Input::Chat(line.to_string()),
    }
}

/// What the caller must do after a line was handled
#[derive(Debug, Default, PartialEq)]
pub struct Outcome {
    /// Frame to send to the relay
    pub outbound: Option<ClientMessage>,
    /// Record to append to the command log
    pub log: Option<NewCommandLog>,
}

pub fn handle_line<R: Rng>(game: &mut ClientGameState, line: &str, rng: &mut R) -> Outcome {
    match parse_input(line) {
        Input::Empty => Outcome::default(),
        Input::Chat(text) => Outcome {
            outbound: Some(ClientMessage::ChatMessage(ChatPayload {
                name: game.player.name.clone(),
                text,
            })),
            log: None,
        },
        Input::Command { name, args } => {
            let log = NewCommandLog::new(&name, &args, game.player.rank.as_str());
            let outbound = execute(game, &name, &args, rng);
            Outcome {
                outbound,
                log: Some(log),
            }
        }
    }
}

fn required_rank(name: &str) -> Option<Rank> {
    match name {
        "spawn" | "fly" | "speed" | "size" => Some(Rank::Admin),
        "god" | "tp" => Some(Rank::SuperAdmin),
        "announce" | "kick" | "kill" | "rank" | "unrank" => Some(Rank::Owner),
        _ => None,
    }
}

fn parse_number(arg: Option<&String>) -> Option<i64> {
    arg.and_then(|value| value.parse().ok())
}

fn info(game: &mut ClientGameState, text: impl Into<String>) -> Option<ClientMessage> {
    game.add_chat(text, ChatKind::Info);
    None
}

fn error(game: &mut ClientGameState, text: impl Into<String>) -> Option<ClientMessage> {
    game.add_chat(text, ChatKind::Error);
    None
}

/// Runs one command against local state, returning any frame for the relay.
pub fn execute<R: Rng>(
    game: &mut ClientGameState,
    name: &str,
    args: &[String],
    rng: &mut R,
) -> Option<ClientMessage> {
    if let Some(required) = required_rank(name) {
        if !game.has_permission(required) {
            return error(game, "Permission Denied.");
        }
    }

    match name {
        "help" => info(
            game,
            "Available: /move, /spawn, /fly, /speed, /size, /god, /tp, /announce, /kick, /kill, /rank, /unrank",
        ),

        "move" => {
            let Some(direction) = args.first().and_then(|arg| Direction::parse(arg)) else {
                return error(game, "Usage: /move <up|down|left|right> [steps]");
            };
            let steps = parse_number(args.get(1)).unwrap_or(1).clamp(1, 1000);
            for _ in 0..steps {
                game.step(direction);
            }
            None
        }

        "spawn" => {
            let count = parse_number(args.first())
                .filter(|count| *count > 0)
                .unwrap_or(1)
                .min(1000);
            game.spawn_npcs(count as usize, rng);
            info(game, format!("Spawned {} NPCs.", count))
        }

        "fly" => {
            game.player.toggle_effect(Effect::Fly);
            info(game, "Flight mode toggled.")
        }

        "speed" => match parse_number(args.first()) {
            Some(value) => {
                game.speed = value as f64;
                info(game, format!("Speed set to {}", value))
            }
            None => error(game, "Usage: /speed <number>"),
        },

        "size" => match parse_number(args.first()) {
            Some(value) => {
                game.player.size = value as f64;
                info(game, format!("Size set to {}", value))
            }
            None => error(game, "Usage: /size <number>"),
        },

        "god" => {
            game.player.toggle_effect(Effect::God);
            info(game, "GOD MODE TOGGLED")
        }

        "announce" => {
            let text = args.join(" ");
            game.announce(&text, Instant::now());
            None
        }

        "tp" => match (parse_number(args.first()), parse_number(args.get(1))) {
            (Some(x), Some(y)) => {
                game.teleport(x as f64, y as f64);
                info(game, format!("Teleported to {}, {}", x, y))
            }
            _ => error(game, "Usage: /tp <x> <y>"),
        },

        "kick" | "kill" => {
            let Some(target) = args.first() else {
                return error(
                    game,
                    format!("Usage: /{} <name> or /{} {}", name, name, WILDCARD_TARGET),
                );
            };
            game.add_chat(format!("Sent {} request for: {}", name, target), ChatKind::Info);
            Some(ClientMessage::KickPlayer(KickPayload {
                target: target.clone(),
                reason: name.to_string(),
            }))
        }

        "rank" => {
            let (Some(rank_name), Some(target)) = (args.first(), args.get(1)) else {
                return error(
                    game,
                    format!(
                        "Usage: /rank <rank_name> <player_name> or /rank <rank_name> {}",
                        WILDCARD_TARGET
                    ),
                );
            };
            let Ok(rank) = rank_name.parse::<Rank>() else {
                let names: Vec<&str> = Rank::ALL.iter().map(Rank::as_str).collect();
                return error(game, format!("Invalid rank. Ranks: {}", names.join(", ")));
            };
            game.add_chat(
                format!("Sent rank update request for: {} to {}", target, rank),
                ChatKind::Info,
            );
            Some(ClientMessage::UpdateRank(RankUpdate {
                target: target.clone(),
                rank,
            }))
        }

        "unrank" => {
            let Some(target) = args.first() else {
                return error(
                    game,
                    format!(
                        "Usage: /unrank <player_name> or /unrank {}",
                        WILDCARD_TARGET
                    ),
                );
            };
            game.add_chat(format!("Sent unrank request for: {}", target), ChatKind::Info);
            Some(ClientMessage::UpdateRank(RankUpdate {
                target: target.clone(),
                rank: Rank::Guest,
            }))
        }

        _ => error(game, format!("Unknown command: /{}", name)),
    }
}
