use clap::Parser;
use client::commands::handle_line;
use client::game::{ChatKind, ClientGameState};
use client::logs::LogReporter;
use client::network::RelayClient;
use log::{error, info, warn};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{ClientMessage, Rank, WS_PATH};
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, Duration, MissedTickBehavior};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:5000")]
    server: String,

    /// Display name (defaults to a random guest name)
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Starting rank
    #[arg(short = 'r', long, default_value = "Owner")]
    rank: Rank,

    /// Number of NPCs to start with
    #[arg(long, default_value = "10")]
    npcs: usize,

    /// Do not upload command logs
    #[arg(long)]
    no_logs: bool,
}

fn random_suffix<R: Rng>(rng: &mut R, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect()
}

fn print_lines(game: &mut ClientGameState) {
    for line in game.take_new_lines() {
        match line.kind {
            ChatKind::Chat => println!("{}", line.text),
            ChatKind::Info => println!("* {}", line.text),
            ChatKind::Error => println!("! {}", line.text),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let mut rng = StdRng::from_entropy();

    let id = format!("hero-{}", random_suffix(&mut rng, 9));
    let name = args
        .name
        .clone()
        .unwrap_or_else(|| format!("Guest_{}", random_suffix(&mut rng, 4)));

    let mut game = ClientGameState::new(&id, &name, args.rank);
    game.spawn_npcs(args.npcs, &mut rng);

    let url = format!("ws://{}{}", args.server, WS_PATH);
    info!("Connecting to: {}", url);
    let mut relay = RelayClient::connect(&url).await?;

    let reporter = (!args.no_logs).then(|| LogReporter::new(&format!("http://{}", args.server)));

    println!("Joined as {} ({}, rank {})", name, id, args.rank);
    println!("Type to chat, /help for commands, Ctrl+D to quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut second = interval(Duration::from_secs(1));
    let mut frame = interval(Duration::from_millis(50));
    frame.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            message = relay.recv() => match message {
                Some(message) => {
                    if let Some(exit) = game.apply_server_message(message) {
                        print_lines(&mut game);
                        println!("Disconnected by server, redirecting to {}", exit.destination());
                        return Ok(());
                    }
                }
                None => {
                    println!("CONNECTION LOST: You have lost connection to the server.");
                    return Ok(());
                }
            },

            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let outcome = handle_line(&mut game, &line, &mut rng);
                    if let (Some(entry), Some(reporter)) = (outcome.log, reporter.clone()) {
                        tokio::spawn(async move {
                            if let Err(e) = reporter.report(&entry).await {
                                warn!("Failed to upload command log: {}", e);
                            }
                        });
                    }
                    if let Some(message) = outcome.outbound {
                        relay.send(&message).await?;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    break;
                }
            },

            _ = second.tick() => game.tick_second(),

            _ = frame.tick() => {
                game.drift_npcs(&mut rng);
                game.eat_nearby_npcs();
                game.expire_announcement(Instant::now());
                if let Some(state) = game.take_snapshot_if_changed() {
                    relay.send(&ClientMessage::PlayerState(state)).await?;
                }
            },
        }

        print_lines(&mut game);
    }

    relay.close().await?;
    Ok(())
}
