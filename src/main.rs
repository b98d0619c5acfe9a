//! Go-Arena: networked Go server.
//!
//! ## Usage
//!
//! - `go-arena` - Serve on 127.0.0.1:8000 with a 19x19 board
//! - `go-arena serve --port 9000 --size 13` - Serve with custom settings
//! - `go-arena demo` - Watch the bot play itself on a 9x9 board

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use go_arena::board::Stone;
use go_arena::bot::{SmartBot, Strategy};
use go_arena::constants::{DEFAULT_PORT, DEFAULT_SIZE, MAX_SIZE, MIN_SIZE};
use go_arena::server::{self, ServerConfig};
use go_arena::session::{Event, Game, GameRecord, Mode, Phase};

/// Go-Arena: play Go over TCP against people or a heuristic bot
#[derive(Parser)]
#[command(name = "go-arena")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Accept players and run games (the default)
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Board size for every game
        #[arg(short, long, default_value_t = DEFAULT_SIZE)]
        size: usize,

        /// JSON-lines file that finished games are appended to
        #[arg(long, default_value = "games.jsonl")]
        store: PathBuf,

        /// Seed for the bots, for reproducible games
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Let the bot play against itself and print the result
    Demo {
        #[arg(short, long, default_value_t = 9)]
        size: usize,

        #[arg(long)]
        seed: Option<u64>,

        /// Stop after this many turns even if nobody passed
        #[arg(long, default_value_t = 400)]
        max_moves: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve {
            host,
            port,
            size,
            store,
            seed,
        }) => {
            let config = ServerConfig {
                host,
                port,
                board_size: size,
                store_path: store,
                seed,
            };
            server::run(config).await
        }
        None => server::run(ServerConfig::default()).await,
        Some(Commands::Demo { size, seed, max_moves }) => run_demo(size, seed, max_moves),
    }
}

fn run_demo(size: usize, seed: Option<u64>, max_moves: usize) -> Result<()> {
    if !(MIN_SIZE..=MAX_SIZE).contains(&size) {
        bail!("board size {size} is outside {MIN_SIZE}..={MAX_SIZE}");
    }

    let bot = |offset: u64| seed.map_or_else(SmartBot::new, |s| SmartBot::with_seed(s.wrapping_add(offset)));
    let mut black = bot(0);
    let mut white = bot(1);

    println!("Go-Arena: bot vs bot on {size}x{size}\n");

    let mut game = Game::new(size, Mode::VsBot);
    let mut record: Option<GameRecord> = None;
    let mut turns = 0;

    while !game.is_finished() && turns < max_moves {
        let step = match game.phase() {
            Phase::AwaitingMove(side) => {
                turns += 1;
                let player = if side == Stone::Black { &mut black } else { &mut white };
                let choice = player.choose_move(game.rules(), game.board(), side);
                game.play_choice(side, choice)
            }
            Phase::Proposing(side) => game.handle(side, Event::Propose(Vec::new())),
            Phase::AwaitingResponse(side) => game.handle(side, Event::Accept),
            Phase::Finished => break,
        };
        if step.record.is_some() {
            record = step.record;
        }
    }

    let captures = game.rules().captures();
    println!("{}", game.board());
    println!("Moves: {}", game.log());
    println!("Captures: Black {}, White {}", captures.black, captures.white);

    match record {
        Some(record) => println!(
            "Final score: Black {}, White {} (winner: {})",
            record.black_score, record.white_score, record.winner
        ),
        None => {
            let score = game.rules().final_score(game.board());
            println!(
                "Stopped after {turns} turns. Score so far: Black {}, White {}",
                score.black, score.white
            );
        }
    }
    Ok(())
}
