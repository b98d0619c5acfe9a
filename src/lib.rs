//! Go-Arena: a networked Go server with a heuristic opponent.
//!
//! Two remote players (or one player and the built-in bot) play a full game
//! of Go over a small binary protocol: legal moves, captures, ko, passing,
//! negotiated dead stones and final scoring.
//!
//! ## Modules
//!
//! - [`constants`] - Board limits, heuristic weights, protocol codes
//! - [`board`] - Stones, points, the grid and coordinate notation
//! - [`rules`] - Legality, captures, ko, territory and scoring
//! - [`candidates`] - Static move evaluation and candidate shortlists
//! - [`bot`] - The automated player (one-ply look-ahead)
//! - [`movelog`] - Move history text format and replay
//! - [`protocol`] - Binary frame codec
//! - [`session`] - Game state machine and async session driver
//! - [`store`] - Persistence of finished games
//! - [`server`] - TCP accept loop and matchmaking
//!
//! ## Example
//!
//! ```
//! use go_arena::board::{Board, Stone, parse_coord};
//! use go_arena::bot::{SmartBot, Strategy};
//! use go_arena::rules::Rules;
//!
//! let mut board = Board::new(9);
//! let mut rules = Rules::new();
//!
//! // Play a move
//! let d4 = parse_coord("D4", 9).unwrap();
//! rules.try_place(&mut board, d4, Stone::Black).unwrap();
//!
//! // Ask the bot for a reply
//! let mut bot = SmartBot::with_seed(1);
//! if let Some(reply) = bot.choose_move(&rules, &board, Stone::White) {
//!     println!("White plays {reply}");
//! }
//! ```

pub mod board;
pub mod bot;
pub mod candidates;
pub mod constants;
pub mod movelog;
pub mod protocol;
pub mod rules;
pub mod server;
pub mod session;
pub mod store;
