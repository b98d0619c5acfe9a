//! Constants for board geometry, heuristic weights, bot thresholds and the wire protocol.
//!
//! The heuristic weights define the automated player's style. They were tuned
//! by playing against it, not derived, so treat them as knobs rather than a
//! contract.

// =============================================================================
// Board Geometry
// =============================================================================

/// Default board size (NxN).
pub const DEFAULT_SIZE: usize = 19;

/// Smallest board the server accepts.
pub const MIN_SIZE: usize = 2;

/// Largest board the server accepts. Coordinate text uses one letter per column.
pub const MAX_SIZE: usize = 25;

/// Orthogonal neighbor offsets: up, left, right, down.
pub const DIRECTIONS: [(isize, isize); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];

// =============================================================================
// Candidate Heuristic Weights
// =============================================================================

/// Weight for occupying a good line (third line is best).
pub const LOCATION_WEIGHT: f64 = 25.0;

/// Weight per captured opponent stone.
pub const CAPTURE_WEIGHT: f64 = 40.0;

/// Weight for the liberty count of the resulting group.
pub const GROUP_SAFETY_WEIGHT: f64 = 15.0;

/// Weight for local shape (triangles, dumplings, tiger's mouths, eyes).
pub const SHAPE_WEIGHT: f64 = 20.0;

/// Weight for touching opponent stones.
pub const CUT_WEIGHT: f64 = 20.0;

/// Weight for extending or connecting own groups.
pub const CONNECT_WEIGHT: f64 = 5.0;

/// Candidates scoring at or below this are never considered.
pub const SCORE_FLOOR: f64 = -100.0;

/// Number of legal candidates handed to the one-ply search.
pub const CANDIDATE_LIMIT: usize = 10;

// =============================================================================
// Heuristic Lookup Tables
// =============================================================================

/// Points by distance from the nearest edge (index 0 = first line, 4 = fifth line and beyond).
pub const LINE_POINTS: [f64; 5] = [-1.0, 0.0, 2.0, 1.0, 0.5];

/// Points by liberty count of the resulting group (capped at 4).
pub const LIBERTY_POINTS: [f64; 5] = [-1000.0, -30.0, -5.0, 10.0, 20.0];

/// Points by number of separate own groups joined (index 1 is handled as extension).
pub const CONNECTION_POINTS: [f64; 5] = [0.0, 10.0, 20.0, 30.0, 50.0];

/// Score for a move that touches exactly one own group.
pub const EXTEND_POINTS: f64 = 1.0;

/// Bonus for an adjacent empty point that would have three own neighbors.
pub const TIGER_BONUS: f64 = 5.0;

/// Bonus for an adjacent empty point that would be fully surrounded by own stones.
pub const EYE_BONUS: f64 = 10.0;

/// Penalty for more than two own orthogonal neighbors.
pub const DUMPLING_PENALTY: f64 = -25.0;

/// Penalty per empty triangle formed.
pub const TRIANGLE_PENALTY: f64 = -8.0;

// =============================================================================
// Automated Player
// =============================================================================

/// The bot will not pass before it has made this many decisions.
pub const PASS_MIN_MOVES: u32 = 15;

/// Best net balance below which the bot passes (once past the opening).
pub const PASS_BALANCE: f64 = -10_000.0;

/// Candidates within this margin of the best balance are picked at random.
pub const BALANCE_TOLERANCE: f64 = 2.0;

// =============================================================================
// Wire Protocol
// =============================================================================

/// Default server port.
pub const DEFAULT_PORT: u16 = 8000;

/// Mode selector: play against the automated player.
pub const MODE_BOT: i32 = 1;

/// Mode selector: play against another human.
pub const MODE_HUMAN: i32 = 2;

/// Identifier sent to the side playing Black.
pub const PLAYER_BLACK: i32 = 1;

/// Identifier sent to the side playing White.
pub const PLAYER_WHITE: i32 = 2;

pub const MSG_MOVE: i32 = 10;
pub const MSG_PASS: i32 = 11;
pub const MSG_SURRENDER: i32 = 12;
pub const MSG_QUIT: i32 = 13;
pub const MSG_GAME_OVER: i32 = 14;
pub const MSG_INVALID_MOVE: i32 = 15;
pub const MSG_BOARD_STATE: i32 = 16;
pub const MSG_CAPTURES: i32 = 17;
pub const MSG_MESSAGE: i32 = 18;
pub const MSG_START_MARKING: i32 = 19;
pub const MSG_SEND_PROPOSAL: i32 = 20;
pub const MSG_RECEIVE_PROPOSAL: i32 = 21;
pub const MSG_ACCEPT_PROPOSAL: i32 = 22;

/// Upper bound on points in one dead-stone proposal.
pub const MAX_PROPOSAL_POINTS: i32 = (MAX_SIZE * MAX_SIZE) as i32;

/// Frames buffered between a connection's reader task and its session.
pub const INBOX_CAPACITY: usize = 32;
