//! Move history and its text form.
//!
//! Each move becomes a semicolon-terminated token: the color letter followed
//! by the bracketed move, e.g. `B[D4];W[PASS];B[SURRENDER];`. The parser also
//! accepts the bare form `BD4;`. Replaying a log through [`Rules`] rebuilds
//! the position and capture counts as of the last move. Dead stones agreed
//! during negotiation are not part of the log.

use std::fmt;
use std::str::FromStr;

use derive_more::{Display, Error};

use crate::board::{Board, Point, Stone, parse_coord, str_coord};
use crate::rules::{MoveError, Rules};

/// What a side did on its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    Place(Point),
    Pass,
    Resign,
    Quit,
}

/// One entry in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRecord {
    pub color: Stone,
    pub kind: MoveKind,
}

impl fmt::Display for MoveRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            MoveKind::Place(pt) => str_coord(pt),
            MoveKind::Pass => "PASS".to_string(),
            MoveKind::Resign => "SURRENDER".to_string(),
            MoveKind::Quit => "QUIT".to_string(),
        };
        write!(f, "{}[{}];", self.color.letter(), kind)
    }
}

/// Failure while reading or replaying a log.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum LogError {
    #[display("malformed move token {token:?}")]
    BadToken { token: String },
    #[display("move {index} ({token}) is illegal: {reason}")]
    IllegalMove {
        index: usize,
        token: String,
        reason: MoveError,
    },
}

/// Append-only history of one game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveLog {
    records: Vec<MoveRecord>,
}

impl MoveLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, color: Stone, kind: MoveKind) {
        self.records.push(MoveRecord { color, kind });
    }

    pub fn records(&self) -> &[MoveRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of stone placements.
    pub fn placements(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.kind, MoveKind::Place(_)))
            .count()
    }

    /// Parse log text for a board of the given size.
    pub fn parse(text: &str, size: usize) -> Result<Self, LogError> {
        let mut log = MoveLog::new();
        for token in text.split(';').map(str::trim).filter(|t| !t.is_empty()) {
            log.records.push(parse_token(token, size)?);
        }
        Ok(log)
    }
}

impl fmt::Display for MoveLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.records {
            write!(f, "{record}")?;
        }
        Ok(())
    }
}

impl FromStr for MoveLog {
    type Err = LogError;

    /// Parse using the default board size.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MoveLog::parse(s, crate::constants::DEFAULT_SIZE)
    }
}

fn parse_token(token: &str, size: usize) -> Result<MoveRecord, LogError> {
    let bad = || LogError::BadToken {
        token: token.to_string(),
    };

    let mut chars = token.chars();
    let color = match chars.next() {
        Some('B') => Stone::Black,
        Some('W') => Stone::White,
        _ => return Err(bad()),
    };

    let rest = chars.as_str();
    let body = match rest.strip_prefix('[') {
        Some(inner) => inner.strip_suffix(']').ok_or_else(bad)?,
        None => rest,
    };

    let kind = match body {
        "PASS" => MoveKind::Pass,
        "SURRENDER" => MoveKind::Resign,
        "QUIT" => MoveKind::Quit,
        coord => MoveKind::Place(parse_coord(coord, size).ok_or_else(bad)?),
    };
    Ok(MoveRecord { color, kind })
}

/// Play a log from an empty board and return the position after the last move.
///
/// Resignations and quits do not change the board. The log has no token for
/// dead stone removal, so for a game settled by an accepted non-empty proposal
/// this is the position before negotiation: the agreed dead stones are still
/// on the board and not yet credited as captures.
pub fn replay(log: &MoveLog, size: usize) -> Result<(Board, Rules), LogError> {
    let mut board = Board::new(size);
    let mut rules = Rules::new();

    for (index, record) in log.records().iter().enumerate() {
        match record.kind {
            MoveKind::Place(pt) => {
                rules
                    .try_place(&mut board, pt, record.color)
                    .map_err(|reason| LogError::IllegalMove {
                        index,
                        token: record.to_string(),
                        reason,
                    })?;
            }
            MoveKind::Pass => rules.pass(&board),
            MoveKind::Resign | MoveKind::Quit => {}
        }
    }
    Ok((board, rules))
}
