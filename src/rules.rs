//! Go rules: legality, captures, ko, territory and dead stones.
//!
//! [`Rules`] holds the per-game state that is not part of the board itself:
//! the capture counters and the ko reference (the position before the most
//! recent placement). Pure helpers such as [`explore_group`],
//! [`simulate_captures`] and [`score_territory`] never touch that state and
//! are safe to call on throwaway boards.
//!
//! A move is legal when the target is an empty point on the board, the
//! resulting position (after captures) is not the ko reference, and the
//! placed stone's group keeps at least one liberty. Capturing moves gain
//! liberties from the removed stones, so they are never suicide.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::{Board, Point, Stone};

/// Reason a placement was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    /// Point is outside the board
    OffBoard,
    /// Point is not empty
    Occupied,
    /// Move would recreate the position before the opponent's last move
    Ko,
    /// Move would leave its own group without liberties
    Suicide,
    /// Only Black or White stones can be placed
    NotAStone,
}

impl fmt::Display for MoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveError::OffBoard => write!(f, "illegal move: point not on board"),
            MoveError::Occupied => write!(f, "illegal move: point not empty"),
            MoveError::Ko => write!(f, "illegal move: retakes ko"),
            MoveError::Suicide => write!(f, "illegal move: suicide"),
            MoveError::NotAStone => write!(f, "illegal move: empty is not a color"),
        }
    }
}

impl std::error::Error for MoveError {}

/// Stones removed by each side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Captures {
    /// White stones taken by Black
    pub black: u32,
    /// Black stones taken by White
    pub white: u32,
}

impl Captures {
    pub fn of(&self, color: Stone) -> u32 {
        match color {
            Stone::Black => self.black,
            Stone::White => self.white,
            Stone::Empty => 0,
        }
    }

    fn add(&mut self, color: Stone, n: usize) {
        match color {
            Stone::Black => self.black += n as u32,
            Stone::White => self.white += n as u32,
            Stone::Empty => {}
        }
    }
}

/// Empty points owned by each side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Territory {
    pub black: u32,
    pub white: u32,
}

/// Territory plus captures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub black: u32,
    pub white: u32,
}

impl Score {
    /// The leading color, or `None` for a tie.
    pub fn leader(&self) -> Option<Stone> {
        match self.black.cmp(&self.white) {
            std::cmp::Ordering::Greater => Some(Stone::Black),
            std::cmp::Ordering::Less => Some(Stone::White),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// A connected group and its liberties.
#[derive(Debug, Clone, Default)]
pub struct Group {
    pub members: Vec<Point>,
    pub liberties: Vec<Point>,
}

/// Rules engine state for one game.
#[derive(Debug, Clone, Default)]
pub struct Rules {
    captures: Captures,
    /// Position before the most recent placement (or at the most recent pass)
    ko_reference: Option<Board>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn captures(&self) -> Captures {
        self.captures
    }

    /// Try to place `color` at `pt`.
    ///
    /// The move is simulated on a scratch copy first. On success the scratch
    /// board replaces `board`, the old position becomes the ko reference and
    /// the capture counter grows; the number of captured stones is returned.
    /// On failure nothing changes.
    pub fn try_place(&mut self, board: &mut Board, pt: Point, color: Stone) -> Result<usize, MoveError> {
        if color == Stone::Empty {
            return Err(MoveError::NotAStone);
        }
        match board.get(pt) {
            None => return Err(MoveError::OffBoard),
            Some(Stone::Empty) => {}
            Some(_) => return Err(MoveError::Occupied),
        }

        let mut scratch = board.clone();
        scratch.set(pt, color);
        let captured = remove_captured(&mut scratch, pt, color);

        if self.ko_reference.as_ref() == Some(&scratch) {
            return Err(MoveError::Ko);
        }
        if explore_group(&scratch, pt, color).liberties.is_empty() {
            return Err(MoveError::Suicide);
        }

        self.ko_reference = Some(std::mem::replace(board, scratch));
        self.captures.add(color, captured);
        Ok(captured)
    }

    /// Check a placement on throwaway copies. Neither `self` nor `board` changes.
    pub fn is_legal(&self, board: &Board, pt: Point, color: Stone) -> bool {
        let mut rules = self.clone();
        let mut scratch = board.clone();
        rules.try_place(&mut scratch, pt, color).is_ok()
    }

    /// Remove opponent groups left without liberties next to `pt` and credit `color`.
    ///
    /// Assumes the stone at `pt` has already been placed. Returns the number
    /// of stones removed.
    pub fn resolve_captures(&mut self, board: &mut Board, pt: Point, color: Stone) -> usize {
        let captured = remove_captured(board, pt, color);
        self.captures.add(color, captured);
        captured
    }

    /// Record a pass. The current position becomes the ko reference, which
    /// lifts any pending ko restriction.
    pub fn pass(&mut self, board: &Board) {
        self.ko_reference = Some(board.clone());
    }

    /// Clear stones agreed dead, crediting each one to its opponent.
    ///
    /// Empty and off-board points are skipped. Returns the number of stones removed.
    pub fn remove_dead_groups(&mut self, board: &mut Board, points: &[Point]) -> usize {
        let mut removed = 0;
        for &pt in points {
            match board.get(pt) {
                Some(stone @ (Stone::Black | Stone::White)) => {
                    self.captures.add(stone.opponent(), 1);
                    board.set(pt, Stone::Empty);
                    removed += 1;
                }
                _ => {}
            }
        }
        removed
    }

    /// Territory plus captures for both sides.
    pub fn final_score(&self, board: &Board) -> Score {
        let territory = score_territory(board);
        Score {
            black: territory.black + self.captures.black,
            white: territory.white + self.captures.white,
        }
    }
}

/// Breadth-first search over the `color` group containing `seed`.
///
/// `seed` is always treated as a member, so this also answers "what group
/// would a stone of `color` at `seed` belong to" on a board where the stone
/// was just placed.
pub fn explore_group(board: &Board, seed: Point, color: Stone) -> Group {
    let size = board.size();
    let mut seen = vec![false; size * size];
    let mut liberty_seen = vec![false; size * size];
    let mut group = Group::default();
    let mut queue = VecDeque::new();

    if !board.contains(seed) {
        return group;
    }
    seen[seed.y * size + seed.x] = true;
    queue.push_back(seed);

    while let Some(pt) = queue.pop_front() {
        group.members.push(pt);
        for n in board.neighbors(pt) {
            let i = n.y * size + n.x;
            match board.get(n) {
                Some(Stone::Empty) => {
                    if !liberty_seen[i] {
                        liberty_seen[i] = true;
                        group.liberties.push(n);
                    }
                }
                Some(c) if c == color && !seen[i] => {
                    seen[i] = true;
                    queue.push_back(n);
                }
                _ => {}
            }
        }
    }
    group
}

/// Remove dead opponent groups adjacent to `pt`. Each group is counted once
/// even when it touches `pt` from several sides.
fn remove_captured(board: &mut Board, pt: Point, color: Stone) -> usize {
    let enemy = color.opponent();
    let mut processed: Vec<Point> = Vec::new();
    let mut captured = 0;

    let neighbors: Vec<Point> = board.neighbors(pt).collect();
    for n in neighbors {
        if !board.is(n, enemy) || processed.contains(&n) {
            continue;
        }
        let group = explore_group(board, n, enemy);
        if group.liberties.is_empty() {
            captured += group.members.len();
            for &m in &group.members {
                board.set(m, Stone::Empty);
            }
        } else {
            processed.extend(group.members);
        }
    }
    captured
}

/// Number of opponent stones a `color` stone at `pt` would capture.
///
/// Works on a private copy; neither `board` nor any counter is touched.
/// Returns 0 if `pt` is not an empty point.
pub fn simulate_captures(board: &Board, pt: Point, color: Stone) -> usize {
    play_on_copy(board, pt, color).map_or(0, |(_, captured)| captured)
}

/// Place a stone on a copy of `board` and resolve captures, ignoring ko and suicide.
///
/// Returns the resulting board and the number of stones captured, or `None`
/// if `pt` is not an empty point.
pub fn play_on_copy(board: &Board, pt: Point, color: Stone) -> Option<(Board, usize)> {
    if !board.is(pt, Stone::Empty) || color == Stone::Empty {
        return None;
    }
    let mut scratch = board.clone();
    scratch.set(pt, color);
    let captured = remove_captured(&mut scratch, pt, color);
    Some((scratch, captured))
}

/// Count empty regions bordered by a single color.
///
/// A region touching both colors, or no stones at all, counts for nobody.
pub fn score_territory(board: &Board) -> Territory {
    let size = board.size();
    let mut seen = vec![false; size * size];
    let mut territory = Territory::default();

    for start in board.points() {
        let i = start.y * size + start.x;
        if seen[i] || !board.is(start, Stone::Empty) {
            continue;
        }

        seen[i] = true;
        let mut queue = VecDeque::from([start]);
        let mut region = 0u32;
        let mut touches_black = false;
        let mut touches_white = false;

        while let Some(pt) = queue.pop_front() {
            region += 1;
            for n in board.neighbors(pt) {
                match board.get(n) {
                    Some(Stone::Black) => touches_black = true,
                    Some(Stone::White) => touches_white = true,
                    Some(Stone::Empty) => {
                        let j = n.y * size + n.x;
                        if !seen[j] {
                            seen[j] = true;
                            queue.push_back(n);
                        }
                    }
                    None => {}
                }
            }
        }

        match (touches_black, touches_white) {
            (true, false) => territory.black += region,
            (false, true) => territory.white += region,
            _ => {}
        }
    }
    territory
}
