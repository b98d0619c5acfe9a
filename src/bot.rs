//! The automated opponent.
//!
//! [`SmartBot`] is a depth-1 minimax over a static shortlist:
//!
//! 1. Ask [`best_candidates`] for a handful of legal moves.
//! 2. For each one, play it on a scratch board and look up the opponent's best
//!    reply. The candidate's *net balance* is its own score minus that reply's score.
//! 3. Pick uniformly at random among the candidates whose balance is within
//!    [`BALANCE_TOLERANCE`] of the best, so the bot does not repeat itself.
//!
//! Once past the opening, a hopeless best balance makes the bot pass instead.

use tracing::debug;

use crate::board::{Board, Point, Stone};
use crate::candidates::{Candidate, best_candidates};
use crate::constants::{BALANCE_TOLERANCE, CANDIDATE_LIMIT, PASS_BALANCE, PASS_MIN_MOVES};
use crate::rules::Rules;

/// Something that can pick moves for one side.
///
/// The session only depends on this trait, so alternative players can be
/// swapped in without touching it. `None` means pass.
pub trait Strategy: Send {
    fn choose_move(&mut self, rules: &Rules, board: &Board, color: Stone) -> Option<Point>;
}

/// Heuristic player with one ply of look-ahead.
pub struct SmartBot {
    rng: fastrand::Rng,
    /// Number of times `choose_move` has been called
    decisions: u32,
    limit: usize,
}

impl Default for SmartBot {
    fn default() -> Self {
        Self::new()
    }
}

impl SmartBot {
    pub fn new() -> Self {
        Self::with_rng(fastrand::Rng::new())
    }

    /// A bot whose tie-breaking is reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(fastrand::Rng::with_seed(seed))
    }

    fn with_rng(rng: fastrand::Rng) -> Self {
        Self {
            rng,
            decisions: 0,
            limit: CANDIDATE_LIMIT,
        }
    }

    pub fn decisions(&self) -> u32 {
        self.decisions
    }

    /// Pick among `candidates` given their net balances.
    ///
    /// Returns `None` when the bot should pass.
    fn select(&mut self, candidates: &[Candidate], balances: &[f64]) -> Option<Point> {
        let (best_idx, best) = balances
            .iter()
            .copied()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))?;

        if self.decisions > PASS_MIN_MOVES && best < PASS_BALANCE {
            debug!(best, decisions = self.decisions, "nothing useful left, passing");
            return None;
        }

        let near: Vec<usize> = balances
            .iter()
            .enumerate()
            .filter(|&(_, &b)| b >= best - BALANCE_TOLERANCE)
            .map(|(i, _)| i)
            .collect();

        let chosen = if near.is_empty() {
            best_idx
        } else {
            near[self.rng.usize(..near.len())]
        };
        Some(candidates[chosen].point)
    }
}

impl Strategy for SmartBot {
    fn choose_move(&mut self, rules: &Rules, board: &Board, color: Stone) -> Option<Point> {
        self.decisions += 1;

        let candidates = best_candidates(rules, board, color, self.limit);
        if candidates.is_empty() {
            debug!(%color, "no candidates, passing");
            return None;
        }

        let balances: Vec<f64> = candidates
            .iter()
            .map(|c| net_balance(rules, board, c, color))
            .collect();

        for (c, b) in candidates.iter().zip(&balances) {
            debug!(point = %c.point, score = c.score, balance = b, "candidate");
        }

        self.select(&candidates, &balances)
    }
}

/// Candidate score minus the opponent's best reply score after it is played.
///
/// Zero when the opponent has no reply at all.
pub fn net_balance(rules: &Rules, board: &Board, candidate: &Candidate, color: Stone) -> f64 {
    let mut rules = rules.clone();
    let mut scratch = board.clone();
    if rules.try_place(&mut scratch, candidate.point, color).is_err() {
        return f64::NEG_INFINITY;
    }

    best_candidates(&rules, &scratch, color.opponent(), 1)
        .first()
        .map_or(0.0, |reply| candidate.score - reply.score)
}
