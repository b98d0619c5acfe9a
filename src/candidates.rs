//! Static move evaluation and candidate shortlists.
//!
//! Every empty point gets a weighted sum of six heuristics:
//!
//! - **location**: distance from the edge, best on the third line
//! - **capture**: number of opponent stones the move would take
//! - **group safety**: liberties of the group the new stone ends up in
//! - **shape**: empty triangles and dumplings are bad, tiger's mouths and eyes good
//! - **cut**: contact with opponent stones
//! - **connect**: joining separate own groups, with a small reward for extending one
//!
//! No look-ahead happens here; see [`crate::bot`] for the one-ply search on top.

use crate::board::{Board, Point, Stone};
use crate::constants::{
    CAPTURE_WEIGHT, CONNECT_WEIGHT, CONNECTION_POINTS, CUT_WEIGHT, DUMPLING_PENALTY, EXTEND_POINTS,
    EYE_BONUS, GROUP_SAFETY_WEIGHT, LIBERTY_POINTS, LINE_POINTS, LOCATION_WEIGHT, SCORE_FLOOR,
    SHAPE_WEIGHT, TIGER_BONUS, TRIANGLE_PENALTY,
};
use crate::rules::{Rules, explore_group, play_on_copy};

/// A move worth considering, with its static score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub point: Point,
    pub score: f64,
}

/// Return up to `limit` legal candidates for `color`, best first.
///
/// Points scoring at or below [`SCORE_FLOOR`] are dropped before the
/// (comparatively expensive) legality check. Ties keep board order.
pub fn best_candidates(rules: &Rules, board: &Board, color: Stone, limit: usize) -> Vec<Candidate> {
    let mut scored: Vec<Candidate> = board
        .points()
        .filter(|&pt| board.is(pt, Stone::Empty))
        .map(|pt| Candidate {
            point: pt,
            score: point_score(board, pt, color),
        })
        .filter(|c| c.score > SCORE_FLOOR)
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));

    scored
        .into_iter()
        .filter(|c| rules.is_legal(board, c.point, color))
        .take(limit)
        .collect()
}

/// Weighted sum of all heuristics for `color` playing at `pt`.
///
/// Returns negative infinity for occupied or off-board points.
pub fn point_score(board: &Board, pt: Point, color: Stone) -> f64 {
    let Some((after, captured)) = play_on_copy(board, pt, color) else {
        return f64::NEG_INFINITY;
    };

    captured as f64 * CAPTURE_WEIGHT
        + location_score(board, pt) * LOCATION_WEIGHT
        + safety_score(&after, pt, color) * GROUP_SAFETY_WEIGHT
        + shape_score(board, pt, color) * SHAPE_WEIGHT
        + cut_score(board, pt, color) * CUT_WEIGHT
        + connect_score(board, pt, color) * CONNECT_WEIGHT
}

/// Line preference. The third line scores highest, the center is flat from the fifth line on.
pub fn location_score(board: &Board, pt: Point) -> f64 {
    let far = board.size() - 1;
    let distance = pt.x.min(pt.y).min(far - pt.x).min(far - pt.y).min(LINE_POINTS.len() - 1);
    LINE_POINTS[distance]
}

/// Liberties of the group containing `pt` on the board after the move.
fn safety_score(after: &Board, pt: Point, color: Stone) -> f64 {
    let liberties = explore_group(after, pt, color).liberties.len();
    LIBERTY_POINTS[liberties.min(LIBERTY_POINTS.len() - 1)]
}

/// Local shape around `pt`, judged as if `color` had played there.
pub fn shape_score(board: &Board, pt: Point, color: Stone) -> f64 {
    let mine = |dx: isize, dy: isize| {
        board
            .offset(pt, dx, dy)
            .is_some_and(|p| board.is(p, color))
    };
    let empty = |dx: isize, dy: isize| {
        board
            .offset(pt, dx, dy)
            .is_some_and(|p| board.is(p, Stone::Empty))
    };

    let mut score = 0.0;

    // Empty triangles: two own stones at right angles with the corner between them empty
    for (dx, dy) in [(-1, -1), (1, -1), (-1, 1), (1, 1)] {
        if mine(dx, 0) && mine(0, dy) && empty(dx, dy) {
            score += TRIANGLE_PENALTY;
        }
    }

    let mut own_neighbors = 0;
    for n in board.neighbors(pt) {
        match board.get(n) {
            Some(c) if c == color => own_neighbors += 1,
            Some(Stone::Empty) => {
                // `pt` itself counts as own once played
                let around = board.neighbors(n).count();
                let own = 1 + board.neighbors(n).filter(|&m| board.is(m, color)).count();
                if own == around {
                    score += EYE_BONUS;
                } else if own == 3 {
                    score += TIGER_BONUS;
                }
            }
            _ => {}
        }
    }

    if own_neighbors > 2 {
        score += DUMPLING_PENALTY;
    }
    score
}

/// Contact with opponent stones. A single touch is neutral, each extra one counts.
pub fn cut_score(board: &Board, pt: Point, color: Stone) -> f64 {
    let opponents = board.neighbors(pt).filter(|&n| board.is(n, color.opponent())).count();
    opponents.saturating_sub(1) as f64
}

/// Reward for joining separate own groups. Touching just one group is a small extension bonus.
pub fn connect_score(board: &Board, pt: Point, color: Stone) -> f64 {
    let mut counted: Vec<Point> = Vec::new();
    let mut groups = 0;

    for n in board.neighbors(pt) {
        if !board.is(n, color) || counted.contains(&n) {
            continue;
        }
        groups += 1;
        counted.extend(explore_group(board, n, color).members);
    }

    match groups {
        0 => 0.0,
        1 => EXTEND_POINTS,
        n => CONNECTION_POINTS[n.min(CONNECTION_POINTS.len() - 1)],
    }
}
