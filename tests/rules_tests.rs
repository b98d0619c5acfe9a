//! Integration tests for the rules engine and move-log replay.
//!
//! Positions are written with coordinate text ("C2") the same way a client
//! would see them, then checked through the public API only.

use go_arena::board::{Board, Point, Stone, parse_coord};
use go_arena::movelog::{LogError, MoveKind, MoveLog, replay};
use go_arena::rules::{Captures, MoveError, Rules, Score, score_territory};

// =============================================================================
// Helper functions for setting up test positions
// =============================================================================

fn at(coord: &str, size: usize) -> Point {
    parse_coord(coord, size).unwrap_or_else(|| panic!("bad coordinate {coord}"))
}

/// Place stones directly, without going through the rules.
fn setpos(size: usize, black: &[&str], white: &[&str]) -> Board {
    let mut board = Board::new(size);
    for c in black {
        board.set(at(c, size), Stone::Black);
    }
    for c in white {
        board.set(at(c, size), Stone::White);
    }
    board
}

// =============================================================================
// Legality
// =============================================================================

#[test]
fn test_failed_placement_never_mutates() {
    let mut board = setpos(5, &["A1", "B2", "C3"], &["D4", "E5", "A5"]);
    let mut rules = Rules::new();
    let before = board.clone();

    for pt in before.points() {
        if before.is(pt, Stone::Empty) {
            continue;
        }
        for color in [Stone::Black, Stone::White] {
            assert_eq!(rules.try_place(&mut board, pt, color), Err(MoveError::Occupied));
        }
    }
    assert_eq!(rules.try_place(&mut board, Point::new(7, 0), Stone::Black), Err(MoveError::OffBoard));
    assert_eq!(board, before);
    assert_eq!(rules.captures(), Captures::default());
}

#[test]
fn test_ko_scenario_4x4() {
    // Black surrounds B2; White's stones make C2 capturable
    let mut board = setpos(4, &["B1", "A2", "B3", "C2"], &["C1", "D2", "C3"]);
    let mut rules = Rules::new();

    assert_eq!(rules.try_place(&mut board, at("B2", 4), Stone::White), Ok(1));
    assert_eq!(board.get(at("C2", 4)), Some(Stone::Empty));
    assert_eq!(rules.captures().white, 1);

    assert_eq!(rules.try_place(&mut board, at("B2", 4), Stone::Black), Err(MoveError::Occupied));
    assert_eq!(rules.try_place(&mut board, at("C2", 4), Stone::Black), Err(MoveError::Ko));
    assert!(rules.try_place(&mut board, at("D4", 4), Stone::Black).is_ok());
}

#[test]
fn test_multi_stone_suicide_rejected() {
    // C1 is the last liberty of the White pair A1-B1
    let mut board = setpos(4, &["A2", "B2", "D1", "C2"], &["A1", "B1"]);
    let mut rules = Rules::new();
    assert_eq!(rules.try_place(&mut board, at("C1", 4), Stone::White), Err(MoveError::Suicide));

    // Black filling C1 captures both
    assert_eq!(rules.try_place(&mut board, at("C1", 4), Stone::Black), Ok(2));
    assert_eq!(rules.captures().black, 2);
}

// =============================================================================
// Scoring
// =============================================================================

#[test]
fn test_edge_region_enclosed_by_one_color() {
    // Black wall along row 3 of a 5x5: rows 1-2 (10 points) touch only Black
    let board = setpos(5, &["A3", "B3", "C3", "D3", "E3"], &["C5"]);
    let territory = score_territory(&board);
    assert_eq!(territory.black, 10);
    // Rows 4-5 touch both colors
    assert_eq!(territory.white, 0);
}

#[test]
fn test_dead_stones_change_the_result() {
    let mut board = setpos(5, &["A3", "B3", "C3", "D3", "E3"], &["C1"]);
    let mut rules = Rules::new();
    assert_eq!(rules.final_score(&board), Score { black: 10, white: 0 });

    rules.remove_dead_groups(&mut board, &[at("C1", 5)]);
    assert_eq!(rules.final_score(&board), Score { black: 21, white: 0 });
}

// =============================================================================
// Move log round trip
// =============================================================================

const KO_FIGHT: &str = "B[B1];W[C1];B[A2];W[D2];B[B3];W[C3];B[C2];W[B2];";

#[test]
fn test_replay_rejects_immediate_ko_recapture() {
    let log = MoveLog::parse(&format!("{KO_FIGHT}B[C2];"), 4).unwrap();
    match replay(&log, 4) {
        Err(LogError::IllegalMove { index, reason, .. }) => {
            assert_eq!(index, 8);
            assert_eq!(reason, MoveError::Ko);
        }
        other => panic!("expected ko, got {other:?}"),
    }
}

#[test]
fn test_replay_after_pass_and_tenuki() {
    let log = MoveLog::parse(&format!("{KO_FIGHT}B[PASS];W[D4];B[C2];"), 4).unwrap();
    let (board, rules) = replay(&log, 4).unwrap();

    assert_eq!(rules.captures(), Captures { black: 1, white: 1 });
    assert_eq!(board.get(at("B2", 4)), Some(Stone::Empty));
    assert_eq!(board.get(at("C2", 4)), Some(Stone::Black));
}

#[test]
fn test_replay_matches_live_game() {
    let moves = ["B1", "B2", "A2", "E5", "C2", "E4", "B3", "D5"];
    let mut board = Board::new(5);
    let mut rules = Rules::new();
    let mut log = MoveLog::new();

    for (i, c) in moves.iter().enumerate() {
        let color = if i % 2 == 0 { Stone::Black } else { Stone::White };
        rules.try_place(&mut board, at(c, 5), color).unwrap();
        log.push(color, MoveKind::Place(at(c, 5)));
    }
    log.push(Stone::White, MoveKind::Pass);
    log.push(Stone::Black, MoveKind::Resign);
    // B3 took the white stone at B2
    assert_eq!(rules.captures().black, 1);

    let reread = MoveLog::parse(&log.to_string(), 5).unwrap();
    assert_eq!(reread, log);

    let (replayed, replayed_rules) = replay(&reread, 5).unwrap();
    assert_eq!(replayed, board);
    assert_eq!(replayed_rules.captures(), rules.captures());
}
