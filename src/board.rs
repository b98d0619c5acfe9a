//! Board representation: a fixed NxN grid of stones.
//!
//! The board knows nothing about Go rules. It stores cells, remembers the
//! last stone placed and converts coordinates to and from text notation
//! (`"D4"` = column D, fourth row, i.e. `x = 3, y = 3`).
//!
//! Equality and hashing only look at the size and the cells, so two boards
//! with the same stones compare equal even if they were reached by
//! different move orders. The ko check relies on this.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::constants::DIRECTIONS;

/// Contents of a single cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stone {
    Black,
    White,
    Empty,
}

impl Stone {
    /// Black <-> White. Empty stays Empty.
    #[inline]
    pub fn opponent(self) -> Stone {
        match self {
            Stone::Black => Stone::White,
            Stone::White => Stone::Black,
            Stone::Empty => Stone::Empty,
        }
    }

    /// Cell code used on the wire (Black = 0, White = 1, Empty = 2).
    pub fn code(self) -> i32 {
        match self {
            Stone::Black => 0,
            Stone::White => 1,
            Stone::Empty => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Stone> {
        match code {
            0 => Some(Stone::Black),
            1 => Some(Stone::White),
            2 => Some(Stone::Empty),
            _ => None,
        }
    }

    /// Single-letter tag used in move logs.
    pub fn letter(self) -> char {
        match self {
            Stone::Black => 'B',
            Stone::White => 'W',
            Stone::Empty => '.',
        }
    }
}

impl fmt::Display for Stone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stone::Black => "Black",
            Stone::White => "White",
            Stone::Empty => "Empty",
        };
        f.write_str(name)
    }
}

/// A board coordinate. `x` is the column, `y` the row, both 0-based.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

impl Point {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Convert signed wire coordinates. Negative values have no point.
    pub fn from_wire(x: i32, y: i32) -> Option<Point> {
        Some(Point::new(usize::try_from(x).ok()?, usize::try_from(y).ok()?))
    }

    pub fn to_wire(self) -> (i32, i32) {
        (self.x as i32, self.y as i32)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&str_coord(*self))
    }
}

/// An NxN Go board.
#[derive(Clone, Debug)]
pub struct Board {
    size: usize,
    cells: Vec<Stone>,
    last_move: Option<Point>,
}

impl Board {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![Stone::Empty; size * size],
            last_move: None,
        }
    }

    /// Build a board from row-major cells. Returns `None` if the cell count is wrong.
    pub fn from_cells(size: usize, cells: Vec<Stone>) -> Option<Self> {
        if cells.len() != size * size {
            return None;
        }
        Some(Self {
            size,
            cells,
            last_move: None,
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn idx(&self, pt: Point) -> usize {
        pt.y * self.size + pt.x
    }

    #[inline]
    pub fn contains(&self, pt: Point) -> bool {
        pt.x < self.size && pt.y < self.size
    }

    /// Stone at `pt`, or `None` when `pt` is off the board.
    #[inline]
    pub fn get(&self, pt: Point) -> Option<Stone> {
        if !self.contains(pt) {
            return None;
        }
        Some(self.cells[self.idx(pt)])
    }

    /// True if `pt` is on the board and holds `stone`.
    #[inline]
    pub fn is(&self, pt: Point, stone: Stone) -> bool {
        self.get(pt) == Some(stone)
    }

    /// Set a cell. Placing a stone also records it as the last move.
    ///
    /// # Panics
    /// Panics if `pt` is off the board.
    pub fn set(&mut self, pt: Point, stone: Stone) {
        assert!(self.contains(pt), "point {pt:?} is off a {}x{} board", self.size, self.size);
        let i = self.idx(pt);
        self.cells[i] = stone;
        if stone != Stone::Empty {
            self.last_move = Some(pt);
        }
    }

    pub fn last_move(&self) -> Option<Point> {
        self.last_move
    }

    /// Row-major cells (`y` outer, `x` inner).
    pub fn cells(&self) -> &[Stone] {
        &self.cells
    }

    /// Step from `pt` by `(dx, dy)`, if the result is on the board.
    #[inline]
    pub fn offset(&self, pt: Point, dx: isize, dy: isize) -> Option<Point> {
        let x = pt.x.checked_add_signed(dx)?;
        let y = pt.y.checked_add_signed(dy)?;
        let p = Point::new(x, y);
        self.contains(p).then_some(p)
    }

    /// The up-to-four orthogonal neighbors of `pt` that lie on the board.
    pub fn neighbors(&self, pt: Point) -> impl Iterator<Item = Point> + '_ {
        DIRECTIONS
            .iter()
            .filter_map(move |&(dx, dy)| self.offset(pt, dx, dy))
    }

    /// All points in row-major order.
    pub fn points(&self) -> impl Iterator<Item = Point> + use<> {
        let size = self.size;
        (0..size).flat_map(move |y| (0..size).map(move |x| Point::new(x, y)))
    }

    pub fn count(&self, stone: Stone) -> usize {
        self.cells.iter().filter(|&&c| c == stone).count()
    }
}

impl PartialEq for Board {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && self.cells == other.cells
    }
}

impl Eq for Board {}

impl Hash for Board {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.size.hash(state);
        self.cells.hash(state);
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in (0..self.size).rev() {
            write!(f, "{:>2} ", y + 1)?;
            for x in 0..self.size {
                let ch = match self.cells[self.idx(Point::new(x, y))] {
                    Stone::Black => 'X',
                    Stone::White => 'O',
                    Stone::Empty => '.',
                };
                write!(f, "{ch} ")?;
            }
            writeln!(f)?;
        }
        write!(f, "   ")?;
        for x in 0..self.size {
            write!(f, "{} ", column_letter(x))?;
        }
        writeln!(f)
    }
}

fn column_letter(x: usize) -> char {
    (b'A' + x as u8) as char
}

/// Parse a coordinate such as `"D4"` on a board of the given size.
///
/// Columns are letters starting at `A` (no letter is skipped), rows are
/// 1-based numbers. Returns `None` for malformed text or points off the board.
pub fn parse_coord(s: &str, size: usize) -> Option<Point> {
    let s = s.trim();
    if !(2..=3).contains(&s.len()) || !s.is_ascii() {
        return None;
    }

    let col = s.as_bytes()[0].to_ascii_uppercase();
    if !col.is_ascii_uppercase() {
        return None;
    }
    let x = (col - b'A') as usize;

    let row: usize = s[1..].parse().ok()?;
    if row == 0 {
        return None;
    }

    let pt = Point::new(x, row - 1);
    (pt.x < size && pt.y < size).then_some(pt)
}

/// Format a point as coordinate text, e.g. `(3, 3)` -> `"D4"`.
pub fn str_coord(pt: Point) -> String {
    format!("{}{}", column_letter(pt.x), pt.y + 1)
}
