//! Pre-computed geometry tables and check detection.
//!
//! The tables hold, for every square, the on-board knight and king targets and
//! the eight rays walking outward to the edge. They are built once (via
//! `OnceLock`) and shared read-only by the generator.
//!
//! Check detection is generator-driven: a king is in check when
//! some pseudo-legal move of the other side would capture it.

use std::sync::OnceLock;

use crate::engine::board::Board;
use crate::engine::movegen;
use crate::engine::position::Position;
use crate::engine::types::{Color, Square};

// =========================================================================
// Directions
// =========================================================================

/// A sliding direction as `(file delta, rank delta)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    East,
    West,
    North,
    South,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::East,
        Direction::West,
        Direction::North,
        Direction::South,
        Direction::NorthEast,
        Direction::NorthWest,
        Direction::SouthEast,
        Direction::SouthWest,
    ];

    /// Orthogonal rays, in generation order.
    pub const ROOK: [Direction; 4] = [
        Direction::East,
        Direction::West,
        Direction::North,
        Direction::South,
    ];

    /// Diagonal rays, in generation order.
    pub const BISHOP: [Direction; 4] = [
        Direction::NorthEast,
        Direction::NorthWest,
        Direction::SouthEast,
        Direction::SouthWest,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn delta(self) -> (i8, i8) {
        match self {
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::North => (0, 1),
            Direction::South => (0, -1),
            Direction::NorthEast => (1, 1),
            Direction::NorthWest => (-1, 1),
            Direction::SouthEast => (1, -1),
            Direction::SouthWest => (-1, -1),
        }
    }
}

/// Knight jumps, in generation order: one rank up (two files right, left),
/// two ranks up (one file right, left), then the same going down.
const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (2, 1),
    (-2, 1),
    (1, 2),
    (-1, 2),
    (2, -1),
    (-2, -1),
    (1, -2),
    (-1, -2),
];

/// King steps, in generation order: the rank above (straight, left, right),
/// the same rank (left, right), then the rank below.
const KING_OFFSETS: [(i8, i8); 8] = [
    (0, 1),
    (-1, 1),
    (1, 1),
    (-1, 0),
    (1, 0),
    (0, -1),
    (-1, -1),
    (1, -1),
];

// =========================================================================
// Tables
// =========================================================================

/// Get a reference to the global geometry tables.
pub fn tables() -> &'static AttackTables {
    static TABLES: OnceLock<AttackTables> = OnceLock::new();
    TABLES.get_or_init(AttackTables::init)
}

/// Per-square target lists for leapers and rays for sliders.
pub struct AttackTables {
    knight: [Vec<Square>; 64],
    king: [Vec<Square>; 64],
    /// `rays[square][direction]`: squares from nearest to farthest.
    rays: [[Vec<Square>; 8]; 64],
}

impl AttackTables {
    #[inline]
    pub fn knight_targets(&self, sq: Square) -> &[Square] {
        &self.knight[sq.index()]
    }

    #[inline]
    pub fn king_targets(&self, sq: Square) -> &[Square] {
        &self.king[sq.index()]
    }

    #[inline]
    pub fn ray(&self, sq: Square, dir: Direction) -> &[Square] {
        &self.rays[sq.index()][dir.index()]
    }

    fn init() -> Self {
        AttackTables {
            knight: std::array::from_fn(|i| leaper_targets(Square(i as u8), &KNIGHT_OFFSETS)),
            king: std::array::from_fn(|i| leaper_targets(Square(i as u8), &KING_OFFSETS)),
            rays: std::array::from_fn(|i| {
                std::array::from_fn(|d| walk_ray(Square(i as u8), Direction::ALL[d]))
            }),
        }
    }
}

fn leaper_targets(from: Square, offsets: &[(i8, i8)]) -> Vec<Square> {
    offsets
        .iter()
        .filter_map(|&(df, dr)| from.offset(df, dr))
        .collect()
}

fn walk_ray(from: Square, dir: Direction) -> Vec<Square> {
    let (df, dr) = dir.delta();
    let mut ray = Vec::with_capacity(7);
    let mut cur = from;
    while let Some(next) = cur.offset(df, dr) {
        ray.push(next);
        cur = next;
    }
    ray
}

// =========================================================================
// Check detection
// =========================================================================

/// Is `color`'s king attacked in `pos`?
///
/// Recomputed from scratch: every pseudo-legal move of the other side is
/// generated and tested for capturing the king.
pub fn is_in_check(pos: &Position, color: Color) -> bool {
    board_in_check(pos.board(), color)
}

/// Board-only variant of [`is_in_check`], used on scratch boards during
/// castling validation.
pub(crate) fn board_in_check(board: &Board, color: Color) -> bool {
    let Some(king_sq) = board.king_square(color) else {
        return false;
    };
    is_square_attacked(board, king_sq, !color)
}

/// Does any pseudo-legal capture of `by` land on `sq`?
pub(crate) fn is_square_attacked(board: &Board, sq: Square, by: Color) -> bool {
    let mut moves = Vec::with_capacity(32);
    for (from, piece) in board.pieces() {
        if piece.color != by {
            continue;
        }
        moves.clear();
        movegen::generate_on(board, from, &mut moves);
        if moves
            .iter()
            .any(|m| m.is_capture() && !m.is_en_passant() && m.to == sq)
        {
            return true;
        }
    }
    false
}

// =========================================================================
// Tests
// =========================================================================
