//! Mailbox board and its text codec.
//!
//! `Board` stores one slot per square, indexed by `Square` (LERF: a1 = 0,
//! h8 = 63). The text form is 64 whitespace-separated two-character tokens,
//! rank 8 first, files a→h within a rank; `00` marks an empty square.

use std::fmt;
use std::ops::Index;

use crate::engine::types::{ChessError, Color, Piece, PieceType, Square};

/// Token used for an empty square in the board text encoding.
pub const EMPTY_TOKEN: &str = "00";

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// Fully populated 64-square board.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    squares: [Option<Piece>; Square::NUM],
}

impl Board {
    /// A board with no pieces.
    pub fn empty() -> Self {
        Board {
            squares: [None; Square::NUM],
        }
    }

    /// Standard starting layout.
    pub fn starting() -> Self {
        let mut board = Board::empty();
        let back = [
            PieceType::Rook,
            PieceType::Knight,
            PieceType::Bishop,
            PieceType::Queen,
            PieceType::King,
            PieceType::Bishop,
            PieceType::Knight,
            PieceType::Rook,
        ];
        for (file, &kind) in back.iter().enumerate() {
            let file = file as u8;
            board.put(Square::from_file_rank(file, 0), Piece::new(Color::White, kind));
            board.put(Square::from_file_rank(file, 1), Piece::new(Color::White, PieceType::Pawn));
            board.put(Square::from_file_rank(file, 6), Piece::new(Color::Black, PieceType::Pawn));
            board.put(Square::from_file_rank(file, 7), Piece::new(Color::Black, kind));
        }
        board
    }

    // -----------------------------------------------------------------------
    // Square access
    // -----------------------------------------------------------------------

    #[inline]
    pub fn get(&self, sq: Square) -> Option<Piece> {
        self.squares[sq.index()]
    }

    /// Place a piece, discarding whatever occupied the square.
    #[inline]
    pub fn put(&mut self, sq: Square, piece: Piece) {
        self.squares[sq.index()] = Some(piece);
    }

    /// Empty a square, returning what was there.
    #[inline]
    pub fn remove(&mut self, sq: Square) -> Option<Piece> {
        self.squares[sq.index()].take()
    }

    #[inline]
    pub fn is_empty(&self, sq: Square) -> bool {
        self.squares[sq.index()].is_none()
    }

    /// Whether `sq` holds exactly `piece`.
    #[inline]
    pub fn holds(&self, sq: Square, piece: Piece) -> bool {
        self.get(sq) == Some(piece)
    }

    /// Square of the king of `color`, scanning in file-major order.
    pub fn king_square(&self, color: Color) -> Option<Square> {
        let king = Piece::new(color, PieceType::King);
        Square::file_major().find(|&sq| self.holds(sq, king))
    }

    /// Occupied squares with their pieces, in file-major order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::file_major().filter_map(|sq| self.get(sq).map(|p| (sq, p)))
    }

    // -----------------------------------------------------------------------
    // Text codec
    // -----------------------------------------------------------------------

    /// Decode the 64-token board text encoding.
    pub fn from_text(text: &str) -> Result<Self, ChessError> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.len() != Square::NUM {
            return Err(ChessError::InvalidBoardText(format!(
                "expected 64 tokens, got {}",
                tokens.len()
            )));
        }

        let mut board = Board::empty();
        for (i, token) in tokens.iter().enumerate() {
            let sq = text_order_square(i);
            if *token == EMPTY_TOKEN {
                continue;
            }
            let piece = Piece::from_code(token).ok_or_else(|| {
                ChessError::InvalidBoardText(format!("invalid token '{token}' for {sq}"))
            })?;
            board.put(sq, piece);
        }
        Ok(board)
    }

    /// Encode as 64 space-separated tokens, rank 8 first.
    pub fn to_text(&self) -> String {
        self.text_rows().join(" ")
    }

    /// The eight rows of the text encoding, rank 8 first.
    pub fn text_rows(&self) -> Vec<String> {
        (0..8u8)
            .rev()
            .map(|rank| {
                (0..8u8)
                    .map(|file| token(self.get(Square::from_file_rank(file, rank))))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }

    /// Render the board as eight lines of tokens (rank 8 at top).
    pub fn grid_string(&self) -> String {
        self.text_rows().join("\n")
    }
}

/// Square addressed by position `i` of the text encoding.
#[inline]
fn text_order_square(i: usize) -> Square {
    let rank = 7 - (i / 8) as u8;
    let file = (i % 8) as u8;
    Square::from_file_rank(file, rank)
}

fn token(slot: Option<Piece>) -> String {
    match slot {
        Some(p) => p.code(),
        None => EMPTY_TOKEN.to_string(),
    }
}

impl Index<Square> for Board {
    type Output = Option<Piece>;

    #[inline]
    fn index(&self, sq: Square) -> &Option<Piece> {
        &self.squares[sq.index()]
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.grid_string())
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Board(")?;
        for row in self.text_rows() {
            writeln!(f, "  {row}")?;
        }
        write!(f, ")")
    }
}

impl std::str::FromStr for Board {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Board::from_text(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
