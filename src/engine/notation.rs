//! Move text encoding.
//!
//! A move is written as piece letter, origin, optional `x`, destination, an
//! optional promotion letter, and a trailing `EP` for en passant:
//! `Rh1h2`, `Ng8xf6`, `Pe7e8Q`, `Pe5xf6EP`. Castling is written on the king
//! with a side marker instead of a destination: `Ke1<O-O>`, `Ke8<O-O-O>`.

use std::fmt;
use std::str::FromStr;

use crate::engine::types::{
    CastlingSide, ChessError, Color, KING_HOME_FILE, Move, MoveFlags, PieceType, Square,
};

// =========================================================================
// Encoding
// =========================================================================

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.piece.letter(), self.from)?;
        if let Some(side) = self.castling_side() {
            return f.write_str(side.notation());
        }
        if self.is_capture() {
            f.write_str("x")?;
        }
        write!(f, "{}", self.to)?;
        if let Some(promo) = self.promotion {
            write!(f, "{}", promo.letter())?;
        }
        if self.is_en_passant() {
            f.write_str("EP")?;
        }
        Ok(())
    }
}

// =========================================================================
// Parsing
// =========================================================================

/// Parse one move token.
///
/// Only the shape of the token is checked here. Whether the move can be
/// played is decided against a position.
pub fn parse_move(text: &str) -> Result<Move, ChessError> {
    let invalid = || ChessError::InvalidMoveText(text.to_string());

    let mut chars = text.chars();
    let piece = chars.next().and_then(PieceType::from_letter).ok_or_else(invalid)?;
    let rest = chars.as_str();
    let from = parse_square(rest.get(..2).ok_or_else(invalid)?)?;
    let rest = &rest[2..];

    // --- Castling ---
    if rest.starts_with('<') {
        let side = CastlingSide::BOTH
            .into_iter()
            .find(|s| s.notation() == rest)
            .ok_or_else(invalid)?;
        if piece != PieceType::King || from.file() != KING_HOME_FILE {
            return Err(invalid());
        }
        let color = match from.rank() {
            0 => Color::White,
            7 => Color::Black,
            _ => return Err(invalid()),
        };
        return Ok(Move::castling(color, side));
    }

    // --- Ordinary moves ---
    let (capture, rest) = match rest.strip_prefix('x') {
        Some(after) => (true, after),
        None => (false, rest),
    };
    let to = parse_square(rest.get(..2).ok_or_else(invalid)?)?;
    let mut rest = &rest[2..];

    let en_passant = match rest.strip_suffix("EP") {
        Some(before) => {
            rest = before;
            true
        }
        None => false,
    };

    let promotion = match rest {
        "" => None,
        letter => {
            let mut cs = letter.chars();
            let promo = cs.next().and_then(PieceType::from_letter).ok_or_else(invalid)?;
            if cs.next().is_some() || !promo.is_promotion_choice() {
                return Err(invalid());
            }
            Some(promo)
        }
    };

    if from == to {
        return Err(invalid());
    }
    if (promotion.is_some() || en_passant) && piece != PieceType::Pawn {
        return Err(invalid());
    }
    if en_passant && (!capture || promotion.is_some()) {
        return Err(invalid());
    }

    let mut flags = MoveFlags::NONE;
    if capture {
        flags = flags | MoveFlags::CAPTURE;
    }
    if en_passant {
        flags = flags | MoveFlags::EN_PASSANT;
    }

    Ok(Move {
        piece,
        from,
        to,
        promotion,
        flags,
    })
}

fn parse_square(text: &str) -> Result<Square, ChessError> {
    Square::from_algebraic(text).ok_or_else(|| ChessError::InvalidSquare(text.to_string()))
}

impl FromStr for Move {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_move(s)
    }
}

// =========================================================================
// Tests
// =========================================================================
