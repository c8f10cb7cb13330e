//! Position: the board plus everything the rules need to know about how it
//! was reached (castling rights, en-passant grants, halfmove clock, history),
//! and the move applier that produces successors.

use tracing::debug;

use crate::engine::board::Board;
use crate::engine::movegen;
use crate::engine::types::{
    CastlingRights, CastlingSide, ChessError, Color, KING_HOME_FILE, Move, Piece, PieceType,
    Square,
};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Board and context as stored in the history, compared for repetitions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Snapshot {
    pub board: Board,
    pub side_to_move: Color,
    pub castling_rights: CastlingRights,
    pub en_passant: [Vec<Move>; 2],
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A position in play. Successors are new values; a `Position` is never
/// changed once handed out.
#[derive(Clone, Debug)]
pub struct Position {
    board: Board,
    side_to_move: Color,
    castling_rights: CastlingRights,
    /// En-passant captures each side may play on its next move.
    en_passant: [Vec<Move>; 2],
    halfmove_clock: u16,
    /// Every position of the game so far, the current one last.
    history: Vec<Snapshot>,
}

impl Position {
    /// Standard starting position, white to move.
    pub fn starting() -> Self {
        Position::from_board(Board::starting(), Color::White)
    }

    /// Start play from an arbitrary board.
    ///
    /// A castling right is granted when the king and the matching rook both
    /// stand on their home squares. No en-passant captures are available and
    /// the clock starts at zero. The board is taken as given; a missing or
    /// duplicated king is not detected.
    pub fn from_board(board: Board, side_to_move: Color) -> Self {
        let mut castling_rights = CastlingRights::NONE;
        for color in [Color::White, Color::Black] {
            let rank = color.back_rank();
            let king_home = Square::from_file_rank(KING_HOME_FILE, rank);
            if !board.holds(king_home, Piece::new(color, PieceType::King)) {
                continue;
            }
            for side in CastlingSide::BOTH {
                let corner = Square::from_file_rank(side.rook_file(), rank);
                if board.holds(corner, Piece::new(color, PieceType::Rook)) {
                    castling_rights.insert(CastlingRights::flag(color, side));
                }
            }
        }

        let mut pos = Position {
            board,
            side_to_move,
            castling_rights,
            en_passant: [Vec::new(), Vec::new()],
            halfmove_clock: 0,
            history: Vec::new(),
        };
        pos.history.push(pos.snapshot());
        pos
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline]
    pub fn castling_rights(&self) -> CastlingRights {
        self.castling_rights
    }

    /// En-passant captures `color` is currently allowed to play.
    #[inline]
    pub fn en_passant_targets(&self, color: Color) -> &[Move] {
        &self.en_passant[color.index()]
    }

    #[inline]
    pub fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    pub fn history(&self) -> &[Snapshot] {
        &self.history
    }

    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.board.get(sq)
    }

    /// Piece `mv` would remove from the board, if any.
    pub fn captured_piece(&self, mv: &Move) -> Option<Piece> {
        if mv.is_castling() {
            return None;
        }
        match mv.en_passant_victim() {
            Some(victim) => self.board.get(victim),
            None => self.board.get(mv.to),
        }
    }

    /// Current board and context as a history entry.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            board: self.board,
            side_to_move: self.side_to_move,
            castling_rights: self.castling_rights,
            en_passant: self.en_passant.clone(),
        }
    }

    /// How many times the current position has occurred, this one included.
    pub fn repetition_count(&self) -> usize {
        let current = self.snapshot();
        self.history.iter().filter(|s| **s == current).count()
    }

    /// A hundred half-moves without a pawn move or capture.
    pub fn fifty_move_claimable(&self) -> bool {
        self.halfmove_clock >= 100
    }

    // -----------------------------------------------------------------------
    // Move application
    // -----------------------------------------------------------------------

    /// Play a move for the side to move, returning the successor.
    ///
    /// Fails without touching `self` when the origin is empty, the piece
    /// belongs to the other side, or the move is not among the legal moves.
    pub fn apply(&self, mv: &Move) -> Result<Position, ChessError> {
        let piece = self.board.get(mv.from).ok_or(ChessError::EmptyCell(mv.from))?;
        if piece.color != self.side_to_move {
            return Err(ChessError::WrongTurn { color: piece.color });
        }
        if !movegen::legal_moves(self, self.side_to_move).contains(mv) {
            return Err(ChessError::IllegalMove {
                mv: mv.to_string(),
                reason: format!("not a legal move for {}", self.side_to_move),
            });
        }

        let mut next = self.apply_unchecked(mv);
        next.history.reserve_exact(self.history.len() + 1);
        next.history.extend(self.history.iter().cloned());
        next.history.push(next.snapshot());

        debug!(
            %mv,
            halfmove_clock = next.halfmove_clock,
            side_to_move = %next.side_to_move,
            "move applied"
        );
        Ok(next)
    }

    /// Successor of a generated move with every effect except the history
    /// entry. Legality checks simulate with this and throw the result away;
    /// `apply` fills the history in.
    pub(crate) fn apply_unchecked(&self, mv: &Move) -> Position {
        let us = self.side_to_move_of(mv);
        let them = !us;
        let mut board = self.board;

        // ---- Relocation ----
        let captured = if let Some(side) = mv.castling_side() {
            let rank = us.back_rank();
            board.remove(mv.from);
            board.remove(Square::from_file_rank(side.rook_file(), rank));
            board.put(mv.to, Piece::new(us, PieceType::King));
            board.put(
                Square::from_file_rank(side.rook_to_file(), rank),
                Piece::new(us, PieceType::Rook),
            );
            None
        } else {
            let ep_victim = mv.en_passant_victim().and_then(|victim| board.remove(victim));
            board.remove(mv.from);
            let landing = Piece::new(us, mv.promotion.unwrap_or(mv.piece));
            let on_target = board.get(mv.to);
            board.put(mv.to, landing);
            ep_victim.or(on_target)
        };

        // ---- Castling rights ----
        // By square: leaving or being captured on a home square both revoke.
        let mut castling_rights = self.castling_rights;
        castling_rights.0 &= CASTLING_MASK[mv.from.index()];
        castling_rights.0 &= CASTLING_MASK[mv.to.index()];

        // ---- En passant ----
        let mut en_passant = self.en_passant.clone();
        en_passant[us.index()].clear();
        if mv.is_double_step() {
            let crossed = Square::from_file_rank(mv.to.file(), (mv.from.rank() + mv.to.rank()) / 2);
            for df in [1, -1] {
                if let Some(beside) = mv.to.offset(df, 0)
                    && board.holds(beside, Piece::new(them, PieceType::Pawn))
                {
                    en_passant[them.index()].push(Move::en_passant(beside, crossed));
                }
            }
        }

        // ---- Clock ----
        let halfmove_clock = if mv.piece == PieceType::Pawn || captured.is_some() {
            0
        } else {
            self.halfmove_clock.saturating_add(1)
        };

        Position {
            board,
            side_to_move: them,
            castling_rights,
            en_passant,
            halfmove_clock,
            history: Vec::new(),
        }
    }

    /// Colour of the piece making `mv`. Candidates for either side are
    /// simulated, so this reads the board rather than `side_to_move`.
    fn side_to_move_of(&self, mv: &Move) -> Color {
        self.board
            .get(mv.from)
            .map_or(self.side_to_move, |p| p.color)
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::starting()
    }
}

/// Castling bits that survive a move touching each square.
const CASTLING_MASK: [u8; 64] = {
    let mut mask = [0b1111u8; 64];
    mask[0] = 0b1111 & !CastlingRights::WHITE_QUEENSIDE;
    mask[4] = 0b1111 & !(CastlingRights::WHITE_KINGSIDE | CastlingRights::WHITE_QUEENSIDE);
    mask[7] = 0b1111 & !CastlingRights::WHITE_KINGSIDE;
    mask[56] = 0b1111 & !CastlingRights::BLACK_QUEENSIDE;
    mask[60] = 0b1111 & !(CastlingRights::BLACK_KINGSIDE | CastlingRights::BLACK_QUEENSIDE);
    mask[63] = 0b1111 & !CastlingRights::BLACK_KINGSIDE;
    mask
};

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        Square::from_algebraic(name).unwrap()
    }

    fn mv(text: &str) -> Move {
        text.parse().unwrap()
    }

    fn pos(side: Color, pieces: &[(&str, &str)]) -> Position {
        let mut b = Board::empty();
        for &(name, code) in pieces {
            b.put(sq(name), Piece::from_code(code).unwrap());
        }
        Position::from_board(b, side)
    }

    fn play(mut p: Position, moves: &[&str]) -> Position {
        for text in moves {
            p = p.apply(&mv(text)).unwrap_or_else(|e| panic!("{text}: {e}"));
        }
        p
    }

    // -------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------

    #[test]
    fn starting_context() {
        let p = Position::starting();
        assert_eq!(p.side_to_move(), Color::White);
        assert_eq!(p.castling_rights(), CastlingRights::ALL);
        assert!(p.en_passant_targets(Color::White).is_empty());
        assert!(p.en_passant_targets(Color::Black).is_empty());
        assert_eq!(p.halfmove_clock(), 0);
        assert_eq!(p.history().len(), 1);
        assert_eq!(p.repetition_count(), 1);
    }

    #[test]
    fn rights_derived_from_home_squares() {
        let p = pos(
            Color::White,
            &[("e1", "wk"), ("h1", "wr"), ("a2", "wr"), ("e8", "bk"), ("a8", "br"), ("h8", "br")],
        );
        assert_eq!(p.castling_rights().to_letters(), "Kkq");

        let p = pos(Color::White, &[("d1", "wk"), ("h1", "wr"), ("a1", "wr"), ("e8", "bk")]);
        assert_eq!(p.castling_rights(), CastlingRights::NONE);
    }

    // -------------------------------------------------------------------
    // Apply: errors
    // -------------------------------------------------------------------

    #[test]
    fn apply_from_empty_square() {
        let err = Position::starting().apply(&mv("Pe4e5")).unwrap_err();
        assert!(matches!(err, ChessError::EmptyCell(s) if s == sq("e4")));
    }

    #[test]
    fn apply_wrong_turn() {
        let err = Position::starting().apply(&mv("Pe7e5")).unwrap_err();
        assert!(matches!(err, ChessError::WrongTurn { color: Color::Black }));
    }

    #[test]
    fn apply_illegal_leaves_original_untouched() {
        let p = Position::starting();
        let before = p.snapshot();
        let err = p.apply(&mv("Pe2e5")).unwrap_err();
        assert!(matches!(err, ChessError::IllegalMove { .. }));
        assert_eq!(p.snapshot(), before);
        assert_eq!(p.history().len(), 1);
    }

    #[test]
    fn apply_rejects_wrong_piece_letter() {
        let err = Position::starting().apply(&mv("Ng1g3")).unwrap_err();
        assert!(matches!(err, ChessError::IllegalMove { .. }));
        let err = Position::starting().apply(&mv("Bg1f3")).unwrap_err();
        assert!(matches!(err, ChessError::IllegalMove { .. }));
    }

    // -------------------------------------------------------------------
    // Apply: effects
    // -------------------------------------------------------------------

    #[test]
    fn quiet_move_relocates_and_toggles_turn() {
        let p = play(Position::starting(), &["Ng1f3"]);
        assert_eq!(p.piece_at(sq("g1")), None);
        assert_eq!(p.piece_at(sq("f3")), Some(Piece::new(Color::White, PieceType::Knight)));
        assert_eq!(p.side_to_move(), Color::Black);
        assert_eq!(p.halfmove_clock(), 1);
        assert_eq!(p.history().len(), 2);
    }

    #[test]
    fn castling_moves_king_and_rook() {
        let p = pos(Color::White, &[("e1", "wk"), ("h1", "wr"), ("a1", "wr"), ("e8", "bk")]);
        let p = play(p, &["Ke1<O-O>"]);
        assert_eq!(p.piece_at(sq("g1")), Some(Piece::new(Color::White, PieceType::King)));
        assert_eq!(p.piece_at(sq("f1")), Some(Piece::new(Color::White, PieceType::Rook)));
        assert!(p.board().is_empty(sq("e1")));
        assert!(p.board().is_empty(sq("h1")));
        assert_eq!(p.castling_rights(), CastlingRights::NONE);
        assert_eq!(p.halfmove_clock(), 1);
    }

    #[test]
    fn queenside_castling_black() {
        let p = pos(Color::Black, &[("e1", "wk"), ("e8", "bk"), ("a8", "br")]);
        let p = play(p, &["Ke8<O-O-O>"]);
        assert_eq!(p.piece_at(sq("c8")), Some(Piece::new(Color::Black, PieceType::King)));
        assert_eq!(p.piece_at(sq("d8")), Some(Piece::new(Color::Black, PieceType::Rook)));
        assert!(p.board().is_empty(sq("a8")));
    }

    #[test]
    fn rook_capture_on_home_square_revokes_right() {
        let p = pos(
            Color::White,
            &[("e1", "wk"), ("h1", "wr"), ("e8", "bk"), ("h8", "br"), ("a8", "br")],
        );
        assert_eq!(p.castling_rights().to_letters(), "Kkq");
        let p = play(p, &["Rh1xh8"]);
        assert_eq!(p.castling_rights().to_letters(), "q");
        assert_eq!(p.halfmove_clock(), 0);
    }

    #[test]
    fn rights_never_restored() {
        let p = pos(Color::White, &[("e1", "wk"), ("h1", "wr"), ("e8", "bk")]);
        let p = play(p, &["Rh1h2", "Ke8d8", "Rh2h1"]);
        assert!(!p.castling_rights().can_castle(Color::White, CastlingSide::Kingside));
    }

    #[test]
    fn double_step_grants_en_passant_to_opponent() {
        let p = pos(
            Color::White,
            &[("e1", "wk"), ("e8", "bk"), ("d2", "wp"), ("c4", "bp"), ("e4", "bp")],
        );
        let p = play(p, &["Pd2d4"]);
        assert_eq!(
            p.en_passant_targets(Color::Black),
            &[Move::en_passant(sq("e4"), sq("d3")), Move::en_passant(sq("c4"), sq("d3"))]
        );
        assert!(p.en_passant_targets(Color::White).is_empty());
    }

    #[test]
    fn double_step_without_neighbour_grants_nothing() {
        let p = play(Position::starting(), &["Pe2e4"]);
        assert!(p.en_passant_targets(Color::Black).is_empty());
    }

    #[test]
    fn en_passant_removes_victim_beside_target() {
        let p = pos(Color::Black, &[("e1", "wk"), ("e8", "bk"), ("e5", "wp"), ("d7", "bp")]);
        let p = play(p, &["Pd7d5", "Pe5xd6EP"]);
        assert!(p.board().is_empty(sq("d5")));
        assert!(p.board().is_empty(sq("e5")));
        assert_eq!(p.piece_at(sq("d6")), Some(Piece::new(Color::White, PieceType::Pawn)));
        assert!(p.en_passant_targets(Color::White).is_empty());
    }

    #[test]
    fn promotion_substitutes_piece() {
        let p = pos(Color::White, &[("c1", "wk"), ("h1", "bk"), ("b7", "wp"), ("a8", "br")]);
        let p = play(p, &["Pb7xa8N"]);
        assert_eq!(p.piece_at(sq("a8")), Some(Piece::new(Color::White, PieceType::Knight)));
        assert!(p.board().is_empty(sq("b7")));
    }

    #[test]
    fn captured_piece_lookup() {
        let p = pos(Color::White, &[("e1", "wk"), ("e8", "bk"), ("e5", "wp"), ("d5", "bp"), ("f6", "bn")]);
        assert_eq!(
            p.captured_piece(&Move::en_passant(sq("e5"), sq("d6"))),
            Some(Piece::new(Color::Black, PieceType::Pawn))
        );
        assert_eq!(
            p.captured_piece(&mv("Pe5xf6")),
            Some(Piece::new(Color::Black, PieceType::Knight))
        );
        assert_eq!(p.captured_piece(&mv("Pe5e6")), None);
    }

    #[test]
    fn halfmove_clock_counts_and_resets() {
        let p = play(Position::starting(), &["Ng1f3", "Ng8f6", "Nb1c3"]);
        assert_eq!(p.halfmove_clock(), 3);
        let p = play(p, &["Pe7e5"]);
        assert_eq!(p.halfmove_clock(), 0);
        let p = play(p, &["Nf3xe5"]);
        assert_eq!(p.halfmove_clock(), 0);
        let p = play(p, &["Nb8c6"]);
        assert_eq!(p.halfmove_clock(), 1);
    }

    // -------------------------------------------------------------------
    // Draw data
    // -------------------------------------------------------------------

    #[test]
    fn fifty_move_claim_after_hundred_quiet_half_moves() {
        let shuffle = ["Ng1f3", "Ng8f6", "Nf3g1", "Nf6g8"];
        let mut p = Position::starting();
        for ply in 0..100 {
            assert!(!p.fifty_move_claimable(), "claimable at clock {}", p.halfmove_clock());
            p = p.apply(&mv(shuffle[ply % 4])).unwrap();
        }
        assert_eq!(p.halfmove_clock(), 100);
        assert!(p.fifty_move_claimable());

        // A pawn move clears the claim.
        let p = play(p, &["Pe2e4"]);
        assert!(!p.fifty_move_claimable());
    }

    #[test]
    fn knight_shuffle_repeats_position() {
        let p = play(
            Position::starting(),
            &["Ng1f3", "Ng8f6", "Nf3g1", "Nf6g8", "Ng1f3", "Ng8f6", "Nf3g1", "Nf6g8"],
        );
        assert_eq!(p.repetition_count(), 3);
        assert_eq!(p.history().len(), 9);
        assert_eq!(p.halfmove_clock(), 8);
        assert!(!p.fifty_move_claimable());
    }

    #[test]
    fn en_passant_grant_distinguishes_positions() {
        // Same board, but the first occurrence offered an en-passant capture.
        let p = pos(Color::White, &[("e1", "wk"), ("e8", "bk"), ("d2", "wp"), ("e4", "bp")]);
        let p = play(p, &["Pd2d4", "Ke8d8", "Ke1d1", "Kd8e8", "Kd1e1"]);
        assert_eq!(p.board(), &p.history()[1].board);
        assert_eq!(p.repetition_count(), 1);
    }
}
