//! Move generation.
//!
//! Pipeline:
//!   1. Generate pseudo-legal moves per square (ignoring whether the mover's
//!      own king is left attacked).
//!   2. Filter: castling preconditions, simulate on a disposable copy and
//!      reject anything that leaves the mover in check, and drop en-passant
//!      captures the opponent's last move did not grant.
//!
//! Output order is stable: squares files a→h, ranks 1→8, and within a square
//! the per-piece generation order below.

use tracing::trace;

use crate::engine::attacks::{self, Direction, board_in_check, tables};
use crate::engine::board::Board;
use crate::engine::position::Position;
use crate::engine::types::{
    CastlingSide, Color, KING_HOME_FILE, Move, MoveFlags, Piece, PieceType, Square,
};

// =========================================================================
// Public API
// =========================================================================

/// Pseudo-legal moves of the piece on `from` (either colour).
///
/// Empty squares yield nothing.
pub fn generate(pos: &Position, from: Square) -> Vec<Move> {
    let mut moves = Vec::with_capacity(32);
    generate_on(pos.board(), from, &mut moves);
    moves
}

/// All legal moves for `color`, whether or not it is that side's turn.
pub fn legal_moves(pos: &Position, color: Color) -> Vec<Move> {
    let mut legal = Vec::with_capacity(64);
    let mut pseudo = Vec::with_capacity(32);

    for (from, piece) in pos.board().pieces() {
        if piece.color != color {
            continue;
        }
        pseudo.clear();
        generate_on(pos.board(), from, &mut pseudo);
        for mv in pseudo.drain(..) {
            match check_legal(pos, color, &mv) {
                Ok(()) => legal.push(mv),
                Err(rejection) => trace!(%mv, reason = rejection.as_str(), "candidate rejected"),
            }
        }
    }
    legal
}

/// Legal moves of the piece standing on `from`.
pub fn legal_moves_from(pos: &Position, from: Square) -> Vec<Move> {
    match pos.board().get(from) {
        Some(piece) => legal_moves(pos, piece.color)
            .into_iter()
            .filter(|m| m.from == from)
            .collect(),
        None => Vec::new(),
    }
}

/// In check with no legal move.
pub fn is_checkmate(pos: &Position, color: Color) -> bool {
    attacks::is_in_check(pos, color) && legal_moves(pos, color).is_empty()
}

/// Not in check, but no legal move.
pub fn is_stalemate(pos: &Position, color: Color) -> bool {
    !attacks::is_in_check(pos, color) && legal_moves(pos, color).is_empty()
}

// =========================================================================
// Legality filter
// =========================================================================

/// Why a pseudo-legal candidate was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Rejection {
    NoCastlingRight,
    CastlingOutOfCheck,
    CastlingThroughCheck,
    LeavesKingInCheck,
    EnPassantNotGranted,
}

impl Rejection {
    fn as_str(self) -> &'static str {
        match self {
            Rejection::NoCastlingRight => "castling right lost",
            Rejection::CastlingOutOfCheck => "cannot castle out of check",
            Rejection::CastlingThroughCheck => "king crosses or lands on an attacked square",
            Rejection::LeavesKingInCheck => "leaves own king in check",
            Rejection::EnPassantNotGranted => "en passant not granted by the last move",
        }
    }
}

fn check_legal(pos: &Position, us: Color, mv: &Move) -> Result<(), Rejection> {
    if let Some(side) = mv.castling_side() {
        check_castling(pos, us, mv, side)?;
    }

    if mv.is_en_passant() && !pos.en_passant_targets(us).contains(mv) {
        return Err(Rejection::EnPassantNotGranted);
    }

    let next = pos.apply_unchecked(mv);
    if board_in_check(next.board(), us) {
        return Err(Rejection::LeavesKingInCheck);
    }
    Ok(())
}

/// The king may not castle without the right, out of check, or across or
/// onto an attacked square. Each square is tested with the king standing on
/// it and the rest of the board untouched.
fn check_castling(pos: &Position, us: Color, mv: &Move, side: CastlingSide) -> Result<(), Rejection> {
    if !pos.castling_rights().can_castle(us, side) {
        return Err(Rejection::NoCastlingRight);
    }
    if board_in_check(pos.board(), us) {
        return Err(Rejection::CastlingOutOfCheck);
    }

    let king = Piece::new(us, PieceType::King);
    let rank = us.back_rank();
    for file in [side.king_transit_file(), side.king_to_file()] {
        let mut scratch = *pos.board();
        scratch.remove(mv.from);
        scratch.put(Square::from_file_rank(file, rank), king);
        if board_in_check(&scratch, us) {
            return Err(Rejection::CastlingThroughCheck);
        }
    }
    Ok(())
}

// =========================================================================
// Pseudo-legal generation
// =========================================================================

/// Append the pseudo-legal moves of the piece on `from` to `moves`.
pub(crate) fn generate_on(board: &Board, from: Square, moves: &mut Vec<Move>) {
    let Some(piece) = board.get(from) else {
        return;
    };
    let t = tables();
    match piece.kind {
        PieceType::Pawn => generate_pawn_moves(board, from, piece.color, moves),
        PieceType::Knight => generate_step_moves(board, from, piece, t.knight_targets(from), moves),
        PieceType::Bishop => {
            generate_ray_moves(board, from, piece.color, PieceType::Bishop, &Direction::BISHOP, moves)
        }
        PieceType::Rook => {
            generate_ray_moves(board, from, piece.color, PieceType::Rook, &Direction::ROOK, moves)
        }
        PieceType::Queen => {
            // Rook rays first, then bishop rays, all tagged as queen moves.
            generate_ray_moves(board, from, piece.color, PieceType::Queen, &Direction::ROOK, moves);
            generate_ray_moves(board, from, piece.color, PieceType::Queen, &Direction::BISHOP, moves);
        }
        PieceType::King => {
            generate_step_moves(board, from, piece, t.king_targets(from), moves);
            generate_castling_candidates(board, from, piece.color, moves);
        }
    }
}

// -------------------------------------------------------------------------
// Sliders
// -------------------------------------------------------------------------

/// Walk each ray until the edge, a friendly piece (stop, no move), or an
/// enemy piece (capture, stop). `tag` is the piece kind written into the
/// moves, which lets the queen reuse the rook and bishop rays.
fn generate_ray_moves(
    board: &Board,
    from: Square,
    us: Color,
    tag: PieceType,
    dirs: &[Direction],
    moves: &mut Vec<Move>,
) {
    let t = tables();
    for &dir in dirs {
        for &to in t.ray(from, dir) {
            match board.get(to) {
                None => moves.push(Move::new(tag, from, to)),
                Some(p) if p.color != us => {
                    moves.push(Move::with_flags(tag, from, to, MoveFlags::CAPTURE));
                    break;
                }
                Some(_) => break,
            }
        }
    }
}

// -------------------------------------------------------------------------
// Knight / king steps
// -------------------------------------------------------------------------

fn generate_step_moves(
    board: &Board,
    from: Square,
    piece: Piece,
    targets: &[Square],
    moves: &mut Vec<Move>,
) {
    for &to in targets {
        match board.get(to) {
            None => moves.push(Move::new(piece.kind, from, to)),
            Some(p) if p.color != piece.color => {
                moves.push(Move::with_flags(piece.kind, from, to, MoveFlags::CAPTURE))
            }
            Some(_) => {}
        }
    }
}

/// Geometric castling only: king on its home square, matching rook in the
/// corner, and the squares between them empty. Rights and attacked squares
/// are left to the legality filter.
fn generate_castling_candidates(board: &Board, from: Square, us: Color, moves: &mut Vec<Move>) {
    let rank = us.back_rank();
    if from != Square::from_file_rank(KING_HOME_FILE, rank) {
        return;
    }
    let rook = Piece::new(us, PieceType::Rook);
    for side in CastlingSide::BOTH {
        let corner = Square::from_file_rank(side.rook_file(), rank);
        let path_clear = side
            .between_files()
            .iter()
            .all(|&file| board.is_empty(Square::from_file_rank(file, rank)));
        if board.holds(corner, rook) && path_clear {
            moves.push(Move::castling(us, side));
        }
    }
}

// -------------------------------------------------------------------------
// Pawns
// -------------------------------------------------------------------------

/// Rank (0-based) a pawn must stand on to capture en passant.
#[inline]
fn en_passant_rank(us: Color) -> u8 {
    match us {
        Color::White => 4,
        Color::Black => 3,
    }
}

fn generate_pawn_moves(board: &Board, from: Square, us: Color, moves: &mut Vec<Move>) {
    let dir = us.forward();
    let Some(one) = from.offset(0, dir) else {
        return;
    };
    let promotes = one.rank() == us.promotion_rank();

    // --- Pushes ---
    if board.is_empty(one) {
        push_pawn_move(from, one, MoveFlags::NONE, promotes, moves);

        if from.rank() == us.pawn_home_rank()
            && let Some(two) = from.offset(0, 2 * dir)
            && board.is_empty(two)
        {
            moves.push(Move::new(PieceType::Pawn, from, two));
        }
    }

    // --- Diagonals: right, then left ---
    for df in [1, -1] {
        let Some(diag) = from.offset(df, dir) else {
            continue;
        };
        match board.get(diag) {
            Some(p) if p.color != us => push_pawn_move(from, diag, MoveFlags::CAPTURE, promotes, moves),
            Some(_) => {}
            None => {
                // En passant: the enemy pawn sits beside us, not on `diag`.
                if from.rank() == en_passant_rank(us)
                    && let Some(beside) = from.offset(df, 0)
                    && board.holds(beside, Piece::new(!us, PieceType::Pawn))
                {
                    moves.push(Move::en_passant(from, diag));
                }
            }
        }
    }
}

/// Push a pawn move, expanded into the four promotion choices on the last rank.
fn push_pawn_move(from: Square, to: Square, flags: MoveFlags, promotes: bool, moves: &mut Vec<Move>) {
    if promotes {
        for promo in PieceType::PROMOTIONS {
            moves.push(Move::with_promotion(from, to, promo, flags));
        }
    } else {
        moves.push(Move::with_flags(PieceType::Pawn, from, to, flags));
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        Square::from_algebraic(name).unwrap()
    }

    fn mv(text: &str) -> Move {
        text.parse().unwrap()
    }

    fn texts(moves: &[Move]) -> Vec<String> {
        moves.iter().map(|m| m.to_string()).collect()
    }

    /// Position with `side` to move, built from `(square, token)` pairs.
    fn pos(side: Color, pieces: &[(&str, &str)]) -> Position {
        let mut b = Board::empty();
        for &(name, code) in pieces {
            b.put(sq(name), Piece::from_code(code).unwrap());
        }
        Position::from_board(b, side)
    }

    /// Play moves in sequence, panicking on the first illegal one.
    fn play(mut p: Position, moves: &[&str]) -> Position {
        for text in moves {
            p = p.apply(&mv(text)).unwrap_or_else(|e| panic!("{text}: {e}"));
        }
        p
    }

    // -------------------------------------------------------------------
    // Pseudo-legal generation
    // -------------------------------------------------------------------

    #[test]
    fn rook_rays_in_order() {
        let p = pos(Color::White, &[("a1", "wr"), ("a3", "wp"), ("c1", "bn"), ("e1", "wk"), ("e8", "bk")]);
        assert_eq!(texts(&generate(&p, sq("a1"))), vec!["Ra1b1", "Ra1xc1", "Ra1a2"]);
    }

    #[test]
    fn bishop_rays_in_order() {
        let p = pos(Color::White, &[("c1", "wb"), ("e3", "bp"), ("e1", "wk"), ("e8", "bk")]);
        assert_eq!(
            texts(&generate(&p, sq("c1"))),
            vec!["Bc1d2", "Bc1xe3", "Bc1b2", "Bc1a3"]
        );
    }

    #[test]
    fn queen_is_rook_then_bishop_rays() {
        let p = pos(
            Color::White,
            &[("a1", "wq"), ("a2", "wp"), ("b1", "wn"), ("c3", "bp"), ("e1", "wk"), ("e8", "bk")],
        );
        assert_eq!(texts(&generate(&p, sq("a1"))), vec!["Qa1b2", "Qa1xc3"]);
    }

    #[test]
    fn knight_offsets_filtered_to_board() {
        let p = pos(Color::White, &[("b1", "wn"), ("d2", "wp"), ("c3", "bp"), ("e1", "wk"), ("e8", "bk")]);
        assert_eq!(texts(&generate(&p, sq("b1"))), vec!["Nb1xc3", "Nb1a3"]);
    }

    #[test]
    fn king_steps_and_castling_candidates() {
        let p = pos(Color::White, &[("e1", "wk"), ("a1", "wr"), ("h1", "wr"), ("e8", "bk")]);
        let moves = texts(&generate(&p, sq("e1")));
        assert_eq!(moves.len(), 7);
        assert_eq!(moves[0], "Ke1e2");
        assert_eq!(&moves[5..], ["Ke1<O-O>", "Ke1<O-O-O>"]);
    }

    #[test]
    fn castling_candidate_needs_rook_and_empty_path() {
        let p = pos(
            Color::White,
            &[("e1", "wk"), ("a1", "wr"), ("b1", "wn"), ("h1", "br"), ("e8", "bk")],
        );
        let moves = texts(&generate(&p, sq("e1")));
        assert!(!moves.iter().any(|m| m.contains("<O-O")));
    }

    #[test]
    fn castling_candidate_ignores_attacks() {
        // f1 is attacked, but generation is geometric only.
        let p = pos(Color::White, &[("e1", "wk"), ("h1", "wr"), ("f8", "br"), ("a8", "bk")]);
        assert!(generate(&p, sq("e1")).contains(&mv("Ke1<O-O>")));
    }

    #[test]
    fn pawn_pushes_and_captures() {
        let p = pos(Color::White, &[("e2", "wp"), ("d3", "bp"), ("f3", "wn"), ("e1", "wk"), ("e8", "bk")]);
        assert_eq!(texts(&generate(&p, sq("e2"))), vec!["Pe2e3", "Pe2e4", "Pe2xd3"]);
    }

    #[test]
    fn black_pawn_moves_down() {
        let p = pos(Color::Black, &[("d7", "bp"), ("e6", "wp"), ("e1", "wk"), ("e8", "bk")]);
        assert_eq!(texts(&generate(&p, sq("d7"))), vec!["Pd7d6", "Pd7d5", "Pd7xe6"]);
    }

    #[test]
    fn pawn_double_step_blocked() {
        let p = pos(Color::White, &[("e2", "wp"), ("e4", "bn"), ("e1", "wk"), ("e8", "bk")]);
        assert_eq!(texts(&generate(&p, sq("e2"))), vec!["Pe2e3"]);
        let p = pos(Color::White, &[("e2", "wp"), ("e3", "bn"), ("e1", "wk"), ("e8", "bk")]);
        assert!(generate(&p, sq("e2")).is_empty());
    }

    #[test]
    fn pawn_promotion_variants() {
        let p = pos(Color::White, &[("e7", "wp"), ("f8", "br"), ("a1", "wk"), ("h1", "bk")]);
        assert_eq!(
            texts(&generate(&p, sq("e7"))),
            vec![
                "Pe7e8Q", "Pe7e8N", "Pe7e8B", "Pe7e8R", "Pe7xf8Q", "Pe7xf8N", "Pe7xf8B", "Pe7xf8R"
            ]
        );
    }

    #[test]
    fn en_passant_candidate_is_geometric() {
        let p = pos(Color::White, &[("e5", "wp"), ("d5", "bp"), ("e1", "wk"), ("e8", "bk")]);
        assert_eq!(texts(&generate(&p, sq("e5"))), vec!["Pe5e6", "Pe5xd6EP"]);
    }

    #[test]
    fn empty_square_generates_nothing() {
        let p = Position::starting();
        assert!(generate(&p, sq("e4")).is_empty());
    }

    // -------------------------------------------------------------------
    // Legal filter
    // -------------------------------------------------------------------

    #[test]
    fn starting_position_has_20_moves() {
        let p = Position::starting();
        let moves = legal_moves(&p, Color::White);
        assert_eq!(moves.len(), 20);
        assert_eq!(moves.iter().filter(|m| m.piece == PieceType::Pawn).count(), 16);
        assert_eq!(moves.iter().filter(|m| m.piece == PieceType::Knight).count(), 4);
        assert_eq!(legal_moves(&p, Color::Black).len(), 20);
    }

    #[test]
    fn legal_order_is_file_major() {
        let moves = texts(&legal_moves(&Position::starting(), Color::White));
        assert_eq!(&moves[..4], ["Pa2a3", "Pa2a4", "Nb1c3", "Nb1a3"]);
        assert_eq!(moves.last().unwrap(), "Ph2h4");
    }

    #[test]
    fn pinned_piece_cannot_move() {
        let p = pos(Color::White, &[("e1", "wk"), ("e2", "wn"), ("e8", "br"), ("a8", "bk")]);
        assert!(legal_moves_from(&p, sq("e2")).is_empty());
    }

    #[test]
    fn must_escape_check() {
        let p = pos(Color::White, &[("e1", "wk"), ("a1", "wr"), ("h1", "bq"), ("e8", "bk")]);
        for m in legal_moves(&p, Color::White) {
            let next = p.apply(&m).unwrap();
            assert!(!attacks::is_in_check(&next, Color::White), "{m} leaves king in check");
        }
    }

    #[test]
    fn castling_both_sides_legal() {
        let p = pos(
            Color::White,
            &[("e1", "wk"), ("a1", "wr"), ("h1", "wr"), ("e8", "bk")],
        );
        let moves = legal_moves(&p, Color::White);
        assert!(moves.contains(&mv("Ke1<O-O>")));
        assert!(moves.contains(&mv("Ke1<O-O-O>")));
    }

    #[test]
    fn castling_through_attacked_transit_square() {
        // Black rook on f8 covers f1.
        let p = pos(
            Color::White,
            &[("e1", "wk"), ("a1", "wr"), ("h1", "wr"), ("f8", "br"), ("a8", "bk")],
        );
        let moves = legal_moves(&p, Color::White);
        assert!(!moves.contains(&mv("Ke1<O-O>")));
        assert!(moves.contains(&mv("Ke1<O-O-O>")));
    }

    #[test]
    fn castling_onto_attacked_square() {
        // Black rook on c8 covers c1; b1 being attacked does not matter.
        let p = pos(
            Color::White,
            &[("e1", "wk"), ("a1", "wr"), ("c8", "br"), ("h8", "bk")],
        );
        assert!(!legal_moves(&p, Color::White).contains(&mv("Ke1<O-O-O>")));
        let p = pos(
            Color::White,
            &[("e1", "wk"), ("a1", "wr"), ("b8", "br"), ("h8", "bk")],
        );
        assert!(legal_moves(&p, Color::White).contains(&mv("Ke1<O-O-O>")));
    }

    #[test]
    fn no_castling_out_of_check() {
        let p = pos(Color::White, &[("e1", "wk"), ("h1", "wr"), ("e8", "br"), ("a8", "bk")]);
        assert!(!legal_moves(&p, Color::White).iter().any(|m| m.is_castling()));
    }

    #[test]
    fn castling_needs_right() {
        let p = pos(
            Color::White,
            &[("e1", "wk"), ("h1", "wr"), ("e8", "bk"), ("a8", "br")],
        );
        let p = play(p, &["Rh1h2", "Ke8d8", "Rh2h1", "Kd8e8"]);
        assert!(!legal_moves(&p, Color::White).contains(&mv("Ke1<O-O>")));
    }

    #[test]
    fn en_passant_requires_fresh_grant() {
        // Geometrically available but never granted by a double step.
        let p = pos(Color::White, &[("e5", "wp"), ("d5", "bp"), ("e1", "wk"), ("e8", "bk")]);
        assert!(!legal_moves(&p, Color::White).contains(&mv("Pe5xd6EP")));
    }

    #[test]
    fn en_passant_granted_by_double_step() {
        let p = pos(Color::Black, &[("e5", "wp"), ("d7", "bp"), ("e1", "wk"), ("h8", "bk")]);
        let p = play(p, &["Pd7d5"]);
        assert!(legal_moves(&p, Color::White).contains(&mv("Pe5xd6EP")));
    }

    #[test]
    fn en_passant_expires_after_one_move() {
        let p = pos(
            Color::Black,
            &[("e5", "wp"), ("d7", "bp"), ("a1", "wk"), ("h8", "bk")],
        );
        let p = play(p, &["Pd7d5", "Ka1a2", "Kh8g8"]);
        assert!(!legal_moves(&p, Color::White).contains(&mv("Pe5xd6EP")));
    }

    #[test]
    fn en_passant_exposing_king_is_illegal() {
        // Removing both pawns from rank 5 opens the rook onto the king.
        let p = pos(
            Color::Black,
            &[("a5", "wk"), ("e5", "wp"), ("d7", "bp"), ("h5", "br"), ("h8", "bk")],
        );
        let p = play(p, &["Pd7d5"]);
        assert!(!legal_moves(&p, Color::White).contains(&mv("Pe5xd6EP")));
    }

    #[test]
    fn checkmate_and_stalemate() {
        // Back-rank mate.
        let p = pos(Color::Black, &[("g8", "bk"), ("f7", "bp"), ("g7", "bp"), ("h7", "bp"), ("a8", "wr"), ("g1", "wk")]);
        assert!(is_checkmate(&p, Color::Black));
        assert!(!is_stalemate(&p, Color::Black));

        let p = pos(Color::Black, &[("a8", "bk"), ("c7", "wk"), ("b6", "wq")]);
        assert!(is_stalemate(&p, Color::Black));
        assert!(!is_checkmate(&p, Color::Black));
    }

    #[test]
    fn legal_moves_from_empty_square() {
        assert!(legal_moves_from(&Position::starting(), sq("e4")).is_empty());
        assert_eq!(legal_moves_from(&Position::starting(), sq("g1")).len(), 2);
    }
}
