//! Stateful game controller wrapping Position.
//!
//! `Game` keeps the latest position, the moves that led to it, and the
//! previous positions for undo. Draw claims are not decided here; the
//! halfmove clock and repetition count are exposed for whoever arbitrates.

use serde::Serialize;
use tracing::{info, warn};

use crate::engine::attacks;
use crate::engine::movegen;
use crate::engine::notation::parse_move;
use crate::engine::position::Position;
use crate::engine::types::{
    CastlingRights, ChessError, Color, GameStatus, Move, Piece, Square,
};

// =========================================================================
// MoveRecord
// =========================================================================

/// A recorded move in the game history.
#[derive(Clone, Debug)]
pub struct MoveRecord {
    /// The move that was played.
    pub mv: Move,
    /// Its text encoding.
    pub text: String,
    /// Piece removed by the move, if any.
    pub captured: Option<Piece>,
    /// Status of the side to move after this move.
    pub status_after: GameStatus,
}

// =========================================================================
// GameSummary
// =========================================================================

/// Serializable view of a game for output.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    /// Board text rows, rank 8 first.
    pub board: Vec<String>,
    pub side_to_move: Color,
    pub status: GameStatus,
    pub castling_rights: CastlingRights,
    pub halfmove_clock: u16,
    pub repetition_count: usize,
    pub fifty_move_claimable: bool,
    pub moves: Vec<String>,
    pub legal_moves: Vec<Move>,
}

// =========================================================================
// Game
// =========================================================================

/// A chess game with history, undo, and status tracking.
#[derive(Clone, Debug)]
pub struct Game {
    position: Position,
    move_history: Vec<MoveRecord>,
    /// Positions before each recorded move, for undo.
    previous: Vec<Position>,
    status: GameStatus,
}

impl Game {
    /// New game from the standard starting position.
    pub fn new() -> Self {
        Game::from_position(Position::starting())
    }

    /// Continue play from an existing position.
    pub fn from_position(position: Position) -> Self {
        let status = compute_status(&position);
        Game {
            position,
            move_history: Vec::new(),
            previous: Vec::new(),
            status,
        }
    }

    // -----------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn side_to_move(&self) -> Color {
        self.position.side_to_move()
    }

    pub fn move_history(&self) -> &[MoveRecord] {
        &self.move_history
    }

    /// Legal moves for the side to move.
    pub fn legal_moves(&self) -> Vec<Move> {
        movegen::legal_moves(&self.position, self.position.side_to_move())
    }

    pub fn legal_moves_from(&self, sq: Square) -> Vec<Move> {
        movegen::legal_moves_from(&self.position, sq)
    }

    pub fn is_game_over(&self) -> bool {
        self.status.is_game_over()
    }

    pub fn halfmove_clock(&self) -> u16 {
        self.position.halfmove_clock()
    }

    pub fn repetition_count(&self) -> usize {
        self.position.repetition_count()
    }

    // -----------------------------------------------------------------
    // Make move
    // -----------------------------------------------------------------

    /// Play a move. Returns the text encoding of the move played.
    ///
    /// Returns `ChessError::GameOver` once the game has ended; otherwise the
    /// errors of [`Position::apply`].
    pub fn make_move(&mut self, mv: &Move) -> Result<String, ChessError> {
        if self.status.is_game_over() {
            return Err(rejected(ChessError::GameOver(self.status)));
        }

        let captured = self.position.captured_piece(mv);
        let next = self.position.apply(mv).map_err(rejected)?;
        let status = compute_status(&next);

        let text = mv.to_string();
        self.previous.push(std::mem::replace(&mut self.position, next));
        self.status = status;
        self.move_history.push(MoveRecord {
            mv: *mv,
            text: text.clone(),
            captured,
            status_after: status,
        });

        if status.is_game_over() {
            info!(%status, moves = self.move_history.len(), "game over");
        }
        Ok(text)
    }

    /// Parse a move token and play it.
    pub fn play(&mut self, text: &str) -> Result<String, ChessError> {
        let mv = parse_move(text).map_err(rejected)?;
        self.make_move(&mv)
    }

    // -----------------------------------------------------------------
    // Undo move
    // -----------------------------------------------------------------

    /// Undo the last move. Returns the move that was undone.
    pub fn undo_move(&mut self) -> Result<Move, ChessError> {
        if self.move_history.is_empty() || self.previous.is_empty() {
            return Err(ChessError::NothingToUndo);
        }
        let (Some(record), Some(previous)) = (self.move_history.pop(), self.previous.pop()) else {
            return Err(ChessError::NothingToUndo);
        };
        self.position = previous;
        self.status = compute_status(&self.position);
        Ok(record.mv)
    }

    // -----------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------

    pub fn summary(&self) -> GameSummary {
        GameSummary {
            board: self.position.board().text_rows(),
            side_to_move: self.position.side_to_move(),
            status: self.status,
            castling_rights: self.position.castling_rights(),
            halfmove_clock: self.position.halfmove_clock(),
            repetition_count: self.position.repetition_count(),
            fifty_move_claimable: self.position.fifty_move_claimable(),
            moves: self.move_history.iter().map(|r| r.text.clone()).collect(),
            legal_moves: self.legal_moves(),
        }
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

/// Status of the side to move in `pos`.
fn compute_status(pos: &Position) -> GameStatus {
    let us = pos.side_to_move();
    let in_check = attacks::is_in_check(pos, us);
    let has_moves = !movegen::legal_moves(pos, us).is_empty();
    match (in_check, has_moves) {
        (true, false) => GameStatus::Checkmate,
        (false, false) => GameStatus::Stalemate,
        (true, true) => GameStatus::Check,
        (false, true) => GameStatus::Active,
    }
}

fn rejected(err: ChessError) -> ChessError {
    warn!(error = %err, "move rejected");
    err
}

// =========================================================================
// Tests
// =========================================================================
