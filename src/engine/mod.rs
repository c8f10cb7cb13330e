pub mod attacks;
pub mod board;
pub mod game;
pub mod movegen;
pub mod notation;
pub mod position;
pub mod types;

pub use attacks::is_in_check;
pub use board::Board;
pub use game::{Game, GameSummary, MoveRecord};
pub use movegen::{generate, is_checkmate, is_stalemate, legal_moves, legal_moves_from};
pub use notation::parse_move;
pub use position::{Position, Snapshot};
pub use types::*;
