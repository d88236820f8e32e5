//! Move application.

use super::position::Position;
use super::types::{Board, Mark};
use tracing::instrument;

/// Error produced when a move cannot be applied to a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum BoardError {
    /// Index outside [0, 9).
    #[display("Move index {} is out of bounds (must be 0-8)", _0)]
    OutOfBounds(#[error(not(source))] usize),

    /// The target cell already holds a mark.
    #[display("Cell {} is already occupied", _0)]
    CellOccupied(#[error(not(source))] Position),
}

/// Places `mark` at `index`, returning the new board.
///
/// The input board is never modified; on error nothing changes.
#[instrument(skip(board), fields(occupied = board.occupied()))]
pub fn apply_move(board: &Board, index: usize, mark: Mark) -> Result<Board, BoardError> {
    let pos = Position::from_index(index).ok_or(BoardError::OutOfBounds(index))?;
    if !board.is_empty(pos) {
        return Err(BoardError::CellOccupied(pos));
    }
    Ok(board.with(pos, mark))
}
