//! Core domain types for the board.

use super::position::Position;
use serde::{Deserialize, Serialize};

/// Mark placed by a player.
///
/// Player one always plays `X`, player two always plays `O`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum Mark {
    /// Player one's mark (goes first).
    X,
    /// Player two's mark.
    O,
}

impl Mark {
    /// Wire code of this mark (`1` for X, `2` for O).
    pub fn code(self) -> u8 {
        match self {
            Mark::X => 1,
            Mark::O => 2,
        }
    }

    /// Parses a wire code. `0` is the empty cell, not a mark.
    pub fn from_code(code: u128) -> Option<Self> {
        match code {
            1 => Some(Mark::X),
            2 => Some(Mark::O),
            _ => None,
        }
    }
}

/// A cell on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Square {
    /// Empty cell.
    Empty,
    /// Cell holding a mark.
    Occupied(Mark),
}

impl Square {
    /// Wire code of this cell (`0` empty, `1` X, `2` O).
    pub fn code(self) -> u8 {
        match self {
            Square::Empty => 0,
            Square::Occupied(mark) => mark.code(),
        }
    }

    /// Parses a wire cell code.
    pub fn from_code(code: u128) -> Option<Self> {
        match code {
            0 => Some(Square::Empty),
            other => Mark::from_code(other).map(Square::Occupied),
        }
    }
}

/// 3x3 board, row-major.
///
/// The length is fixed by the type. Cells are only written through
/// [`apply_move`](crate::apply_move), which refuses to overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    squares: [Square; 9],
}

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self {
            squares: [Square::Empty; 9],
        }
    }

    /// Rebuilds a board from already-validated cells (e.g. decoded from the ledger).
    pub fn from_squares(squares: [Square; 9]) -> Self {
        Self { squares }
    }

    /// Gets the cell at a position.
    pub fn get(&self, pos: Position) -> Square {
        self.squares[pos.to_index()]
    }

    /// Checks if a cell is empty.
    pub fn is_empty(&self, pos: Position) -> bool {
        self.get(pos) == Square::Empty
    }

    /// Returns all cells.
    pub fn squares(&self) -> &[Square; 9] {
        &self.squares
    }

    /// Returns the wire codes of all cells.
    pub fn codes(&self) -> [u8; 9] {
        self.squares.map(Square::code)
    }

    /// Number of marks placed so far.
    pub fn occupied(&self) -> usize {
        self.squares.iter().filter(|s| **s != Square::Empty).count()
    }

    pub(crate) fn with(mut self, pos: Position, mark: Mark) -> Self {
        self.squares[pos.to_index()] = Square::Occupied(mark);
        self
    }

    /// Formats the board as a grid; empty cells show their move index.
    pub fn display(&self) -> String {
        let mut result = String::new();
        for row in 0..3 {
            for col in 0..3 {
                let pos = row * 3 + col;
                let symbol = match self.squares[pos] {
                    Square::Empty => pos.to_string(),
                    Square::Occupied(mark) => mark.to_string(),
                };
                result.push_str(&symbol);
                if col < 2 {
                    result.push('|');
                }
            }
            if row < 2 {
                result.push_str("\n-+-+-\n");
            }
        }
        result
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_wire_encoding() {
        let board = Board::new()
            .with(Position::TopLeft, Mark::X)
            .with(Position::TopCenter, Mark::O);
        assert_eq!(board.codes(), [1, 2, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(board.occupied(), 2);
    }

    #[test]
    fn test_square_from_code_rejects_unknown() {
        assert_eq!(Square::from_code(0), Some(Square::Empty));
        assert_eq!(Square::from_code(2), Some(Square::Occupied(Mark::O)));
        assert_eq!(Square::from_code(3), None);
        assert_eq!(Mark::from_code(0), None);
    }

    #[test]
    fn test_display_grid() {
        let board = Board::new().with(Position::Center, Mark::X);
        assert_eq!(board.display(), "0|1|2\n-+-+-\n3|X|5\n-+-+-\n6|7|8");
    }
}
