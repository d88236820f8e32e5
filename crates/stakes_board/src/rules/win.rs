//! Win detection logic.

use crate::{Board, Mark, Position, Square};
use tracing::instrument;

/// Every winning triple: rows, then columns, then diagonals.
pub const LINES: [[Position; 3]; 8] = [
    // Rows
    [Position::TopLeft, Position::TopCenter, Position::TopRight],
    [Position::MiddleLeft, Position::Center, Position::MiddleRight],
    [Position::BottomLeft, Position::BottomCenter, Position::BottomRight],
    // Columns
    [Position::TopLeft, Position::MiddleLeft, Position::BottomLeft],
    [Position::TopCenter, Position::Center, Position::BottomCenter],
    [Position::TopRight, Position::MiddleRight, Position::BottomRight],
    // Diagonals
    [Position::TopLeft, Position::Center, Position::BottomRight],
    [Position::TopRight, Position::Center, Position::BottomLeft],
];

/// Checks if there is a winner on the board.
///
/// Returns the mark of the first uniform, non-empty line in [`LINES`]
/// order. A board reachable through legal play has at most one winner.
#[instrument(skip(board))]
pub fn check_winner(board: &Board) -> Option<Mark> {
    LINES.iter().find_map(|&[a, b, c]| match board.get(a) {
        Square::Occupied(mark) if board.get(b) == board.get(a) && board.get(c) == board.get(a) => {
            Some(mark)
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply_move;

    fn board_of(moves: &[(usize, Mark)]) -> Board {
        moves.iter().fold(Board::new(), |board, &(index, mark)| {
            apply_move(&board, index, mark).expect("legal move")
        })
    }

    #[test]
    fn test_no_winner_empty_board() {
        assert_eq!(check_winner(&Board::new()), None);
    }

    #[test]
    fn test_winner_top_row() {
        let board = board_of(&[(0, Mark::X), (1, Mark::X), (2, Mark::X)]);
        assert_eq!(check_winner(&board), Some(Mark::X));
    }

    #[test]
    fn test_winner_column() {
        let board = board_of(&[(1, Mark::O), (4, Mark::O), (7, Mark::O)]);
        assert_eq!(check_winner(&board), Some(Mark::O));
    }

    #[test]
    fn test_winner_anti_diagonal() {
        let board = board_of(&[(2, Mark::O), (4, Mark::O), (6, Mark::O)]);
        assert_eq!(check_winner(&board), Some(Mark::O));
    }

    #[test]
    fn test_every_line_detected() {
        for line in LINES {
            let moves: Vec<_> = line.iter().map(|p| (p.to_index(), Mark::X)).collect();
            assert_eq!(check_winner(&board_of(&moves)), Some(Mark::X), "{line:?}");
        }
    }

    #[test]
    fn test_mixed_line_is_not_a_win() {
        let board = board_of(&[(0, Mark::X), (1, Mark::O), (2, Mark::X)]);
        assert_eq!(check_winner(&board), None);
    }
}
