//! Contract error codes.

use stakes_board::BoardError;

/// Reason a contract call was rejected.
///
/// Every variant leaves the ledger untouched. The numeric [`code`](Self::code)
/// is what the wire `(err uN)` response carries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display, derive_more::Error, strum::EnumIter,
)]
pub enum ContractError {
    /// Bet amount must be greater than zero.
    #[display("Bet amount must be greater than zero")]
    InvalidBetAmount,
    /// Mark is not the one this step of the game requires.
    #[display("Invalid mark for this move")]
    InvalidMark,
    /// No game with this id.
    #[display("Game not found")]
    GameNotFound,
    /// Game already has a second player.
    #[display("Game is not waiting for an opponent")]
    GameNotWaiting,
    /// Caller is not the player whose turn it is.
    #[display("Not your turn")]
    NotYourTurn,
    /// Game is waiting for an opponent or already over.
    #[display("Game is not in progress")]
    GameNotInProgress,
    /// Mark does not belong to the calling player.
    #[display("Mark does not match the calling player")]
    WrongMark,
    /// Joiner offered a wager different from the creator's.
    #[display("Bet amount does not match the game's wager")]
    BetMismatch,
    /// Creator tried to join their own game.
    #[display("Cannot join your own game")]
    SelfJoin,
    /// Move index outside [0, 9).
    #[display("Move index out of bounds")]
    OutOfBounds,
    /// Target cell already holds a mark.
    #[display("Cell is already occupied")]
    CellOccupied,
    /// Sender's balance cannot cover the wager.
    #[display("Insufficient funds to lock the wager")]
    InsufficientFunds,
    /// Amount arithmetic overflowed.
    #[display("Arithmetic overflow")]
    ArithmeticOverflow,
}

impl ContractError {
    /// Stable wire code.
    pub fn code(self) -> u128 {
        match self {
            Self::InvalidBetAmount => 100,
            Self::InvalidMark => 101,
            Self::GameNotFound => 102,
            Self::GameNotWaiting => 103,
            Self::NotYourTurn => 104,
            Self::GameNotInProgress => 105,
            Self::WrongMark => 106,
            Self::BetMismatch => 107,
            Self::SelfJoin => 108,
            Self::OutOfBounds => 109,
            Self::CellOccupied => 110,
            Self::InsufficientFunds => 111,
            Self::ArithmeticOverflow => 112,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: u128) -> Option<Self> {
        <Self as strum::IntoEnumIterator>::iter().find(|e| e.code() == code)
    }
}

impl From<BoardError> for ContractError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::OutOfBounds(_) => Self::OutOfBounds,
            BoardError::CellOccupied(_) => Self::CellOccupied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_codes_are_unique_and_invertible() {
        let mut seen = std::collections::HashSet::new();
        for err in ContractError::iter() {
            assert!(seen.insert(err.code()), "duplicate code for {err:?}");
            assert_eq!(ContractError::from_code(err.code()), Some(err));
        }
        assert_eq!(ContractError::from_code(999), None);
    }
}
