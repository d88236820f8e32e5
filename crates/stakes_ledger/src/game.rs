//! Per-game record and its derived views.

use crate::Identity;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use stakes_board::{Board, Mark, is_full};

/// Game identifier, assigned sequentially from zero.
pub type GameId = u128;

/// Lifecycle status, derived from the record rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumString, strum::IntoStaticStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum GameStatus {
    /// Created, no opponent yet.
    Waiting,
    /// Both players joined, no result yet.
    InProgress,
    /// Someone completed a line.
    Finished,
    /// Board filled without a line.
    Draw,
}

impl GameStatus {
    /// Wire string (`waiting`, `in-progress`, `finished`, `draw`).
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// No further moves are accepted.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Draw)
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authoritative state of one game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters, Serialize, Deserialize)]
pub struct Game {
    /// Sequential id.
    id: GameId,
    /// Creator, always plays X.
    player_one: Identity,
    /// Joiner, always plays O. Set exactly once.
    player_two: Option<Identity>,
    /// Whose move is next.
    is_player_one_turn: bool,
    /// Wager per player.
    bet_amount: u128,
    /// Current board.
    board: Board,
    /// Winner, set exactly once at a terminal transition.
    winner: Option<Identity>,
}

impl Game {
    /// Builds a record from its parts.
    ///
    /// Used by the state machine and by decoders of ledger reads; no
    /// validation beyond the types is performed here.
    pub fn from_parts(
        id: GameId,
        player_one: Identity,
        player_two: Option<Identity>,
        is_player_one_turn: bool,
        bet_amount: u128,
        board: Board,
        winner: Option<Identity>,
    ) -> Self {
        Self {
            id,
            player_one,
            player_two,
            is_player_one_turn,
            bet_amount,
            board,
            winner,
        }
    }

    /// Derives the lifecycle status.
    pub fn status(&self) -> GameStatus {
        match (&self.player_two, &self.winner) {
            (None, _) => GameStatus::Waiting,
            (Some(_), Some(_)) => GameStatus::Finished,
            (Some(_), None) if is_full(&self.board) => GameStatus::Draw,
            (Some(_), None) => GameStatus::InProgress,
        }
    }

    /// The mark assigned to `player` in this game, if they are in it.
    pub fn mark_of(&self, player: &Identity) -> Option<Mark> {
        if *player == self.player_one {
            Some(Mark::X)
        } else if self.player_two.as_ref() == Some(player) {
            Some(Mark::O)
        } else {
            None
        }
    }

    /// The player who moves next, if the game has two players.
    pub fn current_player(&self) -> Option<&Identity> {
        if self.is_player_one_turn {
            Some(&self.player_one)
        } else {
            self.player_two.as_ref()
        }
    }

    /// Value riding on the game: one wager while waiting, both once joined.
    pub fn total_prize(&self) -> u128 {
        match self.player_two {
            Some(_) => self.bet_amount.saturating_mul(2),
            None => self.bet_amount,
        }
    }

    /// Derived read-only status view.
    pub fn status_view(&self) -> StatusView {
        let status = self.status();
        StatusView {
            status,
            winner: self.winner.clone(),
            total_prize: self.total_prize(),
            is_draw: status == GameStatus::Draw,
        }
    }

    pub(crate) fn set_player_two(&mut self, player: Identity) {
        self.player_two = Some(player);
    }

    pub(crate) fn set_board(&mut self, board: Board) {
        self.board = board;
    }

    pub(crate) fn flip_turn(&mut self) {
        self.is_player_one_turn = !self.is_player_one_turn;
    }

    pub(crate) fn set_winner(&mut self, winner: Identity) {
        self.winner = Some(winner);
    }
}

/// Result of `get-game-status`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters, Serialize, Deserialize)]
pub struct StatusView {
    /// Lifecycle status.
    status: GameStatus,
    /// Winner, for finished games.
    winner: Option<Identity>,
    /// Value riding on the game.
    total_prize: u128,
    /// Whether the game ended in a draw.
    is_draw: bool,
}

impl StatusView {
    /// Builds a view from its parts (used when decoding ledger reads).
    pub fn new(status: GameStatus, winner: Option<Identity>, total_prize: u128) -> Self {
        Self {
            is_draw: status == GameStatus::Draw,
            status,
            winner,
            total_prize,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::TESTNET_SINGLESIG;
    use std::str::FromStr;

    fn id(n: u8) -> Identity {
        Identity::standard(TESTNET_SINGLESIG, [n; 20]).expect("valid version")
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(GameStatus::InProgress.as_str(), "in-progress");
        assert_eq!(GameStatus::from_str("draw"), Ok(GameStatus::Draw));
        assert!(GameStatus::from_str("over").is_err());
    }

    #[test]
    fn test_waiting_game_prize_is_single_wager() {
        let game = Game::from_parts(0, id(1), None, false, 500, Board::new(), None);
        assert_eq!(game.status(), GameStatus::Waiting);
        assert_eq!(game.total_prize(), 500);
        assert_eq!(game.current_player(), None);
    }

    #[test]
    fn test_marks_are_fixed_by_seat() {
        let game = Game::from_parts(0, id(1), Some(id(2)), true, 1, Board::new(), None);
        assert_eq!(game.mark_of(&id(1)), Some(Mark::X));
        assert_eq!(game.mark_of(&id(2)), Some(Mark::O));
        assert_eq!(game.mark_of(&id(3)), None);
    }
}
