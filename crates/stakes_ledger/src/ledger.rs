//! Host-side wrapper that commits transitions and answers read-only queries.

use crate::game::{Game, GameId, StatusView};
use crate::state::{ContractCall, LedgerState, Receipt, Transaction, transition};
use crate::{ContractError, Identity};
use tracing::{debug, info, instrument, warn};

/// The contract as seen by one ledger: committed state plus a block counter.
///
/// Calls are applied one at a time. A call either commits completely or
/// leaves the ledger exactly as it was.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    state: LedgerState,
    height: u64,
}

impl Ledger {
    /// Creates an empty ledger.
    #[instrument]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger with genesis balances.
    #[instrument(skip(balances))]
    pub fn with_balances(
        balances: impl IntoIterator<Item = (Identity, u128)>,
    ) -> Result<Self, ContractError> {
        let mut ledger = Self::new();
        for (who, amount) in balances {
            ledger.fund(who, amount)?;
        }
        Ok(ledger)
    }

    /// Credits funds to an account outside of any game.
    #[instrument(skip(self, who), fields(who = %who))]
    pub fn fund(&mut self, who: Identity, amount: u128) -> Result<(), ContractError> {
        self.state.mint(who, amount)
    }

    /// Executes a transaction atomically.
    #[instrument(skip(self, tx), fields(height = self.height, sender = %tx.sender()))]
    pub fn execute(&mut self, tx: &Transaction) -> Result<Receipt, ContractError> {
        match transition(&self.state, tx) {
            Ok((next, receipt)) => {
                debug_assert_eq!(next.total_supply(), self.state.total_supply());
                self.state = next;
                self.height += 1;
                debug!(game_id = *receipt.game_id(), events = receipt.events().len(), "Committed");
                Ok(receipt)
            }
            Err(err) => {
                warn!(error = %err, code = err.code(), "Transaction rejected");
                Err(err)
            }
        }
    }

    /// `create-game`: opens a game with the creator's opening X move.
    pub fn create_game(
        &mut self,
        creator: &Identity,
        bet_amount: u128,
        move_index: u128,
        mark: u128,
    ) -> Result<GameId, ContractError> {
        let call = ContractCall::CreateGame {
            bet_amount,
            move_index,
            mark,
        };
        let receipt = self.execute(&Transaction::new(creator.clone(), call))?;
        info!(game_id = *receipt.game_id(), "create-game committed");
        Ok(*receipt.game_id())
    }

    /// `join-game`: seats the joiner as player two and locks a matching wager.
    pub fn join_game(
        &mut self,
        game_id: GameId,
        joiner: &Identity,
        move_index: u128,
        mark: u128,
    ) -> Result<GameId, ContractError> {
        let call = ContractCall::JoinGame {
            game_id,
            move_index,
            mark,
            bet_amount: None,
        };
        let receipt = self.execute(&Transaction::new(joiner.clone(), call))?;
        Ok(*receipt.game_id())
    }

    /// `play`: places the caller's mark and settles the game if it ended.
    pub fn play(
        &mut self,
        game_id: GameId,
        player: &Identity,
        move_index: u128,
        mark: u128,
    ) -> Result<GameId, ContractError> {
        let call = ContractCall::Play {
            game_id,
            move_index,
            mark,
        };
        let receipt = self.execute(&Transaction::new(player.clone(), call))?;
        Ok(*receipt.game_id())
    }

    /// `get-game`
    pub fn get_game(&self, game_id: GameId) -> Option<Game> {
        self.state.game(game_id).cloned()
    }

    /// `get-game-status`
    pub fn get_game_status(&self, game_id: GameId) -> Result<StatusView, ContractError> {
        self.state
            .game(game_id)
            .map(Game::status_view)
            .ok_or(ContractError::GameNotFound)
    }

    /// `get-latest-game-id`: number of games ever created.
    pub fn get_latest_game_id(&self) -> GameId {
        self.state.next_game_id()
    }

    /// Spendable balance of an account.
    pub fn balance_of(&self, who: &Identity) -> u128 {
        self.state.balance_of(who)
    }

    /// Value locked against a game.
    pub fn escrow_of(&self, game_id: GameId) -> u128 {
        self.state.escrow_of(game_id)
    }

    /// Committed state.
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Number of committed transactions.
    pub fn height(&self) -> u64 {
        self.height
    }
}
