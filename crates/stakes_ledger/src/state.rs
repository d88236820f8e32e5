//! Pure state transitions for the contract.
//!
//! Every mutating call is a function `(&LedgerState, &Transaction) ->
//! Result<(LedgerState, Receipt), ContractError>`. The input state is never
//! touched, so a rejected call leaves nothing behind; the hosting ledger
//! supplies ordering and decides whether to commit the returned state.

use crate::game::{Game, GameId, GameStatus};
use crate::{ContractError, Identity};
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use stakes_board::{Board, Mark, apply_move, check_winner, is_full};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// A mutating contract call, with arguments exactly as they arrive on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "kebab-case")]
pub enum ContractCall {
    /// `create-game(bet-amount, move-index, move)`
    CreateGame {
        /// Wager locked from the creator.
        bet_amount: u128,
        /// Opening move index.
        move_index: u128,
        /// Mark code (must be X).
        mark: u128,
    },
    /// `join-game(game-id, move-index, move)`
    JoinGame {
        /// Game to join.
        game_id: GameId,
        /// Joiner's move index.
        move_index: u128,
        /// Mark code (must be O).
        mark: u128,
        /// Wager the joiner expects to lock. `None` locks the game's wager.
        bet_amount: Option<u128>,
    },
    /// `play(game-id, move-index, move)`
    Play {
        /// Game to play in.
        game_id: GameId,
        /// Move index.
        move_index: u128,
        /// Mark code of the caller.
        mark: u128,
    },
}

/// A call together with the identity that signed it.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize, new)]
pub struct Transaction {
    /// Signer of the call.
    sender: Identity,
    /// The call itself.
    call: ContractCall,
}

/// Event emitted by a successful call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum LedgerEvent {
    /// A game was created and the creator's wager locked.
    GameCreated {
        /// New game id.
        game_id: GameId,
        /// Creator.
        player: Identity,
        /// Wager locked.
        bet_amount: u128,
    },
    /// A second player joined and locked a matching wager.
    GameJoined {
        /// Game id.
        game_id: GameId,
        /// Joiner.
        player: Identity,
    },
    /// A mark was placed.
    MovePlayed {
        /// Game id.
        game_id: GameId,
        /// Mover.
        player: Identity,
        /// Board index.
        index: usize,
        /// Mark placed.
        mark: Mark,
    },
    /// The whole pot went to the winner.
    PrizePaid {
        /// Game id.
        game_id: GameId,
        /// Winner.
        winner: Identity,
        /// Amount paid.
        amount: u128,
    },
    /// The pot was split after a draw.
    DrawRefunded {
        /// Game id.
        game_id: GameId,
        /// Paid to player one (receives any odd unit).
        player_one_amount: u128,
        /// Paid to player two.
        player_two_amount: u128,
    },
}

/// Outcome of a committed call.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct Receipt {
    /// The created or affected game.
    game_id: GameId,
    /// Events in emission order.
    events: Vec<LedgerEvent>,
}

/// Complete contract state: games, escrow, balances, and the id counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    games: BTreeMap<GameId, Game>,
    escrow: BTreeMap<GameId, u128>,
    balances: BTreeMap<Identity, u128>,
    next_game_id: GameId,
}

impl LedgerState {
    /// Looks up a game.
    pub fn game(&self, game_id: GameId) -> Option<&Game> {
        self.games.get(&game_id)
    }

    /// All games, by id.
    pub fn games(&self) -> impl Iterator<Item = &Game> {
        self.games.values()
    }

    /// Next id to be assigned (the number of games ever created).
    pub fn next_game_id(&self) -> GameId {
        self.next_game_id
    }

    /// Value currently locked against a game.
    pub fn escrow_of(&self, game_id: GameId) -> u128 {
        self.escrow.get(&game_id).copied().unwrap_or(0)
    }

    /// Spendable balance of an account.
    pub fn balance_of(&self, who: &Identity) -> u128 {
        self.balances.get(who).copied().unwrap_or(0)
    }

    /// Balances plus escrow. Unchanged by every transition.
    pub fn total_supply(&self) -> u128 {
        self.balances
            .values()
            .chain(self.escrow.values())
            .fold(0u128, |acc, v| acc.saturating_add(*v))
    }

    /// Credits genesis funds to an account.
    pub(crate) fn mint(&mut self, who: Identity, amount: u128) -> Result<(), ContractError> {
        self.credit(&who, amount)
    }

    #[instrument(skip(self), fields(game_id = self.next_game_id))]
    fn create_game(
        &mut self,
        creator: &Identity,
        bet_amount: u128,
        move_index: u128,
        mark: u128,
    ) -> Result<Receipt, ContractError> {
        if bet_amount == 0 {
            return Err(ContractError::InvalidBetAmount);
        }
        if Mark::from_code(mark) != Some(Mark::X) {
            return Err(ContractError::InvalidMark);
        }
        let index = board_index(move_index)?;
        let board = apply_move(&Board::new(), index, Mark::X)?;

        let game_id = self.next_game_id;
        self.lock(game_id, creator, bet_amount)?;
        self.next_game_id = game_id
            .checked_add(1)
            .ok_or(ContractError::ArithmeticOverflow)?;

        let game = Game::from_parts(game_id, creator.clone(), None, false, bet_amount, board, None);
        self.games.insert(game_id, game);
        info!(game_id, bet_amount, "Game created");

        Ok(Receipt {
            game_id,
            events: vec![
                LedgerEvent::GameCreated {
                    game_id,
                    player: creator.clone(),
                    bet_amount,
                },
                LedgerEvent::MovePlayed {
                    game_id,
                    player: creator.clone(),
                    index,
                    mark: Mark::X,
                },
            ],
        })
    }

    #[instrument(skip(self))]
    fn join_game(
        &mut self,
        joiner: &Identity,
        game_id: GameId,
        move_index: u128,
        mark: u128,
        offered_bet: Option<u128>,
    ) -> Result<Receipt, ContractError> {
        let mut game = self
            .games
            .get(&game_id)
            .cloned()
            .ok_or(ContractError::GameNotFound)?;
        if game.status() != GameStatus::Waiting {
            return Err(ContractError::GameNotWaiting);
        }
        if Mark::from_code(mark) != Some(Mark::O) {
            return Err(ContractError::InvalidMark);
        }
        if joiner == game.player_one() {
            return Err(ContractError::SelfJoin);
        }
        let bet_amount = *game.bet_amount();
        if offered_bet.is_some_and(|offered| offered != bet_amount) {
            return Err(ContractError::BetMismatch);
        }
        let index = board_index(move_index)?;
        let board = apply_move(game.board(), index, Mark::O)?;

        self.lock(game_id, joiner, bet_amount)?;
        game.set_player_two(joiner.clone());
        game.set_board(board);
        game.flip_turn();
        info!(game_id, "Game joined");

        let mut events = vec![
            LedgerEvent::GameJoined {
                game_id,
                player: joiner.clone(),
            },
            LedgerEvent::MovePlayed {
                game_id,
                player: joiner.clone(),
                index,
                mark: Mark::O,
            },
        ];
        self.settle(&mut game, &mut events)?;
        self.games.insert(game_id, game);
        Ok(Receipt { game_id, events })
    }

    #[instrument(skip(self))]
    fn play(
        &mut self,
        player: &Identity,
        game_id: GameId,
        move_index: u128,
        mark: u128,
    ) -> Result<Receipt, ContractError> {
        let mut game = self
            .games
            .get(&game_id)
            .cloned()
            .ok_or(ContractError::GameNotFound)?;
        if game.status() != GameStatus::InProgress {
            return Err(ContractError::GameNotInProgress);
        }
        if game.current_player() != Some(player) {
            return Err(ContractError::NotYourTurn);
        }
        let mark = Mark::from_code(mark).ok_or(ContractError::InvalidMark)?;
        if game.mark_of(player) != Some(mark) {
            return Err(ContractError::WrongMark);
        }
        let index = board_index(move_index)?;
        let board = apply_move(game.board(), index, mark)?;

        game.set_board(board);
        game.flip_turn();
        debug!(game_id, index, %mark, "Move applied");

        let mut events = vec![LedgerEvent::MovePlayed {
            game_id,
            player: player.clone(),
            index,
            mark,
        }];
        self.settle(&mut game, &mut events)?;
        self.games.insert(game_id, game);
        Ok(Receipt { game_id, events })
    }

    /// Pays out the pot if the last move ended the game.
    ///
    /// A win pays the whole pot to the winner. A draw splits it, with any
    /// odd unit going to player one.
    fn settle(&mut self, game: &mut Game, events: &mut Vec<LedgerEvent>) -> Result<(), ContractError> {
        let game_id = *game.id();
        if let Some(mark) = check_winner(game.board()) {
            let winner = match mark {
                Mark::X => Some(game.player_one().clone()),
                Mark::O => game.player_two().clone(),
            }
            .ok_or(ContractError::GameNotInProgress)?;
            let pot = self.release(game_id);
            self.credit(&winner, pot)?;
            info!(game_id, %winner, amount = pot, "Prize paid");
            events.push(LedgerEvent::PrizePaid {
                game_id,
                winner: winner.clone(),
                amount: pot,
            });
            game.set_winner(winner);
        } else if is_full(game.board()) {
            let player_two = game
                .player_two()
                .clone()
                .ok_or(ContractError::GameNotInProgress)?;
            let pot = self.release(game_id);
            let player_two_amount = pot / 2;
            let player_one_amount = pot - player_two_amount;
            self.credit(game.player_one(), player_one_amount)?;
            self.credit(&player_two, player_two_amount)?;
            info!(game_id, player_one_amount, player_two_amount, "Draw refunded");
            events.push(LedgerEvent::DrawRefunded {
                game_id,
                player_one_amount,
                player_two_amount,
            });
        }
        Ok(())
    }

    fn lock(&mut self, game_id: GameId, from: &Identity, amount: u128) -> Result<(), ContractError> {
        let balance = self.balance_of(from);
        let remaining = balance
            .checked_sub(amount)
            .ok_or(ContractError::InsufficientFunds)?;
        let locked = self
            .escrow_of(game_id)
            .checked_add(amount)
            .ok_or(ContractError::ArithmeticOverflow)?;
        self.balances.insert(from.clone(), remaining);
        self.escrow.insert(game_id, locked);
        debug!(game_id, amount, locked, "Wager locked");
        Ok(())
    }

    fn release(&mut self, game_id: GameId) -> u128 {
        self.escrow.insert(game_id, 0).unwrap_or(0)
    }

    fn credit(&mut self, to: &Identity, amount: u128) -> Result<(), ContractError> {
        let balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(ContractError::ArithmeticOverflow)?;
        self.balances.insert(to.clone(), balance);
        Ok(())
    }
}

fn board_index(move_index: u128) -> Result<usize, ContractError> {
    usize::try_from(move_index).map_err(|_| ContractError::OutOfBounds)
}

/// Executes one transaction against `state`, returning the successor state.
///
/// Pure: `state` is only read. On error no successor exists, which is how
/// a rejected call leaves board and escrow untouched.
#[instrument(skip(state, tx), fields(sender = %tx.sender(), call = ?tx.call()))]
pub fn transition(
    state: &LedgerState,
    tx: &Transaction,
) -> Result<(LedgerState, Receipt), ContractError> {
    let mut next = state.clone();
    let sender = tx.sender();
    let receipt = match *tx.call() {
        ContractCall::CreateGame {
            bet_amount,
            move_index,
            mark,
        } => next.create_game(sender, bet_amount, move_index, mark)?,
        ContractCall::JoinGame {
            game_id,
            move_index,
            mark,
            bet_amount,
        } => next.join_game(sender, game_id, move_index, mark, bet_amount)?,
        ContractCall::Play {
            game_id,
            move_index,
            mark,
        } => next.play(sender, game_id, move_index, mark)?,
    };

    #[cfg(debug_assertions)]
    crate::invariants::assert_invariants(&next);

    Ok((next, receipt))
}
