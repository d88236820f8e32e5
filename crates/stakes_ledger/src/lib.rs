//! Ledger state machine for wagered tic-tac-toe.
//!
//! Two players each lock the same wager; the contract holds both in escrow
//! and pays the winner, or splits the pot on a draw.
//!
//! # Architecture
//!
//! - **State**: [`LedgerState`] with pure [`transition`]s per [`Transaction`]
//! - **Host**: [`Ledger`] commits successful transitions and answers reads
//! - **Identity**: c32check-addressed principals
//! - **Invariants**: escrow/turn/mark properties checked after each transition
//!
//! # Example
//!
//! ```
//! use stakes_ledger::{GameStatus, Identity, Ledger};
//!
//! let alice = Identity::standard(26, [1; 20])?;
//! let bob = Identity::standard(26, [2; 20])?;
//! let mut ledger = Ledger::with_balances([(alice.clone(), 10), (bob.clone(), 10)])?;
//!
//! let id = ledger.create_game(&alice, 5, 0, 1)?;
//! ledger.join_game(id, &bob, 4, 2)?;
//! assert_eq!(ledger.get_game_status(id)?.status(), &GameStatus::InProgress);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod game;
pub mod identity;
pub mod invariants;
mod ledger;
mod state;

pub use error::ContractError;
pub use game::{Game, GameId, GameStatus, StatusView};
pub use identity::{Identity, IdentityError};
pub use ledger::Ledger;
pub use state::{ContractCall, LedgerEvent, LedgerState, Receipt, Transaction, transition};
