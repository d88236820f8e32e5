//! Board engine for wagered tic-tac-toe.
//!
//! Pure logic only: the 9-cell board, move validation, and win/draw
//! detection. Nothing in this crate performs I/O or holds shared state,
//! so every function is safe to call from inside a ledger transaction.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod engine;
mod position;
pub mod rules;
mod types;

pub use engine::{BoardError, apply_move};
pub use position::Position;
pub use rules::{check_winner, is_draw, is_full};
pub use types::{Board, Mark, Square};
