//! Ledger-wide invariants.
//!
//! Properties that must hold for every committed state. Transitions check
//! them in debug builds; tests use them directly.

use crate::LedgerState;
use crate::game::{Game, GameStatus};
use stakes_board::{Mark, Square};

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants checked together.
pub trait InvariantSet<S> {
    /// Returns every violated invariant, or `Ok(())` if all hold.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

impl<S, I1, I2, I3> InvariantSet<S> for (I1, I2, I3)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
    I3: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let violations: Vec<_> = [
            (I1::holds(state), I1::description()),
            (I2::holds(state), I2::description()),
            (I3::holds(state), I3::description()),
        ]
        .into_iter()
        .filter(|(holds, _)| !holds)
        .map(|(_, description)| InvariantViolation::new(description))
        .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

fn mark_counts(game: &Game) -> (usize, usize) {
    game.board()
        .squares()
        .iter()
        .fold((0, 0), |(x, o), square| match square {
            Square::Occupied(Mark::X) => (x + 1, o),
            Square::Occupied(Mark::O) => (x, o + 1),
            Square::Empty => (x, o),
        })
}

/// Escrow per game matches its lifecycle: one wager while waiting, two in
/// progress, nothing once settled.
pub struct EscrowMatchesStatus;

impl Invariant<LedgerState> for EscrowMatchesStatus {
    fn holds(state: &LedgerState) -> bool {
        state.games().all(|game| {
            let bet = *game.bet_amount();
            let expected = match game.status() {
                GameStatus::Waiting => Some(bet),
                GameStatus::InProgress => bet.checked_mul(2),
                GameStatus::Finished | GameStatus::Draw => Some(0),
            };
            expected == Some(state.escrow_of(*game.id()))
        })
    }

    fn description() -> &'static str {
        "Escrow per game matches its lifecycle status"
    }
}

/// X moves first and players alternate, so X leads O by zero or one.
pub struct MarksAlternate;

impl Invariant<LedgerState> for MarksAlternate {
    fn holds(state: &LedgerState) -> bool {
        state.games().all(|game| {
            let (x, o) = mark_counts(game);
            x == o || x == o + 1
        })
    }

    fn description() -> &'static str {
        "Mark counts alternate (X leads O by at most one)"
    }
}

/// The turn flag points at player one exactly when both marks are level.
pub struct TurnMatchesBoard;

impl Invariant<LedgerState> for TurnMatchesBoard {
    fn holds(state: &LedgerState) -> bool {
        state.games().all(|game| {
            let (x, o) = mark_counts(game);
            *game.is_player_one_turn() == (x == o)
        })
    }

    fn description() -> &'static str {
        "Turn flag agrees with the marks on the board"
    }
}

/// All ledger invariants as a composable set.
pub type LedgerInvariants = (EscrowMatchesStatus, MarksAlternate, TurnMatchesBoard);

/// Panics with every violated description. Called after each transition in
/// debug builds.
pub fn assert_invariants(state: &LedgerState) {
    if let Err(violations) = LedgerInvariants::check_all(state) {
        let descriptions = violations
            .iter()
            .map(|v| v.description.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        panic!("Ledger invariant violated: {descriptions}");
    }
}
