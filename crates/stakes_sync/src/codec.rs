//! Mapping between contract records and wire values.
//!
//! The read side decodes `get-game`, `get-game-status`, and
//! `get-latest-game-id` results. The write side builds the positional `uint`
//! arguments of the public functions.

use crate::value::{ClarityValue, CodecError};
use serde::{Deserialize, Serialize};
use stakes_board::{Board, Mark, Square};
use stakes_ledger::{ContractCall, ContractError, Game, GameId, GameStatus, StatusView};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Read-only function returning the number of games created.
pub const GET_LATEST_GAME_ID: &str = "get-latest-game-id";
/// Read-only function returning an optional game record.
pub const GET_GAME: &str = "get-game";
/// Read-only function returning a status view or an error code.
pub const GET_GAME_STATUS: &str = "get-game-status";
/// Public function opening a game.
pub const CREATE_GAME: &str = "create-game";
/// Public function joining a waiting game.
pub const JOIN_GAME: &str = "join-game";
/// Public function placing a mark.
pub const PLAY: &str = "play";

fn field<'a>(
    fields: &'a BTreeMap<String, ClarityValue>,
    key: &'static str,
) -> Result<&'a ClarityValue, CodecError> {
    fields.get(key).ok_or(CodecError::MissingField(key))
}

fn optional_principal(
    fields: &BTreeMap<String, ClarityValue>,
    key: &'static str,
) -> Result<Option<stakes_ledger::Identity>, CodecError> {
    field(fields, key)?
        .as_optional()?
        .map(|inner| inner.as_principal().cloned())
        .transpose()
}

fn decode_board(value: &ClarityValue) -> Result<Board, CodecError> {
    let cells = value.as_list()?;
    if cells.len() != 9 {
        return Err(CodecError::BoardLength(cells.len()));
    }
    let mut squares = [Square::Empty; 9];
    for (square, cell) in squares.iter_mut().zip(cells) {
        let code = cell.as_uint()?;
        *square = Square::from_code(code).ok_or(CodecError::InvalidCell(code))?;
    }
    Ok(Board::from_squares(squares))
}

fn encode_board(board: &Board) -> ClarityValue {
    ClarityValue::List(
        board
            .codes()
            .iter()
            .map(|code| ClarityValue::UInt(u128::from(*code)))
            .collect(),
    )
}

/// Decodes a `get-game` result.
///
/// `none` is an absent game. A `some` wrapping anything other than a well
/// formed game tuple is an error.
#[instrument(skip(value), fields(kind = value.type_name()))]
pub fn decode_game(game_id: GameId, value: &ClarityValue) -> Result<Option<Game>, CodecError> {
    let Some(inner) = value.as_optional()? else {
        debug!("Game absent");
        return Ok(None);
    };
    let fields = inner.as_tuple()?;

    let game = Game::from_parts(
        game_id,
        field(fields, "player-one")?.as_principal()?.clone(),
        optional_principal(fields, "player-two")?,
        field(fields, "is-player-one-turn")?.as_bool()?,
        field(fields, "bet-amount")?.as_uint()?,
        decode_board(field(fields, "board")?)?,
        optional_principal(fields, "winner")?,
    );
    Ok(Some(game))
}

/// Encodes a game record the way `get-game` returns it.
pub fn encode_game(game: Option<&Game>) -> ClarityValue {
    let Some(game) = game else {
        return ClarityValue::OptionalNone;
    };
    ClarityValue::some(ClarityValue::tuple([
        ("player-one", ClarityValue::Principal(game.player_one().clone())),
        (
            "player-two",
            ClarityValue::optional_principal(game.player_two().as_ref()),
        ),
        (
            "is-player-one-turn",
            ClarityValue::Bool(*game.is_player_one_turn()),
        ),
        ("bet-amount", ClarityValue::UInt(*game.bet_amount())),
        ("board", encode_board(game.board())),
        ("winner", ClarityValue::optional_principal(game.winner().as_ref())),
    ]))
}

/// Decodes a `get-latest-game-id` result.
pub fn decode_latest_game_id(value: &ClarityValue) -> Result<GameId, CodecError> {
    match value {
        ClarityValue::ResponseOk(inner) => inner.as_uint(),
        other => other.as_uint(),
    }
}

/// Decodes a `get-game-status` result.
///
/// The outer `Result` reports malformed values; the inner one carries the
/// contract's own rejection.
#[instrument(skip(value), fields(kind = value.type_name()))]
pub fn decode_status(
    value: &ClarityValue,
) -> Result<Result<StatusView, ContractError>, CodecError> {
    let fields = match value {
        ClarityValue::ResponseOk(inner) => inner.as_tuple()?,
        ClarityValue::ResponseErr(inner) => {
            let code = inner.as_uint()?;
            return ContractError::from_code(code)
                .map(Err)
                .ok_or(CodecError::UnknownErrorCode(code));
        }
        other => {
            return Err(CodecError::UnexpectedType {
                expected: "response",
                found: other.type_name(),
            });
        }
    };

    let text = field(fields, "status")?.as_str()?;
    let status = text
        .parse::<GameStatus>()
        .map_err(|_| CodecError::UnknownStatus(text.to_string()))?;
    let view = StatusView::new(
        status,
        optional_principal(fields, "winner")?,
        field(fields, "total-prize")?.as_uint()?,
    );
    if *view.is_draw() != field(fields, "is-draw")?.as_bool()? {
        return Err(CodecError::InconsistentStatus(status));
    }
    Ok(Ok(view))
}

/// Encodes a status lookup the way `get-game-status` returns it.
pub fn encode_status(result: &Result<StatusView, ContractError>) -> ClarityValue {
    match result {
        Ok(view) => ClarityValue::ok(ClarityValue::tuple([
            (
                "status",
                ClarityValue::StringAscii(view.status().as_str().to_string()),
            ),
            ("winner", ClarityValue::optional_principal(view.winner().as_ref())),
            ("total-prize", ClarityValue::UInt(*view.total_prize())),
            ("is-draw", ClarityValue::Bool(*view.is_draw())),
        ])),
        Err(err) => ClarityValue::err(ClarityValue::UInt(err.code())),
    }
}

/// Unsigned call for a public contract function: its name and positional
/// arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxPayload {
    function: &'static str,
    args: Vec<ClarityValue>,
}

/// Wire-ready rendering of a [`TxPayload`] for handing to a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPayloadJson {
    /// Contract function name.
    pub function: String,
    /// `0x`-prefixed hex arguments, in order.
    pub args: Vec<String>,
}

impl TxPayload {
    /// `create-game(bet-amount, move-index, move)`; the opening mark is X.
    pub fn create_game(bet_amount: u128, move_index: u128) -> Self {
        Self::uints(CREATE_GAME, [bet_amount, move_index, u128::from(Mark::X.code())])
    }

    /// `join-game(game-id, move-index, move)`; the joiner's mark is O.
    pub fn join_game(game_id: GameId, move_index: u128) -> Self {
        Self::uints(JOIN_GAME, [game_id, move_index, u128::from(Mark::O.code())])
    }

    /// `play(game-id, move-index, move)`
    pub fn play(game_id: GameId, move_index: u128, mark: Mark) -> Self {
        Self::uints(PLAY, [game_id, move_index, u128::from(mark.code())])
    }

    fn uints(function: &'static str, args: [u128; 3]) -> Self {
        Self {
            function,
            args: args.into_iter().map(ClarityValue::UInt).collect(),
        }
    }

    /// Contract function name.
    pub fn function(&self) -> &'static str {
        self.function
    }

    /// Positional arguments.
    pub fn args(&self) -> &[ClarityValue] {
        &self.args
    }

    /// Arguments as `0x`-prefixed hex.
    pub fn hex_args(&self) -> Result<Vec<String>, CodecError> {
        self.args.iter().map(ClarityValue::to_hex).collect()
    }

    /// Serializable rendering.
    pub fn to_json(&self) -> Result<TxPayloadJson, CodecError> {
        Ok(TxPayloadJson {
            function: self.function.to_string(),
            args: self.hex_args()?,
        })
    }
}

impl TryFrom<&TxPayload> for ContractCall {
    type Error = CodecError;

    /// Reads a payload back into the call the contract executes.
    fn try_from(payload: &TxPayload) -> Result<Self, Self::Error> {
        let [a, b, c] = payload.args.as_slice() else {
            return Err(CodecError::ArgumentCount(payload.args.len()));
        };
        let (a, b, c) = (a.as_uint()?, b.as_uint()?, c.as_uint()?);
        let call = match payload.function {
            CREATE_GAME => ContractCall::CreateGame {
                bet_amount: a,
                move_index: b,
                mark: c,
            },
            JOIN_GAME => ContractCall::JoinGame {
                game_id: a,
                move_index: b,
                mark: c,
                bet_amount: None,
            },
            PLAY => ContractCall::Play {
                game_id: a,
                move_index: b,
                mark: c,
            },
            other => return Err(CodecError::UnknownFunction(other.to_string())),
        };
        Ok(call)
    }
}
