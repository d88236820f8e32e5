//! In-process ledger exposed through the read-only wire interface.
//!
//! Answers the same calls a node would, encoded the same way, so the read
//! layer can be driven without a network. Public calls arrive as
//! [`TxPayload`]s and run through the contract state machine.

use crate::client::{ClientError, ReadOnlyClient};
use crate::codec::{self, GET_GAME, GET_GAME_STATUS, GET_LATEST_GAME_ID, TxPayload};
use crate::value::ClarityValue;
use async_trait::async_trait;
use stakes_ledger::{ContractCall, ContractError, Identity, Ledger, Receipt, Transaction};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, instrument};

/// Shared handle to a local [`Ledger`].
#[derive(Debug, Clone, Default)]
pub struct LocalLedgerClient {
    ledger: Arc<RwLock<Ledger>>,
}

impl LocalLedgerClient {
    /// Wraps a ledger.
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
        }
    }

    /// Runs `f` against the current ledger.
    pub fn with_ledger<T>(&self, f: impl FnOnce(&Ledger) -> T) -> T {
        let ledger = self.ledger.read().unwrap_or_else(PoisonError::into_inner);
        f(&ledger)
    }

    /// Executes a public call on behalf of `sender`.
    #[instrument(skip(self, payload), fields(function = payload.function(), sender = %sender))]
    pub fn submit(&self, sender: &Identity, payload: &TxPayload) -> Result<Receipt, SubmitError> {
        let call = ContractCall::try_from(payload).map_err(SubmitError::Codec)?;
        let mut ledger = self.ledger.write().unwrap_or_else(PoisonError::into_inner);
        ledger
            .execute(&Transaction::new(sender.clone(), call))
            .map_err(SubmitError::Contract)
    }

    fn single_uint(function: &str, args: &[ClarityValue]) -> Result<u128, ClientError> {
        match args {
            [arg] => Ok(arg.as_uint()?),
            _ => Err(ClientError::Rejected(format!(
                "{} expects 1 argument, got {}",
                function,
                args.len()
            ))),
        }
    }
}

/// Why a submitted call did not commit.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum SubmitError {
    /// The payload did not describe a contract call.
    #[display("Malformed payload: {_0}")]
    Codec(crate::value::CodecError),
    /// The contract rejected the call.
    #[display("Rejected with u{}: {}", _0.code(), _0)]
    Contract(ContractError),
}

#[async_trait]
impl ReadOnlyClient for LocalLedgerClient {
    #[instrument(skip(self, args))]
    async fn call_read_only(
        &self,
        function: &str,
        args: &[ClarityValue],
    ) -> Result<ClarityValue, ClientError> {
        let value = match function {
            GET_LATEST_GAME_ID => {
                ClarityValue::UInt(self.with_ledger(|ledger| ledger.get_latest_game_id()))
            }
            GET_GAME => {
                let game_id = Self::single_uint(function, args)?;
                let game = self.with_ledger(|ledger| ledger.get_game(game_id));
                codec::encode_game(game.as_ref())
            }
            GET_GAME_STATUS => {
                let game_id = Self::single_uint(function, args)?;
                let status = self.with_ledger(|ledger| ledger.get_game_status(game_id));
                codec::encode_status(&status)
            }
            other => {
                return Err(ClientError::Rejected(format!(
                    "Unknown read-only function '{}'",
                    other
                )));
            }
        };
        debug!(kind = value.type_name(), "Answered locally");
        Ok(value)
    }
}
