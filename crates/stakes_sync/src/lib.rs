//! Read-side mirror of the wagered tic-tac-toe contract.
//!
//! # Architecture
//!
//! - **Values**: [`ClarityValue`] and its consensus binary/hex encoding
//! - **Codec**: game records, status views, and call payloads on the wire
//! - **Client**: [`ReadOnlyClient`] over HTTP, with [`RetryingClient`] backoff
//! - **Cache**: [`TtlCache`] memoizing reads for a fixed lifetime
//! - **Feed**: [`GameFeed`] combining the above into cached game reads
//! - **Local**: [`LocalLedgerClient`] serving an in-process ledger
//!
//! # Example
//!
//! ```
//! use stakes_ledger::{Identity, Ledger};
//! use stakes_sync::{GameFeed, LocalLedgerClient, TxPayload};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let alice = Identity::standard(26, [1; 20])?;
//! let local = LocalLedgerClient::new(Ledger::with_balances([(alice.clone(), 10)])?);
//! local.submit(&alice, &TxPayload::create_game(5, 4))?;
//!
//! let feed = GameFeed::new(local, Duration::from_secs(30), 3);
//! let games = feed.recent_games().await?;
//! assert_eq!(games.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod cache;
mod client;
pub mod codec;
mod config;
mod local;
mod sync;
mod value;

pub use cache::TtlCache;
pub use client::{ClientError, HttpLedgerClient, ReadOnlyClient, RetryPolicy, RetryingClient};
pub use codec::{TxPayload, TxPayloadJson};
pub use config::{ConfigError, ENV_API_URL, ENV_CONTRACT_ADDRESS, ENV_CONTRACT_NAME, SyncConfig};
pub use local::{LocalLedgerClient, SubmitError};
pub use sync::{GameFeed, GameLookup, SyncError};
pub use value::{ClarityValue, CodecError, MAX_DEPTH};
