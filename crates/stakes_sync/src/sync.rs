//! Cached read view of the contract.

use crate::cache::TtlCache;
use crate::client::{ClientError, ReadOnlyClient};
use crate::codec::{self, GET_GAME, GET_GAME_STATUS, GET_LATEST_GAME_ID};
use crate::config::SyncConfig;
use crate::value::{ClarityValue, CodecError};
use derive_more::{Display, Error, From};
use stakes_ledger::{ContractError, Game, GameId, StatusView};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Failure of a cached read.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error, From)]
pub enum SyncError {
    /// The ledger could not be reached, or kept rate limiting.
    #[display("Ledger read failed: {_0}")]
    Client(ClientError),
    /// The ledger answered with something that is not the expected shape.
    #[display("Ledger returned malformed data: {_0}")]
    Codec(CodecError),
    /// The contract refused the query.
    #[display("Contract error u{}: {}", _0.code(), _0)]
    Contract(ContractError),
}

/// Outcome of a per-game lookup, as cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameLookup {
    /// The game exists.
    Found(Game),
    /// The ledger returned `none`.
    Missing,
    /// The ledger returned a value that is not a game record.
    Undecodable(String),
}

impl GameLookup {
    /// The game, if one was decoded.
    pub fn game(&self) -> Option<&Game> {
        match self {
            Self::Found(game) => Some(game),
            Self::Missing | Self::Undecodable(_) => None,
        }
    }

    /// Consumes the lookup into the game, if one was decoded.
    pub fn into_game(self) -> Option<Game> {
        match self {
            Self::Found(game) => Some(game),
            Self::Missing | Self::Undecodable(_) => None,
        }
    }
}

/// Mirrors recent games through a read-only client, memoizing results.
///
/// Per-game lookups and the recent-games list are cached separately, each
/// for the configured TTL. Within a TTL a repeated read returns the same
/// result without touching the client; afterwards it may reflect newer
/// ledger state.
#[derive(Debug)]
pub struct GameFeed<C> {
    client: C,
    games: TtlCache<GameId, GameLookup>,
    recent: TtlCache<(), Vec<Game>>,
    window: u32,
}

impl<C: ReadOnlyClient> GameFeed<C> {
    /// Creates a feed with explicit cache lifetime and list window.
    pub fn new(client: C, ttl: Duration, window: u32) -> Self {
        Self {
            client,
            games: TtlCache::new(ttl),
            recent: TtlCache::new(ttl),
            window,
        }
    }

    /// Creates a feed using configured cache lifetime and list window.
    pub fn from_config(client: C, config: &SyncConfig) -> Self {
        Self::new(client, config.cache_ttl(), *config.recent_window())
    }

    /// The underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Number of games ever created. Not cached.
    #[instrument(skip(self))]
    pub async fn latest_game_id(&self) -> Result<GameId, SyncError> {
        let value = self.client.call_read_only(GET_LATEST_GAME_ID, &[]).await?;
        Ok(codec::decode_latest_game_id(&value)?)
    }

    /// Cached lookup of one game.
    #[instrument(skip(self))]
    pub async fn lookup(&self, game_id: GameId) -> Result<GameLookup, SyncError> {
        self.games
            .get_or_refresh(game_id, || self.fetch(game_id))
            .await
    }

    async fn fetch(&self, game_id: GameId) -> Result<GameLookup, SyncError> {
        let value = self
            .client
            .call_read_only(GET_GAME, &[ClarityValue::UInt(game_id)])
            .await?;
        let lookup = match codec::decode_game(game_id, &value) {
            Ok(Some(game)) => GameLookup::Found(game),
            Ok(None) => GameLookup::Missing,
            Err(err) => {
                warn!(game_id, error = %err, "Ledger returned an undecodable game");
                GameLookup::Undecodable(err.to_string())
            }
        };
        Ok(lookup)
    }

    /// Cached `get-game`: `None` when the game is absent or unreadable.
    pub async fn game(&self, game_id: GameId) -> Result<Option<Game>, SyncError> {
        Ok(self.lookup(game_id).await?.into_game())
    }

    /// The newest games, oldest first. Cached as a whole.
    ///
    /// Fetches at most the configured window of ids below the latest id;
    /// ids that are absent or unreadable are skipped. Each refresh also
    /// evicts expired per-game entries.
    #[instrument(skip(self), fields(window = self.window))]
    pub async fn recent_games(&self) -> Result<Vec<Game>, SyncError> {
        self.recent
            .get_or_refresh((), || async {
                self.games.purge_expired();
                let latest = self.latest_game_id().await?;
                let start = latest.saturating_sub(u128::from(self.window));
                let mut games = Vec::new();
                for game_id in start..latest {
                    if let Some(game) = self.game(game_id).await? {
                        games.push(game);
                    }
                }
                info!(latest, count = games.len(), "Refreshed recent games");
                Ok::<_, SyncError>(games)
            })
            .await
    }

    /// `get-game-status`. Not cached.
    #[instrument(skip(self))]
    pub async fn game_status(&self, game_id: GameId) -> Result<StatusView, SyncError> {
        let value = self
            .client
            .call_read_only(GET_GAME_STATUS, &[ClarityValue::UInt(game_id)])
            .await?;
        let view = codec::decode_status(&value)??;
        debug!(status = %view.status(), "Status read");
        Ok(view)
    }

    /// Forgets cached results so the next reads go to the ledger.
    pub fn invalidate(&self, game_id: GameId) {
        self.games.invalidate(&game_id);
        self.recent.invalidate(&());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::TxPayload;
    use crate::local::LocalLedgerClient;
    use stakes_ledger::Ledger;
    use stakes_ledger::identity::TESTNET_SINGLESIG;
    use stakes_ledger::Identity;

    const TTL: Duration = Duration::from_secs(30);

    fn feed_with_one_game() -> GameFeed<LocalLedgerClient> {
        let alice = Identity::standard(TESTNET_SINGLESIG, [1; 20]).unwrap();
        let ledger = Ledger::with_balances([(alice.clone(), 100)]).unwrap();
        let local = LocalLedgerClient::new(ledger);
        local.submit(&alice, &TxPayload::create_game(5, 4)).unwrap();
        GameFeed::new(local, TTL, 3)
    }

    #[tokio::test(start_paused = true)]
    async fn test_recent_refresh_evicts_expired_lookups() {
        let feed = feed_with_one_game();
        for game_id in 10..20 {
            assert_eq!(feed.lookup(game_id).await, Ok(GameLookup::Missing));
        }
        assert_eq!(feed.games.len(), 10);

        tokio::time::advance(TTL).await;
        let games = feed.recent_games().await.unwrap();

        assert_eq!(games.len(), 1);
        assert_eq!(feed.games.len(), 1);
        assert!(feed.games.get(&0).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_lookups_survive_refresh() {
        let feed = feed_with_one_game();
        feed.lookup(7).await.unwrap();

        tokio::time::advance(TTL / 2).await;
        feed.recent_games().await.unwrap();

        assert_eq!(feed.games.len(), 2);
        assert_eq!(feed.games.get(&7), Some(GameLookup::Missing));
    }
}
