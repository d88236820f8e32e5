//! Cached reads against an in-process ledger.

use async_trait::async_trait;
use stakes_board::Mark;
use stakes_ledger::identity::TESTNET_SINGLESIG;
use stakes_ledger::{ContractError, GameStatus, Identity, Ledger};
use stakes_sync::{
    ClarityValue, ClientError, GameFeed, GameLookup, LocalLedgerClient, ReadOnlyClient,
    SubmitError, SyncError, TxPayload,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TTL: Duration = Duration::from_secs(30);
const BET: u128 = 1_000_000;

/// Records every function name passed through to the inner client.
struct Counting<C> {
    inner: C,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl<C: ReadOnlyClient> ReadOnlyClient for Counting<C> {
    async fn call_read_only(
        &self,
        function: &str,
        args: &[ClarityValue],
    ) -> Result<ClarityValue, ClientError> {
        self.log.lock().unwrap().push(function.to_string());
        self.inner.call_read_only(function, args).await
    }
}

struct Fixture {
    local: LocalLedgerClient,
    feed: GameFeed<Counting<LocalLedgerClient>>,
    log: Arc<Mutex<Vec<String>>>,
    p1: Identity,
    p2: Identity,
}

impl Fixture {
    fn new() -> Self {
        let p1 = Identity::standard(TESTNET_SINGLESIG, [1; 20]).unwrap();
        let p2 = Identity::standard(TESTNET_SINGLESIG, [2; 20]).unwrap();
        let ledger = Ledger::with_balances([(p1.clone(), 100 * BET), (p2.clone(), 100 * BET)])
            .expect("genesis");
        let local = LocalLedgerClient::new(ledger);
        let log = Arc::new(Mutex::new(Vec::new()));
        let counting = Counting {
            inner: local.clone(),
            log: Arc::clone(&log),
        };
        Self {
            feed: GameFeed::new(counting, TTL, 3),
            local,
            log,
            p1,
            p2,
        }
    }

    fn calls(&self, function: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.as_str() == function)
            .count()
    }

    fn create(&self) -> u128 {
        *self
            .local
            .submit(&self.p1, &TxPayload::create_game(BET, 0))
            .expect("create")
            .game_id()
    }
}

#[tokio::test(start_paused = true)]
async fn test_repeat_read_within_ttl_is_served_from_cache() {
    let fx = Fixture::new();
    let id = fx.create();

    let first = fx.feed.game(id).await.unwrap();
    fx.local
        .submit(&fx.p2, &TxPayload::join_game(id, 4))
        .unwrap();
    tokio::time::advance(Duration::from_secs(10)).await;
    let second = fx.feed.game(id).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(second.unwrap().status(), GameStatus::Waiting);
    assert_eq!(fx.calls("get-game"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_read_after_ttl_sees_new_state() {
    let fx = Fixture::new();
    let id = fx.create();

    fx.feed.game(id).await.unwrap();
    fx.local
        .submit(&fx.p2, &TxPayload::join_game(id, 4))
        .unwrap();
    tokio::time::advance(TTL).await;
    let game = fx.feed.game(id).await.unwrap().unwrap();

    assert_eq!(game.status(), GameStatus::InProgress);
    assert_eq!(game.player_two(), &Some(fx.p2.clone()));
    assert_eq!(fx.calls("get-game"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_after_submit_skips_stale_entries() {
    let fx = Fixture::new();
    let id = fx.create();

    assert_eq!(fx.feed.recent_games().await.unwrap().len(), 1);
    fx.local
        .submit(&fx.p2, &TxPayload::join_game(id, 4))
        .unwrap();
    fx.feed.invalidate(id);

    let game = fx.feed.game(id).await.unwrap().unwrap();
    assert_eq!(game.status(), GameStatus::InProgress);
    let recent = fx.feed.recent_games().await.unwrap();
    assert_eq!(recent[0].status(), GameStatus::InProgress);
    assert_eq!(fx.calls("get-latest-game-id"), 2);
    assert_eq!(fx.calls("get-game"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_missing_game_is_cached() {
    let fx = Fixture::new();

    assert_eq!(fx.feed.lookup(42).await, Ok(GameLookup::Missing));
    assert_eq!(fx.feed.game(42).await, Ok(None));
    assert_eq!(fx.calls("get-game"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_recent_games_takes_last_window() {
    let fx = Fixture::new();
    for _ in 0..5 {
        fx.create();
    }

    let games = fx.feed.recent_games().await.unwrap();
    let ids: Vec<u128> = games.iter().map(|g| *g.id()).collect();
    assert_eq!(ids, vec![2, 3, 4]);
    assert_eq!(fx.calls("get-latest-game-id"), 1);
    assert_eq!(fx.calls("get-game"), 3);

    fx.feed.recent_games().await.unwrap();
    assert_eq!(fx.calls("get-latest-game-id"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_recent_games_with_fewer_than_window() {
    let fx = Fixture::new();
    fx.create();

    let games = fx.feed.recent_games().await.unwrap();
    assert_eq!(games.len(), 1);
    assert_eq!(*games[0].id(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_status_surfaces_contract_error() {
    let fx = Fixture::new();
    assert_eq!(
        fx.feed.game_status(9).await,
        Err(SyncError::Contract(ContractError::GameNotFound))
    );
}

#[tokio::test(start_paused = true)]
async fn test_submitted_game_settles_and_reads_back() {
    let fx = Fixture::new();
    let id = fx.create();
    let moves = [
        (&fx.p2, TxPayload::join_game(id, 1)),
        (&fx.p1, TxPayload::play(id, 4, Mark::X)),
        (&fx.p2, TxPayload::play(id, 3, Mark::O)),
        (&fx.p1, TxPayload::play(id, 8, Mark::X)),
    ];
    for (who, payload) in &moves {
        fx.local.submit(who, payload).expect("legal move");
    }

    let status = fx.feed.game_status(id).await.unwrap();
    assert_eq!(status.status(), &GameStatus::Finished);
    assert_eq!(status.winner(), &Some(fx.p1.clone()));
    assert_eq!(*status.total_prize(), 2 * BET);
    assert!(!status.is_draw());

    let game = fx.feed.game(id).await.unwrap().unwrap();
    assert_eq!(game.board().codes(), [1, 2, 0, 2, 1, 0, 0, 0, 1]);
    fx.local.with_ledger(|ledger| {
        assert_eq!(ledger.escrow_of(id), 0);
        assert_eq!(ledger.balance_of(&fx.p1), 101 * BET);
    });
}

#[tokio::test(start_paused = true)]
async fn test_rejected_submission_reports_code() {
    let fx = Fixture::new();
    let id = fx.create();

    let err = fx
        .local
        .submit(&fx.p1, &TxPayload::join_game(id, 4))
        .unwrap_err();
    assert_eq!(err, SubmitError::Contract(ContractError::SelfJoin));
    assert_eq!(fx.feed.game(id).await.unwrap().unwrap().player_two(), &None);
}

/// Answers every `get-game` with a value that is not a game record.
struct Garbled;

#[async_trait]
impl ReadOnlyClient for Garbled {
    async fn call_read_only(
        &self,
        _function: &str,
        _args: &[ClarityValue],
    ) -> Result<ClarityValue, ClientError> {
        Ok(ClarityValue::some(ClarityValue::UInt(1)))
    }
}

#[tokio::test(start_paused = true)]
async fn test_undecodable_game_reads_as_absent() {
    let feed = GameFeed::new(Garbled, TTL, 3);

    assert_eq!(feed.game(0).await, Ok(None));
    assert!(matches!(
        feed.lookup(0).await,
        Ok(GameLookup::Undecodable(_))
    ));
}
