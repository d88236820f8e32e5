//! HTTP client against a mock node.

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use stakes_sync::{
    ClarityValue, ClientError, ENV_API_URL, GameFeed, HttpLedgerClient, ReadOnlyClient,
    RetryPolicy, RetryingClient, SyncConfig,
};
use std::time::Duration;

const CALL_READ: &str = "/v2/contracts/call-read/ST2HYQ0YP5YK1DF7HF859G5HDQ4JKRRFFBT48SM0M/tic-tac-toe";

fn config_for(server: &ServerGuard) -> SyncConfig {
    let url = server.url();
    let mut config = SyncConfig::default();
    config.apply_overrides(|key| (key == ENV_API_URL).then(|| url.clone()));
    config
}

fn ok_body(value: &ClarityValue) -> String {
    json!({ "okay": true, "result": value.to_hex().unwrap() }).to_string()
}

#[tokio::test]
async fn test_read_sends_sender_and_hex_arguments() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", format!("{CALL_READ}/get-game").as_str())
        .match_body(Matcher::PartialJson(json!({
            "sender": "ST2HYQ0YP5YK1DF7HF859G5HDQ4JKRRFFBT48SM0M",
            "arguments": ["0x0100000000000000000000000000000007"],
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ok_body(&ClarityValue::OptionalNone))
        .create_async()
        .await;

    let client = HttpLedgerClient::new(&config_for(&server)).unwrap();
    let value = client
        .call_read_only("get-game", &[ClarityValue::UInt(7)])
        .await;

    assert_eq!(value, Ok(ClarityValue::OptionalNone));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_status_429_is_rate_limited() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", format!("{CALL_READ}/get-latest-game-id").as_str())
        .with_status(429)
        .create_async()
        .await;

    let client = HttpLedgerClient::new(&config_for(&server)).unwrap();
    let err = client
        .call_read_only("get-latest-game-id", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::RateLimited(_)));
    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn test_retrying_client_gives_up_after_policy() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", format!("{CALL_READ}/get-latest-game-id").as_str())
        .with_status(429)
        .expect(3)
        .create_async()
        .await;

    let http = HttpLedgerClient::new(&config_for(&server)).unwrap();
    let client = RetryingClient::new(http, RetryPolicy::new(2, Duration::from_millis(1)));
    let err = client
        .call_read_only("get-latest-game-id", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Unavailable { attempts: 3, .. }));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_node_rejection_is_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", format!("{CALL_READ}/get-game").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "okay": false, "cause": "Unchecked(NoSuchContract)" }).to_string())
        .expect(1)
        .create_async()
        .await;

    let http = HttpLedgerClient::new(&config_for(&server)).unwrap();
    let client = RetryingClient::new(http, RetryPolicy::new(3, Duration::from_millis(1)));
    let err = client
        .call_read_only("get-game", &[ClarityValue::UInt(0)])
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ClientError::Rejected("Unchecked(NoSuchContract)".to_string())
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_error_keeps_status_and_body() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", format!("{CALL_READ}/get-game-status").as_str())
        .with_status(503)
        .with_body("maintenance")
        .create_async()
        .await;

    let client = HttpLedgerClient::new(&config_for(&server)).unwrap();
    let err = client
        .call_read_only("get-game-status", &[ClarityValue::UInt(0)])
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ClientError::Http {
            status: 503,
            body: "maintenance".to_string()
        }
    );
    assert!(!err.is_rate_limited());
}

#[tokio::test]
async fn test_garbage_hex_is_a_codec_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", format!("{CALL_READ}/get-latest-game-id").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "okay": true, "result": "0xzz" }).to_string())
        .create_async()
        .await;

    let client = HttpLedgerClient::new(&config_for(&server)).unwrap();
    let err = client
        .call_read_only("get-latest-game-id", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Codec(_)));
}

#[tokio::test]
async fn test_feed_lists_recent_games_over_http() {
    let mut server = Server::new_async().await;
    let latest = server
        .mock("POST", format!("{CALL_READ}/get-latest-game-id").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ok_body(&ClarityValue::UInt(0)))
        .expect(1)
        .create_async()
        .await;

    let config = config_for(&server);
    let feed = GameFeed::from_config(HttpLedgerClient::new(&config).unwrap(), &config);

    assert_eq!(feed.recent_games().await, Ok(vec![]));
    assert_eq!(feed.recent_games().await, Ok(vec![]));
    latest.assert_async().await;
}
