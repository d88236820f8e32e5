//! Stakes - command-line reader for the wagered tic-tac-toe contract.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command, TxCommand};
use stakes_ledger::{Game, StatusView};
use stakes_sync::{GameFeed, HttpLedgerClient, RetryingClient, SyncConfig, TxPayload};
use tracing::{debug, info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = SyncConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    debug!(?config, "Config resolved");

    match cli.command {
        Command::Games => list_games(&open_feed(&config)?).await,
        Command::Game { id } => show_game(&open_feed(&config)?, id).await,
        Command::Status { id } => {
            let view = open_feed(&config)?.game_status(id).await?;
            println!("{}", render_status(id, &view));
            Ok(())
        }
        Command::Latest => {
            println!("{}", open_feed(&config)?.latest_game_id().await?);
            Ok(())
        }
        Command::Tx { call } => print_payload(&config, call),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

type NodeFeed = GameFeed<RetryingClient<HttpLedgerClient>>;

/// Builds the cached, retrying reader for the configured node.
fn open_feed(config: &SyncConfig) -> Result<NodeFeed> {
    let http = HttpLedgerClient::new(config)?;
    info!(api_url = %config.api_url(), "Reading from ledger");
    Ok(GameFeed::from_config(
        RetryingClient::new(http, config.retry_policy()),
        config,
    ))
}

#[instrument(skip_all)]
async fn list_games(feed: &NodeFeed) -> Result<()> {
    let games = feed.recent_games().await?;
    if games.is_empty() {
        println!("No games yet");
    }
    for game in &games {
        println!("{}\n", render_game(game));
    }
    Ok(())
}

#[instrument(skip(feed))]
async fn show_game(feed: &NodeFeed, id: u128) -> Result<()> {
    match feed.game(id).await? {
        Some(game) => println!("{}", render_game(&game)),
        None => println!("Game {} not found", id),
    }
    Ok(())
}

/// Prints an unsigned call for a wallet to sign and broadcast.
fn print_payload(config: &SyncConfig, call: TxCommand) -> Result<()> {
    let payload = match call {
        TxCommand::Create { bet, index } => TxPayload::create_game(bet, index),
        TxCommand::Join { id, index } => TxPayload::join_game(id, index),
        TxCommand::Play { id, index, mark } => TxPayload::play(id, index, mark.into()),
    };
    let json = serde_json::json!({
        "contract": config.contract()?.to_string(),
        "call": payload.to_json()?,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn render_game(game: &Game) -> String {
    let opponent = game
        .player_two()
        .as_ref()
        .map_or_else(|| "(open)".to_string(), ToString::to_string);
    let mut out = format!(
        "Game {} [{}] bet {}\n  X: {}\n  O: {}\n",
        game.id(),
        game.status(),
        game.bet_amount(),
        game.player_one(),
        opponent
    );
    if let Some(winner) = game.winner() {
        out.push_str(&format!("  Winner: {}\n", winner));
    } else if let Some(next) = game.current_player() {
        out.push_str(&format!("  To move: {}\n", next));
    }
    out.push_str(&game.board().display());
    out
}

fn render_status(id: u128, view: &StatusView) -> String {
    let winner = view
        .winner()
        .as_ref()
        .map_or_else(|| "none".to_string(), ToString::to_string);
    format!(
        "Game {}: {} (winner: {}, prize: {}, draw: {})",
        id,
        view.status(),
        winner,
        view.total_prize(),
        view.is_draw()
    )
}
