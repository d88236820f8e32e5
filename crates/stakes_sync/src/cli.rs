//! Command-line interface for the `stakes` binary.

use clap::{Parser, Subcommand, ValueEnum};
use stakes_board::Mark;
use std::path::PathBuf;

/// Stakes - read and prepare calls for the wagered tic-tac-toe contract
#[derive(Parser, Debug)]
#[command(name = "stakes")]
#[command(about = "Cached reads and call payloads for the tic-tac-toe contract", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file (defaults apply when omitted)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the most recent games
    Games,

    /// Show one game
    Game {
        /// Game id
        id: u128,
    },

    /// Show a game's derived status
    Status {
        /// Game id
        id: u128,
    },

    /// Print the number of games created
    Latest,

    /// Print the payload for a public contract call
    Tx {
        /// Call to build
        #[command(subcommand)]
        call: TxCommand,
    },
}

/// Public contract calls.
#[derive(Subcommand, Debug)]
pub enum TxCommand {
    /// Open a game with an opening X move
    Create {
        /// Wager in micro-units
        #[arg(long)]
        bet: u128,

        /// Opening move index (0-8)
        #[arg(long)]
        index: u128,
    },

    /// Join a waiting game with an O move
    Join {
        /// Game id
        id: u128,

        /// Move index (0-8)
        #[arg(long)]
        index: u128,
    },

    /// Place a mark in a game in progress
    Play {
        /// Game id
        id: u128,

        /// Move index (0-8)
        #[arg(long)]
        index: u128,

        /// Mark to place
        #[arg(long, value_enum)]
        mark: MarkArg,
    },
}

/// Mark as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MarkArg {
    /// Player one
    X,
    /// Player two
    O,
}

impl From<MarkArg> for Mark {
    fn from(mark: MarkArg) -> Self {
        match mark {
            MarkArg::X => Mark::X,
            MarkArg::O => Mark::O,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_play_with_global_flags() {
        let cli = Cli::parse_from([
            "stakes", "--verbose", "tx", "play", "3", "--index", "8", "--mark", "o",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Command::Tx {
                call: TxCommand::Play { id, index, mark },
            } => {
                assert_eq!((id, index), (3, 8));
                assert_eq!(Mark::from(mark), Mark::O);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_config_flag_after_subcommand() {
        let cli = Cli::parse_from(["stakes", "game", "7", "--config", "stakes.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("stakes.toml")));
        assert!(matches!(cli.command, Command::Game { id: 7 }));
    }
}
