//! accrue-node: command-line driver for the reward engine.
//!
//! Loads the node configuration, initializes logging and dispatches one
//! subcommand against the SQLite store in the data directory (or an
//! in-memory store for replays).

mod config;
mod replay;

use std::path::{Path, PathBuf};

use accrue_engine::genesis::init_genesis;
use accrue_engine::stub::{StubBank, StubOracle};
use accrue_engine::Keeper;
use accrue_types::genesis::GenesisState;
use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::NodeConfig;
use crate::replay::{ReplayOptions, Scenario};

#[derive(Parser)]
#[command(name = "accrue-node")]
#[command(about = "Reward accrual and claim synchronization engine")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "ACCRUE_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory (overrides config file)
    #[arg(short, long, env = "ACCRUE_DATA_DIR")]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import the configured genesis file into an empty store
    Init,
    /// Replay a scripted scenario and print a JSON summary
    Replay {
        /// Scenario JSON file
        scenario: PathBuf,
        /// Write to the data directory store instead of memory
        #[arg(long)]
        persist: bool,
    },
    /// Print the store as genesis JSON
    Export,
    /// Print stored claims of an account
    Rewards {
        owner: String,
        #[arg(long)]
        category: Option<String>,
    },
    /// Print stored reward factors
    Factors {
        #[arg(long)]
        category: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = NodeConfig::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }
    init_tracing(&config)?;

    info!(data_dir = %config.data_dir().display(), "accrue-node starting");

    match cli.command {
        Command::Init => {
            let genesis = load_genesis(&config.genesis_path())?;
            let mut conn = open_store(&config)?;
            init_genesis(&mut conn, &genesis)?;
            info!(db = %config.db_path().display(), "store initialized");
        }
        Command::Replay { scenario, persist } => {
            let content = std::fs::read_to_string(&scenario)
                .with_context(|| format!("reading {}", scenario.display()))?;
            let scenario: Scenario = serde_json::from_str(&content)?;
            let mut conn = if persist {
                open_store(&config)?
            } else {
                accrue_db::open_memory()?
            };
            let options = ReplayOptions {
                prune_zero_claims: config.engine.prune_zero_claims,
            };
            let summary = replay::run(&mut conn, &scenario, options)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Export => {
            let (keeper, conn) = open_keeper(&config)?;
            let genesis = keeper.export_genesis(&conn)?;
            println!("{}", serde_json::to_string_pretty(&genesis)?);
        }
        Command::Rewards { owner, category } => {
            let (keeper, conn) = open_keeper(&config)?;
            // No live oracle behind the node, so only stored claims are meaningful.
            let claims = keeper.query_rewards(&conn, &owner, category.as_deref(), true, 0)?;
            println!("{}", serde_json::to_string_pretty(&claims)?);
        }
        Command::Factors { category } => {
            let (keeper, conn) = open_keeper(&config)?;
            let factors = keeper.query_reward_factors(&conn, category.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&factors)?);
        }
    }
    Ok(())
}

/// Initialize tracing from `RUST_LOG` plus the configured default level.
fn init_tracing(config: &NodeConfig) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("accrue={}", config.advanced.log_level).parse()?);

    if config.advanced.log_file.is_empty() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.advanced.log_file)
            .with_context(|| format!("opening log file {}", config.advanced.log_file))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    }
    Ok(())
}

fn load_genesis(path: &Path) -> anyhow::Result<GenesisState> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading genesis {}", path.display()))?;
    let genesis: GenesisState = serde_json::from_str(&content)?;
    genesis.validate()?;
    Ok(genesis)
}

fn open_store(config: &NodeConfig) -> anyhow::Result<rusqlite::Connection> {
    std::fs::create_dir_all(config.data_dir())?;
    Ok(accrue_db::open(&config.db_path())?)
}

/// Keeper over the configured params with empty in-memory collaborators.
fn open_keeper(
    config: &NodeConfig,
) -> anyhow::Result<(Keeper<StubOracle, StubBank>, rusqlite::Connection)> {
    let genesis = load_genesis(&config.genesis_path())?;
    let keeper = Keeper::new(genesis.params, StubOracle::new(), StubBank::new())?;
    let conn = open_store(config)?;
    Ok((keeper, conn))
}
