//! Currency Genesis Binary
//!
//! Builds the genesis state of a chain from a config file and prints the
//! resulting states as JSON.

use ledger_state::MemoryState;
use operation_processor::{Config, Operation, Outcome, Processors};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    info!("Starting currency genesis");

    // Load configuration
    let config_path = std::env::var("GENESIS_CONFIG")
        .ok()
        .or_else(|| std::env::args().nth(1));
    let config = match config_path {
        Some(path) => {
            info!("Loading config from: {}", path);
            Config::from_file(&path)?
        }
        None => {
            info!("Loading config from environment variables");
            Config::from_env()?
        }
    };

    let genesis = config
        .genesis
        .as_ref()
        .ok_or("no [genesis] section in configuration")?;
    let op = Operation::from(genesis.operation()?);

    let processors = Processors::new(&config)?;
    let state = MemoryState::new();

    let values = match processors.process(0, &op, &state)? {
        Outcome::Accepted(values) => values,
        Outcome::Rejected(reason) => {
            error!("Genesis rejected: {}", reason);
            return Err(reason.into());
        }
    };

    state.merge(0, &values)?;
    info!("Genesis state built: fact={}, states={}", op.fact_hash(), state.len());

    println!("{}", serde_json::to_string_pretty(&state.states())?);

    Ok(())
}
