/// Esplora Mock Server
///
/// Serves an in-memory ledger seeded from a JSON file, for poking at the
/// wallet CLI without touching a public explorer.
///
/// Seed format:
///
/// ```json
/// {
///   "tip_height": 800000,
///   "utxos": { "tb1q...": [{"txid": "...", "vout": 0, "value": 50000,
///                          "status": {"confirmed": true, "block_height": 799990}}] },
///   "fees": {"fastestFee": 5, "halfHourFee": 2, "hourFee": 2, "economyFee": 1, "minimumFee": 1},
///   "broadcast_txid": "..."
/// }
/// ```
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;

use esplora_mock::{run_server, BroadcastBehavior, MockState, RecommendedFees, UtxoResponse};

#[derive(Debug, Default, Deserialize)]
struct Seed {
    tip_height: Option<u64>,
    #[serde(default)]
    utxos: HashMap<String, Vec<UtxoResponse>>,
    fees: Option<RecommendedFees>,
    broadcast_txid: Option<String>,
}

#[derive(Debug)]
struct Config {
    seed_file: Option<String>,
    server_host: String,
    server_port: u16,
}

impl Config {
    fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let seed_file = env::var("MOCK_SEED_FILE").ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("Invalid SERVER_PORT")?;

        Ok(Self {
            seed_file,
            server_host,
            server_port,
        })
    }
}

fn load_seed(path: &str) -> Result<Seed> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid seed file {}", path))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let seed = match &config.seed_file {
        Some(path) => load_seed(path)?,
        None => Seed::default(),
    };

    let state = MockState::new();
    if let Some(height) = seed.tip_height {
        state.ledger().tip_height = height;
    }
    for (address, utxos) in seed.utxos {
        for utxo in utxos {
            state.add_utxo(&address, utxo);
        }
    }
    if let Some(fees) = seed.fees {
        state.set_fees(fees);
    }
    if let Some(txid) = seed.broadcast_txid {
        state.set_broadcast(BroadcastBehavior::Accept(txid));
    }

    log::info!(
        "Seeded {} addresses (seed file: {:?})",
        state.ledger().utxos.len(),
        config.seed_file
    );

    run_server(state, config.server_host, config.server_port)
        .await
        .context("Server error")?;

    Ok(())
}
