use clap::{Parser, Subcommand};
use multichain_wallet::{
    Accessor, ChainAccessor, ChainId, FeeEstimator, FeeRateTier, TransactionRequest,
    TransferOrchestrator, WalletConfig,
};

#[derive(Parser)]
#[command(name = "multichain-wallet", version, about = "Balances and Bitcoin transfers over public APIs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the balance of an address
    Balance {
        #[arg(long)]
        chain: ChainId,
        #[arg(long)]
        address: String,
    },
    /// Show current fee rates per tier
    Fees {
        #[arg(long, default_value = "btc-testnet")]
        chain: ChainId,
    },
    /// Send BTC from a single-key address
    Send {
        #[arg(long, default_value = "btc-testnet")]
        chain: ChainId,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Amount in BTC
        #[arg(long)]
        amount: f64,
        #[arg(long, value_enum, default_value_t = FeeRateTier::Medium)]
        fee_tier: FeeRateTier,
        #[arg(long, env = "WALLET_WIF", hide_env_values = true)]
        wif: String,
        #[arg(long, env = "WALLET_PUBKEY")]
        pubkey: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger (set RUST_LOG=debug for verbose output, RUST_LOG=info for normal)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Command::Balance { chain, address } => {
            let config = WalletConfig::from_env_for_chain(chain)?;
            let mut accessor = Accessor::for_chain(chain, &config)?;
            accessor.initialize().await?;
            let balance = accessor.fetch_balance(&address).await;

            if let (Ok(balance), Some(utxo)) = (&balance, accessor.as_utxo()) {
                log::info!(
                    "{} {} across {} verified UTXOs",
                    balance,
                    chain.symbol(),
                    utxo.get_utxos().len()
                );
            }
            accessor.disconnect().await?;

            println!("{} {}", balance?, chain.symbol());
        }
        Command::Fees { chain } => {
            let config = WalletConfig::from_env_for_chain(chain)?;
            let fees = FeeEstimator::new(&config)?.fetch_gas_fees(chain).await;
            println!("{}", serde_json::to_string_pretty(&fees)?);
        }
        Command::Send {
            chain,
            from,
            to,
            amount,
            fee_tier,
            wif,
            pubkey,
        } => {
            let config = WalletConfig::from_env_for_chain(chain)?;
            let mut orchestrator = TransferOrchestrator::new(&config)?;

            let request = TransactionRequest {
                network: chain,
                sender_address: from,
                recipient_address: to,
                amount_major_units: amount,
                utxos: None,
            };

            let result = orchestrator
                .send_transaction(request, &wif, &pubkey, fee_tier)
                .await;
            orchestrator.disconnect().await?;

            println!("{}", serde_json::to_string_pretty(&result?)?);
        }
    }

    Ok(())
}
