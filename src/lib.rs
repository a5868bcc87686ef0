//! Multichain Wallet: balances and Bitcoin transfers over public APIs
//!
//! This crate reconciles UTXO-based and account-based chains behind one
//! accessor contract, and runs Bitcoin sends against redundant public
//! block-explorer endpoints.
//!
//! # Architecture
//!
//! - **ChainAccessor**: `initialize / fetch_balance / calculate_balance /
//!   disconnect`, implemented by `UtxoAccessor` (Bitcoin) and
//!   `AccountAccessor` (ETH, BASE, SOL, XRP), unified by the `Accessor` enum
//! - **UtxoAccessor**: explorer fallback chain, shape filter, live spent-check
//! - **FeeEstimator**: fee tiers with per-network defaults on any failure
//! - **TransactionBuilder**: fee, change and dust arithmetic, signing
//! - **Broadcaster**: endpoint and encoding fallback, terminal on rejection
//! - **TransferOrchestrator**: the send pipeline end to end
//!
//! # Example
//!
//! ```ignore
//! use multichain_wallet::{ChainId, FeeRateTier, TransactionRequest, TransferOrchestrator, WalletConfig};
//!
//! let config = WalletConfig::from_env()?;
//! let mut orchestrator = TransferOrchestrator::new(&config)?;
//!
//! let result = orchestrator
//!     .send_transaction(
//!         TransactionRequest {
//!             network: ChainId::BitcoinTestnet,
//!             sender_address: "tb1q...".into(),
//!             recipient_address: "tb1q...".into(),
//!             amount_major_units: 0.0007,
//!             utxos: None,
//!         },
//!         &wif,
//!         &pubkey_hex,
//!         FeeRateTier::Medium,
//!     )
//!     .await?;
//! println!("{} (fee {} sats)", result.tx_hash, result.total_fee);
//! ```

pub mod account;
pub mod bitcoin;
pub mod chain;
pub mod config;
pub mod error;

// Re-exports for convenience
pub use crate::account::AccountAccessor;
pub use crate::bitcoin::{
    Broadcaster, BuiltTransaction, FeeEstimator, FeeRateTier, FeeRates, SendResult,
    TransactionBuilder, TransactionRequest, TransferOrchestrator, Utxo, UtxoAccessor,
    UtxoSnapshot,
};
pub use crate::chain::{check_balance, Accessor, ChainAccessor, ChainId, ChainKind};
pub use crate::config::WalletConfig;
pub use crate::error::WalletError;

// Common result type
pub type Result<T> = std::result::Result<T, WalletError>;
