//! Error types for wallet operations
//!
//! Every failure is scoped to a single fetch or send call. I/O failures are
//! logged where they happen and folded into the next fallback attempt; only
//! once every fallback is exhausted do they surface as one of these variants.

use thiserror::Error;

use crate::chain::ChainId;

#[derive(Error, Debug)]
pub enum WalletError {
    /// Accessor used before `initialize()`
    #[error("{chain} accessor used before initialize()")]
    NotInitialized { chain: ChainId },

    /// No configured endpoint answered the readiness probe
    #[error("All {chain} endpoints failed: {last_error}")]
    AllEndpointsFailed { chain: ChainId, last_error: String },

    #[error(
        "No spendable UTXOs for {address}: no funds, or all outputs are still unconfirmed \
         (check confirmations and try again)"
    )]
    NoSpendableUtxos { address: String },

    #[error("Invalid UTXO set: {0}")]
    InvalidUtxoSet(String),

    #[error(
        "Insufficient funds: need {} sats (amount + fee), only {} sats available \
         (short by {} sats)",
        .required,
        .available,
        shortfall(.required, .available)
    )]
    InsufficientFunds { required: u64, available: u64 },

    #[error("Private key error: {0}")]
    KeyDecode(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The transaction itself was refused; retrying elsewhere cannot help
    #[error("Transaction rejected by {endpoint}: {body}")]
    RejectedByNetwork { endpoint: String, body: String },

    #[error("Broadcast failed on every endpoint, last response: {last_body}")]
    BroadcastExhausted { last_body: String },

    #[error("Operation not supported for {0}")]
    UnsupportedChain(ChainId),

    #[error("Balance query failed: {0}")]
    Balance(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn shortfall(required: &u64, available: &u64) -> u64 {
    required.saturating_sub(*available)
}

impl WalletError {
    /// Errors caused by the request itself rather than by flaky providers.
    ///
    /// Retrying one of these with the same inputs cannot succeed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::NotInitialized { .. }
                | Self::InvalidUtxoSet(_)
                | Self::InsufficientFunds { .. }
                | Self::KeyDecode(_)
                | Self::InvalidAddress(_)
                | Self::InvalidAmount(_)
                | Self::RejectedByNetwork { .. }
                | Self::UnsupportedChain(_)
        )
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}
