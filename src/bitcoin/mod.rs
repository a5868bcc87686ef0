//! Bitcoin protocol operations
//!
//! - UTXO discovery and spend verification
//! - Fee estimation
//! - Transaction building and signing
//! - Broadcasting
//! - The send pipeline tying them together

pub mod broadcast;
pub mod fees;
pub mod network;
pub mod send;
pub mod transaction;
pub mod utxo;

// Re-export main types
pub use broadcast::Broadcaster;
pub use fees::{FeeEstimator, FeeRateTier, FeeRates};
pub use network::NetworkParams;
pub use send::{SendResult, TransferOrchestrator};
pub use transaction::{BuiltTransaction, TransactionBuilder, TransactionRequest};
pub use utxo::{Utxo, UtxoAccessor, UtxoSnapshot};
