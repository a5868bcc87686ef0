//! Bitcoin sending operations

use serde::Serialize;

use super::broadcast::Broadcaster;
use super::fees::{FeeEstimator, FeeRateTier};
use super::transaction::{TransactionBuilder, TransactionRequest};
use super::utxo::UtxoAccessor;
use crate::chain::{ChainAccessor, ChainId, ChainKind};
use crate::config::WalletConfig;
use crate::error::WalletError;

#[derive(Debug, Clone, Serialize)]
pub struct SendResult {
    pub tx_hash: String,
    /// sat/vB
    pub fee_rate: u64,
    /// sats
    pub total_fee: u64,
}

/// Runs a send end to end: UTXOs, fees, build, broadcast
///
/// Owns its accessor; `send_transaction` takes `&mut self`, so one
/// orchestrator handles one send at a time.
pub struct TransferOrchestrator {
    accessor: UtxoAccessor,
    fee_estimator: FeeEstimator,
    builder: TransactionBuilder,
    broadcaster: Broadcaster,
}

impl TransferOrchestrator {
    pub fn new(config: &WalletConfig) -> Result<Self, WalletError> {
        Ok(Self {
            accessor: UtxoAccessor::new(config.bitcoin_chain(), config)?,
            fee_estimator: FeeEstimator::new(config)?,
            builder: TransactionBuilder::new(config),
            broadcaster: Broadcaster::new(config)?,
        })
    }

    pub fn chain(&self) -> ChainId {
        self.accessor.chain()
    }

    /// Send `request.amount_major_units` BTC from the sender to the recipient
    ///
    /// Any `utxos` already on the request are replaced by a fresh verified
    /// set for the sender address.
    pub async fn send_transaction(
        &mut self,
        request: TransactionRequest,
        private_key_wif: &str,
        public_key_hex: &str,
        tier: FeeRateTier,
    ) -> Result<SendResult, WalletError> {
        if request.network.kind() == ChainKind::Account || request.network != self.chain() {
            return Err(WalletError::UnsupportedChain(request.network));
        }

        log::info!(
            "Sending {} {} from {} to {} (fee tier: {})",
            request.amount_major_units,
            request.network.symbol(),
            request.sender_address,
            request.recipient_address,
            tier
        );

        self.accessor.initialize().await?;
        let balance = self.accessor.fetch_balance(&request.sender_address).await?;
        let utxos = self.accessor.get_utxos().to_vec();

        log::debug!(
            "Sender balance {} {} across {} UTXOs",
            balance,
            request.network.symbol(),
            utxos.len()
        );

        let fees = self.fee_estimator.fetch_gas_fees(request.network).await;

        let request = TransactionRequest {
            utxos: Some(utxos),
            ..request
        };

        let built = self.builder.build(
            &request,
            private_key_wif,
            public_key_hex,
            tier,
            Some(&fees),
        )?;

        let fee_rate = built.fee_rate_used;
        let total_fee = built.total_fee_sats;

        let tx_hash = self.broadcaster.submit(built).await?;

        log::info!(
            "Sent {} {} - txid: {}, fee: {} sats at {} sat/vB",
            request.amount_major_units,
            request.network.symbol(),
            tx_hash,
            total_fee,
            fee_rate
        );

        Ok(SendResult {
            tx_hash,
            fee_rate,
            total_fee,
        })
    }

    /// Release the accessor's cache and readiness
    pub async fn disconnect(&mut self) -> Result<(), WalletError> {
        self.accessor.disconnect().await
    }
}
