//! Per-network Bitcoin parameters

use bitcoin::Network;

use super::fees::FeeRates;

pub const SATS_PER_BTC: u64 = 100_000_000;

/// Outputs at or below this value are not worth creating
pub const DUST_THRESHOLD_SATS: u64 = 546;

/// Fixed size used for fee estimation (inputs and outputs are not counted)
pub const TX_SIZE_ESTIMATE_VBYTES: u64 = 227;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkParams {
    pub network: Network,
    pub dust_threshold_sats: u64,
    pub min_fee_sats: u64,
    pub size_estimate_vbytes: u64,
    pub default_fees: FeeRates,
}

impl NetworkParams {
    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Bitcoin => Self {
                network,
                dust_threshold_sats: DUST_THRESHOLD_SATS,
                min_fee_sats: 1_000,
                size_estimate_vbytes: TX_SIZE_ESTIMATE_VBYTES,
                default_fees: FeeRates {
                    low: 5,
                    medium: 10,
                    high: 20,
                },
            },
            _ => Self {
                network,
                dust_threshold_sats: DUST_THRESHOLD_SATS,
                min_fee_sats: 1_000,
                size_estimate_vbytes: TX_SIZE_ESTIMATE_VBYTES,
                default_fees: FeeRates {
                    low: 1,
                    medium: 2,
                    high: 5,
                },
            },
        }
    }

    /// The other network, used when a WIF carries the wrong version byte
    pub fn alternate(&self) -> Network {
        match self.network {
            Network::Bitcoin => Network::Testnet,
            _ => Network::Bitcoin,
        }
    }
}

/// Satoshis to BTC
pub fn sats_to_btc(sats: u64) -> f64 {
    sats as f64 / SATS_PER_BTC as f64
}
