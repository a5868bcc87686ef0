//! Fee-rate lookup
//!
//! Unlike UTXO discovery, fee estimation is allowed to fail quietly: a
//! network default is always good enough to get a transaction out, so any
//! problem with the recommendation endpoint falls back to the default table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::network::NetworkParams;
use crate::chain::ChainId;
use crate::config::WalletConfig;
use crate::error::WalletError;

/// Fee rates per tier, in sat/vB for Bitcoin and the chain-native unit
/// elsewhere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRates {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
}

impl FeeRates {
    pub fn rate_for(&self, tier: FeeRateTier) -> u64 {
        match tier {
            FeeRateTier::Low => self.low,
            FeeRateTier::Medium => self.medium,
            FeeRateTier::High => self.high,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FeeRateTier {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for FeeRateTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FeeRateTier::Low => "low",
            FeeRateTier::Medium => "medium",
            FeeRateTier::High => "high",
        })
    }
}

impl FromStr for FeeRateTier {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(FeeRateTier::Low),
            "medium" => Ok(FeeRateTier::Medium),
            "high" => Ok(FeeRateTier::High),
            other => Err(WalletError::Config(format!(
                "Unknown fee tier '{}', expected low, medium or high",
                other
            ))),
        }
    }
}

/// Response of `GET /v1/fees/recommended`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendedFees {
    fastest_fee: u64,
    half_hour_fee: u64,
    minimum_fee: u64,
}

pub struct FeeEstimator {
    client: reqwest::Client,
    fee_url: String,
    bitcoin_network: bitcoin::Network,
}

impl FeeEstimator {
    pub fn new(config: &WalletConfig) -> Result<Self, WalletError> {
        Ok(Self {
            client: config.http_client()?,
            fee_url: config.fee_url.clone(),
            bitcoin_network: config.bitcoin_network,
        })
    }

    /// Current fee rates for `chain`; never fails
    pub async fn fetch_gas_fees(&self, chain: ChainId) -> FeeRates {
        match chain.bitcoin_network() {
            Some(network) if network == self.bitcoin_network => {
                let defaults = NetworkParams::for_network(network).default_fees;
                match self.fetch_recommended().await {
                    Ok(rates) => rates,
                    Err(e) => {
                        log::warn!(
                            "Fee recommendation unavailable ({}), using {} defaults {:?}",
                            e,
                            chain,
                            defaults
                        );
                        defaults
                    }
                }
            }
            Some(network) => {
                log::warn!(
                    "Fee endpoint is configured for {:?}, using static {} defaults",
                    self.bitcoin_network,
                    chain
                );
                NetworkParams::for_network(network).default_fees
            }
            None => static_fees(chain),
        }
    }

    async fn fetch_recommended(&self) -> Result<FeeRates, WalletError> {
        let url = format!("{}/v1/fees/recommended", self.fee_url);
        log::debug!("Fetching fee recommendation from {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(WalletError::Network(format!("HTTP {}", response.status())));
        }

        let fees: RecommendedFees = response
            .json()
            .await
            .map_err(|e| WalletError::Network(format!("Malformed fee response: {}", e)))?;

        Ok(FeeRates {
            low: fees.minimum_fee,
            medium: fees.half_hour_fee,
            high: fees.fastest_fee,
        })
    }
}

/// Static tiers for account-based chains
///
/// - ETH/BASE: gwei per gas
/// - SOL: micro-lamports per compute unit (priority fee)
/// - XRP: drops per transaction
fn static_fees(chain: ChainId) -> FeeRates {
    match chain {
        ChainId::Ethereum => FeeRates {
            low: 1,
            medium: 2,
            high: 5,
        },
        ChainId::Base => FeeRates {
            low: 1,
            medium: 1,
            high: 2,
        },
        ChainId::Solana => FeeRates {
            low: 0,
            medium: 1_000,
            high: 10_000,
        },
        ChainId::Xrp => FeeRates {
            low: 10,
            medium: 12,
            high: 20,
        },
        ChainId::Bitcoin | ChainId::BitcoinTestnet => {
            let network = chain
                .bitcoin_network()
                .unwrap_or(bitcoin::Network::Testnet);
            NetworkParams::for_network(network).default_fees
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_parsing() {
        assert_eq!("LOW".parse::<FeeRateTier>().unwrap(), FeeRateTier::Low);
        assert_eq!(" medium ".parse::<FeeRateTier>().unwrap(), FeeRateTier::Medium);
        assert_eq!("high".parse::<FeeRateTier>().unwrap(), FeeRateTier::High);
        assert!("urgent".parse::<FeeRateTier>().is_err());
        assert_eq!(FeeRateTier::default(), FeeRateTier::Medium);
    }

    #[test]
    fn test_rate_for_tier() {
        let rates = FeeRates {
            low: 1,
            medium: 2,
            high: 7,
        };
        assert_eq!(rates.rate_for(FeeRateTier::Low), 1);
        assert_eq!(rates.rate_for(FeeRateTier::Medium), 2);
        assert_eq!(rates.rate_for(FeeRateTier::High), 7);
    }

    #[test]
    fn test_recommended_fee_mapping() {
        let body = r#"{"fastestFee":25,"halfHourFee":12,"hourFee":8,"economyFee":4,"minimumFee":2}"#;
        let fees: RecommendedFees = serde_json::from_str(body).unwrap();
        assert_eq!(fees.minimum_fee, 2);
        assert_eq!(fees.half_hour_fee, 12);
        assert_eq!(fees.fastest_fee, 25);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_falls_back_to_defaults() {
        let mut config = WalletConfig::for_network(bitcoin::Network::Bitcoin);
        config.fee_url = "http://127.0.0.1:9".into();
        config.request_timeout = std::time::Duration::from_secs(2);

        let estimator = FeeEstimator::new(&config).unwrap();
        let rates = estimator.fetch_gas_fees(ChainId::Bitcoin).await;
        assert_eq!(
            rates,
            NetworkParams::for_network(bitcoin::Network::Bitcoin).default_fees
        );
    }

    #[test]
    fn test_mainnet_and_testnet_defaults_differ() {
        let mainnet = NetworkParams::for_network(bitcoin::Network::Bitcoin).default_fees;
        let testnet = NetworkParams::for_network(bitcoin::Network::Testnet).default_fees;
        assert_ne!(mainnet, testnet);
        assert!(testnet.low >= 1);
    }

    #[tokio::test]
    async fn test_account_chains_use_static_fees() {
        let estimator = FeeEstimator::new(&WalletConfig::default()).unwrap();
        let xrp = estimator.fetch_gas_fees(ChainId::Xrp).await;
        assert!(xrp.low <= xrp.medium && xrp.medium <= xrp.high);
    }
}
