//! UTXO discovery and verification over Esplora-style explorers
//!
//! A balance is only as good as the outputs behind it, so every output goes
//! through two stages before it is counted:
//!
//! 1. shape filter on the explorer response (confirmed, positive value, valid
//!    txid and vout), applied locally;
//! 2. a live spent-check against a second provider (`/tx/{txid}/outspends`),
//!    which catches explorers serving stale data.
//!
//! Explorers are tried in the configured order. A failing or empty explorer
//! moves the search to the next one; it never ends the search early.

use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use async_trait::async_trait;
use bitcoin::{Address, Txid};
use futures::stream::{self, StreamExt};
use serde_json::Value;

use super::network::sats_to_btc;
use crate::chain::{ChainAccessor, ChainId};
use crate::config::WalletConfig;
use crate::error::WalletError;

/// Outspends lookups in flight at once against the verification provider
const MAX_CONCURRENT_SPEND_CHECKS: usize = 4;

/// An unspent output, identified by `(txid, vout)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    pub value_sats: u64,
    pub confirmed: bool,
    pub block_height: Option<u32>,
}

impl Utxo {
    pub fn outpoint(&self) -> String {
        format!("{}:{}", self.txid, self.vout)
    }
}

/// Verified UTXO set for one address, taken from one explorer
#[derive(Debug, Clone)]
pub struct UtxoSnapshot {
    pub address: String,
    pub utxos: Vec<Utxo>,
    /// Explorer base URL the set came from
    pub source: String,
}

impl UtxoSnapshot {
    pub fn total_sats(&self) -> u64 {
        self.utxos.iter().map(|u| u.value_sats).sum()
    }
}

/// Parse one explorer entry (`{txid, vout, value, status: {confirmed, block_height}}`)
///
/// Returns `None` for entries missing a field or carrying one of the wrong
/// type; those are dropped rather than failing the whole response.
pub fn parse_utxo_entry(entry: &Value) -> Option<Utxo> {
    let txid = entry["txid"].as_str()?.to_string();
    let vout = u32::try_from(entry["vout"].as_u64()?).ok()?;
    let value_sats = entry["value"].as_u64()?;
    let confirmed = entry["status"]["confirmed"].as_bool().unwrap_or(false);
    let block_height = entry["status"]["block_height"]
        .as_u64()
        .and_then(|h| u32::try_from(h).ok());

    Some(Utxo {
        txid,
        vout,
        value_sats,
        confirmed,
        block_height,
    })
}

/// Keep confirmed, positive-value outputs with a well-formed txid
///
/// Duplicated outpoints keep their first occurrence. Applying this to its own
/// output changes nothing.
pub fn retain_spendable(utxos: Vec<Utxo>) -> Vec<Utxo> {
    let mut seen = HashSet::new();
    utxos
        .into_iter()
        .filter(|u| u.confirmed && u.value_sats > 0 && Txid::from_str(&u.txid).is_ok())
        .filter(|u| seen.insert(u.outpoint()))
        .collect()
}

pub struct UtxoAccessor {
    chain: ChainId,
    network: bitcoin::Network,
    client: reqwest::Client,
    explorer_urls: Vec<String>,
    verify_url: String,
    initialized: bool,
    cache: Vec<Utxo>,
}

impl UtxoAccessor {
    pub fn new(chain: ChainId, config: &WalletConfig) -> Result<Self, WalletError> {
        let network = chain
            .bitcoin_network()
            .ok_or(WalletError::UnsupportedChain(chain))?;

        if network != config.bitcoin_network {
            return Err(WalletError::Config(format!(
                "{} accessor needs a {:?} config, got {:?}",
                chain, network, config.bitcoin_network
            )));
        }
        if config.explorer_urls.is_empty() {
            return Err(WalletError::Config("No explorer URLs configured".into()));
        }

        Ok(Self {
            chain,
            network,
            client: config.http_client()?,
            explorer_urls: config.explorer_urls.clone(),
            verify_url: config.verify_url.clone(),
            initialized: false,
            cache: Vec::new(),
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Last verified set from `fetch_balance`, empty if never fetched
    pub fn get_utxos(&self) -> &[Utxo] {
        &self.cache
    }

    /// Resolve the verified UTXO set for `address` without touching the cache
    pub async fn fetch_snapshot(&self, address: &str) -> Result<UtxoSnapshot, WalletError> {
        if !self.initialized {
            return Err(WalletError::NotInitialized { chain: self.chain });
        }
        self.check_address(address)?;

        for base_url in &self.explorer_urls {
            let url = format!("{}/address/{}/utxo", base_url, address);
            log::debug!("Fetching UTXOs from {}", url);

            let candidates = match self.fetch_confirmed(&url).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    log::warn!("UTXO lookup failed at {}: {}", url, e);
                    continue;
                }
            };

            if candidates.is_empty() {
                log::debug!("No confirmed UTXOs for {} at {}", address, base_url);
                continue;
            }

            let found = candidates.len();
            let verified = self.verify_unspent(candidates).await;

            if verified.is_empty() {
                log::warn!(
                    "All {} UTXOs from {} failed spend verification",
                    found,
                    base_url
                );
                continue;
            }

            log::debug!(
                "{} of {} UTXOs for {} verified unspent (source: {})",
                verified.len(),
                found,
                address,
                base_url
            );

            return Ok(UtxoSnapshot {
                address: address.to_string(),
                utxos: verified,
                source: base_url.clone(),
            });
        }

        Err(WalletError::NoSpendableUtxos {
            address: address.to_string(),
        })
    }

    fn check_address(&self, address: &str) -> Result<(), WalletError> {
        Address::from_str(address)
            .map_err(|e| WalletError::InvalidAddress(format!("{}: {}", address, e)))?
            .require_network(self.network)
            .map_err(|e| WalletError::InvalidAddress(format!("{}: {}", address, e)))?;
        Ok(())
    }

    /// Query one explorer and apply the shape filter
    async fn fetch_confirmed(&self, url: &str) -> Result<Vec<Utxo>, WalletError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(WalletError::Network(format!("HTTP {}", response.status())));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| WalletError::Network(format!("Malformed UTXO response: {}", e)))?;

        let entries = body
            .as_array()
            .ok_or_else(|| WalletError::Network("UTXO response is not a JSON array".into()))?;

        let parsed: Vec<Utxo> = entries.iter().filter_map(parse_utxo_entry).collect();
        let dropped = entries.len() - parsed.len();
        if dropped > 0 {
            log::debug!("Dropped {} malformed UTXO entries from {}", dropped, url);
        }

        Ok(retain_spendable(parsed))
    }

    /// Drop outputs that the verification provider reports spent
    ///
    /// Outputs whose status cannot be determined are dropped as well: only
    /// outputs positively seen unspent are kept.
    async fn verify_unspent(&self, utxos: Vec<Utxo>) -> Vec<Utxo> {
        let mut by_txid: BTreeMap<String, Vec<Utxo>> = BTreeMap::new();
        for utxo in utxos {
            by_txid.entry(utxo.txid.clone()).or_default().push(utxo);
        }

        let checks = stream::iter(by_txid).map(|(txid, outputs)| async move {
            match self.fetch_outspends(&txid).await {
                Ok(outspends) => outputs
                    .into_iter()
                    .filter(|u| match outspends.get(u.vout as usize) {
                        Some(status) => match status["spent"].as_bool() {
                            Some(false) => true,
                            Some(true) => {
                                log::debug!("UTXO {} already spent, dropping", u.outpoint());
                                false
                            }
                            None => {
                                log::warn!("No spend status for {}, dropping", u.outpoint());
                                false
                            }
                        },
                        None => {
                            log::warn!("Outspends for {} missing vout {}", txid, u.vout);
                            false
                        }
                    })
                    .collect::<Vec<_>>(),
                Err(e) => {
                    log::warn!("Spend verification failed for {}: {}", txid, e);
                    Vec::new()
                }
            }
        });

        // `buffered` keeps txid order so the cache is deterministic
        checks
            .buffered(MAX_CONCURRENT_SPEND_CHECKS)
            .collect::<Vec<Vec<Utxo>>>()
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    async fn fetch_outspends(&self, txid: &str) -> Result<Vec<Value>, WalletError> {
        let url = format!("{}/tx/{}/outspends", self.verify_url, txid);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(WalletError::Network(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| WalletError::Network(format!("Malformed outspends response: {}", e)))?;

        match body {
            Value::Array(items) => Ok(items),
            _ => Err(WalletError::Network(
                "Outspends response is not a JSON array".into(),
            )),
        }
    }

    async fn probe(&self, base_url: &str) -> Result<u64, WalletError> {
        let url = format!("{}/blocks/tip/height", base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(WalletError::Network(format!("HTTP {}", response.status())));
        }

        let height: u64 = response
            .text()
            .await?
            .trim()
            .parse()
            .map_err(|e: std::num::ParseIntError| WalletError::Network(e.to_string()))?;

        Ok(height)
    }
}

#[async_trait]
impl ChainAccessor for UtxoAccessor {
    fn chain(&self) -> ChainId {
        self.chain
    }

    async fn initialize(&mut self) -> Result<(), WalletError> {
        if self.initialized {
            return Ok(());
        }

        let mut last_error = String::from("no explorer configured");
        for base_url in &self.explorer_urls {
            match self.probe(base_url).await {
                Ok(height) => {
                    log::debug!("{} explorer {} ready at height {}", self.chain, base_url, height);
                    self.initialized = true;
                    return Ok(());
                }
                Err(e) => {
                    log::warn!("Explorer {} not reachable: {}", base_url, e);
                    last_error = format!("{}: {}", base_url, e);
                }
            }
        }

        Err(WalletError::AllEndpointsFailed {
            chain: self.chain,
            last_error,
        })
    }

    /// Refreshes the UTXO cache as a side effect
    ///
    /// The cache is cleared first, so a failed fetch leaves it empty rather
    /// than holding data from a previous address or a partial response.
    async fn fetch_balance(&mut self, address: &str) -> Result<f64, WalletError> {
        self.cache.clear();

        let snapshot = self.fetch_snapshot(address).await?;
        let total = snapshot.total_sats();
        self.cache = snapshot.utxos;

        Ok(sats_to_btc(total))
    }

    async fn disconnect(&mut self) -> Result<(), WalletError> {
        self.cache.clear();
        self.initialized = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn txid(n: u8) -> String {
        format!("{:064x}", n)
    }

    fn utxo(n: u8, vout: u32, value: u64, confirmed: bool) -> Utxo {
        Utxo {
            txid: txid(n),
            vout,
            value_sats: value,
            confirmed,
            block_height: confirmed.then_some(800_000),
        }
    }

    #[test]
    fn test_parse_utxo_entry() {
        let entry = json!({
            "txid": txid(1),
            "vout": 2,
            "value": 50_000,
            "status": {"confirmed": true, "block_height": 812_345}
        });
        let parsed = parse_utxo_entry(&entry).unwrap();
        assert_eq!(parsed.vout, 2);
        assert_eq!(parsed.value_sats, 50_000);
        assert!(parsed.confirmed);
        assert_eq!(parsed.block_height, Some(812_345));
    }

    #[test]
    fn test_parse_drops_malformed_entries() {
        assert!(parse_utxo_entry(&json!({"vout": 0, "value": 1})).is_none());
        assert!(parse_utxo_entry(&json!({"txid": txid(1), "vout": -1, "value": 1})).is_none());
        assert!(parse_utxo_entry(&json!({"txid": txid(1), "vout": 0, "value": "10"})).is_none());
        assert!(
            parse_utxo_entry(&json!({"txid": txid(1), "vout": 5_000_000_000u64, "value": 1}))
                .is_none()
        );

        // Missing status reads as unconfirmed, not malformed
        let unconfirmed = parse_utxo_entry(&json!({"txid": txid(1), "vout": 0, "value": 1})).unwrap();
        assert!(!unconfirmed.confirmed);
    }

    #[test]
    fn test_retain_spendable_filters() {
        let mut bad_txid = utxo(3, 0, 10_000, true);
        bad_txid.txid = "not-a-txid".into();

        let kept = retain_spendable(vec![
            utxo(1, 0, 50_000, true),
            utxo(2, 0, 30_000, false),
            utxo(4, 1, 0, true),
            bad_txid,
            utxo(1, 0, 50_000, true),
        ]);

        assert_eq!(kept, vec![utxo(1, 0, 50_000, true)]);
    }

    #[test]
    fn test_retain_spendable_is_idempotent() {
        let input = vec![
            utxo(1, 0, 50_000, true),
            utxo(1, 1, 25_000, true),
            utxo(2, 0, 30_000, false),
            utxo(3, 0, 0, true),
            utxo(4, 3, 7_000, true),
            utxo(1, 1, 25_000, true),
        ];

        let once = retain_spendable(input);
        let twice = retain_spendable(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);
    }

    #[test]
    fn test_snapshot_total() {
        let snapshot = UtxoSnapshot {
            address: "tb1q".into(),
            utxos: vec![utxo(1, 0, 50_000, true), utxo(2, 0, 30_000, true)],
            source: "http://localhost".into(),
        };
        assert_eq!(snapshot.total_sats(), 80_000);
    }

    #[tokio::test]
    async fn test_fetch_before_initialize_fails() {
        let config = WalletConfig::default();
        let mut accessor = UtxoAccessor::new(ChainId::BitcoinTestnet, &config).unwrap();

        let err = accessor
            .fetch_balance("tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx")
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::NotInitialized { .. }));
        assert!(accessor.get_utxos().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_when_never_connected() {
        let config = WalletConfig::default();
        let mut accessor = UtxoAccessor::new(ChainId::BitcoinTestnet, &config).unwrap();
        accessor.disconnect().await.unwrap();
        assert!(!accessor.is_initialized());
    }

    #[test]
    fn test_network_mismatch_is_rejected() {
        let config = WalletConfig::for_network(bitcoin::Network::Bitcoin);
        assert!(matches!(
            UtxoAccessor::new(ChainId::BitcoinTestnet, &config),
            Err(WalletError::Config(_))
        ));
        assert!(matches!(
            UtxoAccessor::new(ChainId::Solana, &config),
            Err(WalletError::UnsupportedChain(ChainId::Solana))
        ));
    }

    #[test]
    fn test_calculate_balance_is_pure() {
        let config = WalletConfig::default();
        let accessor = UtxoAccessor::new(ChainId::BitcoinTestnet, &config).unwrap();
        assert_eq!(accessor.calculate_balance(80_000), 0.0008);
        assert_eq!(accessor.calculate_balance(0), 0.0);
    }
}
