/// Wallet configuration
///
/// Built once at startup (from environment variables or explicitly in code)
/// and handed to every component at construction. Nothing reads the
/// environment after that point.
use std::collections::HashMap;
use std::env;
use std::time::Duration;

use crate::chain::ChainId;
use crate::error::WalletError;

const DEFAULT_TIMEOUT_SECS: u64 = 20;

#[derive(Clone, Debug)]
pub struct WalletConfig {
    /// Bitcoin network type (`Bitcoin` or `Testnet`)
    pub bitcoin_network: bitcoin::Network,
    /// Esplora-style UTXO providers, tried in order
    pub explorer_urls: Vec<String>,
    /// Independent provider used to re-check that outputs are unspent
    pub verify_url: String,
    /// mempool.space-style fee recommendation provider
    pub fee_url: String,
    /// Broadcast providers, tried in order
    pub broadcast_urls: Vec<String>,
    /// JSON-RPC endpoints for account-based chains, tried in order
    pub account_rpc_urls: HashMap<ChainId, Vec<String>>,
    /// Per-HTTP-call timeout
    pub request_timeout: Duration,
    /// Accept a WIF encoded for the other Bitcoin network (logged)
    pub allow_key_network_fallback: bool,
}

impl WalletConfig {
    /// Defaults for a Bitcoin network
    ///
    /// Mainnet reads UTXOs from Blockstream then mempool.space; testnet has a
    /// single explorer. Spend verification and fee estimates always go to
    /// mempool.space so that they come from a different source than the
    /// first explorer.
    pub fn for_network(network: bitcoin::Network) -> Self {
        let (explorer_urls, verify_url, fee_url, broadcast_urls) = match network {
            bitcoin::Network::Bitcoin => (
                vec![
                    "https://blockstream.info/api".to_string(),
                    "https://mempool.space/api".to_string(),
                ],
                "https://mempool.space/api".to_string(),
                "https://mempool.space/api".to_string(),
                vec![
                    "https://blockstream.info/api".to_string(),
                    "https://mempool.space/api".to_string(),
                ],
            ),
            _ => (
                vec!["https://blockstream.info/testnet/api".to_string()],
                "https://mempool.space/testnet/api".to_string(),
                "https://mempool.space/testnet/api".to_string(),
                vec![
                    "https://blockstream.info/testnet/api".to_string(),
                    "https://mempool.space/testnet/api".to_string(),
                ],
            ),
        };

        Self {
            bitcoin_network: network,
            explorer_urls,
            verify_url,
            fee_url,
            broadcast_urls,
            account_rpc_urls: default_account_rpc_urls(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            allow_key_network_fallback: true,
        }
    }

    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `BITCOIN_NETWORK`: "testnet" (default) or "mainnet"/"bitcoin"
    /// - `BTC_EXPLORER_URLS`, `BTC_BROADCAST_URLS`: comma separated base URLs
    /// - `BTC_VERIFY_URL`, `BTC_FEE_URL`: single base URL
    /// - `ETH_RPC_URLS`, `BASE_RPC_URLS`, `SOL_RPC_URLS`, `XRP_RPC_URLS`
    /// - `HTTP_TIMEOUT_SECS`: per-request timeout (default 20)
    /// - `ALLOW_KEY_NETWORK_FALLBACK`: "true" (default) or "false"
    ///
    /// # Examples
    ///
    /// ```bash
    /// # Mainnet with a local Esplora in front of the public ones
    /// BITCOIN_NETWORK=mainnet \
    /// BTC_EXPLORER_URLS=http://localhost:3000,https://blockstream.info/api \
    /// multichain-wallet balance --chain btc --address bc1q...
    /// ```
    pub fn from_env() -> Result<Self, WalletError> {
        dotenv::dotenv().ok();

        let network = parse_network(env::var("BITCOIN_NETWORK").ok().as_deref());
        Self::for_network(network).with_env_overrides()
    }

    /// Like `from_env`, but the Bitcoin network follows the chain being used
    pub fn from_env_for_chain(chain: ChainId) -> Result<Self, WalletError> {
        match chain.bitcoin_network() {
            Some(network) => {
                dotenv::dotenv().ok();
                Self::for_network(network).with_env_overrides()
            }
            None => Self::from_env(),
        }
    }

    fn with_env_overrides(self) -> Result<Self, WalletError> {
        self.with_overrides(|var| env::var(var).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name
    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, WalletError> {
        if let Some(urls) = url_list(lookup("BTC_EXPLORER_URLS")) {
            self.explorer_urls = urls;
        }
        if let Some(urls) = url_list(lookup("BTC_BROADCAST_URLS")) {
            self.broadcast_urls = urls;
        }
        if let Some(url) = lookup("BTC_VERIFY_URL") {
            self.verify_url = trim_url(&url);
        }
        if let Some(url) = lookup("BTC_FEE_URL") {
            self.fee_url = trim_url(&url);
        }

        for (chain, var) in [
            (ChainId::Ethereum, "ETH_RPC_URLS"),
            (ChainId::Base, "BASE_RPC_URLS"),
            (ChainId::Solana, "SOL_RPC_URLS"),
            (ChainId::Xrp, "XRP_RPC_URLS"),
        ] {
            if let Some(urls) = url_list(lookup(var)) {
                self.account_rpc_urls.insert(chain, urls);
            }
        }

        if let Some(secs) = lookup("HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|e| {
                WalletError::Config(format!("HTTP_TIMEOUT_SECS '{}': {}", secs, e))
            })?;
            self.request_timeout = Duration::from_secs(secs);
        }

        if let Some(flag) = lookup("ALLOW_KEY_NETWORK_FALLBACK") {
            self.allow_key_network_fallback = match flag.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                other => {
                    return Err(WalletError::Config(format!(
                        "ALLOW_KEY_NETWORK_FALLBACK must be true or false, got '{}'",
                        other
                    )))
                }
            };
        }

        log::debug!(
            "Loaded config: network={:?}, explorers={:?}, broadcast={:?}",
            self.bitcoin_network,
            self.explorer_urls,
            self.broadcast_urls
        );

        Ok(self)
    }

    /// JSON-RPC endpoints for an account-based chain
    pub fn rpc_urls(&self, chain: ChainId) -> &[String] {
        self.account_rpc_urls
            .get(&chain)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Shared HTTP client with the configured per-call timeout
    pub fn http_client(&self) -> Result<reqwest::Client, WalletError> {
        reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| WalletError::Config(format!("Failed to build HTTP client: {}", e)))
    }

    /// Chain id of the configured Bitcoin network
    pub fn bitcoin_chain(&self) -> ChainId {
        match self.bitcoin_network {
            bitcoin::Network::Bitcoin => ChainId::Bitcoin,
            _ => ChainId::BitcoinTestnet,
        }
    }
}

impl Default for WalletConfig {
    /// Default configuration (Testnet)
    fn default() -> Self {
        Self::for_network(bitcoin::Network::Testnet)
    }
}

fn default_account_rpc_urls() -> HashMap<ChainId, Vec<String>> {
    HashMap::from([
        (
            ChainId::Ethereum,
            vec![
                "https://eth.llamarpc.com".to_string(),
                "https://cloudflare-eth.com".to_string(),
            ],
        ),
        (ChainId::Base, vec!["https://mainnet.base.org".to_string()]),
        (
            ChainId::Solana,
            vec!["https://api.mainnet-beta.solana.com".to_string()],
        ),
        (
            ChainId::Xrp,
            vec![
                "https://s1.ripple.com:51234".to_string(),
                "https://xrplcluster.com".to_string(),
            ],
        ),
    ])
}

/// Unset means testnet; unknown names warn and fall back to testnet
fn parse_network(value: Option<&str>) -> bitcoin::Network {
    match value.unwrap_or("testnet").trim().to_lowercase().as_str() {
        "mainnet" | "bitcoin" => bitcoin::Network::Bitcoin,
        "testnet" | "" => bitcoin::Network::Testnet,
        other => {
            log::warn!("Unknown network '{}', defaulting to testnet", other);
            bitcoin::Network::Testnet
        }
    }
}

fn url_list(raw: Option<String>) -> Option<Vec<String>> {
    let raw = raw?;
    let urls: Vec<String> = raw
        .split(',')
        .map(trim_url)
        .filter(|url| !url.is_empty())
        .collect();
    (!urls.is_empty()).then_some(urls)
}

fn trim_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
