//! Balance reads for account-based chains over JSON-RPC
//!
//! Transfers on these chains go through each chain's own SDK and are not
//! handled here; this accessor only answers "how much does this address
//! hold".

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::chain::{ChainAccessor, ChainId, ChainKind};
use crate::config::WalletConfig;
use crate::error::WalletError;

pub struct AccountAccessor {
    chain: ChainId,
    client: reqwest::Client,
    rpc_urls: Vec<String>,
    active_endpoint: Option<String>,
}

impl AccountAccessor {
    pub fn new(chain: ChainId, config: &WalletConfig) -> Result<Self, WalletError> {
        if chain.kind() != ChainKind::Account {
            return Err(WalletError::UnsupportedChain(chain));
        }

        let rpc_urls = config.rpc_urls(chain).to_vec();
        if rpc_urls.is_empty() {
            return Err(WalletError::Config(format!("No RPC URLs configured for {}", chain)));
        }

        Ok(Self {
            chain,
            client: config.http_client()?,
            rpc_urls,
            active_endpoint: None,
        })
    }

    /// RPC endpoint that answered the readiness probe
    pub fn active_endpoint(&self) -> Option<&str> {
        self.active_endpoint.as_deref()
    }

    async fn call(&self, url: &str, method: &str, params: Value) -> Result<Value, WalletError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self.client.post(url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(WalletError::Network(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let reply: Value = response
            .json()
            .await
            .map_err(|e| WalletError::Network(format!("Malformed RPC response: {}", e)))?;

        if let Some(error) = reply.get("error").filter(|e| !e.is_null()) {
            return Err(WalletError::Balance(format!("{} failed: {}", method, error)));
        }

        Ok(reply["result"].clone())
    }

    async fn probe(&self, url: &str) -> Result<(), WalletError> {
        let (method, params) = match self.chain {
            ChainId::Solana => ("getSlot", json!([])),
            ChainId::Xrp => ("server_info", json!([{}])),
            _ => ("eth_blockNumber", json!([])),
        };
        self.call(url, method, params).await.map(|_| ())
    }

    fn balance_request(&self, address: &str) -> (&'static str, Value) {
        match self.chain {
            ChainId::Solana => ("getBalance", json!([address])),
            ChainId::Xrp => (
                "account_info",
                json!([{ "account": address, "ledger_index": "validated" }]),
            ),
            _ => ("eth_getBalance", json!([address, "latest"])),
        }
    }

    /// Active endpoint first, then the rest in configured order
    fn endpoints_in_order(&self) -> Vec<String> {
        let mut ordered = Vec::with_capacity(self.rpc_urls.len());
        if let Some(active) = &self.active_endpoint {
            ordered.push(active.clone());
        }
        ordered.extend(
            self.rpc_urls
                .iter()
                .filter(|url| Some(url.as_str()) != self.active_endpoint.as_deref())
                .cloned(),
        );
        ordered
    }
}

/// Extract the raw-unit balance from an RPC `result`
pub fn parse_balance(chain: ChainId, result: &Value) -> Result<u128, WalletError> {
    match chain {
        ChainId::Ethereum | ChainId::Base => {
            let hex = result
                .as_str()
                .ok_or_else(|| WalletError::Balance(format!("Unexpected result: {}", result)))?;
            u128::from_str_radix(hex.trim_start_matches("0x"), 16)
                .map_err(|e| WalletError::Balance(format!("Bad wei amount {}: {}", hex, e)))
        }
        ChainId::Solana => result["value"]
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| WalletError::Balance(format!("Unexpected result: {}", result))),
        ChainId::Xrp => {
            // Accounts below the reserve do not exist on-ledger yet
            if result["error"].as_str() == Some("actNotFound") {
                return Ok(0);
            }
            let drops = result["account_data"]["Balance"]
                .as_str()
                .ok_or_else(|| WalletError::Balance(format!("Unexpected result: {}", result)))?;
            drops
                .parse::<u128>()
                .map_err(|e| WalletError::Balance(format!("Bad drops amount {}: {}", drops, e)))
        }
        ChainId::Bitcoin | ChainId::BitcoinTestnet => Err(WalletError::UnsupportedChain(chain)),
    }
}

fn check_address(chain: ChainId, address: &str) -> Result<(), WalletError> {
    let valid = match chain {
        ChainId::Ethereum | ChainId::Base => {
            address.len() == 42
                && address.starts_with("0x")
                && address[2..].chars().all(|c| c.is_ascii_hexdigit())
        }
        ChainId::Xrp => address.starts_with('r') && (25..=35).contains(&address.len()),
        ChainId::Solana => {
            (32..=44).contains(&address.len())
                && address.chars().all(|c| c.is_ascii_alphanumeric() && !"0OIl".contains(c))
        }
        ChainId::Bitcoin | ChainId::BitcoinTestnet => false,
    };

    if valid {
        Ok(())
    } else {
        Err(WalletError::InvalidAddress(format!(
            "{} is not a {} address",
            address, chain
        )))
    }
}

#[async_trait]
impl ChainAccessor for AccountAccessor {
    fn chain(&self) -> ChainId {
        self.chain
    }

    async fn initialize(&mut self) -> Result<(), WalletError> {
        if self.active_endpoint.is_some() {
            return Ok(());
        }

        let mut last_error = String::from("no RPC configured");
        for url in &self.rpc_urls {
            match self.probe(url).await {
                Ok(()) => {
                    log::debug!("{} RPC {} ready", self.chain, url);
                    self.active_endpoint = Some(url.clone());
                    return Ok(());
                }
                Err(e) => {
                    log::warn!("{} RPC {} not reachable: {}", self.chain, url, e);
                    last_error = format!("{}: {}", url, e);
                }
            }
        }

        Err(WalletError::AllEndpointsFailed {
            chain: self.chain,
            last_error,
        })
    }

    async fn fetch_balance(&mut self, address: &str) -> Result<f64, WalletError> {
        if self.active_endpoint.is_none() {
            return Err(WalletError::NotInitialized { chain: self.chain });
        }
        check_address(self.chain, address)?;

        let (method, params) = self.balance_request(address);
        let mut last_error = None;

        for url in self.endpoints_in_order() {
            match self.call(&url, method, params.clone()).await {
                Ok(result) => {
                    let raw = parse_balance(self.chain, &result)?;
                    if self.active_endpoint.as_deref() != Some(url.as_str()) {
                        log::info!("{} switching active RPC to {}", self.chain, url);
                        self.active_endpoint = Some(url);
                    }
                    return Ok(self.calculate_balance(raw));
                }
                Err(e) => {
                    log::warn!("{} balance query at {} failed: {}", self.chain, url, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            WalletError::Balance(format!("No {} endpoint answered", self.chain))
        }))
    }

    async fn disconnect(&mut self) -> Result<(), WalletError> {
        self.active_endpoint = None;
        Ok(())
    }
}
