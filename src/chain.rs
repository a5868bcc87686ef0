//! Chain identifiers and the uniform accessor contract
//!
//! Chains come in two families: UTXO-based ledgers, where a balance is the sum
//! of a verified set of unspent outputs, and account-based ledgers, where the
//! node reports a balance number directly. `Accessor` is the tagged union over
//! both; code that needs the UTXO set matches on it instead of downcasting.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::account::AccountAccessor;
use crate::bitcoin::utxo::UtxoAccessor;
use crate::config::WalletConfig;
use crate::error::WalletError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainId {
    Bitcoin,
    BitcoinTestnet,
    Ethereum,
    Base,
    Solana,
    Xrp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKind {
    Utxo,
    Account,
}

impl ChainId {
    pub const ALL: [ChainId; 6] = [
        ChainId::Bitcoin,
        ChainId::BitcoinTestnet,
        ChainId::Ethereum,
        ChainId::Base,
        ChainId::Solana,
        ChainId::Xrp,
    ];

    pub fn kind(&self) -> ChainKind {
        match self {
            ChainId::Bitcoin | ChainId::BitcoinTestnet => ChainKind::Utxo,
            ChainId::Ethereum | ChainId::Base | ChainId::Solana | ChainId::Xrp => {
                ChainKind::Account
            }
        }
    }

    /// Number of raw units per major unit, as a power of ten
    ///
    /// - BTC: satoshis (8)
    /// - ETH/BASE: wei (18)
    /// - SOL: lamports (9)
    /// - XRP: drops (6)
    pub fn decimals(&self) -> u32 {
        match self {
            ChainId::Bitcoin | ChainId::BitcoinTestnet => 8,
            ChainId::Ethereum | ChainId::Base => 18,
            ChainId::Solana => 9,
            ChainId::Xrp => 6,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ChainId::Bitcoin => "BTC",
            ChainId::BitcoinTestnet => "tBTC",
            ChainId::Ethereum | ChainId::Base => "ETH",
            ChainId::Solana => "SOL",
            ChainId::Xrp => "XRP",
        }
    }

    /// Bitcoin network for UTXO chains, `None` for account chains
    pub fn bitcoin_network(&self) -> Option<bitcoin::Network> {
        match self {
            ChainId::Bitcoin => Some(bitcoin::Network::Bitcoin),
            ChainId::BitcoinTestnet => Some(bitcoin::Network::Testnet),
            _ => None,
        }
    }

    /// Convert a raw-unit amount into the chain's major unit
    pub fn to_major_units(&self, raw: u128) -> f64 {
        raw as f64 / 10f64.powi(self.decimals() as i32)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChainId::Bitcoin => "btc",
            ChainId::BitcoinTestnet => "btc-testnet",
            ChainId::Ethereum => "eth",
            ChainId::Base => "base",
            ChainId::Solana => "sol",
            ChainId::Xrp => "xrp",
        };
        f.write_str(name)
    }
}

impl FromStr for ChainId {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "btc" | "bitcoin" => Ok(ChainId::Bitcoin),
            "btc-testnet" | "tbtc" | "testnet" => Ok(ChainId::BitcoinTestnet),
            "eth" | "ethereum" => Ok(ChainId::Ethereum),
            "base" => Ok(ChainId::Base),
            "sol" | "solana" => Ok(ChainId::Solana),
            "xrp" | "ripple" => Ok(ChainId::Xrp),
            other => Err(WalletError::Config(format!("Unknown chain '{}'", other))),
        }
    }
}

/// Uniform contract over every supported chain family
///
/// Stateful operations take `&mut self`: an accessor's cache belongs to one
/// in-flight fetch/send at a time. Issue concurrent sends through separate
/// accessor instances.
#[async_trait]
pub trait ChainAccessor: Send {
    fn chain(&self) -> ChainId;

    /// Establish readiness. Calling it again once ready is a no-op.
    async fn initialize(&mut self) -> Result<(), WalletError>;

    /// Balance of `address` in major units (BTC, not satoshis)
    async fn fetch_balance(&mut self, address: &str) -> Result<f64, WalletError>;

    /// Raw units to major units. Pure.
    fn calculate_balance(&self, raw: u128) -> f64 {
        self.chain().to_major_units(raw)
    }

    /// Release any held connection or cache. Safe when never connected.
    async fn disconnect(&mut self) -> Result<(), WalletError>;
}

/// One accessor per chain family
pub enum Accessor {
    Utxo(UtxoAccessor),
    Account(AccountAccessor),
}

impl Accessor {
    pub fn for_chain(chain: ChainId, config: &WalletConfig) -> Result<Self, WalletError> {
        match chain.kind() {
            ChainKind::Utxo => Ok(Accessor::Utxo(UtxoAccessor::new(chain, config)?)),
            ChainKind::Account => Ok(Accessor::Account(AccountAccessor::new(chain, config)?)),
        }
    }

    pub fn kind(&self) -> ChainKind {
        match self {
            Accessor::Utxo(_) => ChainKind::Utxo,
            Accessor::Account(_) => ChainKind::Account,
        }
    }

    pub fn as_utxo(&self) -> Option<&UtxoAccessor> {
        match self {
            Accessor::Utxo(accessor) => Some(accessor),
            Accessor::Account(_) => None,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ChainAccessor {
        match self {
            Accessor::Utxo(accessor) => accessor,
            Accessor::Account(accessor) => accessor,
        }
    }
}

#[async_trait]
impl ChainAccessor for Accessor {
    fn chain(&self) -> ChainId {
        match self {
            Accessor::Utxo(accessor) => accessor.chain(),
            Accessor::Account(accessor) => accessor.chain(),
        }
    }

    async fn initialize(&mut self) -> Result<(), WalletError> {
        self.inner_mut().initialize().await
    }

    async fn fetch_balance(&mut self, address: &str) -> Result<f64, WalletError> {
        self.inner_mut().fetch_balance(address).await
    }

    async fn disconnect(&mut self) -> Result<(), WalletError> {
        self.inner_mut().disconnect().await
    }
}

/// One-shot balance read: initialize, fetch, disconnect
pub async fn check_balance(
    chain: ChainId,
    address: &str,
    config: &WalletConfig,
) -> Result<f64, WalletError> {
    let mut accessor = Accessor::for_chain(chain, config)?;
    accessor.initialize().await?;
    let balance = accessor.fetch_balance(address).await;
    accessor.disconnect().await?;
    balance
}
