//! Common test utilities for wallet integration tests
//!
//! This module provides shared test infrastructure including:
//! - Logger setup
//! - Deterministic testnet keys and addresses
//! - Wallet configuration pointed at local mock servers
#![allow(dead_code)]

use std::time::Duration;

use bitcoin::secp256k1::{Secp256k1, SecretKey};
use bitcoin::{Address, CompressedPublicKey, Network, PrivateKey, PublicKey};
use esplora_mock::{MockExplorer, RecommendedFees, UtxoResponse};
use multichain_wallet::WalletConfig;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A single-key testnet wallet
pub struct TestWallet {
    pub wif: String,
    pub pubkey_hex: String,
    pub address: String,
}

impl TestWallet {
    pub fn p2wpkh(seed: u8) -> Self {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(&[seed; 32]).expect("valid secret key");
        let private_key = PrivateKey::new(secret, Network::Testnet);
        let public_key = PublicKey::from_private_key(&secp, &private_key);
        let compressed = CompressedPublicKey::try_from(public_key).expect("compressed key");

        Self {
            wif: private_key.to_wif(),
            pubkey_hex: public_key.to_string(),
            address: Address::p2wpkh(&compressed, Network::Testnet).to_string(),
        }
    }
}

/// Deterministic 64-hex txid
pub fn txid(n: u8) -> String {
    format!("{:064x}", n)
}

pub fn confirmed(n: u8, vout: u32, value: u64) -> UtxoResponse {
    UtxoResponse::confirmed(txid(n), vout, value, 799_990)
}

pub fn fees(low: u64, medium: u64, high: u64) -> RecommendedFees {
    RecommendedFees {
        fastest_fee: high,
        half_hour_fee: medium,
        hour_fee: medium,
        economy_fee: low,
        minimum_fee: low,
    }
}

/// Testnet config routed entirely to local mocks
pub fn config_for(
    explorers: &[&MockExplorer],
    verifier: &MockExplorer,
    broadcasters: &[&MockExplorer],
) -> WalletConfig {
    let mut config = WalletConfig::for_network(Network::Testnet);
    config.explorer_urls = explorers.iter().map(|m| m.url()).collect();
    config.verify_url = verifier.url();
    config.fee_url = verifier.url();
    config.broadcast_urls = broadcasters.iter().map(|m| m.url()).collect();
    config.request_timeout = Duration::from_secs(5);
    config
}
