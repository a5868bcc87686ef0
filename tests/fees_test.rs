/// Fee recommendation lookup and its fallbacks
mod common;

use common::*;
use esplora_mock::{Fault, MockExplorer};
use multichain_wallet::{ChainId, FeeEstimator, FeeRates, WalletConfig};

const TESTNET_DEFAULTS: FeeRates = FeeRates {
    low: 1,
    medium: 2,
    high: 5,
};

fn estimator(fee_server: &MockExplorer) -> FeeEstimator {
    let config = config_for(&[], fee_server, &[]);
    FeeEstimator::new(&config).unwrap()
}

#[tokio::test]
async fn test_recommended_fees_map_to_tiers() -> anyhow::Result<()> {
    init_logger();
    let server = MockExplorer::start().await?;
    server.state.set_fees(fees(3, 8, 21));

    let rates = estimator(&server).fetch_gas_fees(ChainId::BitcoinTestnet).await;

    assert_eq!(
        rates,
        FeeRates {
            low: 3,
            medium: 8,
            high: 21
        }
    );
    assert_eq!(server.state.request_count("GET /v1/fees/recommended"), 1);

    Ok(())
}

#[tokio::test]
async fn test_unavailable_fees_use_network_defaults() -> anyhow::Result<()> {
    init_logger();
    let server = MockExplorer::start().await?;

    let rates = estimator(&server).fetch_gas_fees(ChainId::BitcoinTestnet).await;
    assert_eq!(rates, TESTNET_DEFAULTS);

    server.state.set_fees(fees(3, 8, 21));
    server.state.fail("/v1", Fault::Malformed);
    let rates = estimator(&server).fetch_gas_fees(ChainId::BitcoinTestnet).await;
    assert_eq!(rates, TESTNET_DEFAULTS);

    Ok(())
}

#[tokio::test]
async fn test_other_network_uses_its_own_defaults_without_asking() -> anyhow::Result<()> {
    init_logger();
    let server = MockExplorer::start().await?;
    server.state.set_fees(fees(3, 8, 21));

    let rates = estimator(&server).fetch_gas_fees(ChainId::Bitcoin).await;

    assert_eq!(
        rates,
        FeeRates {
            low: 5,
            medium: 10,
            high: 20
        }
    );
    assert_eq!(server.state.request_count("GET"), 0);

    Ok(())
}

#[tokio::test]
async fn test_account_chain_fees_never_touch_the_network() -> anyhow::Result<()> {
    init_logger();
    let server = MockExplorer::start().await?;
    let mut config = WalletConfig::default();
    config.fee_url = server.url();

    let estimator = FeeEstimator::new(&config)?;
    for chain in [ChainId::Ethereum, ChainId::Base, ChainId::Solana, ChainId::Xrp] {
        let rates = estimator.fetch_gas_fees(chain).await;
        assert!(rates.low <= rates.medium && rates.medium <= rates.high, "{} tiers", chain);
    }
    assert!(server.state.requests().is_empty());

    Ok(())
}
