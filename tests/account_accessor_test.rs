/// Account-chain balance reads over mock JSON-RPC endpoints
mod common;

use common::*;
use esplora_mock::{Fault, MockExplorer};
use multichain_wallet::{
    check_balance, Accessor, AccountAccessor, ChainAccessor, ChainId, ChainKind, WalletConfig,
    WalletError,
};
use serde_json::json;

const ETH_ADDRESS: &str = "0x52908400098527886E0F7030069857D2E4169EE7";
const XRP_ADDRESS: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";
const SOL_ADDRESS: &str = "11111111111111111111111111111111";

fn config_with_rpc(chain: ChainId, endpoints: &[&MockExplorer]) -> WalletConfig {
    let mut config = WalletConfig::default();
    config
        .account_rpc_urls
        .insert(chain, endpoints.iter().map(|m| m.url()).collect());
    config
}

#[tokio::test]
async fn test_eth_balance_in_ether() -> anyhow::Result<()> {
    init_logger();
    let node = MockExplorer::start().await?;
    node.state.set_rpc_result("eth_blockNumber", json!("0x12a05f2"));
    node.state
        .set_rpc_result("eth_getBalance", json!("0x1bc16d674ec80000"));

    let config = config_with_rpc(ChainId::Ethereum, &[&node]);
    let mut accessor = AccountAccessor::new(ChainId::Ethereum, &config)?;
    accessor.initialize().await?;

    assert_eq!(accessor.fetch_balance(ETH_ADDRESS).await?, 2.0);
    assert_eq!(node.state.request_count("POST /"), 2);

    Ok(())
}

#[tokio::test]
async fn test_initialize_picks_first_live_rpc() -> anyhow::Result<()> {
    init_logger();
    let dead = MockExplorer::start().await?;
    let live = MockExplorer::start().await?;
    dead.state.fail("/", Fault::ServerError);
    live.state.set_rpc_result("getSlot", json!(245_000_000u64));
    live.state
        .set_rpc_result("getBalance", json!({"context": {"slot": 1}, "value": 1_500_000_000u64}));

    let config = config_with_rpc(ChainId::Solana, &[&dead, &live]);
    let mut accessor = AccountAccessor::new(ChainId::Solana, &config)?;
    accessor.initialize().await?;

    let live_url = live.url();
    assert_eq!(accessor.active_endpoint(), Some(live_url.as_str()));
    assert_eq!(accessor.fetch_balance(SOL_ADDRESS).await?, 1.5);

    // Second initialize keeps the handle without probing again
    accessor.initialize().await?;
    assert_eq!(live.state.request_count("POST /"), 2);

    accessor.disconnect().await?;
    assert!(accessor.active_endpoint().is_none());

    Ok(())
}

#[tokio::test]
async fn test_balance_switches_endpoint_when_active_one_fails() -> anyhow::Result<()> {
    init_logger();
    let primary = MockExplorer::start().await?;
    let backup = MockExplorer::start().await?;
    for node in [&primary, &backup] {
        node.state.set_rpc_result("eth_blockNumber", json!("0x10"));
        node.state.set_rpc_result("eth_getBalance", json!("0xde0b6b3a7640000"));
    }

    let config = config_with_rpc(ChainId::Base, &[&primary, &backup]);
    let mut accessor = AccountAccessor::new(ChainId::Base, &config)?;
    accessor.initialize().await?;

    primary.state.fail("/", Fault::Malformed);
    assert_eq!(accessor.fetch_balance(ETH_ADDRESS).await?, 1.0);

    let backup_url = backup.url();
    assert_eq!(accessor.active_endpoint(), Some(backup_url.as_str()));

    Ok(())
}

#[tokio::test]
async fn test_unfunded_xrp_account_reads_zero() -> anyhow::Result<()> {
    init_logger();
    let node = MockExplorer::start().await?;
    node.state.set_rpc_result("server_info", json!({"info": {"build_version": "2.2.0"}}));
    node.state.set_rpc_result(
        "account_info",
        json!({"error": "actNotFound", "status": "error", "validated": true}),
    );

    let config = config_with_rpc(ChainId::Xrp, &[&node]);
    assert_eq!(check_balance(ChainId::Xrp, XRP_ADDRESS, &config).await?, 0.0);

    node.state.set_rpc_result(
        "account_info",
        json!({"account_data": {"Account": XRP_ADDRESS, "Balance": "25000000"}, "status": "success"}),
    );
    assert_eq!(check_balance(ChainId::Xrp, XRP_ADDRESS, &config).await?, 25.0);

    Ok(())
}

#[tokio::test]
async fn test_no_rpc_answers_readiness_check() -> anyhow::Result<()> {
    init_logger();
    let node = MockExplorer::start().await?;
    // No scripted methods: every call is a JSON-RPC "method not found"

    let config = config_with_rpc(ChainId::Ethereum, &[&node]);
    let mut accessor = Accessor::for_chain(ChainId::Ethereum, &config)?;
    assert_eq!(accessor.kind(), ChainKind::Account);

    let err = accessor.initialize().await.unwrap_err();
    assert!(matches!(
        err,
        WalletError::AllEndpointsFailed { chain: ChainId::Ethereum, .. }
    ));

    Ok(())
}

#[tokio::test]
async fn test_invalid_address_is_rejected_without_a_call() -> anyhow::Result<()> {
    init_logger();
    let node = MockExplorer::start().await?;
    node.state.set_rpc_result("eth_blockNumber", json!("0x10"));

    let config = config_with_rpc(ChainId::Ethereum, &[&node]);
    let mut accessor = AccountAccessor::new(ChainId::Ethereum, &config)?;
    accessor.initialize().await?;

    let err = accessor.fetch_balance("0x1234").await.unwrap_err();
    assert!(matches!(err, WalletError::InvalidAddress(_)));
    assert_eq!(node.state.request_count("POST /"), 1);

    Ok(())
}
