/// Broadcast fallback across endpoints and body encodings
mod common;

use common::*;
use esplora_mock::{BroadcastBehavior, MockExplorer};
use bitcoin::absolute::LockTime;
use bitcoin::transaction::Version;
use bitcoin::{Amount, ScriptBuf, Transaction, TxIn, TxOut};
use multichain_wallet::{Broadcaster, BuiltTransaction, WalletError};

const TXID: &str = "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b";
const RAW_TX: &str = "02000000000100000000";

fn reject(status: u16, body: &str) -> BroadcastBehavior {
    BroadcastBehavior::Respond {
        status,
        body: body.to_string(),
    }
}

async fn broadcaster_for(endpoints: &[&MockExplorer]) -> anyhow::Result<(Broadcaster, MockExplorer)> {
    let verifier = MockExplorer::start().await?;
    let config = config_for(&[], &verifier, endpoints);
    Ok((Broadcaster::new(&config)?, verifier))
}

#[tokio::test]
async fn test_rejection_stops_at_first_endpoint() -> anyhow::Result<()> {
    init_logger();
    let first = MockExplorer::start().await?;
    let second = MockExplorer::start().await?;
    first.state.set_broadcast(reject(
        400,
        r#"sendrawtransaction RPC error: {"code":-25,"message":"bad-txns-inputs-missingorspent"}"#,
    ));
    second.state.set_broadcast(BroadcastBehavior::Accept(TXID.to_string()));

    let (broadcaster, _verifier) = broadcaster_for(&[&first, &second]).await?;
    let err = broadcaster.broadcast(RAW_TX).await.unwrap_err();

    match err {
        WalletError::RejectedByNetwork { endpoint, body } => {
            assert_eq!(endpoint, format!("{}/tx", first.url()));
            assert!(body.contains("bad-txns-inputs-missingorspent"));
        }
        other => panic!("expected RejectedByNetwork, got {:?}", other),
    }

    // No JSON retry and no second endpoint after a verdict
    assert_eq!(first.state.request_count("POST /tx"), 1);
    assert_eq!(second.state.request_count("POST /tx"), 0);

    Ok(())
}

#[tokio::test]
async fn test_server_error_moves_to_next_endpoint() -> anyhow::Result<()> {
    init_logger();
    let first = MockExplorer::start().await?;
    let second = MockExplorer::start().await?;
    first.state.set_broadcast(reject(502, "bad gateway"));
    second.state.set_broadcast(BroadcastBehavior::Accept(TXID.to_string()));

    let (broadcaster, _verifier) = broadcaster_for(&[&first, &second]).await?;
    let txid = broadcaster.broadcast(RAW_TX).await?;

    assert_eq!(txid, TXID);
    // Both encodings were tried on the failing endpoint
    assert_eq!(first.state.request_count("POST /tx"), 2);
    assert_eq!(second.state.broadcasts(), vec![RAW_TX.to_string()]);

    Ok(())
}

#[tokio::test]
async fn test_endpoint_statuses_are_not_verdicts() -> anyhow::Result<()> {
    init_logger();
    for status in [404, 408, 429] {
        let first = MockExplorer::start().await?;
        let second = MockExplorer::start().await?;
        first.state.set_broadcast(reject(status, "try later"));
        second.state.set_broadcast(BroadcastBehavior::Accept(TXID.to_string()));

        let (broadcaster, _verifier) = broadcaster_for(&[&first, &second]).await?;
        assert_eq!(broadcaster.broadcast(RAW_TX).await?, TXID, "status {}", status);
    }

    Ok(())
}

#[tokio::test]
async fn test_json_encoding_fallback() -> anyhow::Result<()> {
    init_logger();
    let endpoint = MockExplorer::start().await?;
    endpoint
        .state
        .set_broadcast(BroadcastBehavior::AcceptJsonOnly(TXID.to_string()));

    let (broadcaster, _verifier) = broadcaster_for(&[&endpoint]).await?;
    let txid = broadcaster.broadcast(RAW_TX).await?;

    assert_eq!(txid, TXID);
    assert_eq!(endpoint.state.request_count("POST /tx"), 2);
    assert_eq!(endpoint.state.broadcasts(), vec![RAW_TX.to_string()]);

    Ok(())
}

#[tokio::test]
async fn test_exhausted_reports_last_body() -> anyhow::Result<()> {
    init_logger();
    let first = MockExplorer::start().await?;
    let second = MockExplorer::start().await?;
    first.state.set_broadcast(reject(500, "first is down"));
    second.state.set_broadcast(reject(503, "second is down"));

    let (broadcaster, _verifier) = broadcaster_for(&[&first, &second]).await?;
    let err = broadcaster.broadcast(RAW_TX).await.unwrap_err();

    match err {
        WalletError::BroadcastExhausted { last_body } => {
            assert!(last_body.contains("second is down"), "{}", last_body);
        }
        other => panic!("expected BroadcastExhausted, got {:?}", other),
    }
    assert_eq!(first.state.request_count("POST /tx"), 2);
    assert_eq!(second.state.request_count("POST /tx"), 2);

    Ok(())
}

#[tokio::test]
async fn test_success_without_txid_keeps_local_txid() -> anyhow::Result<()> {
    init_logger();
    let first = MockExplorer::start().await?;
    let second = MockExplorer::start().await?;
    first
        .state
        .set_broadcast(BroadcastBehavior::Accept("OK".to_string()));
    second
        .state
        .set_broadcast(reject(400, "txn-already-in-mempool"));

    let (broadcaster, _verifier) = broadcaster_for(&[&first, &second]).await?;
    let built = BuiltTransaction {
        raw_hex: RAW_TX.to_string(),
        txid: TXID.to_string(),
        fee_rate_used: 2,
        total_fee_sats: 1_000,
        change_sats: None,
    };

    assert_eq!(broadcaster.submit(built).await?, TXID);
    assert_eq!(first.state.request_count("POST /tx"), 1);
    assert_eq!(second.state.request_count("POST /tx"), 0);

    Ok(())
}

#[tokio::test]
async fn test_raw_broadcast_derives_missing_txid() -> anyhow::Result<()> {
    init_logger();
    let endpoint = MockExplorer::start().await?;
    endpoint
        .state
        .set_broadcast(BroadcastBehavior::Accept(String::new()));

    let tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn::default()],
        output: vec![TxOut {
            value: Amount::from_sat(10_000),
            script_pubkey: ScriptBuf::new(),
        }],
    };
    let raw_hex = bitcoin::consensus::encode::serialize_hex(&tx);

    let (broadcaster, _verifier) = broadcaster_for(&[&endpoint]).await?;
    let txid = broadcaster.broadcast(&raw_hex).await?;

    assert_eq!(txid, tx.compute_txid().to_string());
    assert_eq!(endpoint.state.request_count("POST /tx"), 1);

    Ok(())
}
