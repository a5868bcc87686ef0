/// In-memory ledger behind the mock endpoints
///
/// Tests script it through `MockState` before (or while) the client talks to
/// the server; every request the server sees is appended to a log.
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;

use crate::types::*;

#[derive(Debug, Default)]
pub struct Ledger {
    pub tip_height: u64,
    pub utxos: HashMap<String, Vec<UtxoResponse>>,
    /// Outputs reported spent by /tx/{txid}/outspends
    pub spent: HashSet<(String, u32)>,
    /// Txids whose outspends lookup returns 404
    pub unknown_txids: HashSet<String>,
    /// Delay before answering an outspends lookup
    pub outspends_delay: Option<Duration>,
    pub outspends_in_flight: usize,
    /// Highest number of outspends lookups seen in flight at once
    pub outspends_peak: usize,
    pub fees: Option<RecommendedFees>,
    pub broadcast: BroadcastBehavior,
    /// Raw transactions accepted by POST /tx
    pub broadcasts: Vec<String>,
    /// JSON-RPC `result` per method
    pub rpc_results: HashMap<String, Value>,
    pub faults: Vec<(String, Fault)>,
    /// "METHOD /path" for every request received
    pub requests: Vec<String>,
}

/// Shared, cloneable handle on the ledger
#[derive(Clone, Default)]
pub struct MockState {
    inner: Arc<Mutex<Ledger>>,
}

impl MockState {
    pub fn new() -> Self {
        let state = Self::default();
        state.ledger().tip_height = 800_000;
        state
    }

    /// Lock the ledger; a poisoned lock still yields the data
    pub fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_utxo(&self, address: &str, utxo: UtxoResponse) {
        self.ledger()
            .utxos
            .entry(address.to_string())
            .or_default()
            .push(utxo);
    }

    pub fn mark_spent(&self, txid: &str, vout: u32) {
        self.ledger().spent.insert((txid.to_string(), vout));
    }

    pub fn forget_tx(&self, txid: &str) {
        self.ledger().unknown_txids.insert(txid.to_string());
    }

    /// Hold every outspends answer for `delay`
    pub fn slow_outspends(&self, delay: Duration) {
        self.ledger().outspends_delay = Some(delay);
    }

    pub fn outspends_peak(&self) -> usize {
        self.ledger().outspends_peak
    }

    pub fn set_fees(&self, fees: RecommendedFees) {
        self.ledger().fees = Some(fees);
    }

    pub fn set_broadcast(&self, behavior: BroadcastBehavior) {
        self.ledger().broadcast = behavior;
    }

    pub fn set_rpc_result(&self, method: &str, result: Value) {
        self.ledger().rpc_results.insert(method.to_string(), result);
    }

    /// Fail every request whose path starts with `prefix`
    pub fn fail(&self, prefix: &str, fault: Fault) {
        self.ledger().faults.push((prefix.to_string(), fault));
    }

    pub fn heal(&self) {
        self.ledger().faults.clear();
    }

    pub fn requests(&self) -> Vec<String> {
        self.ledger().requests.clone()
    }

    /// Number of recorded requests whose "METHOD /path" starts with `prefix`
    pub fn request_count(&self, prefix: &str) -> usize {
        self.ledger()
            .requests
            .iter()
            .filter(|r| r.starts_with(prefix))
            .count()
    }

    pub fn broadcasts(&self) -> Vec<String> {
        self.ledger().broadcasts.clone()
    }

    pub(crate) fn fault_for(&self, path: &str) -> Option<Fault> {
        self.ledger()
            .faults
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix.as_str()))
            .map(|(_, fault)| *fault)
    }

    /// Mark an outspends lookup started, returning the delay to apply
    pub(crate) fn begin_outspends(&self) -> Option<Duration> {
        let mut ledger = self.ledger();
        ledger.outspends_in_flight += 1;
        ledger.outspends_peak = ledger.outspends_peak.max(ledger.outspends_in_flight);
        ledger.outspends_delay
    }

    pub(crate) fn end_outspends(&self) {
        let mut ledger = self.ledger();
        ledger.outspends_in_flight = ledger.outspends_in_flight.saturating_sub(1);
    }

    /// Spend status for vouts 0..=highest known vout of `txid`
    pub(crate) fn outspends(&self, txid: &str) -> Option<Vec<OutputSpendStatus>> {
        let ledger = self.ledger();
        if ledger.unknown_txids.contains(txid) {
            return None;
        }

        let highest = ledger
            .utxos
            .values()
            .flatten()
            .filter(|u| u.txid == txid)
            .map(|u| u.vout)
            .chain(ledger.spent.iter().filter(|(t, _)| t == txid).map(|(_, v)| *v))
            .max()?;

        Some(
            (0..=highest)
                .map(|vout| {
                    let spent = ledger.spent.contains(&(txid.to_string(), vout));
                    OutputSpendStatus {
                        spent,
                        txid: None,
                        vin: spent.then_some(0),
                    }
                })
                .collect(),
        )
    }
}
