/// Esplora and mempool.space response types
///
/// Field names follow the public APIs so clients parse mock responses the
/// same way they parse the real ones.
use serde::{Deserialize, Serialize};

/// UTXO response from /address/{address}/utxo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UtxoResponse {
    pub txid: String,
    pub vout: u32,
    pub value: u64,
    pub status: UtxoStatus,
}

impl UtxoResponse {
    pub fn confirmed(txid: impl Into<String>, vout: u32, value: u64, block_height: u64) -> Self {
        Self {
            txid: txid.into(),
            vout,
            value,
            status: UtxoStatus {
                confirmed: true,
                block_height: Some(block_height),
                block_hash: None,
                block_time: None,
            },
        }
    }

    pub fn unconfirmed(txid: impl Into<String>, vout: u32, value: u64) -> Self {
        Self {
            txid: txid.into(),
            vout,
            value,
            status: UtxoStatus {
                confirmed: false,
                block_height: None,
                block_hash: None,
                block_time: None,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UtxoStatus {
    pub confirmed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_time: Option<u64>,
}

/// One entry of /tx/{txid}/outspends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSpendStatus {
    pub spent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vin: Option<u32>,
}

/// mempool.space /v1/fees/recommended
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedFees {
    pub fastest_fee: u64,
    pub half_hour_fee: u64,
    pub hour_fee: u64,
    pub economy_fee: u64,
    pub minimum_fee: u64,
}

/// How POST /tx answers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastBehavior {
    /// 200 with the txid as plain text, for either body encoding
    Accept(String),
    /// Only `{"txHex": ...}` bodies are accepted; raw hex gets a 503
    AcceptJsonOnly(String),
    /// Fixed status and body for every submission
    Respond { status: u16, body: String },
}

impl Default for BroadcastBehavior {
    fn default() -> Self {
        BroadcastBehavior::Respond {
            status: 503,
            body: "broadcast not scripted".to_string(),
        }
    }
}

/// Injected failure for every path under a prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// HTTP 500
    ServerError,
    /// HTTP 200 with a body that is not JSON
    Malformed,
}
