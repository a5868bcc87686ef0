//! Multi-endpoint transaction broadcast
//!
//! Providers disagree on the submission format, so each endpoint is tried
//! with a raw hex body first and a `{"txHex": ...}` JSON body second. Any
//! success status means the transaction was taken, whatever the body says.
//! A client-error status is a verdict on the transaction and stops
//! everything; anything else moves on to the next encoding or endpoint.

use std::str::FromStr;

use bitcoin::{Transaction, Txid};
use reqwest::StatusCode;
use serde_json::{json, Value};

use super::transaction::BuiltTransaction;
use crate::config::WalletConfig;
use crate::error::WalletError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    PlainText,
    Json,
}

enum Outcome {
    /// Txid from the response body, when it carried one
    Accepted(Option<String>),
    Rejected(String),
    Transient(String),
}

pub struct Broadcaster {
    client: reqwest::Client,
    broadcast_urls: Vec<String>,
}

impl Broadcaster {
    pub fn new(config: &WalletConfig) -> Result<Self, WalletError> {
        Ok(Self {
            client: config.http_client()?,
            broadcast_urls: config.broadcast_urls.clone(),
        })
    }

    /// Broadcast a built transaction, consuming it
    ///
    /// Falls back to the locally computed txid when the accepting provider
    /// does not echo one.
    pub async fn submit(&self, built: BuiltTransaction) -> Result<String, WalletError> {
        log::debug!("Submitting {} ({} sats fee)", built.txid, built.total_fee_sats);

        match self.post_everywhere(&built.raw_hex).await? {
            Some(remote) => {
                if remote != built.txid {
                    log::warn!(
                        "Provider reported txid {} for transaction {}",
                        remote,
                        built.txid
                    );
                }
                Ok(remote)
            }
            None => Ok(built.txid),
        }
    }

    /// Post a raw signed transaction and return its txid
    ///
    /// When the accepting provider does not echo a txid, it is computed from
    /// `raw_hex`.
    pub async fn broadcast(&self, raw_hex: &str) -> Result<String, WalletError> {
        if let Some(txid) = self.post_everywhere(raw_hex).await? {
            return Ok(txid);
        }

        bitcoin::consensus::encode::deserialize_hex::<Transaction>(raw_hex)
            .map(|tx| tx.compute_txid().to_string())
            .map_err(|e| {
                WalletError::Network(format!(
                    "Transaction accepted without a txid and it could not be derived: {}",
                    e
                ))
            })
    }

    /// Stops at the first endpoint that accepts or rejects
    async fn post_everywhere(&self, raw_hex: &str) -> Result<Option<String>, WalletError> {
        let mut last_body = String::from("no broadcast endpoints configured");

        for base_url in &self.broadcast_urls {
            let url = format!("{}/tx", base_url);

            for encoding in [Encoding::PlainText, Encoding::Json] {
                log::debug!("Broadcasting to {} ({:?})", url, encoding);

                match self.post(&url, raw_hex, encoding).await {
                    Outcome::Accepted(txid) => {
                        log::info!(
                            "Transaction {} accepted by {}",
                            txid.as_deref().unwrap_or("(no txid in response)"),
                            base_url
                        );
                        return Ok(txid);
                    }
                    Outcome::Rejected(body) => {
                        log::error!("Transaction rejected by {}: {}", base_url, body);
                        return Err(WalletError::RejectedByNetwork {
                            endpoint: url,
                            body,
                        });
                    }
                    Outcome::Transient(body) => {
                        log::warn!("Broadcast to {} ({:?}) failed: {}", url, encoding, body);
                        last_body = body;
                    }
                }
            }
        }

        Err(WalletError::BroadcastExhausted { last_body })
    }

    async fn post(&self, url: &str, raw_hex: &str, encoding: Encoding) -> Outcome {
        let request = match encoding {
            Encoding::PlainText => self
                .client
                .post(url)
                .header(reqwest::header::CONTENT_TYPE, "text/plain")
                .body(raw_hex.to_string()),
            Encoding::Json => self.client.post(url).json(&json!({ "txHex": raw_hex })),
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Outcome::Transient(e.to_string()),
        };

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {}>", e));

        if status.is_success() {
            let txid = parse_txid(&body);
            if txid.is_none() {
                log::warn!("HTTP {} from {} without a txid: {}", status, url, body.trim());
            }
            return Outcome::Accepted(txid);
        }

        if is_rejection(status) {
            Outcome::Rejected(format!("HTTP {}: {}", status, body.trim()))
        } else {
            Outcome::Transient(format!("HTTP {}: {}", status, body.trim()))
        }
    }
}

/// 4xx except the statuses that describe the endpoint rather than the
/// transaction (missing route, timeout, rate limit)
fn is_rejection(status: StatusCode) -> bool {
    status.is_client_error()
        && !matches!(
            status,
            StatusCode::NOT_FOUND | StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS
        )
}

/// Accepts a bare txid, a JSON string, or `{"txid": ...}`
fn parse_txid(body: &str) -> Option<String> {
    let body = body.trim();
    let candidate = match serde_json::from_str::<Value>(body) {
        Ok(Value::String(txid)) => txid,
        Ok(Value::Object(obj)) => obj.get("txid")?.as_str()?.to_string(),
        _ => body.to_string(),
    };

    Txid::from_str(candidate.trim())
        .ok()
        .map(|txid| txid.to_string())
}
