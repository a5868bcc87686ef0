/// Axum HTTP handlers for the Esplora, mempool.space and JSON-RPC endpoints
use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::state::MockState;
use crate::types::*;

/// Custom error type for handlers
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        (status, message).into_response()
    }
}

/// Records every request and applies scripted faults before routing
pub async fn record_and_fault(
    State(state): State<MockState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    state
        .ledger()
        .requests
        .push(format!("{} {}", request.method(), path));

    match state.fault_for(&path) {
        Some(Fault::ServerError) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "injected failure").into_response()
        }
        Some(Fault::Malformed) => (StatusCode::OK, "<html>gateway hiccup</html>").into_response(),
        None => next.run(request).await,
    }
}

/// GET /blocks/tip/height
/// Returns the current blockchain height as plain text
pub async fn get_tip_height(State(state): State<MockState>) -> String {
    state.ledger().tip_height.to_string()
}

/// GET /address/{address}/utxo
/// Returns every scripted UTXO for an address, confirmed or not
pub async fn get_address_utxos(
    State(state): State<MockState>,
    Path(address): Path<String>,
) -> Json<Vec<UtxoResponse>> {
    let utxos = state
        .ledger()
        .utxos
        .get(&address)
        .cloned()
        .unwrap_or_default();
    Json(utxos)
}

/// GET /tx/{txid}/outspends
/// Returns the spending status of each output of a transaction
pub async fn get_outspends(
    State(state): State<MockState>,
    Path(txid): Path<String>,
) -> Result<Json<Vec<OutputSpendStatus>>, ApiError> {
    if let Some(delay) = state.begin_outspends() {
        tokio::time::sleep(delay).await;
    }
    let outspends = state.outspends(&txid);
    state.end_outspends();

    outspends
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Transaction not found: {}", txid)))
}

/// GET /v1/fees/recommended
pub async fn get_recommended_fees(
    State(state): State<MockState>,
) -> Result<Json<RecommendedFees>, ApiError> {
    let fees = state.ledger().fees;
    fees.map(Json)
        .ok_or_else(|| ApiError::Unavailable("fee estimates not available".into()))
}

/// POST /tx
/// Accepts raw hex as plain text or `{"txHex": "..."}`
pub async fn broadcast_transaction(
    State(state): State<MockState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    let raw_hex = if is_json {
        match serde_json::from_str::<Value>(&body) {
            Ok(value) => value["txHex"].as_str().unwrap_or_default().to_string(),
            Err(e) => return ApiError::BadRequest(format!("invalid JSON: {}", e)).into_response(),
        }
    } else {
        body.trim().to_string()
    };

    let behavior = state.ledger().broadcast.clone();
    let txid = match behavior {
        BroadcastBehavior::Accept(txid) => txid,
        BroadcastBehavior::AcceptJsonOnly(txid) if is_json => txid,
        BroadcastBehavior::AcceptJsonOnly(_) => {
            return ApiError::Unavailable("expected JSON body".into()).into_response()
        }
        BroadcastBehavior::Respond { status, body } => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (status, body).into_response();
        }
    };

    if raw_hex.is_empty() || hex::decode(&raw_hex).is_err() {
        return ApiError::BadRequest("sendrawtransaction RPC error: TX decode failed".into())
            .into_response();
    }

    log::info!("Mock accepted transaction {}", txid);
    state.ledger().broadcasts.push(raw_hex);
    (StatusCode::OK, txid).into_response()
}

/// POST /
/// Minimal JSON-RPC 2.0 endpoint answering scripted methods
pub async fn json_rpc(State(state): State<MockState>, Json(call): Json<Value>) -> Json<Value> {
    let id = call["id"].clone();
    let method = call["method"].as_str().unwrap_or_default();
    let result = state.ledger().rpc_results.get(method).cloned();

    Json(match result {
        Some(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        None => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32601, "message": format!("Method not found: {}", method) }
        }),
    })
}
