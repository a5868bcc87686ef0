/// Axum HTTP server setup and routing
use std::net::SocketAddr;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::handlers::*;
use crate::state::MockState;

pub fn create_router(state: MockState) -> Router {
    Router::new()
        // JSON-RPC (account chains)
        .route("/", post(json_rpc))
        // Block endpoints
        .route("/blocks/tip/height", get(get_tip_height))
        // Transaction endpoints
        .route("/tx", post(broadcast_transaction))
        .route("/tx/:txid/outspends", get(get_outspends))
        // Address endpoints
        .route("/address/:address/utxo", get(get_address_utxos))
        // mempool.space fee endpoint
        .route("/v1/fees/recommended", get(get_recommended_fees))
        .layer(middleware::from_fn_with_state(state.clone(), record_and_fault))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(state: MockState, host: String, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    log::info!("Esplora mock server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// A mock server running on an ephemeral localhost port
pub struct MockExplorer {
    pub state: MockState,
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl MockExplorer {
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with(MockState::new()).await
    }

    pub async fn start_with(state: MockState) -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = create_router(state.clone());

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("Mock server on {} stopped: {}", addr, e);
            }
        });

        log::debug!("Mock explorer started on {}", addr);
        Ok(Self { state, addr, handle })
    }

    /// Base URL without a trailing slash
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for MockExplorer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
