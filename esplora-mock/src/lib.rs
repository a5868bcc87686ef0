/// Esplora Mock Server Library
///
/// An in-memory stand-in for the public Bitcoin explorer, fee and JSON-RPC
/// endpoints the wallet talks to. Tests script responses and failures
/// through `MockState` and read back the requests the server received.

pub mod handlers;
pub mod server;
pub mod state;
pub mod types;

// Re-export commonly used types
pub use server::{create_router, run_server, MockExplorer};
pub use state::{Ledger, MockState};
pub use types::*;
