//! SPL token toolkit: token creation, account probing and price monitoring
//! over the Solana JSON-RPC API.
//!
//! Shared by the `token-toolkit` CLI and the standalone scripts.

pub mod config;
pub mod error;
pub mod keys;
pub mod logging;
pub mod price;
pub mod probe;
pub mod prompt;
pub mod report;
pub mod rpc;
pub mod token;

// Re-export commonly used items
pub use config::Settings;
pub use error::{ToolkitError, ToolkitResult};
pub use rpc::{EndpointPool, Fallback, LedgerRpc, SolanaRpc};
pub use token::{CreateTokenParams, OperationResult, TokenCreator, TokenInfo, TokenMetadata};
