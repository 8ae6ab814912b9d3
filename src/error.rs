//! Error types for the token toolkit

use solana_client::client_error::ClientError;
use thiserror::Error;

/// Toolkit-level errors
#[derive(Error, Debug)]
pub enum ToolkitError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Address that does not parse as a base58 public key
    #[error("Invalid address '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },

    /// Secret key or keypair file that cannot be loaded
    #[error("Invalid keypair: {0}")]
    InvalidKeypair(String),

    /// Amount rejected before any network call
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Payer balance below the configured floor
    #[error("Insufficient balance: have {have} lamports, need at least {need}")]
    InsufficientBalance { have: u64, need: u64 },

    /// Account does not exist on the cluster
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// RPC/Solana error
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Instruction could not be built
    #[error("Instruction error: {0}")]
    Instruction(String),

    /// On-chain state did not match what was submitted
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    /// Every configured endpoint failed
    #[error("All RPC endpoints exhausted after {attempts} attempts: {last_error}")]
    EndpointsExhausted { attempts: u32, last_error: String },

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error from an off-chain API
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ToolkitError {
    /// Whether another attempt (or another endpoint) may succeed.
    ///
    /// Only transport-level failures qualify; bad input and on-chain state
    /// problems fail the same way everywhere.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ToolkitError::Rpc(_) | ToolkitError::Http(_))
    }

    pub fn invalid_address(input: &str, reason: impl ToString) -> Self {
        ToolkitError::InvalidAddress {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<ClientError> for ToolkitError {
    fn from(err: ClientError) -> Self {
        ToolkitError::Rpc(err.to_string())
    }
}

impl From<config::ConfigError> for ToolkitError {
    fn from(err: config::ConfigError) -> Self {
        ToolkitError::Config(err.to_string())
    }
}

/// Result type for toolkit operations
pub type ToolkitResult<T> = Result<T, ToolkitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ToolkitError::Rpc("connection reset".into()).is_retryable());
        assert!(!ToolkitError::InvalidAmount("zero".into()).is_retryable());
        assert!(!ToolkitError::InsufficientBalance { have: 1, need: 2 }.is_retryable());
        assert!(!ToolkitError::invalid_address("abc", "bad").is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = ToolkitError::EndpointsExhausted {
            attempts: 3,
            last_error: "timeout".into(),
        };
        assert_eq!(
            err.to_string(),
            "All RPC endpoints exhausted after 3 attempts: timeout"
        );
    }
}
