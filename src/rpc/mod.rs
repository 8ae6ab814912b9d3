//! Ledger RPC access.
//!
//! `LedgerRpc` is the narrow set of JSON-RPC calls the toolkit issues. The
//! production implementation wraps the nonblocking Solana `RpcClient`;
//! tests drive the same flows through an in-memory ledger.

pub mod client;
pub mod fallback;

pub use client::SolanaRpc;
pub use fallback::{EndpointPool, Fallback};

use crate::error::ToolkitResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::{
    account::Account, hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction,
};

/// Token amount as reported by `getTokenSupply` / `getTokenAccountBalance`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    /// Raw amount in base units
    pub amount: u64,
    pub decimals: u8,
    pub ui_amount_string: String,
}

#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Endpoint URL, for logs and reports
    fn endpoint(&self) -> &str;

    async fn get_balance(&self, address: &Pubkey) -> ToolkitResult<u64>;

    /// `None` when the account does not exist
    async fn get_account(&self, address: &Pubkey) -> ToolkitResult<Option<Account>>;

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> ToolkitResult<u64>;

    async fn get_latest_blockhash(&self) -> ToolkitResult<Hash>;

    /// Submit a signed transaction and wait for the configured commitment
    async fn send_and_confirm(&self, transaction: &Transaction) -> ToolkitResult<Signature>;

    async fn get_token_supply(&self, mint: &Pubkey) -> ToolkitResult<TokenAmount>;

    async fn get_token_account_balance(&self, account: &Pubkey) -> ToolkitResult<TokenAmount>;
}
