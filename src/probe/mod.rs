//! Read-only inspection of on-chain accounts: existence checks, balances
//! and token risk audits.

pub mod account;
pub mod audit;
pub mod layout;

pub use account::{check_account, check_accounts, check_balance, summarize, AccountCheck, BalanceReport, CheckSummary};
pub use audit::{audit_account, scan_address, scan_addresses, AllowList, Finding, ScanResult, Severity};
pub use layout::{AccountKind, MintLayout, TokenAccountLayout, TokenAccountState};
