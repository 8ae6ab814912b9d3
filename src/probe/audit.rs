//! Read-only risk audit of mints and token accounts
//!
//! Findings per account kind:
//! - Mint: live mint authority, freeze authority, not initialized, zero supply
//! - Token account: delegate with allowance, frozen, close authority, not initialized
//! - Anything else: missing account, foreign owner, unrecognised layout
//!
//! USDC, USDT and wrapped SOL are exempt from the authority findings.

use super::layout::{self, AccountKind, MintLayout, TokenAccountLayout, TokenAccountState};
use crate::config::SPL_TOKEN_PROGRAM_ID;
use crate::error::ToolkitResult;
use crate::keys::parse_pubkey;
use crate::rpc::{EndpointPool, LedgerRpc};
use serde::{Deserialize, Serialize};
use solana_sdk::account::Account;
use std::collections::HashSet;
use std::time::Duration;

/// Mints allowed to keep mint / freeze authority
pub mod known_tokens {
    pub const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
    pub const USDT: &str = "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB";
    pub const WSOL: &str = "So11111111111111111111111111111111111111112";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub code: String,
    pub message: String,
}

impl Finding {
    fn new(severity: Severity, code: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Outcome of scanning one address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub address: String,
    pub kind: AccountKind,
    /// True when any warning or critical finding was raised
    pub flagged: bool,
    pub findings: Vec<Finding>,
    /// Finding messages, flattened for quick reading
    pub reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mint: Option<MintLayout>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_account: Option<TokenAccountLayout>,
}

impl ScanResult {
    fn new(address: &str, kind: AccountKind, findings: Vec<Finding>) -> Self {
        let flagged = findings.iter().any(|f| f.severity >= Severity::Warning);
        let reasons = findings.iter().map(|f| f.message.clone()).collect();
        Self {
            address: address.to_string(),
            kind,
            flagged,
            findings,
            reasons,
            mint: None,
            token_account: None,
        }
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }
}

/// Mints exempt from authority findings
#[derive(Debug, Clone)]
pub struct AllowList {
    mints: HashSet<String>,
}

impl AllowList {
    pub fn new(extra: &[String]) -> Self {
        let mut mints: HashSet<String> = [known_tokens::USDC, known_tokens::USDT, known_tokens::WSOL]
            .iter()
            .map(|s| s.to_string())
            .collect();
        mints.extend(extra.iter().map(|s| s.trim().to_string()));
        Self { mints }
    }

    pub fn contains(&self, mint: &str) -> bool {
        self.mints.contains(mint)
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::new(&[])
    }
}

pub fn audit_mint(address: &str, mint: &MintLayout, allow: &AllowList) -> Vec<Finding> {
    let mut findings = Vec::new();

    if !mint.is_initialized {
        findings.push(Finding::new(
            Severity::Critical,
            "mint_uninitialized",
            "Mint account is not initialized",
        ));
        return findings;
    }

    let allowed = allow.contains(address);
    if let Some(authority) = &mint.mint_authority {
        if !allowed {
            findings.push(Finding::new(
                Severity::Warning,
                "mint_authority_active",
                format!("Mint authority {} can still mint new supply", authority),
            ));
        }
    }
    if let Some(authority) = &mint.freeze_authority {
        if !allowed {
            findings.push(Finding::new(
                Severity::Warning,
                "freeze_authority_active",
                format!("Freeze authority {} can freeze holder accounts", authority),
            ));
        }
    }
    if mint.supply == 0 {
        findings.push(Finding::new(Severity::Info, "zero_supply", "Mint has zero supply"));
    }
    if mint.decimals > 9 {
        findings.push(Finding::new(
            Severity::Info,
            "unusual_decimals",
            format!("Mint uses {} decimals", mint.decimals),
        ));
    }

    findings
}

pub fn audit_token_account(account: &TokenAccountLayout) -> Vec<Finding> {
    let mut findings = Vec::new();

    match account.state {
        TokenAccountState::Uninitialized => {
            findings.push(Finding::new(
                Severity::Critical,
                "account_uninitialized",
                "Token account is not initialized",
            ));
            return findings;
        }
        TokenAccountState::Frozen => findings.push(Finding::new(
            Severity::Warning,
            "account_frozen",
            "Token account is frozen",
        )),
        TokenAccountState::Initialized => {}
    }

    if let Some(delegate) = &account.delegate {
        if account.delegated_amount > 0 {
            findings.push(Finding::new(
                Severity::Warning,
                "delegate_allowance",
                format!(
                    "Delegate {} may move up to {} base units",
                    delegate, account.delegated_amount
                ),
            ));
        }
    }
    if let Some(close_authority) = &account.close_authority {
        if close_authority != &account.owner {
            findings.push(Finding::new(
                Severity::Info,
                "close_authority_set",
                format!("Close authority {} differs from owner", close_authority),
            ));
        }
    }

    findings
}

/// Audit already-fetched account data
pub fn audit_account(address: &str, account: Option<&Account>, allow: &AllowList) -> ScanResult {
    let account = match account {
        Some(account) => account,
        None => {
            return ScanResult::new(
                address,
                AccountKind::Unknown,
                vec![Finding::new(Severity::Critical, "account_missing", "Account not found")],
            )
        }
    };

    if account.owner != SPL_TOKEN_PROGRAM_ID && account.owner != spl_token_2022::id() {
        return ScanResult::new(
            address,
            AccountKind::Unknown,
            vec![Finding::new(
                Severity::Critical,
                "not_token_program",
                format!("Account is owned by {}, not a token program", account.owner),
            )],
        );
    }

    let malformed = |e: crate::error::ToolkitError| {
        ScanResult::new(
            address,
            AccountKind::Unknown,
            vec![Finding::new(Severity::Critical, "malformed_layout", e.to_string())],
        )
    };

    match layout::classify(&account.data) {
        AccountKind::Mint => match layout::parse_mint(&account.data) {
            Ok(mint) => {
                let mut result = ScanResult::new(address, AccountKind::Mint, audit_mint(address, &mint, allow));
                result.mint = Some(mint);
                result
            }
            Err(e) => malformed(e),
        },
        AccountKind::TokenAccount => match layout::parse_token_account(&account.data) {
            Ok(token_account) => {
                let mut result = ScanResult::new(
                    address,
                    AccountKind::TokenAccount,
                    audit_token_account(&token_account),
                );
                result.token_account = Some(token_account);
                result
            }
            Err(e) => malformed(e),
        },
        AccountKind::Unknown => ScanResult::new(
            address,
            AccountKind::Unknown,
            vec![Finding::new(
                Severity::Critical,
                "unknown_layout",
                format!("Unrecognised token program data of {} bytes", account.data.len()),
            )],
        ),
    }
}

/// Fetch and audit one address
pub async fn scan_address(rpc: &dyn LedgerRpc, address: &str, allow: &AllowList) -> ToolkitResult<ScanResult> {
    let pubkey = parse_pubkey(address)?;
    let account = rpc.get_account(&pubkey).await?;
    let result = audit_account(&pubkey.to_string(), account.as_ref(), allow);
    tracing::info!(
        address = %pubkey,
        kind = ?result.kind,
        flagged = result.flagged,
        findings = result.findings.len(),
        "Scanned account"
    );
    Ok(result)
}

/// Scan addresses sequentially through the endpoint pool.
///
/// Addresses that fail to parse or exhaust every endpoint are reported as
/// critical findings instead of aborting the batch.
pub async fn scan_addresses(
    pool: &EndpointPool,
    addresses: &[String],
    allow: &AllowList,
    delay: Duration,
) -> Vec<ScanResult> {
    let mut results = Vec::with_capacity(addresses.len());

    for (index, address) in addresses.iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let outcome = pool
            .run(|rpc| {
                let address = address.clone();
                let allow = allow.clone();
                async move { scan_address(rpc.as_ref(), &address, &allow).await }
            })
            .await;

        results.push(match outcome {
            Ok(found) => found.value,
            Err(e) => ScanResult::new(
                address,
                AccountKind::Unknown,
                vec![Finding::new(Severity::Critical, "scan_failed", e.to_string())],
            ),
        });
    }

    results
}
