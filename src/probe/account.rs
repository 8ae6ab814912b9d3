//! Account existence and balance checks.

use crate::error::ToolkitResult;
use crate::keys::{lamports_to_sol, parse_pubkey};
use crate::rpc::{EndpointPool, LedgerRpc};
use serde::{Deserialize, Serialize};
use solana_sdk::{account::Account, pubkey::Pubkey};
use std::time::Duration;

/// Result of looking up one address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountCheck {
    pub address: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lamports: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AccountCheck {
    fn missing(address: &str, error: impl Into<String>) -> Self {
        Self {
            address: address.to_string(),
            exists: false,
            lamports: None,
            owner: None,
            data_size: None,
            executable: None,
            error: Some(error.into()),
        }
    }
}

/// Look up an address. Parse failures, RPC failures and missing accounts
/// all come back as `exists: false` with the reason in `error`.
pub async fn check_account(rpc: &dyn LedgerRpc, address: &str) -> AccountCheck {
    let pubkey = match parse_pubkey(address) {
        Ok(pubkey) => pubkey,
        Err(e) => return AccountCheck::missing(address, e.to_string()),
    };

    match rpc.get_account(&pubkey).await {
        Ok(account) => from_lookup(&pubkey, account),
        Err(e) => {
            tracing::warn!(address = %pubkey, error = %e, "Account lookup failed");
            AccountCheck::missing(&pubkey.to_string(), e.to_string())
        }
    }
}

fn from_lookup(pubkey: &Pubkey, account: Option<Account>) -> AccountCheck {
    match account {
        Some(account) => {
            tracing::debug!(address = %pubkey, lamports = account.lamports, "Account found");
            AccountCheck {
                address: pubkey.to_string(),
                exists: true,
                lamports: Some(account.lamports),
                owner: Some(account.owner.to_string()),
                data_size: Some(account.data.len()),
                executable: Some(account.executable),
                error: None,
            }
        }
        None => {
            tracing::debug!(address = %pubkey, "Account not found");
            AccountCheck::missing(&pubkey.to_string(), "Account not found")
        }
    }
}

/// Check a list of addresses sequentially, pausing between requests.
/// Each lookup goes through the endpoint pool.
pub async fn check_accounts(pool: &EndpointPool, addresses: &[String], delay: Duration) -> Vec<AccountCheck> {
    let mut results = Vec::with_capacity(addresses.len());

    for (index, address) in addresses.iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let check = match parse_pubkey(address) {
            Err(e) => AccountCheck::missing(address, e.to_string()),
            Ok(_) => match pool
                .run(|rpc| {
                    let address = address.clone();
                    async move { lookup(rpc.as_ref(), &address).await }
                })
                .await
            {
                Ok(found) => found.value,
                Err(e) => AccountCheck::missing(address, e.to_string()),
            },
        };
        results.push(check);
    }

    results
}

/// Like `check_account`, but keeps transport errors as errors so the
/// endpoint pool can retry them.
async fn lookup(rpc: &dyn LedgerRpc, address: &str) -> ToolkitResult<AccountCheck> {
    let pubkey = parse_pubkey(address)?;
    let account = rpc.get_account(&pubkey).await?;
    Ok(from_lookup(&pubkey, account))
}

/// Summary counts for a batch of checks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckSummary {
    pub total: usize,
    pub found: usize,
    pub success_rate: f64,
}

pub fn summarize(checks: &[AccountCheck]) -> CheckSummary {
    let total = checks.len();
    let found = checks.iter().filter(|c| c.exists).count();
    let success_rate = if total == 0 {
        0.0
    } else {
        found as f64 / total as f64 * 100.0
    };
    CheckSummary {
        total,
        found,
        success_rate,
    }
}

/// Payer (and optional target) balance report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceReport {
    pub endpoint: String,
    pub payer: String,
    pub payer_lamports: u64,
    pub payer_sol: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_lamports: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_sol: Option<f64>,
    pub payer_account: AccountCheck,
}

pub async fn check_balance(
    rpc: &dyn LedgerRpc,
    payer: &Pubkey,
    target: Option<&str>,
) -> ToolkitResult<BalanceReport> {
    let payer_lamports = rpc.get_balance(payer).await?;
    tracing::info!(payer = %payer, lamports = payer_lamports, "Payer balance");

    let target = target.map(parse_pubkey).transpose()?;
    let target_lamports = match &target {
        Some(target) => Some(rpc.get_balance(target).await?),
        None => None,
    };

    let payer_account = check_account(rpc, &payer.to_string()).await;

    Ok(BalanceReport {
        endpoint: rpc.endpoint().to_string(),
        payer: payer.to_string(),
        payer_lamports,
        payer_sol: lamports_to_sol(payer_lamports),
        target: target.map(|t| t.to_string()),
        target_lamports,
        target_sol: target_lamports.map(lamports_to_sol),
        payer_account,
    })
}
