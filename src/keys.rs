//! Address parsing, keypair loading and amount checks.
//!
//! Everything here runs before the first RPC call, so bad input is reported
//! without touching the network.

use crate::config::WalletSettings;
use crate::error::{ToolkitError, ToolkitResult};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{keypair_from_seed, read_keypair_file, Keypair},
};
use std::path::Path;
use std::str::FromStr;

/// Parse a base58 address into a canonical public key
pub fn parse_pubkey(input: &str) -> ToolkitResult<Pubkey> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ToolkitError::invalid_address(input, "empty address"));
    }
    Pubkey::from_str(trimmed).map_err(|e| ToolkitError::invalid_address(input, e))
}

/// Parse a secret key given as hex or base58.
///
/// 64 bytes are a full ed25519 keypair, 32 bytes a seed. Only 64 or 128 hex
/// digits are read as hex; anything else is base58.
pub fn keypair_from_secret(secret: &str) -> ToolkitResult<Keypair> {
    let secret = secret.trim();
    let is_hex = matches!(secret.len(), 64 | 128) && secret.chars().all(|c| c.is_ascii_hexdigit());
    let bytes = if is_hex {
        hex::decode(secret).map_err(|e| ToolkitError::InvalidKeypair(e.to_string()))?
    } else {
        bs58::decode(secret)
            .into_vec()
            .map_err(|e| ToolkitError::InvalidKeypair(format!("not hex or base58: {}", e)))?
    };

    match bytes.len() {
        64 => {
            #[allow(deprecated)]
            let keypair = Keypair::from_bytes(&bytes)
                .map_err(|e| ToolkitError::InvalidKeypair(e.to_string()))?;
            Ok(keypair)
        }
        32 => keypair_from_seed(&bytes).map_err(|e| ToolkitError::InvalidKeypair(e.to_string())),
        len => Err(ToolkitError::InvalidKeypair(format!(
            "secret key must be 32 or 64 bytes, got {}",
            len
        ))),
    }
}

/// Load the payer: inline secret key first, keypair file second
pub fn load_payer(wallet: &WalletSettings) -> ToolkitResult<Keypair> {
    if let Some(secret) = wallet.private_key.as_deref().filter(|s| !s.trim().is_empty()) {
        return keypair_from_secret(secret);
    }

    let path = shellexpand::tilde(&wallet.keypair_path).to_string();
    read_keypair_file(&path)
        .map_err(|e| ToolkitError::InvalidKeypair(format!("cannot read keypair file {}: {}", path, e)))
}

/// Accept either an address or a path to a keypair file (the mint authority
/// scripts take both).
pub fn pubkey_or_keypair_file(input: &str) -> ToolkitResult<Pubkey> {
    match parse_pubkey(input) {
        Ok(pubkey) => Ok(pubkey),
        Err(parse_err) => {
            let expanded = shellexpand::tilde(input).to_string();
            match read_keypair_file(&expanded) {
                Ok(keypair) => Ok(solana_sdk::signature::Signer::pubkey(&keypair)),
                Err(_) => Err(parse_err),
            }
        }
    }
}

/// Reject zero amounts before any instruction is built
pub fn validate_amount(amount: u64, what: &str) -> ToolkitResult<u64> {
    if amount == 0 {
        return Err(ToolkitError::InvalidAmount(format!("{} must be greater than zero", what)));
    }
    Ok(amount)
}

/// Convert whole tokens to base units, checking for overflow
pub fn to_base_units(whole_tokens: u64, decimals: u8) -> ToolkitResult<u64> {
    10u64
        .checked_pow(decimals as u32)
        .and_then(|factor| whole_tokens.checked_mul(factor))
        .ok_or_else(|| {
            ToolkitError::InvalidAmount(format!(
                "{} tokens with {} decimals overflows u64",
                whole_tokens, decimals
            ))
        })
}

/// Format base units as a decimal token amount
pub fn format_token_amount(raw: u64, decimals: u8) -> String {
    let digits = raw.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }
    // Any u8 is a valid mint setting, so shift the digits as text
    if digits.len() > decimals {
        let (whole, frac) = digits.split_at(digits.len() - decimals);
        format!("{}.{}", whole, frac)
    } else {
        format!("0.{:0>width$}", digits, width = decimals)
    }
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / 1_000_000_000f64
}

/// Addresses from a text file, one per line. Blank lines and `#` comments
/// are skipped.
pub fn read_address_list(path: &Path) -> ToolkitResult<Vec<String>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
