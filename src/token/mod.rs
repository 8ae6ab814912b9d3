//! SPL token creation and follow-up operations.

pub mod creator;
pub mod instructions;

pub use creator::{save_token_record, TokenCreator};

use crate::error::{ToolkitError, ToolkitResult};
use crate::keys::{to_base_units, validate_amount};
use chrono::{DateTime, Utc};
use instructions::MAX_DECIMALS;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Descriptive token metadata, stored next to `TokenInfo`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<String>,
}

/// A freshly created and verified token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub mint_address: String,
    /// Payer's associated token account holding the initial supply
    pub token_account: String,
    pub decimals: u8,
    /// Whole tokens
    pub total_supply: u64,
    /// Base units (`total_supply * 10^decimals`)
    pub raw_supply: u64,
    pub mint_authority: String,
    pub freeze_authority: Option<String>,
    pub token_program: String,
    pub signatures: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// `TokenInfo` plus metadata, as written to the token file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token_info: TokenInfo,
    pub metadata: TokenMetadata,
}

impl TokenRecord {
    /// `<SYMBOL>_<first 8 chars of mint>.json`
    pub fn file_name(&self) -> String {
        let mint_prefix: String = self.token_info.mint_address.chars().take(8).collect();
        let symbol = if self.metadata.symbol.trim().is_empty() {
            "TOKEN".to_string()
        } else {
            self.metadata.symbol.trim().to_uppercase()
        };
        format!("{}_{}.json", symbol, mint_prefix)
    }
}

/// Outcome of mint-to, transfer, burn and revoke flows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    pub signatures: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationResult {
    pub fn succeeded(signatures: Vec<String>, amount: Option<u64>) -> Self {
        Self {
            success: true,
            signatures,
            amount,
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            signatures: Vec::new(),
            amount: None,
            error: Some(error.to_string()),
        }
    }
}

impl<E: ToString> From<Result<OperationResult, E>> for OperationResult {
    fn from(result: Result<OperationResult, E>) -> Self {
        result.unwrap_or_else(OperationResult::failed)
    }
}

/// Inputs for the mint-and-verify sequence
#[derive(Debug, Clone)]
pub struct CreateTokenParams {
    pub metadata: TokenMetadata,
    pub decimals: u8,
    /// Whole tokens minted to the payer
    pub initial_supply: u64,
    /// Defaults to the payer. When set, authority is handed over after the
    /// initial supply is minted.
    pub mint_authority: Option<Pubkey>,
    pub freeze_authority: Option<Pubkey>,
}

impl CreateTokenParams {
    /// Check decimals and supply without touching the network. Returns the
    /// initial supply in base units.
    pub fn validate(&self) -> ToolkitResult<u64> {
        if self.decimals > MAX_DECIMALS {
            return Err(ToolkitError::InvalidAmount(format!(
                "decimals must be at most {}, got {}",
                MAX_DECIMALS, self.decimals
            )));
        }
        validate_amount(self.initial_supply, "initial supply")?;
        to_base_units(self.initial_supply, self.decimals)
    }
}

/// Mint authorities that can be revoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityKind {
    Mint,
    Freeze,
}

impl std::fmt::Display for AuthorityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthorityKind::Mint => write!(f, "mint"),
            AuthorityKind::Freeze => write!(f, "freeze"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(symbol: &str) -> TokenRecord {
        TokenRecord {
            token_info: TokenInfo {
                mint_address: "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU".into(),
                token_account: Pubkey::new_unique().to_string(),
                decimals: 9,
                total_supply: 1,
                raw_supply: 1_000_000_000,
                mint_authority: Pubkey::new_unique().to_string(),
                freeze_authority: None,
                token_program: crate::config::SPL_TOKEN_PROGRAM_ID.to_string(),
                signatures: vec![],
                created_at: Utc::now(),
            },
            metadata: TokenMetadata {
                symbol: symbol.into(),
                ..Default::default()
            },
        }
    }

    fn create_params(initial_supply: u64, decimals: u8) -> CreateTokenParams {
        CreateTokenParams {
            metadata: TokenMetadata::default(),
            decimals,
            initial_supply,
            mint_authority: None,
            freeze_authority: None,
        }
    }

    #[test]
    fn test_create_params_validation() {
        assert_eq!(create_params(1_000, 6).validate().unwrap(), 1_000_000_000);
        assert_eq!(create_params(3, 0).validate().unwrap(), 3);

        for params in [create_params(0, 9), create_params(u64::MAX, 9), create_params(1, 20)] {
            assert!(matches!(params.validate(), Err(ToolkitError::InvalidAmount(_))));
        }
    }

    #[test]
    fn test_file_name() {
        assert_eq!(record("gem").file_name(), "GEM_7xKXtg2C.json");
        assert_eq!(record(" ").file_name(), "TOKEN_7xKXtg2C.json");
    }

    #[test]
    fn test_operation_result_from_error() {
        let failed: OperationResult =
            Err::<OperationResult, _>(ToolkitError::InvalidAmount("zero".into())).into();
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("Invalid amount: zero"));

        let json = serde_json::to_value(OperationResult::succeeded(vec!["sig".into()], Some(5))).unwrap();
        assert_eq!(json["success"], serde_json::json!(true));
        assert!(json.get("error").is_none());
    }
}
