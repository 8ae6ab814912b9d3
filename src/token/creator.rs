//! Token creation and management against a single RPC endpoint.
//!
//! A `TokenCreator` is bound to one endpoint for its whole life: the
//! mint-and-verify sequence submits several dependent transactions and must
//! not be split across endpoints.

use super::instructions;
use super::{AuthorityKind, CreateTokenParams, OperationResult, TokenInfo, TokenRecord};
use crate::config::Settings;
use crate::error::{ToolkitError, ToolkitResult};
use crate::keys::{format_token_amount, load_payer, parse_pubkey, validate_amount};
use crate::probe::layout::{parse_mint, MINT_LEN};
use crate::report;
use crate::rpc::{LedgerRpc, TokenAmount};
use chrono::Utc;
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct TokenCreator {
    rpc: Arc<dyn LedgerRpc>,
    payer: Keypair,
    program_id: Pubkey,
    min_balance_lamports: u64,
}

impl TokenCreator {
    pub fn new(rpc: Arc<dyn LedgerRpc>, payer: Keypair, program_id: Pubkey) -> Self {
        Self {
            rpc,
            payer,
            program_id,
            min_balance_lamports: 0,
        }
    }

    /// Payer, token program and balance floor from the settings
    pub fn from_settings(settings: &Settings, rpc: Arc<dyn LedgerRpc>) -> ToolkitResult<Self> {
        let payer = load_payer(&settings.wallet)?;
        Ok(Self::new(rpc, payer, settings.token_program_id())
            .with_min_balance(settings.min_balance_lamports()))
    }

    /// Refuse to create tokens when the payer holds fewer lamports
    pub fn with_min_balance(mut self, lamports: u64) -> Self {
        self.min_balance_lamports = lamports;
        self
    }

    pub fn payer(&self) -> Pubkey {
        self.payer.pubkey()
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    pub fn endpoint(&self) -> &str {
        self.rpc.endpoint()
    }

    /// Create a mint, mint the initial supply to the payer's ATA and check
    /// the supply on chain.
    pub async fn create_token(&self, params: &CreateTokenParams) -> ToolkitResult<TokenInfo> {
        let raw_supply = params.validate()?;

        let payer = self.payer.pubkey();
        let balance = self.rpc.get_balance(&payer).await?;
        if balance < self.min_balance_lamports {
            return Err(ToolkitError::InsufficientBalance {
                have: balance,
                need: self.min_balance_lamports,
            });
        }
        tracing::info!(payer = %payer, lamports = balance, endpoint = self.rpc.endpoint(), "Creating token");

        let rent = self.rpc.get_minimum_balance_for_rent_exemption(MINT_LEN).await?;
        let mint_keypair = Keypair::new();
        let mint = mint_keypair.pubkey();
        let mut signatures = Vec::new();

        let create_ixs = instructions::create_mint(
            &payer,
            &mint,
            rent,
            &payer,
            params.freeze_authority.as_ref(),
            params.decimals,
            &self.program_id,
        )?;
        let signature = self.send(&create_ixs, &[&mint_keypair]).await?;
        tracing::info!(mint = %mint, signature = %signature, "Mint initialized");
        signatures.push(signature.to_string());

        let token_account = instructions::associated_token_address(&payer, &mint, &self.program_id);
        let mint_ixs = instructions::mint_to(
            &payer,
            &mint,
            &payer,
            &payer,
            raw_supply,
            params.decimals,
            &self.program_id,
        )?;
        let signature = self.send(&mint_ixs, &[]).await?;
        tracing::info!(token_account = %token_account, raw_supply, signature = %signature, "Initial supply minted");
        signatures.push(signature.to_string());

        let mint_authority = match params.mint_authority {
            Some(authority) if authority != payer => {
                let ix = instructions::set_mint_authority(
                    &mint,
                    &payer,
                    Some(&authority),
                    AuthorityKind::Mint,
                    &self.program_id,
                )?;
                let signature = self.send(&[ix], &[]).await?;
                tracing::info!(authority = %authority, signature = %signature, "Mint authority handed over");
                signatures.push(signature.to_string());
                authority
            }
            _ => payer,
        };

        let supply = self.rpc.get_token_supply(&mint).await?;
        if supply.amount != raw_supply {
            return Err(ToolkitError::VerificationFailed(format!(
                "mint {} reports supply {} but {} was minted",
                mint, supply.amount, raw_supply
            )));
        }
        tracing::info!(mint = %mint, supply = %supply.ui_amount_string, "Supply verified");

        Ok(TokenInfo {
            mint_address: mint.to_string(),
            token_account: token_account.to_string(),
            decimals: params.decimals,
            total_supply: params.initial_supply,
            raw_supply,
            mint_authority: mint_authority.to_string(),
            freeze_authority: params.freeze_authority.map(|a| a.to_string()),
            token_program: self.program_id.to_string(),
            signatures,
            created_at: Utc::now(),
        })
    }

    /// Mint `amount` base units to `destination` (the payer by default)
    pub async fn mint_additional(
        &self,
        mint: &str,
        amount: u64,
        destination: Option<&str>,
    ) -> ToolkitResult<OperationResult> {
        validate_amount(amount, "mint amount")?;
        let mint = parse_pubkey(mint)?;
        let payer = self.payer.pubkey();
        let owner = destination.map(parse_pubkey).transpose()?.unwrap_or(payer);

        let decimals = self.mint_decimals(&mint).await?;
        let ixs = instructions::mint_to(&payer, &mint, &owner, &payer, amount, decimals, &self.program_id)?;
        let signature = self.send(&ixs, &[]).await?;
        tracing::info!(
            mint = %mint,
            owner = %owner,
            amount = %format_token_amount(amount, decimals),
            signature = %signature,
            "Minted additional tokens"
        );
        Ok(OperationResult::succeeded(vec![signature.to_string()], Some(amount)))
    }

    /// Transfer `amount` base units from the payer to `recipient`
    pub async fn transfer(
        &self,
        mint: &str,
        recipient: &str,
        amount: u64,
        memo: Option<&str>,
    ) -> ToolkitResult<OperationResult> {
        validate_amount(amount, "transfer amount")?;
        let mint = parse_pubkey(mint)?;
        let recipient = parse_pubkey(recipient)?;
        let payer = self.payer.pubkey();

        let decimals = self.mint_decimals(&mint).await?;
        let ixs = instructions::transfer(&payer, &mint, &recipient, amount, decimals, memo, &self.program_id)?;
        let signature = self.send(&ixs, &[]).await?;
        tracing::info!(mint = %mint, recipient = %recipient, amount, signature = %signature, "Transferred tokens");
        Ok(OperationResult::succeeded(vec![signature.to_string()], Some(amount)))
    }

    /// Burn `amount` base units from the payer's ATA
    pub async fn burn(&self, mint: &str, amount: u64) -> ToolkitResult<OperationResult> {
        validate_amount(amount, "burn amount")?;
        let mint = parse_pubkey(mint)?;
        let payer = self.payer.pubkey();

        let decimals = self.mint_decimals(&mint).await?;
        let ix = instructions::burn(&payer, &mint, amount, decimals, &self.program_id)?;
        let signature = self.send(&[ix], &[]).await?;
        tracing::info!(mint = %mint, amount, signature = %signature, "Burned tokens");
        Ok(OperationResult::succeeded(vec![signature.to_string()], Some(amount)))
    }

    /// Permanently remove the mint or freeze authority
    pub async fn revoke_authority(&self, mint: &str, kind: AuthorityKind) -> ToolkitResult<OperationResult> {
        let mint = parse_pubkey(mint)?;
        let ix = instructions::set_mint_authority(&mint, &self.payer.pubkey(), None, kind, &self.program_id)?;
        let signature = self.send(&[ix], &[]).await?;
        tracing::info!(mint = %mint, authority = %kind, signature = %signature, "Authority revoked");
        Ok(OperationResult::succeeded(vec![signature.to_string()], None))
    }

    /// Balance of `owner`'s ATA for `mint`; zero when the ATA does not exist
    pub async fn token_balance(&self, mint: &str, owner: &str) -> ToolkitResult<TokenAmount> {
        let mint = parse_pubkey(mint)?;
        let owner = parse_pubkey(owner)?;
        let ata = instructions::associated_token_address(&owner, &mint, &self.program_id);

        if self.rpc.get_account(&ata).await?.is_none() {
            let decimals = self.mint_decimals(&mint).await?;
            tracing::debug!(ata = %ata, "Associated token account does not exist");
            return Ok(TokenAmount {
                amount: 0,
                decimals,
                ui_amount_string: "0".to_string(),
            });
        }
        self.rpc.get_token_account_balance(&ata).await
    }

    async fn mint_decimals(&self, mint: &Pubkey) -> ToolkitResult<u8> {
        let account = self
            .rpc
            .get_account(mint)
            .await?
            .ok_or_else(|| ToolkitError::AccountNotFound(mint.to_string()))?;
        Ok(parse_mint(&account.data)?.decimals)
    }

    async fn send(&self, ixs: &[Instruction], extra_signers: &[&Keypair]) -> ToolkitResult<Signature> {
        let blockhash = self.rpc.get_latest_blockhash().await?;
        let mut signers: Vec<&dyn Signer> = vec![&self.payer];
        signers.extend(extra_signers.iter().map(|k| *k as &dyn Signer));

        let transaction =
            Transaction::new_signed_with_payer(ixs, Some(&self.payer.pubkey()), &signers, blockhash);
        self.rpc.send_and_confirm(&transaction).await
    }
}

/// Write the token file as `<dir>/<SYMBOL>_<mint8>.json`
pub fn save_token_record(dir: &Path, record: &TokenRecord) -> ToolkitResult<PathBuf> {
    let path = dir.join(record.file_name());
    report::write_json(&path, record)?;
    tracing::info!(path = %path.display(), "Token info saved");
    Ok(path)
}
