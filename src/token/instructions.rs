//! Instruction builders for the token flows.
//!
//! Amounts are checked here, so a zero amount never reaches an RPC call.
//! The `spl_token_2022` builders accept both the classic SPL Token program
//! and Token-2022 as `program_id`.

use super::AuthorityKind;
use crate::error::{ToolkitError, ToolkitResult};
use crate::keys::validate_amount;
use crate::probe::layout::MINT_LEN;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use spl_associated_token_account::{
    get_associated_token_address_with_program_id,
    instruction::create_associated_token_account_idempotent,
};
use spl_token_2022::instruction::{self as token_instruction, AuthorityType};

/// Largest decimals value for which `10^decimals` fits in u64
pub const MAX_DECIMALS: u8 = 19;

pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey, program_id: &Pubkey) -> Pubkey {
    get_associated_token_address_with_program_id(owner, mint, program_id)
}

/// `create_account` + `initialize_mint2` for a new mint
pub fn create_mint(
    payer: &Pubkey,
    mint: &Pubkey,
    rent_lamports: u64,
    mint_authority: &Pubkey,
    freeze_authority: Option<&Pubkey>,
    decimals: u8,
    program_id: &Pubkey,
) -> ToolkitResult<Vec<Instruction>> {
    if decimals > MAX_DECIMALS {
        return Err(ToolkitError::InvalidAmount(format!(
            "decimals must be at most {}, got {}",
            MAX_DECIMALS, decimals
        )));
    }

    let create = solana_system_interface::instruction::create_account(
        payer,
        mint,
        rent_lamports,
        MINT_LEN as u64,
        program_id,
    );
    let initialize = token_instruction::initialize_mint2(
        program_id,
        mint,
        mint_authority,
        freeze_authority,
        decimals,
    )
    .map_err(instruction_error)?;

    Ok(vec![create, initialize])
}

/// Idempotent ATA creation for `owner` + `mint_to_checked` into it
pub fn mint_to(
    payer: &Pubkey,
    mint: &Pubkey,
    owner: &Pubkey,
    authority: &Pubkey,
    amount: u64,
    decimals: u8,
    program_id: &Pubkey,
) -> ToolkitResult<Vec<Instruction>> {
    validate_amount(amount, "mint amount")?;
    let destination = associated_token_address(owner, mint, program_id);

    let create_ata = create_associated_token_account_idempotent(payer, owner, mint, program_id);
    let mint_ix = token_instruction::mint_to_checked(
        program_id,
        mint,
        &destination,
        authority,
        &[],
        amount,
        decimals,
    )
    .map_err(instruction_error)?;

    Ok(vec![create_ata, mint_ix])
}

/// `transfer_checked` between the ATAs of `owner` and `recipient`, creating
/// the recipient's ATA if needed. An optional memo is attached.
pub fn transfer(
    owner: &Pubkey,
    mint: &Pubkey,
    recipient: &Pubkey,
    amount: u64,
    decimals: u8,
    memo: Option<&str>,
    program_id: &Pubkey,
) -> ToolkitResult<Vec<Instruction>> {
    validate_amount(amount, "transfer amount")?;
    let source = associated_token_address(owner, mint, program_id);
    let destination = associated_token_address(recipient, mint, program_id);

    let mut instructions = vec![create_associated_token_account_idempotent(
        owner, recipient, mint, program_id,
    )];
    instructions.push(
        token_instruction::transfer_checked(
            program_id,
            &source,
            mint,
            &destination,
            owner,
            &[],
            amount,
            decimals,
        )
        .map_err(instruction_error)?,
    );
    if let Some(memo) = memo.filter(|m| !m.is_empty()) {
        instructions.push(spl_memo::build_memo(memo.as_bytes(), &[owner]));
    }

    Ok(instructions)
}

/// `burn_checked` from the owner's ATA
pub fn burn(
    owner: &Pubkey,
    mint: &Pubkey,
    amount: u64,
    decimals: u8,
    program_id: &Pubkey,
) -> ToolkitResult<Instruction> {
    validate_amount(amount, "burn amount")?;
    let account = associated_token_address(owner, mint, program_id);
    token_instruction::burn_checked(program_id, &account, mint, owner, &[], amount, decimals)
        .map_err(instruction_error)
}

/// `set_authority` on the mint; `None` revokes
pub fn set_mint_authority(
    mint: &Pubkey,
    current: &Pubkey,
    new_authority: Option<&Pubkey>,
    kind: AuthorityKind,
    program_id: &Pubkey,
) -> ToolkitResult<Instruction> {
    let authority_type = match kind {
        AuthorityKind::Mint => AuthorityType::MintTokens,
        AuthorityKind::Freeze => AuthorityType::FreezeAccount,
    };
    token_instruction::set_authority(program_id, mint, new_authority, authority_type, current, &[])
        .map_err(instruction_error)
}

fn instruction_error(err: impl std::fmt::Display) -> ToolkitError {
    ToolkitError::Instruction(err.to_string())
}
