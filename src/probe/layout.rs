//! SPL Token account layouts, read at fixed offsets.
//!
//! Mint (82 bytes):
//! - mint_authority: COption<Pubkey> (4 byte tag + 32 bytes)
//! - supply: u64
//! - decimals: u8
//! - is_initialized: bool
//! - freeze_authority: COption<Pubkey>
//!
//! Token account (165 bytes):
//! - mint, owner: Pubkey
//! - amount: u64
//! - delegate: COption<Pubkey>
//! - state: u8 (0 uninitialized, 1 initialized, 2 frozen)
//! - is_native: COption<u64>
//! - delegated_amount: u64
//! - close_authority: COption<Pubkey>
//!
//! Token-2022 accounts carrying extensions are longer than 165 bytes and
//! store their account type at byte 165.

use crate::error::{ToolkitError, ToolkitResult};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

pub const MINT_LEN: usize = 82;
pub const TOKEN_ACCOUNT_LEN: usize = 165;

const ACCOUNT_TYPE_OFFSET: usize = TOKEN_ACCOUNT_LEN;
const ACCOUNT_TYPE_MINT: u8 = 1;
const ACCOUNT_TYPE_ACCOUNT: u8 = 2;

/// What the data of a token-program-owned account holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Mint,
    TokenAccount,
    Unknown,
}

/// Decide the layout from data length (and the Token-2022 account type byte)
pub fn classify(data: &[u8]) -> AccountKind {
    match data.len() {
        MINT_LEN => AccountKind::Mint,
        TOKEN_ACCOUNT_LEN => AccountKind::TokenAccount,
        len if len > TOKEN_ACCOUNT_LEN => match data[ACCOUNT_TYPE_OFFSET] {
            ACCOUNT_TYPE_MINT => AccountKind::Mint,
            ACCOUNT_TYPE_ACCOUNT => AccountKind::TokenAccount,
            _ => AccountKind::Unknown,
        },
        _ => AccountKind::Unknown,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintLayout {
    pub mint_authority: Option<String>,
    pub supply: u64,
    pub decimals: u8,
    pub is_initialized: bool,
    pub freeze_authority: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenAccountState {
    Uninitialized,
    Initialized,
    Frozen,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccountLayout {
    pub mint: String,
    pub owner: String,
    pub amount: u64,
    pub delegate: Option<String>,
    pub state: TokenAccountState,
    pub is_native: Option<u64>,
    pub delegated_amount: u64,
    pub close_authority: Option<String>,
}

pub fn parse_mint(data: &[u8]) -> ToolkitResult<MintLayout> {
    if data.len() < MINT_LEN {
        return Err(layout_error(format!(
            "mint data is {} bytes, expected at least {}",
            data.len(),
            MINT_LEN
        )));
    }

    Ok(MintLayout {
        mint_authority: parse_optional_pubkey(&data[0..36])?,
        supply: read_u64(data, 36)?,
        decimals: data[44],
        is_initialized: data[45] != 0,
        freeze_authority: parse_optional_pubkey(&data[46..82])?,
    })
}

pub fn parse_token_account(data: &[u8]) -> ToolkitResult<TokenAccountLayout> {
    if data.len() < TOKEN_ACCOUNT_LEN {
        return Err(layout_error(format!(
            "token account data is {} bytes, expected at least {}",
            data.len(),
            TOKEN_ACCOUNT_LEN
        )));
    }

    let state = match data[108] {
        0 => TokenAccountState::Uninitialized,
        1 => TokenAccountState::Initialized,
        2 => TokenAccountState::Frozen,
        other => return Err(layout_error(format!("unknown account state {}", other))),
    };

    let is_native = match read_u32(data, 109)? {
        0 => None,
        1 => Some(read_u64(data, 113)?),
        tag => return Err(layout_error(format!("invalid option tag {}", tag))),
    };

    Ok(TokenAccountLayout {
        mint: read_pubkey(data, 0)?.to_string(),
        owner: read_pubkey(data, 32)?.to_string(),
        amount: read_u64(data, 64)?,
        delegate: parse_optional_pubkey(&data[72..108])?,
        state,
        is_native,
        delegated_amount: read_u64(data, 121)?,
        close_authority: parse_optional_pubkey(&data[129..165])?,
    })
}

/// Parse a COption<Pubkey>: 4 byte tag (0 = None, 1 = Some) then 32 bytes
fn parse_optional_pubkey(data: &[u8]) -> ToolkitResult<Option<String>> {
    match read_u32(data, 0)? {
        0 => Ok(None),
        1 => Ok(Some(read_pubkey(data, 4)?.to_string())),
        tag => Err(layout_error(format!("invalid option tag {}", tag))),
    }
}

fn read_pubkey(data: &[u8], offset: usize) -> ToolkitResult<Pubkey> {
    let bytes: [u8; 32] = slice(data, offset, 32)?
        .try_into()
        .map_err(|_| layout_error("short pubkey"))?;
    Ok(Pubkey::new_from_array(bytes))
}

fn read_u64(data: &[u8], offset: usize) -> ToolkitResult<u64> {
    let bytes: [u8; 8] = slice(data, offset, 8)?
        .try_into()
        .map_err(|_| layout_error("short u64"))?;
    Ok(u64::from_le_bytes(bytes))
}

fn read_u32(data: &[u8], offset: usize) -> ToolkitResult<u32> {
    let bytes: [u8; 4] = slice(data, offset, 4)?
        .try_into()
        .map_err(|_| layout_error("short u32"))?;
    Ok(u32::from_le_bytes(bytes))
}

fn slice(data: &[u8], offset: usize, len: usize) -> ToolkitResult<&[u8]> {
    data.get(offset..offset + len)
        .ok_or_else(|| layout_error(format!("read of {} bytes at offset {} out of range", len, offset)))
}

fn layout_error(message: impl Into<String>) -> ToolkitError {
    ToolkitError::VerificationFailed(format!("malformed token layout: {}", message.into()))
}

/// Serialize a mint into its 82-byte layout
pub fn encode_mint(layout: &MintLayout) -> ToolkitResult<Vec<u8>> {
    let mut data = vec![0u8; MINT_LEN];
    write_optional_pubkey(&mut data[0..36], layout.mint_authority.as_deref())?;
    data[36..44].copy_from_slice(&layout.supply.to_le_bytes());
    data[44] = layout.decimals;
    data[45] = layout.is_initialized as u8;
    write_optional_pubkey(&mut data[46..82], layout.freeze_authority.as_deref())?;
    Ok(data)
}

/// Serialize a token account into its 165-byte layout
pub fn encode_token_account(layout: &TokenAccountLayout) -> ToolkitResult<Vec<u8>> {
    let mut data = vec![0u8; TOKEN_ACCOUNT_LEN];
    data[0..32].copy_from_slice(crate::keys::parse_pubkey(&layout.mint)?.as_ref());
    data[32..64].copy_from_slice(crate::keys::parse_pubkey(&layout.owner)?.as_ref());
    data[64..72].copy_from_slice(&layout.amount.to_le_bytes());
    write_optional_pubkey(&mut data[72..108], layout.delegate.as_deref())?;
    data[108] = match layout.state {
        TokenAccountState::Uninitialized => 0,
        TokenAccountState::Initialized => 1,
        TokenAccountState::Frozen => 2,
    };
    if let Some(rent_reserve) = layout.is_native {
        data[109..113].copy_from_slice(&1u32.to_le_bytes());
        data[113..121].copy_from_slice(&rent_reserve.to_le_bytes());
    }
    data[121..129].copy_from_slice(&layout.delegated_amount.to_le_bytes());
    write_optional_pubkey(&mut data[129..165], layout.close_authority.as_deref())?;
    Ok(data)
}

fn write_optional_pubkey(dest: &mut [u8], value: Option<&str>) -> ToolkitResult<()> {
    if let Some(address) = value {
        let pubkey = crate::keys::parse_pubkey(address)?;
        dest[0..4].copy_from_slice(&1u32.to_le_bytes());
        dest[4..36].copy_from_slice(pubkey.as_ref());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mint() -> MintLayout {
        MintLayout {
            mint_authority: Some(Pubkey::new_unique().to_string()),
            supply: 1_000_000,
            decimals: 6,
            is_initialized: true,
            freeze_authority: None,
        }
    }

    #[test]
    fn test_parse_mint_fields() {
        let mint = sample_mint();
        let data = encode_mint(&mint).unwrap();
        assert_eq!(data.len(), MINT_LEN);
        assert_eq!(parse_mint(&data).unwrap(), mint);
    }

    #[test]
    fn test_parse_mint_rejects_short_data() {
        assert!(parse_mint(&[0u8; 40]).is_err());
    }

    #[test]
    fn test_parse_optional_pubkey_none() {
        let data = [0u8; 36];
        assert!(parse_optional_pubkey(&data).unwrap().is_none());
    }

    #[test]
    fn test_parse_optional_pubkey_bad_tag() {
        let mut data = [0u8; 36];
        data[0] = 7;
        assert!(parse_optional_pubkey(&data).is_err());
    }

    #[test]
    fn test_parse_token_account_fields() {
        let account = TokenAccountLayout {
            mint: Pubkey::new_unique().to_string(),
            owner: Pubkey::new_unique().to_string(),
            amount: 42,
            delegate: Some(Pubkey::new_unique().to_string()),
            state: TokenAccountState::Frozen,
            is_native: None,
            delegated_amount: 10,
            close_authority: None,
        };
        let data = encode_token_account(&account).unwrap();
        assert_eq!(parse_token_account(&data).unwrap(), account);
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(&[0u8; MINT_LEN]), AccountKind::Mint);
        assert_eq!(classify(&[0u8; TOKEN_ACCOUNT_LEN]), AccountKind::TokenAccount);
        assert_eq!(classify(&[0u8; 10]), AccountKind::Unknown);

        let mut extended = vec![0u8; 234];
        extended[ACCOUNT_TYPE_OFFSET] = ACCOUNT_TYPE_MINT;
        assert_eq!(classify(&extended), AccountKind::Mint);
        extended[ACCOUNT_TYPE_OFFSET] = ACCOUNT_TYPE_ACCOUNT;
        assert_eq!(classify(&extended), AccountKind::TokenAccount);
    }
}
