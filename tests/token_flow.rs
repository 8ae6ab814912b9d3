mod common;

use common::{pool_over, MockLedger};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use token_toolkit::config::SPL_TOKEN_PROGRAM_ID;
use token_toolkit::error::ToolkitError;
use token_toolkit::probe::{audit_account, AllowList};
use token_toolkit::report;
use token_toolkit::token::instructions::{self, associated_token_address};
use token_toolkit::token::{
    save_token_record, AuthorityKind, CreateTokenParams, TokenCreator, TokenMetadata, TokenRecord,
};

const ONE_SOL: u64 = 1_000_000_000;

fn params(supply: u64, decimals: u8) -> CreateTokenParams {
    CreateTokenParams {
        metadata: TokenMetadata {
            name: "Test Token".into(),
            symbol: "TEST".into(),
            description: "integration test token".into(),
            image_url: String::new(),
            ..Default::default()
        },
        decimals,
        initial_supply: supply,
        mint_authority: None,
        freeze_authority: None,
    }
}

fn funded_creator(program_id: Pubkey) -> (std::sync::Arc<MockLedger>, TokenCreator) {
    let ledger = MockLedger::new("http://mock-primary");
    let payer = Keypair::new();
    ledger.set_balance(payer.pubkey(), ONE_SOL);
    let creator = TokenCreator::new(ledger.clone(), payer, program_id).with_min_balance(ONE_SOL / 100);
    (ledger, creator)
}

#[tokio::test]
async fn test_create_token_mints_and_verifies_supply() {
    let (ledger, creator) = funded_creator(SPL_TOKEN_PROGRAM_ID);
    let payer = creator.payer();

    let info = creator.create_token(&params(1_000, 6)).await.unwrap();

    let mint: Pubkey = info.mint_address.parse().unwrap();
    assert_ne!(mint, payer);
    assert_eq!(info.raw_supply, 1_000_000_000);
    assert_eq!(info.total_supply, 1_000);
    assert_eq!(info.mint_authority, payer.to_string());
    assert_eq!(info.signatures.len(), 2);
    assert_eq!(info.token_account, associated_token_address(&payer, &mint, &SPL_TOKEN_PROGRAM_ID).to_string());

    let layout = ledger.mint(&mint).unwrap();
    assert!(layout.is_initialized);
    assert_eq!(layout.decimals, 6);
    assert_eq!(layout.supply, 1_000_000_000);

    let ata: Pubkey = info.token_account.parse().unwrap();
    assert_eq!(ledger.token_account(&ata).unwrap().amount, 1_000_000_000);

    let calls = ledger.calls();
    assert_eq!(calls.first().map(String::as_str), Some("getBalance"));
    assert_eq!(calls.last().map(String::as_str), Some("getTokenSupply"));
}

#[tokio::test]
async fn test_create_token_with_token_2022() {
    let (ledger, creator) = funded_creator(spl_token_2022::id());
    let info = creator.create_token(&params(10, 9)).await.unwrap();

    let mint: Pubkey = info.mint_address.parse().unwrap();
    assert_eq!(ledger.account(&mint).unwrap().owner, spl_token_2022::id());
    assert_eq!(info.token_program, spl_token_2022::id().to_string());
}

#[tokio::test]
async fn test_create_token_hands_over_mint_authority() {
    let (ledger, creator) = funded_creator(SPL_TOKEN_PROGRAM_ID);
    let authority = Pubkey::new_unique();
    let freeze = Pubkey::new_unique();
    let mut params = params(5, 0);
    params.mint_authority = Some(authority);
    params.freeze_authority = Some(freeze);

    let info = creator.create_token(&params).await.unwrap();
    assert_eq!(info.signatures.len(), 3);
    assert_eq!(info.mint_authority, authority.to_string());

    let layout = ledger.mint(&info.mint_address.parse().unwrap()).unwrap();
    assert_eq!(layout.mint_authority, Some(authority.to_string()));
    assert_eq!(layout.freeze_authority, Some(freeze.to_string()));
    assert_eq!(layout.supply, 5);
}

#[tokio::test]
async fn test_zero_amounts_make_no_rpc_calls() {
    let (ledger, creator) = funded_creator(SPL_TOKEN_PROGRAM_ID);
    let mint = Pubkey::new_unique().to_string();
    let recipient = Pubkey::new_unique().to_string();

    let err = creator.create_token(&params(0, 9)).await.unwrap_err();
    assert!(matches!(err, ToolkitError::InvalidAmount(_)));
    assert!(matches!(
        creator.mint_additional(&mint, 0, None).await,
        Err(ToolkitError::InvalidAmount(_))
    ));
    assert!(matches!(
        creator.transfer(&mint, &recipient, 0, None).await,
        Err(ToolkitError::InvalidAmount(_))
    ));
    assert!(matches!(creator.burn(&mint, 0).await, Err(ToolkitError::InvalidAmount(_))));

    assert!(ledger.calls().is_empty());
}

#[tokio::test]
async fn test_supply_overflow_is_rejected_before_rpc() {
    let (ledger, creator) = funded_creator(SPL_TOKEN_PROGRAM_ID);
    let err = creator.create_token(&params(u64::MAX, 9)).await.unwrap_err();
    assert!(matches!(err, ToolkitError::InvalidAmount(_)));
    assert!(ledger.calls().is_empty());
}

#[tokio::test]
async fn test_insufficient_balance_sends_nothing() {
    let ledger = MockLedger::new("http://mock-primary");
    let creator = TokenCreator::new(ledger.clone(), Keypair::new(), SPL_TOKEN_PROGRAM_ID).with_min_balance(ONE_SOL);

    let err = creator.create_token(&params(1, 9)).await.unwrap_err();
    assert!(matches!(err, ToolkitError::InsufficientBalance { have: 0, need: ONE_SOL }));
    assert_eq!(ledger.calls(), vec!["getBalance".to_string()]);
}

#[tokio::test]
async fn test_token_lifecycle() {
    let (ledger, creator) = funded_creator(SPL_TOKEN_PROGRAM_ID);
    let payer = creator.payer();
    let info = creator.create_token(&params(1_000, 2)).await.unwrap();
    let mint = info.mint_address.clone();
    let recipient = Pubkey::new_unique();

    let minted = creator.mint_additional(&mint, 500, None).await.unwrap();
    assert!(minted.success);
    assert_eq!(minted.amount, Some(500));

    let sent = creator
        .transfer(&mint, &recipient.to_string(), 100, Some("payment"))
        .await
        .unwrap();
    assert_eq!(sent.signatures.len(), 1);

    creator.burn(&mint, 50).await.unwrap();

    let payer_balance = creator.token_balance(&mint, &payer.to_string()).await.unwrap();
    assert_eq!(payer_balance.amount, 100_000 + 500 - 100 - 50);
    assert_eq!(payer_balance.decimals, 2);

    let recipient_balance = creator.token_balance(&mint, &recipient.to_string()).await.unwrap();
    assert_eq!(recipient_balance.amount, 100);

    let stranger = creator
        .token_balance(&mint, &Pubkey::new_unique().to_string())
        .await
        .unwrap();
    assert_eq!(stranger.amount, 0);

    let mint_key: Pubkey = mint.parse().unwrap();
    assert_eq!(ledger.mint(&mint_key).unwrap().supply, 100_000 + 500 - 50);

    let before = audit_account(&mint, ledger.account(&mint_key).as_ref(), &AllowList::default());
    assert!(before.flagged);

    creator.revoke_authority(&mint, AuthorityKind::Mint).await.unwrap();
    assert_eq!(ledger.mint(&mint_key).unwrap().mint_authority, None);

    let after = audit_account(&mint, ledger.account(&mint_key).as_ref(), &AllowList::default());
    assert!(!after.flagged);
    assert!(after.findings.is_empty());
}

#[tokio::test]
async fn test_operations_on_missing_mint_fail() {
    let (_ledger, creator) = funded_creator(SPL_TOKEN_PROGRAM_ID);
    let missing = Pubkey::new_unique().to_string();
    let err = creator.mint_additional(&missing, 10, None).await.unwrap_err();
    assert!(matches!(err, ToolkitError::AccountNotFound(_)));

    let err = creator.burn("not-an-address", 10).await.unwrap_err();
    assert!(matches!(err, ToolkitError::InvalidAddress { .. }));
}

#[tokio::test]
async fn test_token_record_is_saved_and_reloaded() {
    let (_ledger, creator) = funded_creator(SPL_TOKEN_PROGRAM_ID);
    let params = params(42, 9);
    let record = TokenRecord {
        token_info: creator.create_token(&params).await.unwrap(),
        metadata: params.metadata.clone(),
    };

    let dir = tempfile::tempdir().unwrap();
    let path = save_token_record(dir.path(), &record).unwrap();
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("TEST_"));
    assert_eq!(name, format!("TEST_{}.json", &record.token_info.mint_address[..8]));

    let loaded: TokenRecord = report::read_json(&path).unwrap();
    assert_eq!(loaded, record);
}

#[tokio::test]
async fn test_initial_mint_creates_associated_account() {
    let (ledger, creator) = funded_creator(SPL_TOKEN_PROGRAM_ID);
    let payer = creator.payer();
    let info = creator.create_token(&params(3, 0)).await.unwrap();
    let mint: Pubkey = info.mint_address.parse().unwrap();

    let ixs = instructions::mint_to(&payer, &mint, &payer, &payer, 1, 0, &SPL_TOKEN_PROGRAM_ID).unwrap();
    assert_eq!(ixs[0].program_id, spl_associated_token_account::id());

    let ata = associated_token_address(&payer, &mint, &SPL_TOKEN_PROGRAM_ID);
    let account = ledger.token_account(&ata).unwrap();
    assert_eq!(account.mint, mint.to_string());
    assert_eq!(account.owner, payer.to_string());
    assert_eq!(account.amount, 3);
}

async fn validated_select(
    pool: &token_toolkit::EndpointPool,
    params: &CreateTokenParams,
) -> token_toolkit::error::ToolkitResult<u64> {
    let raw_supply = params.validate()?;
    pool.select().await?;
    Ok(raw_supply)
}

#[tokio::test]
async fn test_invalid_params_rejected_before_endpoint_selection() {
    let ledger = MockLedger::new("http://mock-primary");
    let pool = pool_over(&[ledger.clone()], 2);

    for bad in [params(0, 9), params(u64::MAX, 9), params(1, 20)] {
        let err = validated_select(&pool, &bad).await.unwrap_err();
        assert!(matches!(err, ToolkitError::InvalidAmount(_)));
    }
    assert!(ledger.calls().is_empty());

    assert_eq!(validated_select(&pool, &params(2, 3)).await.unwrap(), 2_000);
    assert_eq!(ledger.calls(), vec!["getLatestBlockhash".to_string()]);
}
