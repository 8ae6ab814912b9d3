//! In-memory ledger used by the integration tests.
//!
//! Applies the handful of system, token and ATA instructions the toolkit
//! sends by decoding their raw instruction data, and records every call.

#![allow(dead_code)]

use async_trait::async_trait;
use solana_sdk::{
    account::Account, hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use token_toolkit::config::{RetrySettings, SPL_TOKEN_PROGRAM_ID};
use token_toolkit::error::{ToolkitError, ToolkitResult};
use token_toolkit::probe::layout::{
    encode_mint, encode_token_account, parse_mint, parse_token_account, MintLayout,
    TokenAccountLayout, TokenAccountState,
};
use token_toolkit::rpc::fallback::Connector;
use token_toolkit::rpc::{EndpointPool, LedgerRpc, TokenAmount};

pub const SYSTEM_PROGRAM_ID: Pubkey = solana_sdk::pubkey!("11111111111111111111111111111111");

#[derive(Default)]
struct State {
    accounts: HashMap<Pubkey, Account>,
    balances: HashMap<Pubkey, u64>,
    calls: Vec<String>,
    transient_failures: u32,
    permanent_failure: bool,
    sent: u32,
}

pub struct MockLedger {
    url: String,
    state: Mutex<State>,
}

impl MockLedger {
    pub fn new(url: &str) -> Arc<Self> {
        Arc::new(Self {
            url: url.to_string(),
            state: Mutex::new(State::default()),
        })
    }

    pub fn set_balance(&self, address: Pubkey, lamports: u64) {
        self.state.lock().unwrap().balances.insert(address, lamports);
    }

    pub fn insert_account(&self, address: Pubkey, account: Account) {
        self.state.lock().unwrap().accounts.insert(address, account);
    }

    pub fn insert_mint(&self, address: Pubkey, mint: &MintLayout) {
        self.insert_account(address, token_account(encode_mint(mint).unwrap()));
    }

    pub fn insert_token_account(&self, address: Pubkey, layout: &TokenAccountLayout) {
        self.insert_account(address, token_account(encode_token_account(layout).unwrap()));
    }

    /// Fail the next `n` calls with a transport error
    pub fn fail_next(&self, n: u32) {
        self.state.lock().unwrap().transient_failures = n;
    }

    /// Fail every call with an error no retry can fix
    pub fn fail_permanently(&self) {
        self.state.lock().unwrap().permanent_failure = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn account(&self, address: &Pubkey) -> Option<Account> {
        self.state.lock().unwrap().accounts.get(address).cloned()
    }

    pub fn mint(&self, address: &Pubkey) -> Option<MintLayout> {
        self.account(address).map(|a| parse_mint(&a.data).unwrap())
    }

    pub fn token_account(&self, address: &Pubkey) -> Option<TokenAccountLayout> {
        self.account(address).map(|a| parse_token_account(&a.data).unwrap())
    }

    fn enter(&self, call: &str) -> ToolkitResult<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call.to_string());
        if state.permanent_failure {
            return Err(ToolkitError::VerificationFailed(format!("{} rejected", call)));
        }
        if state.transient_failures > 0 {
            state.transient_failures -= 1;
            return Err(ToolkitError::Rpc(format!("{}: connection reset", call)));
        }
        Ok(state)
    }
}

fn token_account(data: Vec<u8>) -> Account {
    Account {
        lamports: 2_039_280,
        data,
        owner: SPL_TOKEN_PROGRAM_ID,
        executable: false,
        rent_epoch: 0,
    }
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(data[offset..offset + 8].try_into().unwrap())
}

fn read_pubkey(data: &[u8], offset: usize) -> Pubkey {
    Pubkey::new_from_array(data[offset..offset + 32].try_into().unwrap())
}

fn update_mint(state: &mut State, mint: &Pubkey, f: impl FnOnce(&mut MintLayout)) {
    let account = state.accounts.get_mut(mint).expect("mint exists");
    let mut layout = parse_mint(&account.data).unwrap();
    f(&mut layout);
    account.data = encode_mint(&layout).unwrap();
}

fn update_token_account(state: &mut State, address: &Pubkey, f: impl FnOnce(&mut TokenAccountLayout)) {
    let account = state.accounts.get_mut(address).expect("token account exists");
    let mut layout = parse_token_account(&account.data).unwrap();
    f(&mut layout);
    account.data = encode_token_account(&layout).unwrap();
}

fn apply(state: &mut State, transaction: &Transaction) {
    let keys = &transaction.message.account_keys;
    for ix in &transaction.message.instructions {
        let program = keys[ix.program_id_index as usize];
        let accounts: Vec<Pubkey> = ix.accounts.iter().map(|i| keys[*i as usize]).collect();
        let data = &ix.data;

        if program == SYSTEM_PROGRAM_ID {
            // CreateAccount: u32 tag, lamports, space, owner
            let lamports = read_u64(data, 4);
            let space = read_u64(data, 12) as usize;
            let owner = read_pubkey(data, 20);
            state.accounts.insert(
                accounts[1],
                Account {
                    lamports,
                    data: vec![0; space],
                    owner,
                    executable: false,
                    rent_epoch: 0,
                },
            );
        } else if program == spl_associated_token_account::id() {
            // [payer, ata, wallet, mint, system, token program]
            let ata = accounts[1];
            if !state.accounts.contains_key(&ata) {
                let layout = TokenAccountLayout {
                    mint: accounts[3].to_string(),
                    owner: accounts[2].to_string(),
                    amount: 0,
                    delegate: None,
                    state: TokenAccountState::Initialized,
                    is_native: None,
                    delegated_amount: 0,
                    close_authority: None,
                };
                let mut account = token_account(encode_token_account(&layout).unwrap());
                account.owner = accounts[5];
                state.accounts.insert(ata, account);
            }
        } else if program == SPL_TOKEN_PROGRAM_ID || program == spl_token_2022::id() {
            match data[0] {
                // InitializeMint2: decimals, authority, COption<freeze> (1 byte tag)
                20 => {
                    let freeze_authority = (data[34] == 1).then(|| read_pubkey(data, 35).to_string());
                    let layout = MintLayout {
                        mint_authority: Some(read_pubkey(data, 2).to_string()),
                        supply: 0,
                        decimals: data[1],
                        is_initialized: true,
                        freeze_authority,
                    };
                    let account = state.accounts.get_mut(&accounts[0]).expect("mint allocated");
                    account.data = encode_mint(&layout).unwrap();
                }
                // TransferChecked: [source, mint, destination, authority]
                12 => {
                    let amount = read_u64(data, 1);
                    update_token_account(state, &accounts[0], |a| a.amount -= amount);
                    update_token_account(state, &accounts[2], |a| a.amount += amount);
                }
                // MintToChecked: [mint, destination, authority]
                14 => {
                    let amount = read_u64(data, 1);
                    update_mint(state, &accounts[0], |m| m.supply += amount);
                    update_token_account(state, &accounts[1], |a| a.amount += amount);
                }
                // BurnChecked: [account, mint, authority]
                15 => {
                    let amount = read_u64(data, 1);
                    update_token_account(state, &accounts[0], |a| a.amount -= amount);
                    update_mint(state, &accounts[1], |m| m.supply -= amount);
                }
                // SetAuthority: type, COption<new authority> (1 byte tag)
                6 => {
                    let new_authority = (data[2] == 1).then(|| read_pubkey(data, 3).to_string());
                    match data[1] {
                        0 => update_mint(state, &accounts[0], |m| m.mint_authority = new_authority),
                        1 => update_mint(state, &accounts[0], |m| m.freeze_authority = new_authority),
                        other => panic!("unexpected authority type {}", other),
                    }
                }
                other => panic!("unexpected token instruction {}", other),
            }
        }
    }
}

#[async_trait]
impl LedgerRpc for MockLedger {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn get_balance(&self, address: &Pubkey) -> ToolkitResult<u64> {
        let state = self.enter("getBalance")?;
        Ok(state.balances.get(address).copied().unwrap_or_default())
    }

    async fn get_account(&self, address: &Pubkey) -> ToolkitResult<Option<Account>> {
        let state = self.enter("getAccountInfo")?;
        Ok(state.accounts.get(address).cloned())
    }

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> ToolkitResult<u64> {
        self.enter("getMinimumBalanceForRentExemption")?;
        Ok((data_len as u64 + 128) * 6_960)
    }

    async fn get_latest_blockhash(&self) -> ToolkitResult<Hash> {
        self.enter("getLatestBlockhash")?;
        Ok(Hash::new_unique())
    }

    async fn send_and_confirm(&self, transaction: &Transaction) -> ToolkitResult<Signature> {
        let mut state = self.enter("sendTransaction")?;
        transaction
            .verify()
            .map_err(|e| ToolkitError::VerificationFailed(e.to_string()))?;
        apply(&mut state, transaction);
        state.sent += 1;
        Ok(transaction.signatures[0])
    }

    async fn get_token_supply(&self, mint: &Pubkey) -> ToolkitResult<TokenAmount> {
        let state = self.enter("getTokenSupply")?;
        let account = state
            .accounts
            .get(mint)
            .ok_or_else(|| ToolkitError::AccountNotFound(mint.to_string()))?;
        let layout = parse_mint(&account.data)?;
        Ok(TokenAmount {
            amount: layout.supply,
            decimals: layout.decimals,
            ui_amount_string: layout.supply.to_string(),
        })
    }

    async fn get_token_account_balance(&self, address: &Pubkey) -> ToolkitResult<TokenAmount> {
        let state = self.enter("getTokenAccountBalance")?;
        let account = state
            .accounts
            .get(address)
            .ok_or_else(|| ToolkitError::AccountNotFound(address.to_string()))?;
        let layout = parse_token_account(&account.data)?;
        let mint = layout.mint.parse::<Pubkey>().unwrap();
        let decimals = state
            .accounts
            .get(&mint)
            .map(|m| parse_mint(&m.data).unwrap().decimals)
            .unwrap_or_default();
        Ok(TokenAmount {
            amount: layout.amount,
            decimals,
            ui_amount_string: layout.amount.to_string(),
        })
    }
}

/// Retry policy without sleeps worth waiting for
pub fn fast_retry(max_attempts: u32) -> RetrySettings {
    RetrySettings {
        max_attempts,
        base_delay_ms: 1,
        max_delay_ms: 2,
    }
}

/// Pool whose endpoints resolve to the given mocks, matched by URL
pub fn pool_over(ledgers: &[Arc<MockLedger>], max_attempts: u32) -> EndpointPool {
    let by_url: HashMap<String, Arc<MockLedger>> = ledgers
        .iter()
        .map(|l| (l.endpoint().to_string(), l.clone()))
        .collect();
    let endpoints = ledgers.iter().map(|l| l.endpoint().to_string()).collect();
    let connector: Connector = Arc::new(move |url: &str| {
        by_url.get(url).cloned().expect("known endpoint") as Arc<dyn LedgerRpc>
    });
    EndpointPool::with_connector(endpoints, fast_retry(max_attempts), connector)
}
