use super::{LedgerRpc, TokenAmount};
use crate::error::{ToolkitError, ToolkitResult};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    account::Account, commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey,
    signature::Signature, transaction::Transaction,
};
use std::time::Duration;

/// `LedgerRpc` over the nonblocking Solana JSON-RPC client
pub struct SolanaRpc {
    client: RpcClient,
    url: String,
}

impl SolanaRpc {
    pub fn new(url: &str, commitment: CommitmentConfig, timeout: Duration) -> Self {
        let client = RpcClient::new_with_timeout_and_commitment(url.to_string(), timeout, commitment);
        Self {
            client,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl LedgerRpc for SolanaRpc {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn get_balance(&self, address: &Pubkey) -> ToolkitResult<u64> {
        Ok(self.client.get_balance(address).await?)
    }

    async fn get_account(&self, address: &Pubkey) -> ToolkitResult<Option<Account>> {
        let response = self
            .client
            .get_account_with_commitment(address, self.client.commitment())
            .await?;
        Ok(response.value)
    }

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> ToolkitResult<u64> {
        Ok(self.client.get_minimum_balance_for_rent_exemption(data_len).await?)
    }

    async fn get_latest_blockhash(&self) -> ToolkitResult<Hash> {
        Ok(self.client.get_latest_blockhash().await?)
    }

    async fn send_and_confirm(&self, transaction: &Transaction) -> ToolkitResult<Signature> {
        Ok(self.client.send_and_confirm_transaction(transaction).await?)
    }

    async fn get_token_supply(&self, mint: &Pubkey) -> ToolkitResult<TokenAmount> {
        let supply = self.client.get_token_supply(mint).await?;
        to_token_amount(&supply.amount, supply.decimals, supply.ui_amount_string)
    }

    async fn get_token_account_balance(&self, account: &Pubkey) -> ToolkitResult<TokenAmount> {
        let balance = self.client.get_token_account_balance(account).await?;
        to_token_amount(&balance.amount, balance.decimals, balance.ui_amount_string)
    }
}

fn to_token_amount(amount: &str, decimals: u8, ui_amount_string: String) -> ToolkitResult<TokenAmount> {
    let amount = amount
        .parse::<u64>()
        .map_err(|e| ToolkitError::Rpc(format!("unparseable token amount '{}': {}", amount, e)))?;
    Ok(TokenAmount {
        amount,
        decimals,
        ui_amount_string,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_token_amount() {
        let parsed = to_token_amount("1500", 2, "15".into()).unwrap();
        assert_eq!(parsed.amount, 1500);
        assert_eq!(parsed.decimals, 2);
        assert!(to_token_amount("-1", 0, "".into()).is_err());
    }

    #[test]
    fn test_endpoint_is_reported() {
        let rpc = SolanaRpc::new(
            "http://127.0.0.1:8899",
            CommitmentConfig::confirmed(),
            Duration::from_secs(5),
        );
        assert_eq!(rpc.endpoint(), "http://127.0.0.1:8899");
    }
}
