use anyhow::{Context, Result};
use solana_sdk::signature::Signer;
use token_toolkit::{config::Settings, keys, logging::init_tracing, probe, rpc::EndpointPool};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load(None).context("failed to load configuration")?;
    init_tracing(&settings.logging);

    let payer = keys::load_payer(&settings.wallet)?.pubkey();
    let pool = EndpointPool::from_settings(&settings);
    let target = settings.wallet.target_address.clone();

    println!("🔍 Checking balances on {}", settings.solana.network);
    let result = pool
        .run(|rpc| {
            let target = target.clone();
            async move { probe::check_balance(rpc.as_ref(), &payer, target.as_deref()).await }
        })
        .await?;
    let report = result.value;

    println!("   Endpoint: {} (attempts: {})", result.endpoint, result.attempts);
    println!("   Payer:    {}", report.payer);
    println!("   Balance:  {:.9} SOL", report.payer_sol);
    if let Some(owner) = &report.payer_account.owner {
        println!("   Owner:    {}", owner);
        println!("   Data:     {} bytes", report.payer_account.data_size.unwrap_or_default());
    }
    if let (Some(target), Some(sol)) = (&report.target, report.target_sol) {
        println!("   Target:   {} ({:.9} SOL)", target, sol);
    }

    if report.payer_lamports < settings.min_balance_lamports() {
        println!("⚠️  Payer balance is below {} SOL", settings.security.min_sol_balance);
    } else {
        println!("✅ Payer can cover token creation");
    }
    Ok(())
}
