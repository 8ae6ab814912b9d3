use anyhow::{bail, Context, Result};
use token_toolkit::{
    config::Settings,
    logging::init_tracing,
    prompt,
    report,
    rpc::EndpointPool,
    token::{save_token_record, CreateTokenParams, TokenCreator, TokenMetadata, TokenRecord},
};

/// Usage: create-simple-spl-token [NAME] [SYMBOL] [SUPPLY] [DECIMALS]
#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load(None).context("failed to load configuration")?;
    init_tracing(&settings.logging);

    let args: Vec<String> = std::env::args().collect();
    let name = args.get(1).cloned().unwrap_or_else(|| "Simple Token".to_string());
    let symbol = args.get(2).cloned().unwrap_or_else(|| "SIMPLE".to_string());
    let initial_supply = match args.get(3) {
        Some(s) => s.parse().context("supply must be a whole number")?,
        None => settings.token.default_supply,
    };
    let decimals = match args.get(4) {
        Some(d) => d.parse().context("decimals must be a number")?,
        None => settings.token.default_decimals,
    };

    let params = CreateTokenParams {
        metadata: TokenMetadata {
            name,
            symbol,
            ..Default::default()
        },
        decimals,
        initial_supply,
        mint_authority: None,
        freeze_authority: None,
    };
    params.validate()?;

    if !prompt::confirm_mainnet(&settings, false)? {
        bail!("aborted by user");
    }

    let pool = EndpointPool::from_settings(&settings);
    let selected = pool.select().await?;
    let creator = TokenCreator::from_settings(&settings, selected.value)?;

    println!(
        "🚀 Creating {} ({}) on {}",
        params.metadata.name, params.metadata.symbol, selected.endpoint
    );
    println!("   Payer: {}", creator.payer());

    let token_info = creator.create_token(&params).await?;
    let record = TokenRecord {
        token_info,
        metadata: params.metadata,
    };

    let path = save_token_record(&settings.token.output_dir, &record)?;
    let summary_path = settings
        .token
        .output_dir
        .join(format!("{}_token_info.json", record.metadata.symbol.to_lowercase()));
    report::write_json(&summary_path, &record.token_info)?;

    println!("✅ Mint:          {}", record.token_info.mint_address);
    println!("   Token account: {}", record.token_info.token_account);
    println!("   Saved to:      {}", path.display());
    Ok(())
}
