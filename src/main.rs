use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use solana_sdk::signature::Signer;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use token_toolkit::{
    config::Settings,
    error::ToolkitResult,
    keys::{self, format_token_amount, parse_pubkey},
    logging::init_tracing,
    price::PriceMonitor,
    probe::{self, AllowList},
    prompt, report,
    rpc::{EndpointPool, LedgerRpc},
    token::{save_token_record, AuthorityKind, CreateTokenParams, OperationResult, TokenCreator, TokenMetadata, TokenRecord},
};

#[derive(Parser)]
#[command(name = "token-toolkit")]
#[command(version, about = "Create SPL tokens, probe accounts and watch prices on Solana", long_about = None)]
struct Cli {
    /// Settings file (TOML, YAML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the primary RPC endpoint
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Skip the mainnet confirmation prompt
    #[arg(short, long, global = true)]
    yes: bool,

    /// Where token files and reports are written
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a token and mint the initial supply to the payer
    CreateToken {
        #[arg(long)]
        name: String,
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        image_url: String,
        /// Defaults to token.default_decimals
        #[arg(long)]
        decimals: Option<u8>,
        /// Whole tokens; defaults to token.default_supply
        #[arg(long)]
        supply: Option<u64>,
        /// Hand mint authority to this address after the initial mint
        #[arg(long)]
        mint_authority: Option<String>,
        #[arg(long)]
        freeze_authority: Option<String>,
        #[arg(long)]
        website: Option<String>,
        #[arg(long)]
        twitter: Option<String>,
        #[arg(long)]
        telegram: Option<String>,
        #[arg(long)]
        discord: Option<String>,
    },
    /// Create a token by answering prompts
    Interactive,
    /// Print the effective configuration
    Config {
        #[arg(long, value_enum, default_value_t = ConfigFormat::Toml)]
        format: ConfigFormat,
        /// Also write it (as TOML) to this path
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Payer balance, plus an optional target address
    Balance {
        /// Defaults to SOLANA_TARGET_ADDRESS
        #[arg(long)]
        target: Option<String>,
    },
    /// Check whether accounts exist
    CheckAccounts {
        addresses: Vec<String>,
        /// File with one address per line
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Audit mints and token accounts for risky settings
    Scan {
        addresses: Vec<String>,
        /// File with one address per line
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Mint more tokens (base units)
    MintTo {
        mint: String,
        amount: u64,
        /// Owner of the destination account; defaults to the payer
        #[arg(long)]
        to: Option<String>,
    },
    /// Transfer tokens (base units) from the payer
    Transfer {
        mint: String,
        recipient: String,
        amount: u64,
        #[arg(long)]
        memo: Option<String>,
    },
    /// Burn tokens (base units) from the payer's account
    Burn { mint: String, amount: u64 },
    /// Permanently remove the mint or freeze authority
    RevokeAuthority {
        mint: String,
        #[arg(value_enum)]
        authority: AuthorityKind,
    },
    /// Token balance of an owner (the payer by default)
    TokenBalance { mint: String, owner: Option<String> },
    /// Poll Jupiter quotes for MINT[:SYMBOL[:DECIMALS]] entries
    WatchPrices {
        #[arg(required = true)]
        tokens: Vec<String>,
        /// Seconds between polls
        #[arg(long)]
        interval: Option<u64>,
        /// Stop after this many polls
        #[arg(long)]
        rounds: Option<u32>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ConfigFormat {
    Toml,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(url) = &cli.rpc_url {
        settings.solana.rpc_url = url.clone();
        settings.validate()?;
    }
    if let Some(dir) = &cli.output_dir {
        settings.token.output_dir = dir.clone();
        settings.token.report_dir = dir.clone();
    }
    init_tracing(&settings.logging);

    match cli.command {
        Commands::CreateToken {
            name,
            symbol,
            description,
            image_url,
            decimals,
            supply,
            mint_authority,
            freeze_authority,
            website,
            twitter,
            telegram,
            discord,
        } => {
            let params = CreateTokenParams {
                metadata: TokenMetadata {
                    name,
                    symbol,
                    description,
                    image_url,
                    website,
                    twitter,
                    telegram,
                    discord,
                },
                decimals: decimals.unwrap_or(settings.token.default_decimals),
                initial_supply: supply.unwrap_or(settings.token.default_supply),
                mint_authority: mint_authority.as_deref().map(keys::pubkey_or_keypair_file).transpose()?,
                freeze_authority: freeze_authority.as_deref().map(parse_pubkey).transpose()?,
            };
            create_token(&settings, params, cli.yes).await
        }
        Commands::Interactive => {
            let params = interactive_params(&settings)?;
            create_token(&settings, params, cli.yes).await
        }
        Commands::Config { format, save } => {
            let rendered = match format {
                ConfigFormat::Toml => settings.to_toml()?,
                ConfigFormat::Json => serde_json::to_string_pretty(&settings)?,
            };
            println!("{}", rendered);
            if let Some(path) = save {
                settings.save(&path)?;
                println!("✅ Configuration saved to {}", path.display());
            }
            Ok(())
        }
        Commands::Balance { target } => {
            let target = target.or_else(|| settings.wallet.target_address.clone());
            balance(&settings, target.as_deref()).await
        }
        Commands::CheckAccounts { addresses, file } => {
            let addresses = collect_addresses(addresses, file)?;
            check_accounts(&settings, &addresses).await
        }
        Commands::Scan { addresses, file } => {
            let addresses = collect_addresses(addresses, file)?;
            scan(&settings, &addresses).await
        }
        Commands::MintTo { mint, amount, to } => {
            preflight(keys::validate_amount(amount, "mint amount"))?;
            let creator = connect_creator(&settings, cli.yes).await?;
            finish(creator.mint_additional(&mint, amount, to.as_deref()).await.into())
        }
        Commands::Transfer {
            mint,
            recipient,
            amount,
            memo,
        } => {
            preflight(keys::validate_amount(amount, "transfer amount"))?;
            let creator = connect_creator(&settings, cli.yes).await?;
            finish(creator.transfer(&mint, &recipient, amount, memo.as_deref()).await.into())
        }
        Commands::Burn { mint, amount } => {
            preflight(keys::validate_amount(amount, "burn amount"))?;
            let creator = connect_creator(&settings, cli.yes).await?;
            finish(creator.burn(&mint, amount).await.into())
        }
        Commands::RevokeAuthority { mint, authority } => {
            let creator = connect_creator(&settings, cli.yes).await?;
            finish(creator.revoke_authority(&mint, authority).await.into())
        }
        Commands::TokenBalance { mint, owner } => {
            let creator = connect_creator(&settings, true).await?;
            let owner = owner.unwrap_or_else(|| creator.payer().to_string());
            let balance = creator.token_balance(&mint, &owner).await?;
            println!("💰 Token balance");
            println!("   Mint:    {}", mint);
            println!("   Owner:   {}", owner);
            println!("   Balance: {}", format_token_amount(balance.amount, balance.decimals));
            Ok(())
        }
        Commands::WatchPrices {
            tokens,
            interval,
            rounds,
        } => watch_prices(&settings, &tokens, interval, rounds).await,
    }
}

/// Pick one live endpoint for a multi-transaction flow
async fn select_endpoint(settings: &Settings) -> Result<Arc<dyn LedgerRpc>> {
    let pool = EndpointPool::from_settings(settings);
    let selected = pool.select().await.context("no RPC endpoint is reachable")?;
    println!("🌐 RPC endpoint: {}", selected.endpoint);
    Ok(selected.value)
}

async fn connect_creator(settings: &Settings, assume_yes: bool) -> Result<TokenCreator> {
    if !prompt::confirm_mainnet(settings, assume_yes)? {
        bail!("aborted by user");
    }
    let rpc = select_endpoint(settings).await?;
    let creator = TokenCreator::from_settings(settings, rpc)?;
    println!("👛 Payer: {}", creator.payer());
    Ok(creator)
}

/// Report input errors the same way as failed operations, before the mainnet
/// prompt or any RPC call
fn preflight<T>(check: ToolkitResult<T>) -> Result<T> {
    match check {
        Ok(value) => Ok(value),
        Err(e) => {
            finish(OperationResult::failed(e))?;
            bail!("invalid input")
        }
    }
}

fn finish(result: OperationResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

async fn create_token(settings: &Settings, params: CreateTokenParams, assume_yes: bool) -> Result<()> {
    println!("🚀 Creating token {} ({})", params.metadata.name, params.metadata.symbol);
    println!("   Decimals: {}", params.decimals);
    println!("   Supply:   {}", params.initial_supply);
    preflight(params.validate())?;

    let creator = connect_creator(settings, assume_yes).await?;
    match creator.create_token(&params).await {
        Ok(token_info) => {
            let record = TokenRecord {
                token_info,
                metadata: params.metadata,
            };
            let path = save_token_record(&settings.token.output_dir, &record)?;
            let info = &record.token_info;

            println!("\n✅ Token created");
            println!("   Mint:          {}", info.mint_address);
            println!("   Token account: {}", info.token_account);
            println!("   Supply:        {}", format_token_amount(info.raw_supply, info.decimals));
            for signature in &info.signatures {
                println!("   Signature:     {}", signature);
            }
            println!("   Saved to:      {}", path.display());
            Ok(())
        }
        Err(e) => {
            let failure = serde_json::json!({ "success": false, "error": e.to_string() });
            println!("{}", serde_json::to_string_pretty(&failure)?);
            std::process::exit(1);
        }
    }
}

fn interactive_params(settings: &Settings) -> Result<CreateTokenParams> {
    println!("🪙 Interactive token creation\n");
    let name = prompt::ask("Token name", "")?;
    let symbol = prompt::ask("Token symbol", "")?;
    if name.is_empty() || symbol.is_empty() {
        bail!("token name and symbol are required");
    }
    let description = prompt::ask("Description", "")?;
    let image_url = prompt::ask("Image URL", "")?;
    let decimals: u8 = prompt::ask("Decimals", &settings.token.default_decimals.to_string())?
        .parse()
        .context("decimals must be a number between 0 and 255")?;
    let initial_supply: u64 = prompt::ask("Initial supply", &settings.token.default_supply.to_string())?
        .parse()
        .context("supply must be a non-negative whole number")?;
    let optional = |label: &str| -> Result<Option<String>> {
        let value = prompt::ask(label, "")?;
        Ok(Some(value).filter(|v| !v.is_empty()))
    };

    Ok(CreateTokenParams {
        metadata: TokenMetadata {
            name,
            symbol,
            description,
            image_url,
            website: optional("Website")?,
            twitter: optional("Twitter")?,
            telegram: optional("Telegram")?,
            discord: optional("Discord")?,
        },
        decimals,
        initial_supply,
        mint_authority: None,
        freeze_authority: None,
    })
}

async fn balance(settings: &Settings, target: Option<&str>) -> Result<()> {
    let payer = keys::load_payer(&settings.wallet)?.pubkey();
    let rpc = select_endpoint(settings).await?;
    let report = probe::check_balance(rpc.as_ref(), &payer, target).await?;

    println!("💰 Balance check");
    println!("   Payer:   {}", report.payer);
    println!("   Balance: {:.9} SOL ({} lamports)", report.payer_sol, report.payer_lamports);
    if let Some(owner) = &report.payer_account.owner {
        println!("   Owner:   {}", owner);
    }
    if let (Some(target), Some(sol)) = (&report.target, report.target_sol) {
        println!("   Target:  {} ({:.9} SOL)", target, sol);
    }
    if report.payer_lamports < settings.min_balance_lamports() {
        println!("⚠️  Balance is below the configured minimum of {} SOL", settings.security.min_sol_balance);
    }
    Ok(())
}

fn collect_addresses(mut addresses: Vec<String>, file: Option<PathBuf>) -> Result<Vec<String>> {
    if let Some(path) = file {
        let from_file = keys::read_address_list(&path)
            .with_context(|| format!("cannot read address file {}", path.display()))?;
        addresses.extend(from_file);
    }
    if addresses.is_empty() {
        bail!("no addresses given");
    }
    Ok(addresses)
}

async fn check_accounts(settings: &Settings, addresses: &[String]) -> Result<()> {
    let pool = EndpointPool::from_settings(settings);
    let delay = Duration::from_millis(settings.scan.request_delay_ms);
    println!("🔍 Checking {} accounts", addresses.len());

    let checks = probe::check_accounts(&pool, addresses, delay).await;
    for check in &checks {
        if check.exists {
            println!("   ✅ {} ({} lamports)", check.address, check.lamports.unwrap_or_default());
        } else {
            println!("   ❌ {} ({})", check.address, check.error.as_deref().unwrap_or("not found"));
        }
    }
    let summary = probe::summarize(&checks);
    println!(
        "\n📊 Found {}/{} ({:.1}%)",
        summary.found, summary.total, summary.success_rate
    );

    let (json, md) = report::write_report_pair(
        &settings.token.report_dir,
        "account_check",
        &checks,
        &report::account_checks_markdown(&checks),
    )?;
    println!("📝 Reports: {} , {}", json.display(), md.display());
    Ok(())
}

async fn scan(settings: &Settings, addresses: &[String]) -> Result<()> {
    let pool = EndpointPool::from_settings(settings);
    let allow = AllowList::new(&settings.scan.allow_list);
    let delay = Duration::from_millis(settings.scan.request_delay_ms);
    println!("🔍 Scanning {} addresses", addresses.len());

    let results = probe::scan_addresses(&pool, addresses, &allow, delay).await;
    for result in &results {
        let marker = if result.flagged { "🚩" } else { "✅" };
        println!("   {} {} ({:?})", marker, result.address, result.kind);
        for reason in &result.reasons {
            println!("      - {}", reason);
        }
    }
    let flagged = results.iter().filter(|r| r.flagged).count();
    println!("\n📊 {} of {} flagged", flagged, results.len());

    let (json, md) = report::write_report_pair(
        &settings.token.report_dir,
        "scan_report",
        &results,
        &report::scan_markdown(&results),
    )?;
    println!("📝 Reports: {} , {}", json.display(), md.display());
    Ok(())
}

/// `MINT[:SYMBOL[:DECIMALS]]`
fn parse_watch_entry(entry: &str) -> Result<(String, String, u8)> {
    let mut parts = entry.split(':');
    let mint = parts.next().unwrap_or_default().to_string();
    let symbol = parts.next().unwrap_or_default().to_string();
    let decimals = match parts.next() {
        Some(d) => d.parse().with_context(|| format!("bad decimals in '{}'", entry))?,
        None => 9,
    };
    Ok((mint, symbol, decimals))
}

async fn watch_prices(
    settings: &Settings,
    tokens: &[String],
    interval: Option<u64>,
    rounds: Option<u32>,
) -> Result<()> {
    let mut analytics = settings.analytics.clone();
    if let Some(secs) = interval {
        analytics.price_check_interval_secs = secs;
    }
    let period = analytics.price_check_interval_secs;

    let mut monitor = PriceMonitor::new(analytics)?;
    for entry in tokens {
        let (mint, symbol, decimals) = parse_watch_entry(entry)?;
        monitor.add_token(&mint, &symbol, decimals)?;
    }
    println!("📈 Watching {} tokens every {}s (Ctrl-C to stop)", tokens.len(), period);

    monitor
        .watch(rounds, |monitor, alerts| {
            println!("\n⏱  {}", chrono::Utc::now().format("%H:%M:%S"));
            for mint in monitor.watched() {
                match monitor.latest(&mint) {
                    Some(sample) => println!("   {} {:.9} SOL", mint, sample.price_sol),
                    None => println!("   {} no quote", mint),
                }
            }
            for alert in alerts {
                println!("   {}", alert);
            }
        })
        .await?;
    Ok(())
}
