use anyhow::{bail, Context, Result};
use std::path::Path;
use std::time::Duration;
use token_toolkit::{config::Settings, keys, logging::init_tracing, probe, report, rpc::EndpointPool};

/// Usage: check-accounts-exist <ADDRESS | @FILE>...
#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load(None).context("failed to load configuration")?;
    init_tracing(&settings.logging);

    let mut addresses = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.strip_prefix('@') {
            Some(path) => addresses.extend(keys::read_address_list(Path::new(path))?),
            None => addresses.push(arg),
        }
    }
    if addresses.is_empty() {
        bail!("usage: check-accounts-exist <ADDRESS | @FILE>...");
    }

    let pool = EndpointPool::from_settings(&settings);
    let delay = Duration::from_millis(settings.scan.request_delay_ms);
    let checks = probe::check_accounts(&pool, &addresses, delay).await;

    for check in &checks {
        let status = if check.exists { "✅ exists" } else { "❌ missing" };
        println!("{} {}", status, check.address);
        if let Some(error) = &check.error {
            println!("   {}", error);
        }
    }

    let summary = probe::summarize(&checks);
    println!("\n📊 {}/{} accounts found ({:.1}%)", summary.found, summary.total, summary.success_rate);

    let path = report::timestamped_path(&settings.token.report_dir, "account_check", "json");
    report::write_json(&path, &checks)?;
    println!("📝 Results saved to {}", path.display());
    Ok(())
}
