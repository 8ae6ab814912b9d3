use anyhow::{bail, Context, Result};
use std::path::Path;
use std::time::Duration;
use token_toolkit::{
    config::Settings,
    keys,
    logging::init_tracing,
    probe::{self, AllowList},
    report,
    rpc::EndpointPool,
};

/// Usage: scan-mints <ADDRESS | @FILE>...
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
        bail!("usage: scan-mints <ADDRESS | @FILE>...");
    }

    let pool = EndpointPool::from_settings(&settings);
    let allow = AllowList::new(&settings.scan.allow_list);
    let delay = Duration::from_millis(settings.scan.request_delay_ms);
    let results = probe::scan_addresses(&pool, &addresses, &allow, delay).await;

    for result in &results {
        println!("{} {}", if result.flagged { "🚩" } else { "✅" }, result.address);
        for finding in &result.findings {
            println!("   [{:?}] {}", finding.severity, finding.message);
        }
    }

    let (json, md) = report::write_report_pair(
        &settings.token.report_dir,
        "scan_report",
        &results,
        &report::scan_markdown(&results),
    )?;
    println!("\n📝 {} and {}", json.display(), md.display());

    if results.iter().any(|r| r.flagged) {
        std::process::exit(2);
    }
    Ok(())
}
