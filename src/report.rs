//! JSON and Markdown reports.

use crate::error::ToolkitResult;
use crate::keys::format_token_amount;
use crate::probe::{summarize, AccountCheck, ScanResult, Severity};
use crate::token::TokenRecord;
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// UTC timestamp used in report file names
pub fn timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// `<dir>/<prefix>_<timestamp>.<ext>`
pub fn timestamped_path(dir: &Path, prefix: &str, ext: &str) -> PathBuf {
    dir.join(format!("{}_{}.{}", prefix, timestamp(), ext))
}

/// Pretty JSON, creating parent directories as needed
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> ToolkitResult<()> {
    ensure_parent(path)?;
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> ToolkitResult<T> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

pub fn write_text(path: &Path, contents: &str) -> ToolkitResult<()> {
    ensure_parent(path)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Write `value` as JSON and `markdown` next to it, sharing one timestamp.
/// Returns both paths.
pub fn write_report_pair<T: Serialize + ?Sized>(
    dir: &Path,
    prefix: &str,
    value: &T,
    markdown: &str,
) -> ToolkitResult<(PathBuf, PathBuf)> {
    let stem = format!("{}_{}", prefix, timestamp());
    let json_path = dir.join(format!("{}.json", stem));
    let md_path = dir.join(format!("{}.md", stem));
    write_json(&json_path, value)?;
    write_text(&md_path, markdown)?;
    tracing::info!(json = %json_path.display(), markdown = %md_path.display(), "Report written");
    Ok((json_path, md_path))
}

fn ensure_parent(path: &Path) -> ToolkitResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn token_markdown(record: &TokenRecord) -> String {
    let info = &record.token_info;
    let meta = &record.metadata;
    let mut md = String::new();

    let _ = writeln!(md, "# {} ({})\n", meta.name, meta.symbol);
    if !meta.description.is_empty() {
        let _ = writeln!(md, "{}\n", meta.description);
    }
    let _ = writeln!(md, "| Field | Value |");
    let _ = writeln!(md, "|---|---|");
    let _ = writeln!(md, "| Mint | `{}` |", info.mint_address);
    let _ = writeln!(md, "| Token account | `{}` |", info.token_account);
    let _ = writeln!(md, "| Decimals | {} |", info.decimals);
    let _ = writeln!(
        md,
        "| Supply | {} |",
        format_token_amount(info.raw_supply, info.decimals)
    );
    let _ = writeln!(md, "| Mint authority | `{}` |", info.mint_authority);
    let _ = writeln!(
        md,
        "| Freeze authority | {} |",
        info.freeze_authority
            .as_deref()
            .map(|a| format!("`{}`", a))
            .unwrap_or_else(|| "none".to_string())
    );
    let _ = writeln!(md, "| Token program | `{}` |", info.token_program);
    let _ = writeln!(md, "| Created | {} |", info.created_at.to_rfc3339());

    if !info.signatures.is_empty() {
        let _ = writeln!(md, "\n## Transactions\n");
        for signature in &info.signatures {
            let _ = writeln!(md, "- `{}`", signature);
        }
    }
    md
}

pub fn account_checks_markdown(checks: &[AccountCheck]) -> String {
    let summary = summarize(checks);
    let mut md = String::new();

    let _ = writeln!(md, "# Account check\n");
    let _ = writeln!(md, "Generated: {}\n", Utc::now().to_rfc3339());
    let _ = writeln!(
        md,
        "Found {}/{} accounts ({:.1}%)\n",
        summary.found, summary.total, summary.success_rate
    );
    let _ = writeln!(md, "| Address | Exists | Lamports | Owner | Data size | Note |");
    let _ = writeln!(md, "|---|---|---|---|---|---|");
    for check in checks {
        let _ = writeln!(
            md,
            "| `{}` | {} | {} | {} | {} | {} |",
            check.address,
            if check.exists { "yes" } else { "no" },
            check.lamports.map(|l| l.to_string()).unwrap_or_default(),
            check.owner.as_deref().unwrap_or(""),
            check.data_size.map(|d| d.to_string()).unwrap_or_default(),
            check.error.as_deref().unwrap_or("")
        );
    }
    md
}

pub fn scan_markdown(results: &[ScanResult]) -> String {
    let flagged = results.iter().filter(|r| r.flagged).count();
    let mut md = String::new();

    let _ = writeln!(md, "# Token scan\n");
    let _ = writeln!(md, "Generated: {}\n", Utc::now().to_rfc3339());
    let _ = writeln!(md, "{} of {} addresses flagged\n", flagged, results.len());

    for result in results {
        let status = match result.highest_severity() {
            Some(Severity::Critical) => "🔴 critical",
            Some(Severity::Warning) => "🟡 warning",
            Some(Severity::Info) => "🔵 info",
            None => "🟢 clean",
        };
        let _ = writeln!(md, "## `{}`\n", result.address);
        let _ = writeln!(md, "- Kind: {:?}", result.kind);
        let _ = writeln!(md, "- Status: {}", status);
        if let Some(mint) = &result.mint {
            let _ = writeln!(
                md,
                "- Supply: {}",
                format_token_amount(mint.supply, mint.decimals)
            );
        }
        if let Some(account) = &result.token_account {
            let _ = writeln!(md, "- Mint: `{}`", account.mint);
            let _ = writeln!(md, "- Owner: `{}`", account.owner);
        }
        for finding in &result.findings {
            let _ = writeln!(
                md,
                "- **{:?}** `{}`: {}",
                finding.severity, finding.code, finding.message
            );
        }
        let _ = writeln!(md);
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::audit::audit_account;
    use crate::probe::AllowList;

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/checks.json");
        let checks = vec![AccountCheck {
            address: "abc".into(),
            exists: true,
            lamports: Some(5),
            owner: Some("11111111111111111111111111111111".into()),
            data_size: Some(0),
            executable: Some(false),
            error: None,
        }];

        write_json(&path, &checks).unwrap();
        let loaded: Vec<AccountCheck> = read_json(&path).unwrap();
        assert_eq!(loaded, checks);
    }

    #[test]
    fn test_timestamped_path() {
        let path = timestamped_path(Path::new("reports"), "scan_report", "json");
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("scan_report_"));
        assert!(name.ends_with(".json"));
        // scan_report_ + YYYYMMDD_HHMMSS + .json
        assert_eq!(name.len(), "scan_report_".len() + 15 + ".json".len());
    }

    #[test]
    fn test_report_pair_shares_stem() {
        let dir = tempfile::tempdir().unwrap();
        let results = vec![audit_account("missing", None, &AllowList::default())];
        let (json, md) = write_report_pair(dir.path(), "scan_report", &results, &scan_markdown(&results)).unwrap();
        assert_eq!(json.file_stem(), md.file_stem());

        let loaded: Vec<ScanResult> = read_json(&json).unwrap();
        assert_eq!(loaded, results);
        let text = fs::read_to_string(md).unwrap();
        assert!(text.contains("1 of 1 addresses flagged"));
        assert!(text.contains("account_missing"));
    }
}
