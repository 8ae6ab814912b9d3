//! Terminal prompts shared by the binaries.

use crate::config::Settings;
use crate::error::ToolkitResult;
use std::io::{self, BufRead, Write};

/// Print `label [default]: ` and read one line; empty input gives `default`
pub fn ask(label: &str, default: &str) -> ToolkitResult<String> {
    let stdin = io::stdin();
    ask_from(&mut stdin.lock(), label, default)
}

pub fn ask_from<R: BufRead>(input: &mut R, label: &str, default: &str) -> ToolkitResult<String> {
    if default.is_empty() {
        print!("{}: ", label);
    } else {
        print!("{} [{}]: ", label, default);
    }
    io::stdout().flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim();
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer.to_string()
    })
}

/// y/n question, anything but "y" or "yes" is a no
pub fn confirm(question: &str) -> ToolkitResult<bool> {
    let answer = ask(&format!("{} (y/n)", question), "n")?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Ask before sending transactions to mainnet. Returns false when the user
/// declines.
pub fn confirm_mainnet(settings: &Settings, assume_yes: bool) -> ToolkitResult<bool> {
    if !settings.is_mainnet() || !settings.security.confirm_mainnet || assume_yes {
        return Ok(true);
    }
    println!("⚠️  You are about to send transactions to MAINNET ({})", settings.solana.rpc_url);
    println!("   Real SOL will be spent.");
    confirm("Continue?")
}
