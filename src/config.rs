//! Configuration management for the token toolkit
//!
//! Layers, lowest priority first:
//! 1. Built-in defaults
//! 2. A settings file (`--config PATH`, else `config/settings.*` or `token-toolkit.*`)
//! 3. `TOOLKIT__SECTION__KEY` environment variables
//! 4. The `SOLANA_*` variables the standalone scripts have always used
//!
//! When no RPC URL or keypair path is configured anywhere, the `[provider]`
//! section of the nearest `Anchor.toml` is used before falling back to the
//! cluster defaults.

use crate::error::{ToolkitError, ToolkitResult};
use config::{Config, Environment, File};
use rand::Rng;
use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Classic SPL Token program
pub const SPL_TOKEN_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");

/// Environment variables holding extra fallback endpoints
const FALLBACK_ENV_VARS: [&str; 3] = [
    "SOLANA_RPC_FALLBACK_1",
    "SOLANA_RPC_FALLBACK_2",
    "SOLANA_RPC_FALLBACK_3",
];

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub solana: SolanaSettings,
    pub wallet: WalletSettings,
    pub token: TokenSettings,
    pub retry: RetrySettings,
    pub scan: ScanSettings,
    pub analytics: AnalyticsSettings,
    pub logging: LoggingSettings,
    pub security: SecuritySettings,
}

/// Cluster connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SolanaSettings {
    /// devnet, testnet, mainnet or localnet
    pub network: String,
    /// Primary RPC endpoint; empty means "resolve from Anchor.toml or network"
    pub rpc_url: String,
    /// Tried in order after the primary endpoint
    pub fallback_urls: Vec<String>,
    /// processed, confirmed or finalized
    pub commitment: String,
    pub timeout_secs: u64,
}

impl Default for SolanaSettings {
    fn default() -> Self {
        Self {
            network: "devnet".to_string(),
            rpc_url: String::new(),
            fallback_urls: Vec::new(),
            commitment: "confirmed".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Signing wallet settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletSettings {
    /// JSON keypair file (solana-keygen format)
    pub keypair_path: String,
    /// Hex or base58 secret key; takes precedence over `keypair_path`
    #[serde(skip_serializing)]
    pub private_key: Option<String>,
    /// Address reported next to the payer by the balance check
    pub target_address: Option<String>,
}

/// Token creation defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenSettings {
    pub default_decimals: u8,
    /// Whole tokens minted to the payer on creation
    pub default_supply: u64,
    /// "spl-token" or "token-2022"
    pub program: String,
    /// Where token info files are written
    pub output_dir: PathBuf,
    /// Where scan / check reports are written
    pub report_dir: PathBuf,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            default_decimals: 9,
            default_supply: 1_000_000_000,
            program: "spl-token".to_string(),
            output_dir: PathBuf::from("tokens"),
            report_dir: PathBuf::from("reports"),
        }
    }
}

/// Endpoint retry policy
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Attempts per endpoint before moving to the next one
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay_ms: 500,
            max_delay_ms: 5_000,
        }
    }
}

impl RetrySettings {
    /// Pause before the given retry (1 is the first retry): the base delay
    /// doubled per retry, capped at `max_delay_ms`, plus up to 10% jitter.
    pub fn delay(&self, retry: u32) -> Duration {
        if retry == 0 || self.base_delay_ms == 0 {
            return Duration::ZERO;
        }
        let doublings = (retry - 1).min(63);
        let millis = self
            .base_delay_ms
            .saturating_mul(1u64 << doublings)
            .min(self.max_delay_ms);
        let spread = millis / 10;
        let jitter = if spread > 0 {
            rand::thread_rng().gen_range(0..spread)
        } else {
            0
        };
        Duration::from_millis(millis + jitter)
    }
}

/// Account / mint scan settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Pause between sequential account requests
    pub request_delay_ms: u64,
    /// Extra mints exempt from authority findings
    pub allow_list: Vec<String>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            request_delay_ms: 500,
            allow_list: Vec::new(),
        }
    }
}

/// Price monitoring settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalyticsSettings {
    pub price_check_interval_secs: u64,
    /// Relative change (0.1 = 10%) that raises an alert
    pub price_change_threshold: f64,
    /// Samples kept per token
    pub history_limit: usize,
    pub jupiter_url: String,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            price_check_interval_secs: 60,
            price_change_threshold: 0.1,
            history_limit: 500,
            jupiter_url: "https://quote-api.jup.ag/v6".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Guard rails for write operations
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecuritySettings {
    /// Payer balance (SOL) required before creating a token
    pub min_sol_balance: f64,
    /// Ask before sending transactions on mainnet
    pub confirm_mainnet: bool,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            min_sol_balance: 0.01,
            confirm_mainnet: true,
        }
    }
}

/// `[provider]` section of Anchor.toml
#[derive(Debug, Deserialize)]
struct AnchorToml {
    provider: AnchorProvider,
}

#[derive(Debug, Deserialize)]
struct AnchorProvider {
    cluster: String,
    wallet: String,
}

impl Settings {
    /// Load configuration from files and the process environment
    pub fn load(path: Option<&Path>) -> ToolkitResult<Self> {
        dotenvy::dotenv().ok();
        let env: HashMap<String, String> = std::env::vars().collect();
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::load_with(path, &env, &cwd)
    }

    /// Load configuration against an explicit environment snapshot
    pub fn load_with(
        path: Option<&Path>,
        env: &HashMap<String, String>,
        cwd: &Path,
    ) -> ToolkitResult<Self> {
        let mut builder = Config::builder();

        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder
                .add_source(File::from(cwd.join("config/settings")).required(false))
                .add_source(File::from(cwd.join("token-toolkit")).required(false)),
        };

        // TOOLKIT__SOLANA__NETWORK=mainnet -> solana.network = "mainnet"
        let toolkit_env: HashMap<String, String> = env
            .iter()
            .filter(|(key, _)| key.starts_with("TOOLKIT__"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        builder = builder.add_source(
            Environment::with_prefix("TOOLKIT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("solana.fallback_urls")
                .with_list_parse_key("scan.allow_list")
                .source(Some(toolkit_env)),
        );

        builder = builder
            .set_override_option("solana.rpc_url", non_empty(env, "SOLANA_RPC_URL"))?
            .set_override_option("solana.network", non_empty(env, "SOLANA_NETWORK"))?
            .set_override_option("wallet.private_key", non_empty(env, "SOLANA_PRIVKEY"))?
            .set_override_option("wallet.keypair_path", non_empty(env, "SOLANA_KEYPAIR_PATH"))?
            .set_override_option(
                "wallet.target_address",
                non_empty(env, "SOLANA_TARGET_ADDRESS"),
            )?;

        let mut settings: Settings = builder.build()?.try_deserialize()?;

        for var in FALLBACK_ENV_VARS {
            if let Some(url) = non_empty(env, var) {
                settings.solana.fallback_urls.push(url);
            }
        }

        settings.resolve_defaults(cwd, env);
        settings.validate()?;
        Ok(settings)
    }

    /// Fill RPC URL and keypair path from Anchor.toml or cluster defaults
    fn resolve_defaults(&mut self, cwd: &Path, env: &HashMap<String, String>) {
        let provider = find_anchor_toml(cwd).and_then(|path| match read_anchor_provider(&path) {
            Ok(provider) => Some(provider),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not read Anchor.toml");
                None
            }
        });

        if self.solana.rpc_url.trim().is_empty() {
            self.solana.rpc_url = match &provider {
                Some(provider) => {
                    tracing::info!(cluster = %provider.cluster, "Using RPC from Anchor.toml");
                    cluster_url(&provider.cluster)
                }
                None => cluster_url(&self.solana.network),
            };
        }

        if self.wallet.keypair_path.trim().is_empty() {
            self.wallet.keypair_path = match &provider {
                Some(provider) => provider.wallet.clone(),
                None => {
                    let home = env.get("HOME").cloned().unwrap_or_default();
                    format!("{}/.config/solana/id.json", home)
                }
            };
        }
        self.wallet.keypair_path = shellexpand::tilde(&self.wallet.keypair_path).to_string();
    }

    /// Validate configuration values
    pub fn validate(&self) -> ToolkitResult<()> {
        if self.solana.rpc_url.trim().is_empty() {
            return Err(ToolkitError::Config("solana.rpc_url must not be empty".into()));
        }
        if !self.solana.rpc_url.starts_with("http") {
            return Err(ToolkitError::Config(format!(
                "solana.rpc_url must be an http(s) URL, got '{}'",
                self.solana.rpc_url
            )));
        }
        parse_commitment(&self.solana.commitment)?;
        parse_token_program(&self.token.program)?;
        if self.token.default_decimals > 9 {
            return Err(ToolkitError::Config(
                "token.default_decimals must be between 0 and 9".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ToolkitError::Config("retry.max_attempts must be at least 1".into()));
        }
        if !(self.analytics.price_change_threshold > 0.0) {
            return Err(ToolkitError::Config(
                "analytics.price_change_threshold must be positive".into(),
            ));
        }
        if self.security.min_sol_balance < 0.0 {
            return Err(ToolkitError::Config(
                "security.min_sol_balance must not be negative".into(),
            ));
        }
        Ok(())
    }

    pub fn commitment(&self) -> CommitmentConfig {
        parse_commitment(&self.solana.commitment).unwrap_or_else(|_| CommitmentConfig::confirmed())
    }

    pub fn token_program_id(&self) -> Pubkey {
        parse_token_program(&self.token.program).unwrap_or(SPL_TOKEN_PROGRAM_ID)
    }

    /// Primary endpoint followed by fallbacks, de-duplicated, in order
    pub fn endpoints(&self) -> Vec<String> {
        let mut endpoints: Vec<String> = Vec::new();
        let candidates = std::iter::once(&self.solana.rpc_url).chain(self.solana.fallback_urls.iter());
        for url in candidates {
            let url = url.trim();
            if !url.is_empty() && !endpoints.iter().any(|existing| existing == url) {
                endpoints.push(url.to_string());
            }
        }
        endpoints
    }

    pub fn is_mainnet(&self) -> bool {
        let network = self.solana.network.to_ascii_lowercase();
        network.starts_with("mainnet") || self.solana.rpc_url.contains("mainnet")
    }

    pub fn min_balance_lamports(&self) -> u64 {
        (self.security.min_sol_balance * 1_000_000_000f64).round() as u64
    }

    /// Effective configuration as TOML; the private key is never written
    pub fn to_toml(&self) -> ToolkitResult<String> {
        toml::to_string_pretty(self).map_err(|e| ToolkitError::Config(e.to_string()))
    }

    /// Write the effective configuration to `path`
    pub fn save(&self, path: &Path) -> ToolkitResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}

fn non_empty(env: &HashMap<String, String>, key: &str) -> Option<String> {
    env.get(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_commitment(value: &str) -> ToolkitResult<CommitmentConfig> {
    match value.to_ascii_lowercase().as_str() {
        "processed" => Ok(CommitmentConfig::processed()),
        "confirmed" => Ok(CommitmentConfig::confirmed()),
        "finalized" => Ok(CommitmentConfig::finalized()),
        other => Err(ToolkitError::Config(format!("unknown commitment '{}'", other))),
    }
}

pub fn parse_token_program(value: &str) -> ToolkitResult<Pubkey> {
    match value.to_ascii_lowercase().as_str() {
        "spl-token" | "token" | "classic" => Ok(SPL_TOKEN_PROGRAM_ID),
        "token-2022" | "token2022" => Ok(spl_token_2022::id()),
        other => Err(ToolkitError::Config(format!("unknown token program '{}'", other))),
    }
}

/// Map a cluster moniker (as used in Anchor.toml) to an RPC URL
pub fn cluster_url(cluster: &str) -> String {
    match cluster.to_ascii_lowercase().as_str() {
        "mainnet" | "mainnet-beta" | "m" => "https://api.mainnet-beta.solana.com".to_string(),
        "testnet" | "t" => "https://api.testnet.solana.com".to_string(),
        "localnet" | "localhost" | "l" => "http://127.0.0.1:8899".to_string(),
        "devnet" | "d" => "https://api.devnet.solana.com".to_string(),
        _ if cluster.starts_with("http") => cluster.to_string(),
        _ => "https://api.devnet.solana.com".to_string(),
    }
}

fn find_anchor_toml(start: &Path) -> Option<PathBuf> {
    let mut path = start.to_path_buf();

    // Go up until we find Anchor.toml or reach root
    for _ in 0..5 {
        let anchor_toml = path.join("Anchor.toml");
        if anchor_toml.exists() {
            return Some(anchor_toml);
        }
        if !path.pop() {
            break;
        }
    }
    None
}

fn read_anchor_provider(path: &Path) -> ToolkitResult<AnchorProvider> {
    let contents = fs::read_to_string(path)?;
    let config: AnchorToml =
        toml::from_str(&contents).map_err(|e| ToolkitError::Config(e.to_string()))?;
    Ok(config.provider)
}
