//! Token price monitoring
//!
//! Prices come from the Jupiter quote API as the amount of wrapped SOL
//! received for one whole token. Each watched token keeps a bounded history;
//! a move of at least `price_change_threshold` between two consecutive
//! samples raises a pump or dump alert.

use crate::config::AnalyticsSettings;
use crate::error::{ToolkitError, ToolkitResult};
use crate::keys::parse_pubkey;
use crate::probe::audit::known_tokens::WSOL;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;
const QUOTE_SLIPPAGE_BPS: u16 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub mint: String,
    pub price_sol: f64,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Pump,
    Dump,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    pub mint: String,
    pub symbol: String,
    pub kind: AlertKind,
    pub old_price: f64,
    pub new_price: f64,
    pub change_percent: f64,
    pub timestamp: DateTime<Utc>,
}

impl std::fmt::Display for PriceAlert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (emoji, action) = match self.kind {
            AlertKind::Pump => ("🚀", "PUMP"),
            AlertKind::Dump => ("📉", "DUMP"),
        };
        write!(
            f,
            "{} {} {}: {:.9} SOL -> {:.9} SOL ({:+.2}%)",
            emoji, action, self.symbol, self.old_price, self.new_price, self.change_percent
        )
    }
}

/// Summary over a token's recorded history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceStats {
    pub samples: usize,
    pub current: f64,
    pub min: f64,
    pub max: f64,
    pub average: f64,
    /// Change from the oldest to the newest sample, in percent
    pub change_percent: f64,
}

#[derive(Debug, Clone)]
struct WatchedToken {
    symbol: String,
    decimals: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    out_amount: String,
}

/// Compare two consecutive prices against the alert threshold
pub fn detect_alert(
    mint: &str,
    symbol: &str,
    old_price: f64,
    new_price: f64,
    threshold: f64,
) -> Option<PriceAlert> {
    if old_price <= 0.0 {
        return None;
    }
    let change = (new_price - old_price) / old_price;
    if change.abs() < threshold {
        return None;
    }
    Some(PriceAlert {
        mint: mint.to_string(),
        symbol: symbol.to_string(),
        kind: if change > 0.0 { AlertKind::Pump } else { AlertKind::Dump },
        old_price,
        new_price,
        change_percent: change * 100.0,
        timestamp: Utc::now(),
    })
}

pub struct PriceMonitor {
    client: reqwest::Client,
    settings: AnalyticsSettings,
    watched: HashMap<String, WatchedToken>,
    history: HashMap<String, VecDeque<PriceSample>>,
}

impl PriceMonitor {
    pub fn new(settings: AnalyticsSettings) -> ToolkitResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            settings,
            watched: HashMap::new(),
            history: HashMap::new(),
        })
    }

    pub fn add_token(&mut self, mint: &str, symbol: &str, decimals: u8) -> ToolkitResult<()> {
        let mint = parse_pubkey(mint)?.to_string();
        let symbol = if symbol.is_empty() {
            mint.chars().take(8).collect()
        } else {
            symbol.to_string()
        };
        tracing::info!(mint = %mint, symbol = %symbol, "Token added to price monitor");
        self.watched.insert(mint, WatchedToken { symbol, decimals });
        Ok(())
    }

    pub fn remove_token(&mut self, mint: &str) -> bool {
        self.history.remove(mint);
        let removed = self.watched.remove(mint).is_some();
        if removed {
            tracing::info!(mint = %mint, "Token removed from price monitor");
        }
        removed
    }

    pub fn watched(&self) -> Vec<String> {
        let mut mints: Vec<String> = self.watched.keys().cloned().collect();
        mints.sort();
        mints
    }

    pub fn history(&self, mint: &str) -> Vec<PriceSample> {
        self.history
            .get(mint)
            .map(|samples| samples.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn latest(&self, mint: &str) -> Option<&PriceSample> {
        self.history.get(mint).and_then(|samples| samples.back())
    }

    /// Price of one whole token in SOL
    pub async fn fetch_price(&self, mint: &str, decimals: u8) -> ToolkitResult<f64> {
        let amount = 10u64
            .checked_pow(decimals as u32)
            .ok_or_else(|| ToolkitError::InvalidAmount(format!("decimals {} too large", decimals)))?;
        let url = format!("{}/quote", self.settings.jupiter_url.trim_end_matches('/'));

        tracing::debug!(mint = %mint, url = %url, "Fetching quote");
        let quote: QuoteResponse = self
            .client
            .get(&url)
            .query(&[
                ("inputMint", mint.to_string()),
                ("outputMint", WSOL.to_string()),
                ("amount", amount.to_string()),
                ("slippageBps", QUOTE_SLIPPAGE_BPS.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let lamports: u64 = quote
            .out_amount
            .parse()
            .map_err(|e| ToolkitError::Rpc(format!("bad outAmount '{}': {}", quote.out_amount, e)))?;
        Ok(lamports as f64 / LAMPORTS_PER_SOL)
    }

    /// Append a sample and return an alert if the move crosses the threshold
    pub fn record(&mut self, mint: &str, price_sol: f64) -> Option<PriceAlert> {
        let symbol = self
            .watched
            .get(mint)
            .map(|t| t.symbol.clone())
            .unwrap_or_else(|| mint.chars().take(8).collect());
        let limit = self.settings.history_limit.max(1);
        let threshold = self.settings.price_change_threshold;
        let samples = self.history.entry(mint.to_string()).or_default();

        let alert = samples.back().and_then(|previous| {
            detect_alert(mint, &symbol, previous.price_sol, price_sol, threshold)
        });

        samples.push_back(PriceSample {
            mint: mint.to_string(),
            price_sol,
            timestamp: Utc::now(),
            source: "jupiter".to_string(),
        });
        while samples.len() > limit {
            samples.pop_front();
        }

        if let Some(alert) = &alert {
            tracing::warn!(mint = %mint, change_percent = alert.change_percent, "{}", alert);
        }
        alert
    }

    /// Fetch every watched token concurrently and record the results
    pub async fn update_all(&mut self) -> Vec<PriceAlert> {
        let tokens: Vec<(String, u8)> = self
            .watched
            .iter()
            .map(|(mint, token)| (mint.clone(), token.decimals))
            .collect();

        let fetches = tokens.iter().map(|(mint, decimals)| self.fetch_price(mint, *decimals));
        let results = join_all(fetches).await;

        let mut alerts = Vec::new();
        for ((mint, _), result) in tokens.iter().zip(results) {
            match result {
                Ok(price) => alerts.extend(self.record(mint, price)),
                Err(e) => tracing::warn!(mint = %mint, error = %e, "Price fetch failed"),
            }
        }
        alerts
    }

    pub fn stats(&self, mint: &str) -> Option<PriceStats> {
        let samples = self.history.get(mint)?;
        let first = samples.front()?.price_sol;
        let current = samples.back()?.price_sol;
        let prices = samples.iter().map(|s| s.price_sol);
        let min = prices.clone().fold(f64::INFINITY, f64::min);
        let max = prices.clone().fold(f64::NEG_INFINITY, f64::max);
        let average = prices.sum::<f64>() / samples.len() as f64;
        let change_percent = if first > 0.0 {
            (current - first) / first * 100.0
        } else {
            0.0
        };
        Some(PriceStats {
            samples: samples.len(),
            current,
            min,
            max,
            average,
            change_percent,
        })
    }

    /// Poll on `price_check_interval_secs` until Ctrl-C or `rounds` updates
    pub async fn watch<F>(&mut self, rounds: Option<u32>, mut on_update: F) -> ToolkitResult<()>
    where
        F: FnMut(&PriceMonitor, &[PriceAlert]),
    {
        let period = Duration::from_secs(self.settings.price_check_interval_secs.max(1));
        let mut ticker = tokio::time::interval(period);
        let mut completed = 0u32;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let alerts = self.update_all().await;
                    on_update(self, &alerts);
                    completed += 1;
                    if rounds.is_some_and(|limit| completed >= limit) {
                        return Ok(());
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Price monitor stopped");
                    return Ok(());
                }
            }
        }
    }
}
