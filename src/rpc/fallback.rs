//! Ordered RPC endpoints with retry and exponential backoff.
//!
//! Every endpoint gets `retry.max_attempts` tries before the next one is
//! used. Errors that are not transport failures end the run at once, since
//! another endpoint would reject them the same way.

use super::{LedgerRpc, SolanaRpc};
use crate::config::{RetrySettings, Settings};
use crate::error::{ToolkitError, ToolkitResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Builds a client for one endpoint URL
pub type Connector = Arc<dyn Fn(&str) -> Arc<dyn LedgerRpc> + Send + Sync>;

/// A value produced by one of the endpoints
#[derive(Debug)]
pub struct Fallback<T> {
    pub value: T,
    /// Endpoint that produced the value
    pub endpoint: String,
    /// Total attempts across all endpoints, including the successful one
    pub attempts: u32,
}

pub struct EndpointPool {
    endpoints: Vec<String>,
    retry: RetrySettings,
    connector: Connector,
}

impl EndpointPool {
    /// Pool over the configured endpoints using the Solana JSON-RPC client
    pub fn from_settings(settings: &Settings) -> Self {
        let commitment = settings.commitment();
        let timeout = Duration::from_secs(settings.solana.timeout_secs.max(1));
        let connector: Connector = Arc::new(move |url: &str| {
            Arc::new(SolanaRpc::new(url, commitment, timeout)) as Arc<dyn LedgerRpc>
        });
        Self::with_connector(settings.endpoints(), settings.retry.clone(), connector)
    }

    pub fn with_connector(endpoints: Vec<String>, retry: RetrySettings, connector: Connector) -> Self {
        Self {
            endpoints,
            retry,
            connector,
        }
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Run `op` against the endpoints in order until one succeeds
    pub async fn run<T, F, Fut>(&self, mut op: F) -> ToolkitResult<Fallback<T>>
    where
        F: FnMut(Arc<dyn LedgerRpc>) -> Fut,
        Fut: Future<Output = ToolkitResult<T>>,
    {
        let mut attempts = 0u32;
        let mut last_error = String::from("no RPC endpoints configured");

        for endpoint in &self.endpoints {
            let rpc = (self.connector)(endpoint);

            for attempt in 1..=self.retry.max_attempts.max(1) {
                if attempt > 1 {
                    tokio::time::sleep(self.retry.delay(attempt - 1)).await;
                }
                attempts += 1;

                match op(rpc.clone()).await {
                    Ok(value) => {
                        if attempts > 1 {
                            tracing::info!(endpoint = %endpoint, attempts, "RPC call succeeded after retry");
                        }
                        return Ok(Fallback {
                            value,
                            endpoint: endpoint.clone(),
                            attempts,
                        });
                    }
                    Err(e) if e.is_retryable() => {
                        tracing::warn!(endpoint = %endpoint, attempt, error = %e, "RPC call failed");
                        last_error = e.to_string();
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Err(ToolkitError::EndpointsExhausted {
            attempts,
            last_error,
        })
    }

    /// First endpoint that answers `getLatestBlockhash`.
    ///
    /// Multi-transaction sequences run on a single endpoint so a retry never
    /// replays half of a sequence somewhere else.
    pub async fn select(&self) -> ToolkitResult<Fallback<Arc<dyn LedgerRpc>>> {
        self.run(|rpc| async move {
            let blockhash = rpc.get_latest_blockhash().await;
            blockhash.map(|_| rpc)
        })
        .await
    }
}
