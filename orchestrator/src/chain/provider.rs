//! Read-only chain access over several RPC endpoints with failover

use crate::config::ChainConfig;
use crate::error::{SwapError, SwapResult};

use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

pub struct ChainProvider {
    chain_id: u64,
    endpoints: Vec<Provider<Http>>,
    /// Index of the endpoint currently in use
    active: AtomicUsize,
}

impl ChainProvider {
    pub fn new(config: &ChainConfig) -> SwapResult<Self> {
        let endpoints: Vec<_> = config
            .rpc_urls
            .iter()
            .filter_map(|url| match Provider::<Http>::try_from(url.as_str()) {
                Ok(provider) => {
                    debug!("RPC endpoint for chain {}: {}", config.chain_id, url);
                    Some(provider.interval(Duration::from_millis(500)))
                }
                Err(e) => {
                    warn!("Skipping RPC endpoint {}: {}", url, e);
                    None
                }
            })
            .collect();

        if endpoints.is_empty() {
            return Err(SwapError::ChainConnection {
                chain_id: config.chain_id,
                message: "No valid RPC endpoints".to_string(),
            });
        }

        Ok(Self {
            chain_id: config.chain_id,
            endpoints,
            active: AtomicUsize::new(0),
        })
    }

    fn current(&self) -> &Provider<Http> {
        &self.endpoints[self.active.load(Ordering::Relaxed) % self.endpoints.len()]
    }

    fn rotate(&self) -> usize {
        let next = (self.active.load(Ordering::Relaxed) + 1) % self.endpoints.len();
        self.active.store(next, Ordering::Relaxed);
        next
    }

    /// Try each endpoint once, starting with the active one
    async fn with_failover<'a, T, F, Fut>(&'a self, operation: &str, f: F) -> SwapResult<T>
    where
        F: Fn(&'a Provider<Http>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        for _ in 0..self.endpoints.len() {
            match f(self.current()).await {
                Ok(value) => return Ok(value),
                // The node answered; another endpoint would revert the same way
                Err(e) if e.to_string().contains("execution reverted") => {
                    return Err(SwapError::Contract(e.to_string()));
                }
                Err(e) => {
                    let next = self.rotate();
                    warn!(
                        "{} failed on chain {}: {} (switching to endpoint {})",
                        operation, self.chain_id, e, next
                    );
                }
            }
        }

        Err(SwapError::ChainConnection {
            chain_id: self.chain_id,
            message: format!("all endpoints failed {}", operation),
        })
    }

    /// `eth_call` against the latest block
    pub async fn call(&self, to: Address, data: Bytes) -> SwapResult<Bytes> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        self.with_failover("eth_call", |p| p.call(&tx, None)).await
    }

    pub async fn get_balance(&self, owner: Address) -> SwapResult<U256> {
        self.with_failover("eth_getBalance", |p| p.get_balance(owner, None))
            .await
    }

    pub async fn get_transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> SwapResult<Option<TransactionReceipt>> {
        self.with_failover("eth_getTransactionReceipt", |p| {
            p.get_transaction_receipt(tx_hash)
        })
        .await
    }
}
