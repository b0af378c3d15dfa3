//! Production `ChainClient` driving an external wallet over JSON-RPC
//!
//! Signing stays inside the wallet: transactions go out as `eth_sendTransaction`
//! and network changes as `wallet_switchEthereumChain`. Reads and receipt polling
//! use the per-chain providers so they work regardless of the wallet's active chain.

use super::{ChainClient, ChainProvider, ContractCall, ReceiptStatus};
use crate::config::Settings;
use crate::error::{SwapError, SwapResult};

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

pub struct WalletClient {
    /// Wallet endpoint (signing, active chain)
    wallet: Provider<Http>,
    /// Connected account
    account: Address,
    /// Read providers indexed by chain ID
    providers: HashMap<u64, Arc<ChainProvider>>,
    receipt_poll_interval: Duration,
    receipt_timeout: Duration,
}

fn wallet_error(e: ProviderError) -> SwapError {
    SwapError::Wallet(e.to_string()).normalize_rejection()
}

impl WalletClient {
    /// Connect to the wallet endpoint and every enabled chain
    pub async fn connect(settings: &Settings) -> SwapResult<Self> {
        let wallet = Provider::<Http>::try_from(settings.wallet.rpc_url.as_str())
            .map_err(|e| SwapError::Config(format!("Invalid wallet RPC URL: {}", e)))?;

        let account = wallet
            .get_accounts()
            .await
            .map_err(wallet_error)?
            .first()
            .copied()
            .ok_or_else(|| SwapError::Wallet("Wallet exposes no accounts".to_string()))?;

        let mut providers = HashMap::new();
        for (name, chain_config) in settings.enabled_chains() {
            let provider = ChainProvider::new(chain_config)?;
            providers.insert(chain_config.chain_id, Arc::new(provider));
            debug!("Read provider ready for chain {} ({})", chain_config.chain_id, name);
        }

        info!("Wallet connected with account {:?}", account);

        Ok(Self {
            wallet,
            account,
            providers,
            receipt_poll_interval: Duration::from_millis(settings.wallet.receipt_poll_interval_ms),
            receipt_timeout: Duration::from_secs(settings.wallet.receipt_timeout_secs),
        })
    }

    fn provider(&self, chain_id: u64) -> SwapResult<&ChainProvider> {
        self.providers
            .get(&chain_id)
            .map(|p| p.as_ref())
            .ok_or(SwapError::ChainNotFound { chain_id })
    }
}

#[async_trait]
impl ChainClient for WalletClient {
    fn account(&self) -> Address {
        self.account
    }

    async fn active_chain(&self) -> SwapResult<u64> {
        self.wallet
            .get_chainid()
            .await
            .map(|id| id.as_u64())
            .map_err(wallet_error)
    }

    async fn switch_chain(&self, chain_id: u64) -> SwapResult<()> {
        let params = [serde_json::json!({ "chainId": format!("0x{:x}", chain_id) })];
        self.wallet
            .request::<_, serde_json::Value>("wallet_switchEthereumChain", params)
            .await
            .map_err(wallet_error)?;

        info!("Wallet switched to chain {}", chain_id);
        Ok(())
    }

    async fn native_balance(&self, chain_id: u64, owner: Address) -> SwapResult<U256> {
        self.provider(chain_id)?.get_balance(owner).await
    }

    async fn read(&self, chain_id: u64, to: Address, data: Bytes) -> SwapResult<Bytes> {
        self.provider(chain_id)?.call(to, data).await
    }

    async fn write(&self, call: &ContractCall) -> SwapResult<H256> {
        let tx = TransactionRequest::new()
            .from(self.account)
            .to(call.to)
            .data(call.data.clone())
            .value(call.value)
            .chain_id(call.chain_id);

        let pending = self
            .wallet
            .send_transaction(tx, None)
            .await
            .map_err(wallet_error)?;
        let tx_hash = pending.tx_hash();

        info!(
            "Transaction sent: {} {:?} on chain {}",
            call.method, tx_hash, call.chain_id
        );
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, chain_id: u64, tx_hash: H256) -> SwapResult<ReceiptStatus> {
        let provider = self.provider(chain_id)?;

        let poll = async {
            loop {
                match provider.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => debug!("Receipt for {:?} not available yet", tx_hash),
                    Err(e) => warn!("Receipt poll failed for {:?}: {}", tx_hash, e),
                }
                tokio::time::sleep(self.receipt_poll_interval).await;
            }
        };

        let receipt = timeout(self.receipt_timeout, poll)
            .await
            .map_err(|_| SwapError::Timeout {
                operation: format!("receipt of {:?} on chain {}", tx_hash, chain_id),
            })?;

        if receipt.status == Some(1u64.into()) {
            Ok(ReceiptStatus::Success)
        } else {
            warn!("Transaction {:?} reverted on chain {}", tx_hash, chain_id);
            Ok(ReceiptStatus::Reverted)
        }
    }
}
