//! ERC20 allowance management

use crate::chain::contracts::{self, ERC20};
use crate::chain::{ChainClient, ContractCall, ReceiptStatus};
use crate::error::{SwapError, SwapResult};
use crate::metrics;
use crate::tokens::Token;

use ethers::abi::Token as AbiToken;
use ethers::types::{Address, H256, U256};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalOutcome {
    /// Allowance already covered the amount
    Skipped,
    Approved { tx_hash: H256 },
}

/// Ensures a spender may pull a token before anything spends it
pub struct ApprovalManager {
    client: Arc<dyn ChainClient>,
}

impl ApprovalManager {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self { client }
    }

    pub async fn allowance(&self, token: &Token, owner: Address, spender: Address) -> SwapResult<U256> {
        let data = contracts::encode_call(
            &ERC20,
            "allowance",
            &[AbiToken::Address(owner), AbiToken::Address(spender)],
        )?;
        let out = self.client.read(token.chain_id, token.address, data).await?;
        contracts::decode_uint(&ERC20, "allowance", &out)
    }

    /// Approve `spender` for the maximum amount unless `required` is already allowed.
    /// Returns only after the approval is mined successfully.
    pub async fn ensure_allowance(
        &self,
        token: &Token,
        owner: Address,
        spender: Address,
        required: U256,
    ) -> SwapResult<ApprovalOutcome> {
        if token.is_native() {
            return Ok(ApprovalOutcome::Skipped);
        }

        // Always read: the owner may have revoked an earlier grant
        let current = self.allowance(token, owner, spender).await?;
        if current >= required {
            debug!(
                "Allowance of {} for {:?} is {} (need {}), skipping approval",
                token.symbol, spender, current, required
            );
            metrics::record_approval("skipped");
            return Ok(ApprovalOutcome::Skipped);
        }

        let call = ContractCall {
            chain_id: token.chain_id,
            to: token.address,
            data: contracts::encode_call(
                &ERC20,
                "approve",
                &[AbiToken::Address(spender), AbiToken::Uint(U256::MAX)],
            )?,
            value: U256::zero(),
            method: "approve",
        };

        info!("Approving {} for {:?} on chain {}", token.symbol, spender, token.chain_id);

        let tx_hash = self.client.write(&call).await.map_err(|e| {
            let e = e.normalize_rejection();
            if e.is_user_rejection() {
                warn!("Approval of {} rejected in wallet", token.symbol);
                metrics::record_approval("rejected");
                SwapError::ApprovalRejected
            } else {
                metrics::record_approval("failed");
                SwapError::ApprovalFailed(e.to_string())
            }
        })?;

        let status = self
            .client
            .wait_for_receipt(token.chain_id, tx_hash)
            .await
            .map_err(|e| {
                metrics::record_approval("failed");
                SwapError::ApprovalFailed(e.to_string())
            })?;

        if status != ReceiptStatus::Success {
            metrics::record_approval("failed");
            return Err(SwapError::ApprovalFailed(format!(
                "approval {:?} reverted",
                tx_hash
            )));
        }

        info!("Approval of {} confirmed: {:?}", token.symbol, tx_hash);
        metrics::record_approval("approved");
        Ok(ApprovalOutcome::Approved { tx_hash })
    }
}
