//! Shape dispatch to router, wrapped-native and bridge entry points

use crate::chain::contracts::{self, BRIDGE, ROUTER, WRAPPED_NATIVE};
use crate::chain::{ContractCall, Network, ReceiptStatus};
use crate::context::AppContext;
use crate::error::{SwapError, SwapResult};
use crate::metrics;
use crate::swap::SwapShape;
use crate::tokens::Token;

use chrono::{DateTime, Utc};
use ethers::abi::Token as AbiToken;
use ethers::types::{Address, H256, U256};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Router swaps expire this long after submission
pub const SWAP_DEADLINE_SECS: i64 = 3600;

/// Unix deadline for a router swap submitted at `now`
pub fn deadline_at(now: DateTime<Utc>) -> U256 {
    U256::from((now.timestamp() + SWAP_DEADLINE_SECS).max(0) as u64)
}

/// What to execute, independent of how it was priced
#[derive(Debug, Clone)]
pub struct ExecutionOrder {
    pub from: Token,
    pub to: Token,
    /// The fixed side in base units: input for exact-in, output for exact-out
    pub amount: U256,
    pub recipient: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    /// Handed to the wallet, receipt not yet seen
    Pending,
    Confirmed,
    Failed,
}

/// One execution sent through the wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub hash: H256,
    /// Chain the transaction was signed for
    pub chain_id: u64,
    pub shape: SwapShape,
    pub submitted_at: DateTime<Utc>,
    pub status: TxStatus,
}

/// Build the contract call for `shape`.
///
/// `bound` is the minimum output for exact-in swaps and the maximum input for
/// exact-out swaps; wrap, unwrap and bridge calls ignore it.
pub fn build_call(
    network: &Network,
    shape: SwapShape,
    order: &ExecutionOrder,
    bound: U256,
    path: &[Address],
    deadline: U256,
) -> SwapResult<ContractCall> {
    let path_arg = || AbiToken::Array(path.iter().copied().map(AbiToken::Address).collect());
    let recipient = AbiToken::Address(order.recipient);
    let deadline = AbiToken::Uint(deadline);
    let amount = AbiToken::Uint(order.amount);
    let bound_arg = AbiToken::Uint(bound);

    let (to, abi, method, args, value) = match shape {
        SwapShape::Wrap => (
            network.wrapped_native,
            &*WRAPPED_NATIVE,
            "deposit",
            vec![],
            order.amount,
        ),
        SwapShape::Unwrap => (
            network.wrapped_native,
            &*WRAPPED_NATIVE,
            "withdraw",
            vec![amount],
            U256::zero(),
        ),
        SwapShape::NativeToTokenExactIn => (
            network.router()?,
            &*ROUTER,
            "swapExactETHForTokensSupportingFeeOnTransferTokens",
            vec![bound_arg, path_arg(), recipient, deadline],
            order.amount,
        ),
        SwapShape::NativeToTokenExactOut => (
            network.router()?,
            &*ROUTER,
            "swapETHForExactTokens",
            vec![amount, path_arg(), recipient, deadline],
            bound,
        ),
        SwapShape::TokenToNativeExactIn => (
            network.router()?,
            &*ROUTER,
            "swapExactTokensForETHSupportingFeeOnTransferTokens",
            vec![amount, bound_arg, path_arg(), recipient, deadline],
            U256::zero(),
        ),
        SwapShape::TokenToNativeExactOut => (
            network.router()?,
            &*ROUTER,
            "swapTokensForExactETH",
            vec![amount, bound_arg, path_arg(), recipient, deadline],
            U256::zero(),
        ),
        SwapShape::TokenToTokenExactIn => (
            network.router()?,
            &*ROUTER,
            "swapExactTokensForTokensSupportingFeeOnTransferTokens",
            vec![amount, bound_arg, path_arg(), recipient, deadline],
            U256::zero(),
        ),
        SwapShape::TokenToTokenExactOut => (
            network.router()?,
            &*ROUTER,
            "swapTokensForExactTokens",
            vec![amount, bound_arg, path_arg(), recipient, deadline],
            U256::zero(),
        ),
        SwapShape::CrossChainBridge if order.from.is_native() => {
            (network.bridge()?, &*BRIDGE, "bridgeETH", vec![], order.amount)
        }
        SwapShape::CrossChainBridge => (
            network.bridge()?,
            &*BRIDGE,
            "bridgeTokens",
            vec![AbiToken::Address(order.from.address), amount],
            U256::zero(),
        ),
    };

    if shape.requires_quote() && path.len() < 2 {
        return Err(SwapError::Internal(format!("{} needs a routed path", shape)));
    }

    Ok(ContractCall {
        chain_id: network.chain_id,
        to,
        data: contracts::encode_call(abi, method, &args)?,
        value,
        method,
    })
}

/// Sends the contract call for a classified request and tracks its receipt
pub struct TransactionExecutor {
    /// Wallet client and network table
    context: Arc<AppContext>,
}

impl TransactionExecutor {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    /// Fail with `ChainMismatch` unless the wallet is signing for `chain_id`
    pub async fn ensure_chain(&self, chain_id: u64) -> SwapResult<()> {
        let actual = self.context.client.active_chain().await?;
        if actual != chain_id {
            return Err(SwapError::ChainMismatch {
                expected: chain_id,
                actual,
            });
        }
        Ok(())
    }

    /// Hand the transaction to the wallet; the record is pending until confirmed
    pub async fn submit(
        &self,
        shape: SwapShape,
        order: &ExecutionOrder,
        bound: U256,
        path: &[Address],
    ) -> SwapResult<TransactionRecord> {
        let chain_id = order.from.chain_id;
        let network = self.context.network(chain_id)?;
        self.ensure_chain(chain_id).await?;

        let call = build_call(network, shape, order, bound, path, deadline_at(Utc::now()))?;
        info!(
            "Executing {} via {} on chain {}: amount {} bound {}",
            shape, call.method, chain_id, order.amount, bound
        );

        let hash = self.context.client.write(&call).await.map_err(|e| {
            let e = e.normalize_rejection();
            metrics::record_execution(
                shape.as_str(),
                if e.is_user_rejection() { "rejected" } else { "error" },
            );
            e
        })?;

        Ok(TransactionRecord {
            hash,
            chain_id,
            shape,
            submitted_at: Utc::now(),
            status: TxStatus::Pending,
        })
    }

    /// Wait for the receipt. Only a successful receipt confirms the record.
    pub async fn confirm(&self, mut record: TransactionRecord) -> SwapResult<TransactionRecord> {
        let started = Instant::now();
        let status = self
            .context
            .client
            .wait_for_receipt(record.chain_id, record.hash)
            .await?;
        metrics::record_execution_latency(record.shape.as_str(), started.elapsed().as_secs_f64());

        if status != ReceiptStatus::Success {
            error!(
                "{} transaction {:?} reverted on chain {}",
                record.shape, record.hash, record.chain_id
            );
            metrics::record_execution(record.shape.as_str(), "reverted");
            return Err(SwapError::ExecutionReverted {
                chain_id: record.chain_id,
                tx_hash: format!("{:?}", record.hash),
            });
        }

        info!("{} confirmed: {:?}", record.shape, record.hash);
        metrics::record_execution(record.shape.as_str(), "success");
        record.status = TxStatus::Confirmed;
        Ok(record)
    }

    pub async fn execute(
        &self,
        shape: SwapShape,
        order: &ExecutionOrder,
        bound: U256,
        path: &[Address],
    ) -> SwapResult<TransactionRecord> {
        let record = self.submit(shape, order, bound, path).await?;
        self.confirm(record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        context_with, eth, ethereum, pls, pulsechain, token_x, token_y, wpls, FakeChain,
        ScriptedQuotes,
    };

    fn e18(n: u64) -> U256 {
        U256::from(n) * U256::exp10(18)
    }

    fn order(from: Token, to: Token, amount: U256) -> ExecutionOrder {
        ExecutionOrder {
            from,
            to,
            amount,
            recipient: Address::repeat_byte(0x0f),
        }
    }

    fn route() -> Vec<Address> {
        vec![token_x().address, wpls().address]
    }

    fn decode(call: &ContractCall) -> Vec<AbiToken> {
        let abi = if call.method.starts_with("swap") {
            &*ROUTER
        } else if call.method.starts_with("bridge") {
            &*BRIDGE
        } else {
            &*WRAPPED_NATIVE
        };
        contracts::decode_call(abi, call.method, &call.data).unwrap()
    }

    #[test]
    fn test_wrap_deposits_value() {
        let network = pulsechain();
        let call = build_call(
            &network,
            SwapShape::Wrap,
            &order(pls(), wpls(), e18(10)),
            e18(10),
            &[],
            U256::from(1u64),
        )
        .unwrap();
        assert_eq!(call.method, "deposit");
        assert_eq!(call.to, network.wrapped_native);
        assert_eq!(call.value, e18(10));
        assert_eq!(&call.data[..], &[0xd0, 0xe3, 0x0d, 0xb0]);
    }

    #[test]
    fn test_unwrap_withdraws_without_value() {
        let call = build_call(
            &pulsechain(),
            SwapShape::Unwrap,
            &order(wpls(), pls(), e18(3)),
            e18(3),
            &[],
            U256::one(),
        )
        .unwrap();
        assert_eq!(call.method, "withdraw");
        assert!(call.value.is_zero());
        assert_eq!(decode(&call), vec![AbiToken::Uint(e18(3))]);
    }

    #[test]
    fn test_exact_in_token_to_native_argument_order() {
        let amount = U256::from(100_000_000u64);
        let bound = U256::from(475u64) * U256::exp10(17);
        let deadline = U256::from(1_700_003_600u64);
        let call = build_call(
            &pulsechain(),
            SwapShape::TokenToNativeExactIn,
            &order(token_x(), pls(), amount),
            bound,
            &route(),
            deadline,
        )
        .unwrap();

        assert_eq!(call.method, "swapExactTokensForETHSupportingFeeOnTransferTokens");
        assert!(call.value.is_zero());
        let args = decode(&call);
        assert_eq!(args[0], AbiToken::Uint(amount));
        assert_eq!(args[1], AbiToken::Uint(bound));
        assert_eq!(
            args[2],
            AbiToken::Array(route().into_iter().map(AbiToken::Address).collect())
        );
        assert_eq!(args[3], AbiToken::Address(Address::repeat_byte(0x0f)));
        assert_eq!(args[4], AbiToken::Uint(deadline));
    }

    #[test]
    fn test_native_exact_out_sends_maximum_input_as_value() {
        let call = build_call(
            &pulsechain(),
            SwapShape::NativeToTokenExactOut,
            &order(pls(), token_x(), U256::from(5_000_000u64)),
            e18(2),
            &[wpls().address, token_x().address],
            U256::one(),
        )
        .unwrap();
        assert_eq!(call.method, "swapETHForExactTokens");
        assert_eq!(call.value, e18(2));
        assert_eq!(decode(&call)[0], AbiToken::Uint(U256::from(5_000_000u64)));
    }

    #[test]
    fn test_every_router_shape_has_an_entry_point() {
        let shapes = [
            (SwapShape::NativeToTokenExactIn, pls(), token_x()),
            (SwapShape::TokenToNativeExactOut, token_x(), pls()),
            (SwapShape::TokenToTokenExactIn, token_x(), token_y()),
            (SwapShape::TokenToTokenExactOut, token_x(), token_y()),
        ];
        for (shape, from, to) in shapes {
            let call = build_call(
                &pulsechain(),
                shape,
                &order(from, to, e18(1)),
                e18(1),
                &route(),
                U256::one(),
            )
            .unwrap();
            assert_eq!(call.to, pulsechain().router.unwrap(), "{}", shape);
        }
    }

    #[test]
    fn test_router_shapes_need_a_path() {
        let err = build_call(
            &pulsechain(),
            SwapShape::TokenToTokenExactIn,
            &order(token_x(), token_y(), e18(1)),
            e18(1),
            &[],
            U256::one(),
        )
        .unwrap_err();
        assert!(matches!(err, SwapError::Internal(_)));
    }

    #[test]
    fn test_bridge_entry_points() {
        let network = ethereum();
        let native = build_call(
            &network,
            SwapShape::CrossChainBridge,
            &order(eth(), pls(), e18(1)),
            e18(1),
            &[],
            U256::one(),
        )
        .unwrap();
        assert_eq!(native.method, "bridgeETH");
        assert_eq!(native.value, e18(1));
        assert_eq!(native.to, network.bridge.unwrap());

        let weth = network.wrapped_token();
        let token = build_call(
            &network,
            SwapShape::CrossChainBridge,
            &order(weth.clone(), pls(), e18(2)),
            e18(2),
            &[],
            U256::one(),
        )
        .unwrap();
        assert_eq!(token.method, "bridgeTokens");
        assert_eq!(
            decode(&token),
            vec![AbiToken::Address(weth.address), AbiToken::Uint(e18(2))]
        );
    }

    #[test]
    fn test_deadline_is_one_hour_after_submission() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(deadline_at(now), U256::from(1_700_003_600u64));
    }

    #[tokio::test]
    async fn test_router_swap_carries_deadline() {
        let chain = Arc::new(FakeChain::new(369));
        let executor = TransactionExecutor::new(context_with(chain.clone(), ScriptedQuotes::new()));
        let before = deadline_at(Utc::now());

        executor
            .submit(
                SwapShape::TokenToNativeExactIn,
                &order(token_x(), pls(), e18(1)),
                U256::one(),
                &route(),
            )
            .await
            .unwrap();

        let writes = chain.writes();
        let args = decode(&writes[0]);
        let deadline = args[4].clone().into_uint().unwrap();
        assert!(deadline >= before);
        assert!(deadline <= deadline_at(Utc::now()));
    }

    #[tokio::test]
    async fn test_wrong_network_is_surfaced_not_retried() {
        let chain = Arc::new(FakeChain::new(1));
        let executor = TransactionExecutor::new(context_with(chain.clone(), ScriptedQuotes::new()));

        let err = executor
            .execute(SwapShape::Wrap, &order(pls(), wpls(), e18(1)), e18(1), &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SwapError::ChainMismatch {
                expected: 369,
                actual: 1
            }
        ));
        assert!(chain.writes().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_signature_is_user_rejected() {
        let chain = Arc::new(FakeChain::new(369).reject("deposit"));
        let executor = TransactionExecutor::new(context_with(chain.clone(), ScriptedQuotes::new()));

        let err = executor
            .execute(SwapShape::Wrap, &order(pls(), wpls(), e18(1)), e18(1), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::UserRejected));
    }

    #[tokio::test]
    async fn test_reverted_receipt_is_not_success() {
        let chain = Arc::new(FakeChain::new(369).revert("withdraw"));
        let executor = TransactionExecutor::new(context_with(chain.clone(), ScriptedQuotes::new()));

        let err = executor
            .execute(SwapShape::Unwrap, &order(wpls(), pls(), e18(1)), e18(1), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::ExecutionReverted { chain_id: 369, .. }));
        assert_eq!(chain.methods(), vec!["withdraw"]);
    }

    #[tokio::test]
    async fn test_confirmed_record() {
        let chain = Arc::new(FakeChain::new(369));
        let executor = TransactionExecutor::new(context_with(chain.clone(), ScriptedQuotes::new()));

        let record = executor
            .execute(SwapShape::Wrap, &order(pls(), wpls(), e18(10)), e18(10), &[])
            .await
            .unwrap();
        assert_eq!(record.status, TxStatus::Confirmed);
        assert_eq!(record.chain_id, 369);

        let writes = chain.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].value, e18(10));
    }
}
