//! Cross-chain bridge terms: platform fee and per-token minimum

use crate::chain::contracts::{self, BRIDGE, OMNIBRIDGE};
use crate::chain::{ChainClient, Network};
use crate::error::{SwapError, SwapResult};
use crate::tokens::Token;

use super::slippage::BPS_DENOMINATOR;

use dashmap::DashMap;
use ethers::abi::Token as AbiToken;
use ethers::types::U256;
use std::sync::Arc;
use tracing::{debug, info};

/// Omnibridge fee applied on top of the per-token minimum, in 1/10000
const OMNIBRIDGE_KEEP_BPS: u64 = 9_975;

/// Output delivered for `input` after the platform fee
pub fn bridged_amount(input: U256, fee_bps: U256) -> SwapResult<U256> {
    let denominator = U256::from(BPS_DENOMINATOR);
    let keep = denominator
        .checked_sub(fee_bps)
        .ok_or_else(|| SwapError::Contract(format!("bridge fee {} bps exceeds 100%", fee_bps)))?;
    input
        .checked_mul(keep)
        .map(|v| v / denominator)
        .ok_or(SwapError::AmountOverflow("bridged amount"))
}

/// Smallest input that delivers at least `output` after the platform fee
pub fn required_input(output: U256, fee_bps: U256) -> SwapResult<U256> {
    let denominator = U256::from(BPS_DENOMINATOR);
    let keep = denominator
        .checked_sub(fee_bps)
        .filter(|k| !k.is_zero())
        .ok_or_else(|| SwapError::Contract(format!("bridge fee {} bps leaves nothing", fee_bps)))?;
    output
        .checked_mul(denominator)
        .map(|v| div_ceil(v, keep))
        .ok_or(SwapError::AmountOverflow("bridge input"))
}

/// Per-token minimum grossed up by the omnibridge fee
pub fn minimum_input(min_per_tx: U256) -> SwapResult<U256> {
    min_per_tx
        .checked_mul(U256::from(BPS_DENOMINATOR))
        .map(|v| div_ceil(v, U256::from(OMNIBRIDGE_KEEP_BPS)))
        .ok_or(SwapError::AmountOverflow("bridge minimum"))
}

fn div_ceil(numerator: U256, denominator: U256) -> U256 {
    let (quotient, remainder) = numerator.div_mod(denominator);
    if remainder.is_zero() {
        quotient
    } else {
        quotient + 1
    }
}

/// Reads and caches bridge terms from the source chain
pub struct BridgeTermsReader {
    client: Arc<dyn ChainClient>,
    /// Platform fee per source chain, read once per session
    fees: DashMap<u64, U256>,
}

impl BridgeTermsReader {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self {
            client,
            fees: DashMap::new(),
        }
    }

    /// Platform fee in basis points
    pub async fn platform_fee(&self, network: &Network) -> SwapResult<U256> {
        if let Some(fee) = self.fees.get(&network.chain_id) {
            return Ok(*fee);
        }

        let data = contracts::encode_call(&BRIDGE, "platformFee", &[])?;
        let out = self
            .client
            .read(network.chain_id, network.bridge()?, data)
            .await?;
        let fee = contracts::decode_uint(&BRIDGE, "platformFee", &out)?;
        if fee >= U256::from(BPS_DENOMINATOR) {
            return Err(SwapError::Contract(format!(
                "bridge on chain {} reports fee of {} bps",
                network.chain_id, fee
            )));
        }

        info!("Bridge fee on chain {}: {} bps", network.chain_id, fee);
        self.fees.insert(network.chain_id, fee);
        Ok(fee)
    }

    /// Minimum bridgeable input for `token`, fees included
    pub async fn minimum_for(&self, network: &Network, token: &Token) -> SwapResult<U256> {
        let args = [AbiToken::Address(network.route_address(token))];
        let data = contracts::encode_call(&OMNIBRIDGE, "minPerTx", &args)?;
        let out = self
            .client
            .read(network.chain_id, network.omnibridge()?, data)
            .await?;
        let min_per_tx = contracts::decode_uint(&OMNIBRIDGE, "minPerTx", &out)?;

        let minimum = minimum_input(min_per_tx)?;
        debug!(
            "Bridge minimum for {} on chain {}: {} (minPerTx {})",
            token.symbol, network.chain_id, minimum, min_per_tx
        );
        Ok(minimum)
    }
}
