//! Worst-case bounds enforced on chain

use super::classifier::{SwapShape, TradeDirection};
use crate::error::{SwapError, SwapResult};
use crate::quote::Quote;

use ethers::types::U256;

pub const BPS_DENOMINATOR: u64 = 10_000;

/// Minimum output for exact-in shapes, maximum input for exact-out shapes.
/// Shapes without a quote settle 1:1 (or by a fixed fee) and bound to the quoted output.
pub fn bound_for(shape: SwapShape, quote: &Quote, slippage_bps: u32) -> SwapResult<U256> {
    if slippage_bps as u64 > BPS_DENOMINATOR {
        return Err(SwapError::InvalidSlippage(slippage_bps));
    }
    let bps = U256::from(slippage_bps);
    let denominator = U256::from(BPS_DENOMINATOR);

    match shape.direction() {
        Some(TradeDirection::ExactIn) => quote
            .amount_out
            .checked_mul(denominator - bps)
            .map(|v| v / denominator)
            .ok_or(SwapError::AmountOverflow("minimum output")),
        Some(TradeDirection::ExactOut) => quote
            .amount_in
            .checked_mul(denominator + bps)
            .map(|v| v / denominator)
            .ok_or(SwapError::AmountOverflow("maximum input")),
        None => Ok(quote.amount_out),
    }
}
