//! Swap shape classification
//!
//! The shape decides which contract entry point executes the request, whether a
//! routing quote is needed and whether the source token must be approved.

use super::request::EditedSide;
use crate::chain::Network;
use crate::error::{SwapError, SwapResult};
use crate::tokens::Token;

use ethers::types::Address;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SwapShape {
    Wrap,
    Unwrap,
    NativeToTokenExactIn,
    NativeToTokenExactOut,
    TokenToNativeExactIn,
    TokenToNativeExactOut,
    TokenToTokenExactIn,
    TokenToTokenExactOut,
    CrossChainBridge,
}

/// Which amount a router swap holds fixed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeDirection {
    ExactIn,
    ExactOut,
}

impl SwapShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwapShape::Wrap => "wrap",
            SwapShape::Unwrap => "unwrap",
            SwapShape::NativeToTokenExactIn => "native_to_token_exact_in",
            SwapShape::NativeToTokenExactOut => "native_to_token_exact_out",
            SwapShape::TokenToNativeExactIn => "token_to_native_exact_in",
            SwapShape::TokenToNativeExactOut => "token_to_native_exact_out",
            SwapShape::TokenToTokenExactIn => "token_to_token_exact_in",
            SwapShape::TokenToTokenExactOut => "token_to_token_exact_out",
            SwapShape::CrossChainBridge => "cross_chain_bridge",
        }
    }

    /// Router swaps need a path and a price from the quoting service
    pub fn requires_quote(&self) -> bool {
        self.direction().is_some()
    }

    pub fn direction(&self) -> Option<TradeDirection> {
        match self {
            SwapShape::NativeToTokenExactIn
            | SwapShape::TokenToNativeExactIn
            | SwapShape::TokenToTokenExactIn => Some(TradeDirection::ExactIn),
            SwapShape::NativeToTokenExactOut
            | SwapShape::TokenToNativeExactOut
            | SwapShape::TokenToTokenExactOut => Some(TradeDirection::ExactOut),
            SwapShape::Wrap | SwapShape::Unwrap | SwapShape::CrossChainBridge => None,
        }
    }

    /// Whether executing this shape pulls an ERC20 from the user
    pub fn requires_approval(&self, from: &Token) -> bool {
        match self {
            SwapShape::TokenToNativeExactIn
            | SwapShape::TokenToNativeExactOut
            | SwapShape::TokenToTokenExactIn
            | SwapShape::TokenToTokenExactOut => true,
            SwapShape::CrossChainBridge => !from.is_native(),
            _ => false,
        }
    }
}

impl fmt::Display for SwapShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pure classifier over the wrapped-native address of each known chain
#[derive(Debug, Clone, Default)]
pub struct SwapClassifier {
    wrapped_native: HashMap<u64, Address>,
}

impl SwapClassifier {
    pub fn new<'a>(networks: impl IntoIterator<Item = &'a Network>) -> Self {
        Self {
            wrapped_native: networks
                .into_iter()
                .map(|n| (n.chain_id, n.wrapped_native))
                .collect(),
        }
    }

    fn is_wrapped(&self, token: &Token) -> bool {
        self.wrapped_native
            .get(&token.chain_id)
            .map_or(false, |w| *w == token.address)
    }

    /// Classify a token pair. Identical tokens are rejected.
    pub fn classify(&self, from: &Token, to: &Token, edited: EditedSide) -> SwapResult<SwapShape> {
        if from.same_as(to) {
            return Err(SwapError::SameToken);
        }

        if from.chain_id != to.chain_id {
            return Ok(SwapShape::CrossChainBridge);
        }

        let exact_in = edited == EditedSide::From;
        let shape = match (from.is_native(), to.is_native()) {
            (true, _) if self.is_wrapped(to) => SwapShape::Wrap,
            (_, true) if self.is_wrapped(from) => SwapShape::Unwrap,
            (true, _) if exact_in => SwapShape::NativeToTokenExactIn,
            (true, _) => SwapShape::NativeToTokenExactOut,
            (_, true) if exact_in => SwapShape::TokenToNativeExactIn,
            (_, true) => SwapShape::TokenToNativeExactOut,
            _ if exact_in => SwapShape::TokenToTokenExactIn,
            _ => SwapShape::TokenToTokenExactOut,
        };
        Ok(shape)
    }
}
