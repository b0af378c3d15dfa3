//! Native and token balance reads

use super::contracts::{self, ERC20};
use super::ChainClient;
use crate::error::SwapResult;
use crate::tokens::Token;

use ethers::abi::Token as AbiToken;
use ethers::types::{Address, U256};
use std::sync::Arc;
use tracing::debug;

/// Stateless balance reader
pub struct ChainBalanceReader {
    client: Arc<dyn ChainClient>,
}

impl ChainBalanceReader {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self { client }
    }

    /// Balance of `owner` in `token` on the token's own chain
    pub async fn balance_of(&self, token: &Token, owner: Address) -> SwapResult<U256> {
        let balance = if token.is_native() {
            self.client.native_balance(token.chain_id, owner).await?
        } else {
            let data = contracts::encode_call(&ERC20, "balanceOf", &[AbiToken::Address(owner)])?;
            let out = self.client.read(token.chain_id, token.address, data).await?;
            contracts::decode_uint(&ERC20, "balanceOf", &out)?
        };

        debug!(
            "Balance of {:?}: {} {} on chain {}",
            owner, balance, token.symbol, token.chain_id
        );
        Ok(balance)
    }

    /// Both sides of a pair, read concurrently
    pub async fn pair_balances(
        &self,
        from: &Token,
        to: &Token,
        owner: Address,
    ) -> SwapResult<(U256, U256)> {
        futures::try_join!(self.balance_of(from, owner), self.balance_of(to, owner))
    }
}
