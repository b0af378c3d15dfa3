//! Session token cache with on-demand resolution of custom tokens

use super::{Token, TokenId};
use crate::chain::contracts::{self, ERC20};
use crate::chain::{ChainClient, Network};
use crate::config::MAX_DECIMALS;
use crate::error::{SwapError, SwapResult};

use dashmap::DashMap;
use ethers::types::{Address, U256};
use std::sync::Arc;
use tracing::{debug, info};

/// Tokens known to this session, keyed by `(chain_id, address)`
pub struct TokenRegistry {
    client: Arc<dyn ChainClient>,
    tokens: DashMap<TokenId, Token>,
}

impl TokenRegistry {
    /// Create a registry pre-seeded with each network's native and wrapped-native token
    pub fn new<'a>(
        client: Arc<dyn ChainClient>,
        networks: impl IntoIterator<Item = &'a Network>,
    ) -> Self {
        let tokens = DashMap::new();
        for network in networks {
            for token in [network.native_token(), network.wrapped_token()] {
                tokens.insert(token.id(), token);
            }
        }
        Self { client, tokens }
    }

    pub fn get(&self, id: &TokenId) -> Option<Token> {
        self.tokens.get(id).map(|t| t.clone())
    }

    /// Add a token from a static list
    pub fn insert(&self, token: Token) {
        self.tokens.insert(token.id(), token);
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Look up a token, fetching ERC20 metadata from chain on first use
    pub async fn resolve(&self, chain_id: u64, address: Address) -> SwapResult<Token> {
        let id = TokenId { chain_id, address };
        if let Some(token) = self.get(&id) {
            return Ok(token);
        }

        debug!("Fetching metadata for custom token {:?} on chain {}", address, chain_id);

        let read = |name: &'static str| {
            let client = self.client.clone();
            async move {
                let data = contracts::encode_call(&ERC20, name, &[])?;
                client.read(chain_id, address, data).await
            }
        };

        let (name_raw, symbol_raw, decimals_raw) =
            futures::try_join!(read("name"), read("symbol"), read("decimals"))?;

        let decimals = contracts::decode_uint(&ERC20, "decimals", &decimals_raw)?;
        if decimals > U256::from(MAX_DECIMALS) {
            return Err(SwapError::Contract(format!(
                "token {:?} reports {} decimals",
                address, decimals
            )));
        }

        let token = Token {
            chain_id,
            address,
            symbol: contracts::decode_string(&ERC20, "symbol", &symbol_raw)?,
            name: contracts::decode_string(&ERC20, "name", &name_raw)?,
            decimals: decimals.as_u32() as u8,
            logo_ref: None,
        };

        info!(
            "Resolved custom token {} ({:?}) on chain {}",
            token.symbol, address, chain_id
        );
        self.tokens.insert(id, token.clone());
        Ok(token)
    }
}
