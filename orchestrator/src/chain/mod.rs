//! Chain module - wallet and chain access for the orchestrator
//!
//! This module provides:
//! - The `ChainClient` capability set every component talks to
//! - Contract ABIs and call encoding
//! - Multi-RPC read providers with automatic failover
//! - The wallet JSON-RPC client used in production
//! - Native and token balance reads

pub mod balance;
pub mod contracts;
pub mod provider;
pub mod wallet;

pub use balance::ChainBalanceReader;
pub use provider::ChainProvider;
pub use wallet::WalletClient;

use crate::config::{parse_address, ChainConfig, MAX_DECIMALS};
use crate::error::{SwapError, SwapResult};
use crate::tokens::{Token, NATIVE_ADDRESS};

use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};

/// A state-changing contract call handed to the wallet for signing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub chain_id: u64,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    /// Contract entry point, for logs and metrics
    pub method: &'static str,
}

/// Outcome recorded in a mined receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

/// Capabilities of the external wallet and the chains behind it
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Connected account
    fn account(&self) -> Address;

    /// Chain the wallet is currently signing for
    async fn active_chain(&self) -> SwapResult<u64>;

    /// Ask the wallet to switch its active chain
    async fn switch_chain(&self, chain_id: u64) -> SwapResult<()>;

    /// Native balance of `owner`
    async fn native_balance(&self, chain_id: u64, owner: Address) -> SwapResult<U256>;

    /// Read-only contract call
    async fn read(&self, chain_id: u64, to: Address, data: Bytes) -> SwapResult<Bytes>;

    /// Submit a transaction; returns its hash once the wallet has broadcast it
    async fn write(&self, call: &ContractCall) -> SwapResult<H256>;

    /// Wait until the transaction is mined
    async fn wait_for_receipt(&self, chain_id: u64, tx_hash: H256) -> SwapResult<ReceiptStatus>;
}

/// Per-chain contract set and native currency
#[derive(Debug, Clone)]
pub struct Network {
    pub chain_id: u64,
    pub name: String,
    pub native_symbol: String,
    pub native_decimals: u8,
    pub wrapped_native: Address,
    pub router: Option<Address>,
    pub bridge: Option<Address>,
    pub omnibridge: Option<Address>,
}

impl Network {
    pub fn from_config(config: &ChainConfig) -> SwapResult<Self> {
        let parse = |s: &str| parse_address(s).map_err(|e| SwapError::Config(format!("{:#}", e)));
        let optional = |s: &Option<String>| s.as_deref().map(parse).transpose();

        if config.native_decimals > MAX_DECIMALS {
            return Err(SwapError::Config(format!(
                "chain {} native_decimals {} exceeds {}",
                config.chain_id, config.native_decimals, MAX_DECIMALS
            )));
        }

        Ok(Self {
            chain_id: config.chain_id,
            name: config.name.clone(),
            native_symbol: config.native_symbol.clone(),
            native_decimals: config.native_decimals,
            wrapped_native: parse(&config.wrapped_native)?,
            router: optional(&config.router_address)?,
            bridge: optional(&config.bridge_address)?,
            omnibridge: optional(&config.omnibridge_address)?,
        })
    }

    pub fn router(&self) -> SwapResult<Address> {
        self.router.ok_or(SwapError::MissingContract {
            chain_id: self.chain_id,
            contract: "router",
        })
    }

    pub fn bridge(&self) -> SwapResult<Address> {
        self.bridge.ok_or(SwapError::MissingContract {
            chain_id: self.chain_id,
            contract: "bridge",
        })
    }

    pub fn omnibridge(&self) -> SwapResult<Address> {
        self.omnibridge.ok_or(SwapError::MissingContract {
            chain_id: self.chain_id,
            contract: "omnibridge",
        })
    }

    pub fn native_token(&self) -> Token {
        Token {
            chain_id: self.chain_id,
            address: NATIVE_ADDRESS,
            symbol: self.native_symbol.clone(),
            name: self.native_symbol.clone(),
            decimals: self.native_decimals,
            logo_ref: None,
        }
    }

    pub fn wrapped_token(&self) -> Token {
        Token {
            chain_id: self.chain_id,
            address: self.wrapped_native,
            symbol: format!("W{}", self.native_symbol),
            name: format!("Wrapped {}", self.native_symbol),
            decimals: self.native_decimals,
            logo_ref: None,
        }
    }

    /// Address used in router paths: the native sentinel maps to wrapped native
    pub fn route_address(&self, token: &Token) -> Address {
        if token.is_native() {
            self.wrapped_native
        } else {
            token.address
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ethereum_config(native_decimals: u8) -> ChainConfig {
        ChainConfig {
            chain_id: 1,
            name: "Ethereum".into(),
            rpc_urls: vec!["https://eth.llamarpc.com".into()],
            native_symbol: "ETH".into(),
            native_decimals,
            wrapped_native: "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2".into(),
            router_address: None,
            bridge_address: Some("0x578833840b309620cbc9864f5e5e3f32b378027e".into()),
            omnibridge_address: None,
            enabled: true,
        }
    }

    #[test]
    fn test_network_from_config() {
        let network = Network::from_config(&ethereum_config(18)).unwrap();
        assert_eq!(network.native_token().decimals, 18);
        assert!(network.bridge().is_ok());
        assert!(matches!(
            network.router(),
            Err(SwapError::MissingContract { chain_id: 1, contract: "router" })
        ));
    }

    #[test]
    fn test_native_decimals_beyond_u256_scale_rejected() {
        assert!(Network::from_config(&ethereum_config(77)).is_ok());
        let err = Network::from_config(&ethereum_config(78)).unwrap_err();
        assert!(matches!(err, SwapError::Config(_)));
    }
}
