//! Configuration management for the swap orchestrator
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use ethers::types::Address;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Largest decimal count whose scale factor fits in a U256
pub const MAX_DECIMALS: u8 = 77;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub orchestrator: OrchestratorConfig,
    pub quoting: QuotingConfig,
    pub wallet: WalletConfig,
    pub chains: HashMap<String, ChainConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_debounce_ms")]
    pub quote_debounce_ms: u64,
    #[serde(default = "default_dismiss_ms")]
    pub notification_dismiss_ms: u64,
    #[serde(default = "default_slippage_bps")]
    pub default_slippage_bps: u32,
    #[serde(default = "default_max_quote_age_secs")]
    pub max_quote_age_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuotingConfig {
    pub base_url: String,
    #[serde(default = "default_quote_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// JSON-RPC endpoint exposed by the external wallet
    pub rpc_url: String,
    #[serde(default = "default_receipt_poll_ms")]
    pub receipt_poll_interval_ms: u64,
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_urls: Vec<String>,
    pub native_symbol: String,
    #[serde(default = "default_native_decimals")]
    pub native_decimals: u8,
    pub wrapped_native: String,
    pub router_address: Option<String>,
    pub bridge_address: Option<String>,
    pub omnibridge_address: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_dismiss_ms() -> u64 {
    10_000
}

fn default_slippage_bps() -> u32 {
    50
}

fn default_max_quote_age_secs() -> u64 {
    60
}

fn default_quote_timeout_ms() -> u64 {
    10_000
}

fn default_receipt_poll_ms() -> u64 {
    1_000
}

fn default_receipt_timeout_secs() -> u64 {
    300
}

fn default_native_decimals() -> u8 {
    18
}

fn default_enabled() -> bool {
    true
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            quote_debounce_ms: default_debounce_ms(),
            notification_dismiss_ms: default_dismiss_ms(),
            default_slippage_bps: default_slippage_bps(),
            max_quote_age_secs: default_max_quote_age_secs(),
        }
    }
}

impl OrchestratorConfig {
    pub fn quote_debounce(&self) -> Duration {
        Duration::from_millis(self.quote_debounce_ms)
    }

    pub fn max_quote_age(&self) -> Duration {
        Duration::from_secs(self.max_quote_age_secs)
    }

    pub fn notification_dismiss(&self) -> Duration {
        Duration::from_millis(self.notification_dismiss_ms)
    }
}

impl Settings {
    /// Load settings from the file named by `SWAP_CONFIG` (default `config/default.toml`)
    pub fn load() -> Result<Self> {
        let config_path = env::var("SWAP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_toml_str(&config_str)
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml_str(input: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(input);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.enabled_chains().is_empty() {
            anyhow::bail!("At least one chain must be enabled");
        }

        let debounce = self.orchestrator.quote_debounce_ms;
        if !(100..=5_000).contains(&debounce) {
            anyhow::bail!("quote_debounce_ms must be between 100 and 5000, got {}", debounce);
        }

        if self.orchestrator.default_slippage_bps >= 10_000 {
            anyhow::bail!(
                "default_slippage_bps must be below 10000, got {}",
                self.orchestrator.default_slippage_bps
            );
        }

        if self.quoting.base_url.trim().is_empty() {
            anyhow::bail!("quoting.base_url is empty");
        }

        for (name, chain) in &self.chains {
            if !chain.enabled {
                continue;
            }
            if chain.rpc_urls.is_empty() {
                anyhow::bail!("Chain {} has no RPC URLs configured", name);
            }
            if chain.native_decimals > MAX_DECIMALS {
                anyhow::bail!(
                    "Chain {} native_decimals must be at most {}, got {}",
                    name,
                    MAX_DECIMALS,
                    chain.native_decimals
                );
            }
            parse_address(&chain.wrapped_native)
                .with_context(|| format!("Chain {} wrapped_native", name))?;
            for addr in [
                &chain.router_address,
                &chain.bridge_address,
                &chain.omnibridge_address,
            ]
            .into_iter()
            .flatten()
            {
                parse_address(addr).with_context(|| format!("Chain {} contract address", name))?;
            }
            if chain.router_address.is_none() && chain.bridge_address.is_none() {
                tracing::warn!("Chain {} has neither router nor bridge - wrap/unwrap only", name);
            }
        }

        Ok(())
    }

    /// Get list of enabled chains
    pub fn enabled_chains(&self) -> Vec<(&String, &ChainConfig)> {
        self.chains.iter().filter(|(_, c)| c.enabled).collect()
    }

    /// Get chain config by chain ID
    pub fn get_chain_by_id(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.values().find(|c| c.chain_id == chain_id)
    }
}

/// Parse a hex address, accepting any letter case
pub fn parse_address(input: &str) -> Result<Address> {
    Address::from_str(input.trim()).with_context(|| format!("Invalid address: {}", input))
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static regex");

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}

#[cfg(test)]
pub(crate) const SAMPLE_CONFIG: &str = r#"
[orchestrator]
quote_debounce_ms = 500
notification_dismiss_ms = 10000
default_slippage_bps = 500

[quoting]
base_url = "https://quotes.example.com"

[wallet]
rpc_url = "http://127.0.0.1:1248"

[chains.pulsechain]
chain_id = 369
name = "PulseChain"
rpc_urls = ["https://rpc.pulsechain.com"]
native_symbol = "PLS"
wrapped_native = "0xA1077a294dDE1B09bB078844df40758a5D0f9a27"
router_address = "0xfC1e0b34B5A23fAc02Be4a26Ec0545F349887C39"

[chains.ethereum]
chain_id = 1
name = "Ethereum"
rpc_urls = ["https://eth.llamarpc.com"]
native_symbol = "ETH"
wrapped_native = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"
bridge_address = "0x578833840b309620cbc9864f5e5e3f32b378027e"
omnibridge_address = "0x1715a3e4a142d8b698131108995174f37aeba10d"
"#;
