//! Session context handed to every component

use crate::chain::{ChainClient, Network, WalletClient};
use crate::config::{OrchestratorConfig, Settings};
use crate::error::{SwapError, SwapResult};
use crate::quote::{HttpQuoteSource, QuoteSource};

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Configuration, wallet capabilities and quote source for one session
pub struct AppContext {
    pub config: OrchestratorConfig,
    pub client: Arc<dyn ChainClient>,
    pub quotes: Arc<dyn QuoteSource>,
    networks: HashMap<u64, Network>,
}

impl AppContext {
    pub fn new(
        config: OrchestratorConfig,
        client: Arc<dyn ChainClient>,
        quotes: Arc<dyn QuoteSource>,
        networks: impl IntoIterator<Item = Network>,
    ) -> Self {
        Self {
            config,
            client,
            quotes,
            networks: networks.into_iter().map(|n| (n.chain_id, n)).collect(),
        }
    }

    /// Build from settings with caller-supplied collaborators
    pub fn from_settings(
        settings: &Settings,
        client: Arc<dyn ChainClient>,
        quotes: Arc<dyn QuoteSource>,
    ) -> SwapResult<Self> {
        let networks = settings
            .enabled_chains()
            .into_iter()
            .map(|(_, chain)| Network::from_config(chain))
            .collect::<SwapResult<Vec<_>>>()?;

        Ok(Self::new(settings.orchestrator.clone(), client, quotes, networks))
    }

    /// Connect the wallet and quoting service described by `settings`
    pub async fn connect(settings: &Settings) -> SwapResult<Arc<Self>> {
        let client = Arc::new(WalletClient::connect(settings).await?);
        let quotes = Arc::new(HttpQuoteSource::new(&settings.quoting)?);
        let context = Self::from_settings(settings, client, quotes)?;

        info!(
            "Session ready on {} chain(s) for account {:?}",
            context.networks.len(),
            context.client.account()
        );
        Ok(Arc::new(context))
    }

    pub fn network(&self, chain_id: u64) -> SwapResult<&Network> {
        self.networks
            .get(&chain_id)
            .ok_or(SwapError::ChainNotFound { chain_id })
    }

    pub fn networks(&self) -> impl Iterator<Item = &Network> {
        self.networks.values()
    }
}
