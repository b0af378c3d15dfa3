//! Swap Orchestrator - swap and bridge transaction workflow
//!
//! Classifies each swap request into a transaction shape, keeps routing quotes
//! bound to the live request, approves token spending when needed and tracks
//! execution through to the mined receipt.

pub mod chain;
pub mod config;
pub mod context;
pub mod coordination;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod quote;
pub mod swap;
pub mod telemetry;
pub mod tokens;
pub mod tx;

#[cfg(test)]
mod testing;

pub use chain::{ChainClient, ContractCall, Network, ReceiptStatus};
pub use config::Settings;
pub use context::AppContext;
pub use coordination::{OrchestratorView, Phase, Settlement, SwapOrchestrator};
pub use error::{SwapError, SwapResult};
pub use lifecycle::{LifecycleState, LifecycleStatus, LifecycleTracker};
pub use quote::{Quote, QuoteSource, QuoteState};
pub use swap::{EditedSide, SwapRequest, SwapShape};
pub use tokens::Token;
pub use tx::{TransactionRecord, TxStatus};
