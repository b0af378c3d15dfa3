//! Workflow coordination for swap and bridge requests
//!
//! The coordination layer:
//! 1. Classifies each edit and keeps the dependent amount in sync
//! 2. Binds quotes to the live request key
//! 3. Sequences approval before execution
//! 4. Reports progress through the lifecycle tracker

pub mod engine;
pub mod state;

pub use engine::{OrchestratorView, PairBalances, SwapOrchestrator};
pub use state::{Phase, Settlement};
