//! Error types for the swap orchestrator

use thiserror::Error;

/// Main error type for the orchestrator
#[derive(Error, Debug)]
pub enum SwapError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Quote unavailable: {0}")]
    QuoteUnavailable(String),

    #[error("Quote no longer matches the live request")]
    QuoteStale,

    #[error("Quote expired after {age_secs}s")]
    QuoteExpired { age_secs: i64 },

    #[error("Approval rejected by user")]
    ApprovalRejected,

    #[error("Approval failed: {0}")]
    ApprovalFailed(String),

    #[error("Transaction rejected by user")]
    UserRejected,

    #[error("Wrong network: expected chain {expected}, wallet is on chain {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    #[error("Transaction {tx_hash} reverted on chain {chain_id}")]
    ExecutionReverted { chain_id: u64, tx_hash: String },

    #[error("Insufficient {symbol} balance: have {have}, need {need}")]
    InsufficientBalance {
        symbol: String,
        have: String,
        need: String,
    },

    #[error("Amount {amount} is below the {symbol} minimum of {minimum}")]
    BelowMinimum {
        symbol: String,
        amount: String,
        minimum: String,
    },

    #[error("Source and destination token are the same")]
    SameToken,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid slippage tolerance: {0} bps")]
    InvalidSlippage(u32),

    #[error("Amount overflow in {0}")]
    AmountOverflow(&'static str),

    #[error("No {contract} contract configured for chain {chain_id}")]
    MissingContract {
        chain_id: u64,
        contract: &'static str,
    },

    #[error("Cannot submit while {phase}")]
    NotReady { phase: String },

    #[error("A submission is already in flight")]
    SubmitInFlight,

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Chain connection error for chain {chain_id}: {message}")]
    ChainConnection { chain_id: u64, message: String },

    #[error("Chain {chain_id} not found")]
    ChainNotFound { chain_id: u64 },

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Contract error: {0}")]
    Contract(String),

    #[error("Timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Fragments wallets use when the user declines a signature prompt
const REJECTION_MARKERS: &[&str] = &[
    "user rejected",
    "user denied",
    "rejected by user",
    "user cancelled",
    "code: 4001",
];

/// Check whether a raw wallet/provider message describes a user rejection
pub fn is_rejection_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    REJECTION_MARKERS.iter().any(|m| lower.contains(m))
}

impl SwapError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SwapError::QuoteUnavailable(_)
                | SwapError::QuoteStale
                | SwapError::QuoteExpired { .. }
                | SwapError::ChainConnection { .. }
                | SwapError::Timeout { .. }
        )
    }

    /// Check if the user explicitly declined a wallet prompt
    pub fn is_user_rejection(&self) -> bool {
        match self {
            SwapError::UserRejected | SwapError::ApprovalRejected => true,
            SwapError::Wallet(msg) => is_rejection_message(msg),
            _ => false,
        }
    }

    /// Turn a raw wallet error that carries a rejection into `UserRejected`
    pub fn normalize_rejection(self) -> Self {
        if let SwapError::Wallet(msg) = &self {
            if is_rejection_message(msg) {
                return SwapError::UserRejected;
            }
        }
        self
    }

    /// Message shown to the user through the lifecycle tracker
    pub fn user_message(&self) -> String {
        match self {
            SwapError::ApprovalRejected => "Approval was cancelled by user".to_string(),
            SwapError::ApprovalFailed(_) => {
                "Approval transaction failed. Please try again.".to_string()
            }
            SwapError::UserRejected => "Transaction was cancelled by user".to_string(),
            SwapError::ChainMismatch { expected, .. } => {
                format!("Please switch your wallet to chain {}", expected)
            }
            SwapError::ExecutionReverted { tx_hash, .. } => {
                format!("Transaction {} failed on-chain", tx_hash)
            }
            SwapError::QuoteUnavailable(_) => {
                "Price quote unavailable. Edit the amount to retry.".to_string()
            }
            SwapError::QuoteStale | SwapError::QuoteExpired { .. } => {
                "Price quote expired. Refreshing, please submit again.".to_string()
            }
            SwapError::InsufficientBalance { symbol, .. } => {
                format!("Insufficient {} balance", symbol)
            }
            SwapError::BelowMinimum {
                symbol, minimum, ..
            } => format!("Minimum amount is {} {}", minimum, symbol),
            other => format!("Transaction failed: {}", other),
        }
    }
}

/// Result type for orchestrator operations
pub type SwapResult<T> = Result<T, SwapError>;
