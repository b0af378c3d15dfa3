//! Price and path quotes from the external quoting service
//!
//! This module provides:
//! - The `QuoteSource` seam and its HTTP implementation
//! - `QuoteResolver`, which debounces edits and binds each response to the
//!   request key that triggered it

mod client;
mod resolver;

pub use client::HttpQuoteSource;
pub use resolver::{QuoteResolver, QuoteState};

use crate::error::SwapResult;
use crate::swap::QuoteKey;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ethers::types::{Address, U256};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// A routed price bound to the request key it was fetched for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub key: QuoteKey,
    pub path: Vec<Address>,
    pub amount_in: U256,
    pub amount_out: U256,
    pub obtained_at: DateTime<Utc>,
    /// Monotonic receive time, used for expiry
    #[serde(skip)]
    pub received_at: Instant,
}

impl Quote {
    pub fn from_response(key: QuoteKey, response: PathResponse) -> Self {
        let (amount_in, amount_out) = if key.is_exact_in() {
            (key.amount, response.amount)
        } else {
            (response.amount, key.amount)
        };
        Self {
            key,
            path: response.path,
            amount_in,
            amount_out,
            obtained_at: Utc::now(),
            received_at: Instant::now(),
        }
    }

    /// Amount on the side the user did not type
    pub fn dependent_amount(&self) -> U256 {
        if self.key.is_exact_in() {
            self.amount_out
        } else {
            self.amount_in
        }
    }

    pub fn age(&self) -> Duration {
        self.received_at.elapsed()
    }

    pub fn is_expired(&self, max_age: Duration) -> bool {
        self.age() > max_age
    }
}

/// Body of `POST /api/trading/find-path`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathRequest {
    pub from_token: Address,
    pub to_token: Address,
    /// Base units, decimal
    pub amount: String,
    pub is_amount_in: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PathResponse {
    pub path: Vec<Address>,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: U256,
}

/// The service reports amounts as decimal strings, hex strings or plain numbers
fn deserialize_amount<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(U256::from(n)),
        Raw::Text(s) => {
            let s = s.trim();
            let parsed = match s.strip_prefix("0x") {
                Some(hex) => U256::from_str_radix(hex, 16).map_err(|e| format!("{:?}", e)),
                None => U256::from_dec_str(s).map_err(|e| format!("{:?}", e)),
            };
            parsed.map_err(|e| serde::de::Error::custom(format!("invalid amount {}: {}", s, e)))
        }
    }
}

/// Source of routed quotes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn find_path(&self, request: &PathRequest) -> SwapResult<PathResponse>;
}
