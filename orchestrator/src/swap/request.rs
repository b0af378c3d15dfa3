//! Live swap request and the key that ties a quote to it

use crate::error::SwapResult;
use crate::tokens::{Token, TokenId};

use ethers::types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which amount field the user typed into last
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditedSide {
    From,
    To,
}

impl fmt::Display for EditedSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditedSide::From => write!(f, "from"),
            EditedSide::To => write!(f, "to"),
        }
    }
}

/// The user's current intent. Each edit produces a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub from: Token,
    pub to: Token,
    pub from_amount: String,
    pub to_amount: String,
    pub edited: EditedSide,
    pub slippage_bps: u32,
}

impl SwapRequest {
    /// Request with the source amount typed in
    pub fn exact_in(from: Token, to: Token, amount: impl Into<String>, slippage_bps: u32) -> Self {
        Self {
            from,
            to,
            from_amount: amount.into(),
            to_amount: String::new(),
            edited: EditedSide::From,
            slippage_bps,
        }
    }

    /// Request with the destination amount typed in
    pub fn exact_out(from: Token, to: Token, amount: impl Into<String>, slippage_bps: u32) -> Self {
        Self {
            from,
            to,
            from_amount: String::new(),
            to_amount: amount.into(),
            edited: EditedSide::To,
            slippage_bps,
        }
    }

    pub fn with_from_amount(self, amount: impl Into<String>) -> Self {
        Self {
            from_amount: amount.into(),
            to_amount: String::new(),
            edited: EditedSide::From,
            ..self
        }
    }

    pub fn with_to_amount(self, amount: impl Into<String>) -> Self {
        Self {
            from_amount: String::new(),
            to_amount: amount.into(),
            edited: EditedSide::To,
            ..self
        }
    }

    pub fn with_tokens(self, from: Token, to: Token) -> Self {
        Self { from, to, ..self }
    }

    pub fn with_slippage(self, slippage_bps: u32) -> Self {
        Self {
            slippage_bps,
            ..self
        }
    }

    /// Swap direction, keeping the typed amount on its side
    pub fn flipped(self) -> Self {
        Self {
            from: self.to,
            to: self.from,
            from_amount: self.to_amount,
            to_amount: self.from_amount,
            edited: match self.edited {
                EditedSide::From => EditedSide::To,
                EditedSide::To => EditedSide::From,
            },
            slippage_bps: self.slippage_bps,
        }
    }

    pub fn edited_token(&self) -> &Token {
        match self.edited {
            EditedSide::From => &self.from,
            EditedSide::To => &self.to,
        }
    }

    pub fn dependent_token(&self) -> &Token {
        match self.edited {
            EditedSide::From => &self.to,
            EditedSide::To => &self.from,
        }
    }

    pub fn edited_amount(&self) -> &str {
        match self.edited {
            EditedSide::From => &self.from_amount,
            EditedSide::To => &self.to_amount,
        }
    }

    /// Typed amount in base units; `None` while the field is empty or zero
    pub fn parsed_amount(&self) -> SwapResult<Option<U256>> {
        let input = self.edited_amount().trim();
        if input.is_empty() {
            return Ok(None);
        }
        let amount = self.edited_token().parse_amount(input)?;
        Ok(if amount.is_zero() { None } else { Some(amount) })
    }
}

/// Identifies the request a quote was fetched for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QuoteKey {
    pub from: TokenId,
    pub to: TokenId,
    pub edited: EditedSide,
    pub amount: U256,
}

impl QuoteKey {
    pub fn new(request: &SwapRequest, amount: U256) -> Self {
        Self {
            from: request.from.id(),
            to: request.to.id(),
            edited: request.edited,
            amount,
        }
    }

    pub fn is_exact_in(&self) -> bool {
        self.edited == EditedSide::From
    }
}
