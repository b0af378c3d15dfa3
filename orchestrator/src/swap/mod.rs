//! Swap domain: the live request, its classification and the bounds it settles under

pub mod bridge;
pub mod classifier;
pub mod request;
pub mod slippage;

pub use bridge::BridgeTermsReader;
pub use classifier::{SwapClassifier, SwapShape, TradeDirection};
pub use request::{EditedSide, QuoteKey, SwapRequest};
pub use slippage::bound_for;
