//! In-memory chain and quote fixtures for workflow tests

use crate::chain::contracts::{self, BRIDGE, ERC20, OMNIBRIDGE};
use crate::chain::{ChainClient, ContractCall, Network, ReceiptStatus};
use crate::config::OrchestratorConfig;
use crate::context::AppContext;
use crate::error::{SwapError, SwapResult};
use crate::quote::{PathRequest, PathResponse, Quote, QuoteSource};
use crate::swap::{EditedSide, QuoteKey};
use crate::tokens::Token;

use async_trait::async_trait;
use chrono::Utc;
use ethers::abi::{encode, Abi, Token as AbiToken};
use ethers::types::{Address, Bytes, H256, U256};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

fn address(s: &str) -> Address {
    Address::from_str(s).unwrap()
}

pub(crate) fn pulsechain() -> Network {
    Network {
        chain_id: 369,
        name: "PulseChain".into(),
        native_symbol: "PLS".into(),
        native_decimals: 18,
        wrapped_native: address("0xA1077a294dDE1B09bB078844df40758a5D0f9a27"),
        router: Some(address("0xfC1e0b34B5A23fAc02Be4a26Ec0545F349887C39")),
        bridge: None,
        omnibridge: None,
    }
}

pub(crate) fn ethereum() -> Network {
    Network {
        chain_id: 1,
        name: "Ethereum".into(),
        native_symbol: "ETH".into(),
        native_decimals: 18,
        wrapped_native: address("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"),
        router: None,
        bridge: Some(address("0x578833840b309620cbc9864f5e5e3f32b378027e")),
        omnibridge: Some(address("0x1715a3e4a142d8b698131108995174f37aeba10d")),
    }
}

pub(crate) fn networks() -> Vec<Network> {
    vec![pulsechain(), ethereum()]
}

pub(crate) fn pls() -> Token {
    pulsechain().native_token()
}

pub(crate) fn wpls() -> Token {
    pulsechain().wrapped_token()
}

pub(crate) fn eth() -> Token {
    ethereum().native_token()
}

pub(crate) fn weth() -> Token {
    ethereum().wrapped_token()
}

fn erc20(chain_id: u64, byte: u8, symbol: &str, name: &str, decimals: u8) -> Token {
    Token {
        chain_id,
        address: Address::repeat_byte(byte),
        symbol: symbol.into(),
        name: name.into(),
        decimals,
        logo_ref: None,
    }
}

/// Six-decimal token on PulseChain
pub(crate) fn token_x() -> Token {
    erc20(369, 0xaa, "TKX", "Token X", 6)
}

pub(crate) fn token_y() -> Token {
    erc20(369, 0xbb, "TKY", "Token Y", 18)
}

/// Bridged WETH on PulseChain
pub(crate) fn pweth() -> Token {
    erc20(369, 0xcc, "WETH", "Wrapped Ether from Ethereum", 18)
}

pub(crate) fn quote_key(amount: u64) -> QuoteKey {
    QuoteKey {
        from: token_x().id(),
        to: pls().id(),
        edited: EditedSide::From,
        amount: U256::from(amount),
    }
}

pub(crate) fn path_request(amount: u64) -> PathRequest {
    PathRequest {
        from_token: token_x().address,
        to_token: wpls().address,
        amount: amount.to_string(),
        is_amount_in: true,
    }
}

pub(crate) fn quote_for(amount_in: U256, amount_out: U256, exact_in: bool) -> Quote {
    Quote {
        key: QuoteKey {
            from: token_x().id(),
            to: pls().id(),
            edited: if exact_in { EditedSide::From } else { EditedSide::To },
            amount: if exact_in { amount_in } else { amount_out },
        },
        path: vec![token_x().address, wpls().address],
        amount_in,
        amount_out,
        obtained_at: Utc::now(),
        received_at: Instant::now(),
    }
}

pub(crate) fn context_with(chain: Arc<FakeChain>, quotes: ScriptedQuotes) -> Arc<AppContext> {
    context_with_config(chain, quotes, OrchestratorConfig::default())
}

pub(crate) fn context_with_config(
    chain: Arc<FakeChain>,
    quotes: ScriptedQuotes,
    config: OrchestratorConfig,
) -> Arc<AppContext> {
    Arc::new(AppContext::new(config, chain, Arc::new(quotes), networks()))
}

const REJECTION: &str = "MetaMask Tx Signature: User rejected the request.";

#[derive(Default)]
struct FakeState {
    active_chain: u64,
    native: HashMap<u64, U256>,
    tokens: HashMap<(u64, Address), U256>,
    /// (chain, token, spender)
    allowances: HashMap<(u64, Address, Address), U256>,
    platform_fee: U256,
    min_per_tx: U256,
    rejected: HashSet<&'static str>,
    reverted: HashSet<&'static str>,
    writes: Vec<ContractCall>,
    receipts: HashMap<H256, ReceiptStatus>,
    switches: Vec<u64>,
}

/// Wallet and chains held in memory. Approvals update allowances;
/// everything else is only recorded.
pub(crate) struct FakeChain {
    account: Address,
    state: Mutex<FakeState>,
}

impl FakeChain {
    pub(crate) fn new(active_chain: u64) -> Self {
        Self {
            account: Address::repeat_byte(0x0f),
            state: Mutex::new(FakeState {
                active_chain,
                platform_fee: U256::from(25u64),
                ..Default::default()
            }),
        }
    }

    fn with_state(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub(crate) fn with_native(self, chain_id: u64, amount: U256) -> Self {
        self.with_state(|s| {
            s.native.insert(chain_id, amount);
        });
        self
    }

    pub(crate) fn with_token(self, token: &Token, amount: U256) -> Self {
        self.with_state(|s| {
            s.tokens.insert((token.chain_id, token.address), amount);
        });
        self
    }

    pub(crate) fn with_allowance(self, token: &Token, spender: Address, amount: U256) -> Self {
        self.with_state(|s| {
            s.allowances
                .insert((token.chain_id, token.address, spender), amount);
        });
        self
    }

    pub(crate) fn with_bridge_terms(self, fee_bps: u64, min_per_tx: U256) -> Self {
        self.with_state(|s| {
            s.platform_fee = U256::from(fee_bps);
            s.min_per_tx = min_per_tx;
        });
        self
    }

    pub(crate) fn reject(self, method: &'static str) -> Self {
        self.set_rejected(method, true);
        self
    }

    pub(crate) fn revert(self, method: &'static str) -> Self {
        self.with_state(|s| {
            s.reverted.insert(method);
        });
        self
    }

    pub(crate) fn set_rejected(&self, method: &'static str, rejected: bool) {
        self.with_state(|s| {
            if rejected {
                s.rejected.insert(method);
            } else {
                s.rejected.remove(method);
            }
        });
    }

    pub(crate) fn writes(&self) -> Vec<ContractCall> {
        self.state.lock().unwrap().writes.clone()
    }

    pub(crate) fn methods(&self) -> Vec<&'static str> {
        self.writes().iter().map(|c| c.method).collect()
    }

    pub(crate) fn allowance(&self, token: &Token, spender: Address) -> U256 {
        let state = self.state.lock().unwrap();
        state
            .allowances
            .get(&(token.chain_id, token.address, spender))
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn active(&self) -> u64 {
        self.state.lock().unwrap().active_chain
    }

    fn answer_read(&self, chain_id: u64, to: Address, data: &[u8]) -> SwapResult<U256> {
        let state = self.state.lock().unwrap();
        let is = |abi: &Abi, name: &str| contracts::selector(abi, name).map(|s| data[..4] == s);

        if is(&ERC20, "allowance")? {
            let args = contracts::decode_call(&ERC20, "allowance", data)?;
            let spender = args[1].clone().into_address().unwrap();
            Ok(state
                .allowances
                .get(&(chain_id, to, spender))
                .copied()
                .unwrap_or_default())
        } else if is(&ERC20, "balanceOf")? {
            Ok(state.tokens.get(&(chain_id, to)).copied().unwrap_or_default())
        } else if is(&BRIDGE, "platformFee")? {
            Ok(state.platform_fee)
        } else if is(&OMNIBRIDGE, "minPerTx")? {
            Ok(state.min_per_tx)
        } else {
            Err(SwapError::Contract(format!("unexpected read on {:?}", to)))
        }
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    fn account(&self) -> Address {
        self.account
    }

    async fn active_chain(&self) -> SwapResult<u64> {
        Ok(self.active())
    }

    async fn switch_chain(&self, chain_id: u64) -> SwapResult<()> {
        self.with_state(|s| {
            s.active_chain = chain_id;
            s.switches.push(chain_id);
        });
        Ok(())
    }

    async fn native_balance(&self, chain_id: u64, _owner: Address) -> SwapResult<U256> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .native
            .get(&chain_id)
            .copied()
            .unwrap_or_default())
    }

    async fn read(&self, chain_id: u64, to: Address, data: Bytes) -> SwapResult<Bytes> {
        let value = self.answer_read(chain_id, to, &data)?;
        Ok(encode(&[AbiToken::Uint(value)]).into())
    }

    async fn write(&self, call: &ContractCall) -> SwapResult<H256> {
        // Signing prompts are suspension points
        tokio::task::yield_now().await;

        let mut state = self.state.lock().unwrap();
        if state.rejected.contains(call.method) {
            return Err(SwapError::Wallet(REJECTION.to_string()));
        }
        if call.chain_id != state.active_chain {
            return Err(SwapError::Wallet(format!(
                "wallet is on chain {}",
                state.active_chain
            )));
        }

        state.writes.push(call.clone());
        let hash = H256::from_low_u64_be(state.writes.len() as u64);
        let reverted = state.reverted.contains(call.method);

        if call.method == "approve" && !reverted {
            let args = contracts::decode_call(&ERC20, "approve", &call.data)?;
            let spender = args[0].clone().into_address().unwrap();
            let amount = args[1].clone().into_uint().unwrap();
            state
                .allowances
                .insert((call.chain_id, call.to, spender), amount);
        }

        let status = if reverted {
            ReceiptStatus::Reverted
        } else {
            ReceiptStatus::Success
        };
        state.receipts.insert(hash, status);
        Ok(hash)
    }

    async fn wait_for_receipt(&self, _chain_id: u64, tx_hash: H256) -> SwapResult<ReceiptStatus> {
        tokio::task::yield_now().await;
        self.state
            .lock()
            .unwrap()
            .receipts
            .get(&tx_hash)
            .copied()
            .ok_or_else(|| SwapError::Internal(format!("unknown transaction {:?}", tx_hash)))
    }
}

enum Scripted {
    Answer(U256),
    Fail,
}

/// Quote source answering by requested amount, after a per-amount delay
#[derive(Default)]
pub(crate) struct ScriptedQuotes {
    script: HashMap<String, (Duration, Scripted)>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedQuotes {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn answer(mut self, amount: impl Into<U256>, result: U256, delay: Duration) -> Self {
        let amount: U256 = amount.into();
        self.script
            .insert(amount.to_string(), (delay, Scripted::Answer(result)));
        self
    }

    pub(crate) fn fail(mut self, amount: impl Into<U256>, delay: Duration) -> Self {
        let amount: U256 = amount.into();
        self.script.insert(amount.to_string(), (delay, Scripted::Fail));
        self
    }

    /// Shared call counter, usable after the source is moved into a context
    pub(crate) fn counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl QuoteSource for ScriptedQuotes {
    async fn find_path(&self, request: &PathRequest) -> SwapResult<PathResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.get(&request.amount) {
            Some((delay, outcome)) => {
                tokio::time::sleep(*delay).await;
                match outcome {
                    Scripted::Answer(amount) => Ok(PathResponse {
                        path: vec![request.from_token, request.to_token],
                        amount: *amount,
                    }),
                    Scripted::Fail => Err(SwapError::QuoteUnavailable(
                        "quoting service returned 502 Bad Gateway".to_string(),
                    )),
                }
            }
            None => Err(SwapError::QuoteUnavailable(format!(
                "no script for amount {}",
                request.amount
            ))),
        }
    }
}
