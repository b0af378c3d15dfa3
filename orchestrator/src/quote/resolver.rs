//! Debounced quote resolution tagged by request key
//!
//! Every edit bumps a generation counter. A fetch only publishes its result if
//! its generation is still the live one when the response arrives; anything
//! older is dropped without touching the observable state. The underlying HTTP
//! call is never cancelled, only ignored.

use super::{PathRequest, Quote, QuoteSource};
use crate::error::{SwapError, SwapResult};
use crate::metrics;
use crate::swap::QuoteKey;

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum QuoteState {
    Idle,
    /// Dependent amount must be treated read-only
    Loading { key: QuoteKey },
    Ready { quote: Quote },
    Unavailable { key: QuoteKey, reason: String },
}

impl QuoteState {
    pub fn key(&self) -> Option<&QuoteKey> {
        match self {
            QuoteState::Idle => None,
            QuoteState::Loading { key } | QuoteState::Unavailable { key, .. } => Some(key),
            QuoteState::Ready { quote } => Some(&quote.key),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, QuoteState::Loading { .. })
    }
}

#[derive(Debug, Default)]
struct LiveKey {
    generation: u64,
    key: Option<QuoteKey>,
}

pub struct QuoteResolver {
    source: Arc<dyn QuoteSource>,
    debounce: Duration,
    live: Arc<Mutex<LiveKey>>,
    state: Arc<watch::Sender<QuoteState>>,
    /// Pending debounce timers and in-flight fetches
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl QuoteResolver {
    pub fn new(source: Arc<dyn QuoteSource>, debounce: Duration) -> Self {
        let (state, _) = watch::channel(QuoteState::Idle);
        Self {
            source,
            debounce,
            live: Arc::new(Mutex::new(LiveKey::default())),
            state: Arc::new(state),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<QuoteState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> QuoteState {
        self.state.borrow().clone()
    }

    /// Ready quote for `key`, if that is what the resolver currently holds
    pub fn current_for(&self, key: &QuoteKey) -> Option<Quote> {
        match &*self.state.borrow() {
            QuoteState::Ready { quote } if quote.key == *key => Some(quote.clone()),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    /// Make `key` the live request and fetch after the debounce window
    pub async fn schedule(&self, key: QuoteKey, request: PathRequest) {
        self.spawn_fetch(key, request, self.debounce).await;
    }

    /// Make `key` the live request and fetch immediately
    pub async fn refresh(&self, key: QuoteKey, request: PathRequest) {
        self.spawn_fetch(key, request, Duration::ZERO).await;
    }

    /// Schedule and wait for the outcome bound to `key`
    pub async fn resolve(&self, key: QuoteKey, request: PathRequest) -> SwapResult<Quote> {
        let mut updates = self.subscribe();
        self.schedule(key.clone(), request).await;

        let settled = updates
            .wait_for(|state| !matches!(state, QuoteState::Loading { key: k } if *k == key))
            .await
            .map_err(|_| SwapError::Internal("quote state channel closed".to_string()))?
            .clone();

        match settled {
            QuoteState::Ready { quote } if quote.key == key => Ok(quote),
            QuoteState::Unavailable { key: k, reason } if k == key => {
                Err(SwapError::QuoteUnavailable(reason))
            }
            _ => Err(SwapError::QuoteStale),
        }
    }

    /// Drop the live key; any response still in flight will be discarded
    pub async fn invalidate(&self) {
        let mut live = self.live.lock().await;
        live.generation += 1;
        live.key = None;
        self.state.send_replace(QuoteState::Idle);
    }

    /// Cancel pending timers and stop publishing
    pub async fn shutdown(&self) {
        self.invalidate().await;
        for handle in self.tasks.lock().await.drain(..) {
            handle.abort();
        }
        debug!("Quote resolver stopped");
    }

    async fn spawn_fetch(&self, key: QuoteKey, request: PathRequest, delay: Duration) {
        let generation = {
            let mut live = self.live.lock().await;
            live.generation += 1;
            live.key = Some(key.clone());
            self.state
                .send_replace(QuoteState::Loading { key: key.clone() });
            live.generation
        };

        let handle = tokio::spawn(fetch(
            self.source.clone(),
            self.live.clone(),
            self.state.clone(),
            generation,
            key,
            request,
            delay,
        ));

        let mut tasks = self.tasks.lock().await;
        tasks.retain(|t| !t.is_finished());
        tasks.push(handle);
    }
}

impl Drop for QuoteResolver {
    fn drop(&mut self) {
        for handle in self.tasks.get_mut().drain(..) {
            handle.abort();
        }
    }
}

async fn fetch(
    source: Arc<dyn QuoteSource>,
    live: Arc<Mutex<LiveKey>>,
    state: Arc<watch::Sender<QuoteState>>,
    generation: u64,
    key: QuoteKey,
    request: PathRequest,
    delay: Duration,
) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
        if live.lock().await.generation != generation {
            debug!("Quote request superseded within debounce window");
            return;
        }
    }

    metrics::record_quote_requested();
    let result = source.find_path(&request).await;

    // Hold the live key while publishing so a newer schedule cannot interleave
    let live = live.lock().await;
    if live.generation != generation {
        metrics::record_quote_discarded();
        debug!(
            "Discarding late quote for {:?} -> {:?} ({})",
            key.from.address, key.to.address, key.amount
        );
        return;
    }

    let next = match result {
        Ok(response) => {
            let quote = Quote::from_response(key, response);
            debug!(
                "Quote ready: in {} out {} via {} hops",
                quote.amount_in,
                quote.amount_out,
                quote.path.len().saturating_sub(1)
            );
            QuoteState::Ready { quote }
        }
        Err(e) => {
            warn!("Quote unavailable: {}", e);
            metrics::record_quote_failed();
            QuoteState::Unavailable {
                key,
                reason: e.to_string(),
            }
        }
    };
    state.send_replace(next);
}
