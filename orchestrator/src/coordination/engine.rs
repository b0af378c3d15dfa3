//! End-to-end swap and bridge workflow
//!
//! `SwapOrchestrator` owns the single live request of a session. Edits go
//! through `set_request`, which classifies the request and either computes the
//! dependent amount locally (wrap, unwrap, bridge) or hands the request to the
//! quote resolver. A follower task applies resolver updates that still match
//! the live request key. `submit` runs balance, minimum and network checks,
//! the approval when the shape spends a token, then execution.

use super::state::{Phase, Settlement};
use crate::chain::{ChainBalanceReader, Network};
use crate::context::AppContext;
use crate::error::{SwapError, SwapResult};
use crate::lifecycle::{LifecycleState, LifecycleTracker};
use crate::quote::{PathRequest, Quote, QuoteResolver, QuoteState};
use crate::swap::bridge::{bridged_amount, required_input};
use crate::swap::slippage::BPS_DENOMINATOR;
use crate::swap::{
    bound_for, BridgeTermsReader, EditedSide, QuoteKey, SwapClassifier, SwapRequest, SwapShape,
};
use crate::tokens::{rescale, Token, TokenRegistry};
use crate::tx::{ApprovalManager, ExecutionOrder, TransactionExecutor, TransactionRecord, TxStatus};

use ethers::types::{Address, U256};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Wallet balances for the two tokens of the live request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PairBalances {
    /// Balance of the token being spent, on the source chain
    pub from: U256,
    /// Balance of the token being received, on the destination chain
    pub to: U256,
}

/// Everything the presentation layer renders
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrchestratorView {
    /// Current workflow phase
    pub phase: Phase,
    /// Shape of the live request, once classified
    pub shape: Option<SwapShape>,
    /// Resolver state, shown only while it belongs to the live request
    pub quote: QuoteState,
    /// Amount fields in display units
    pub from_amount: String,
    pub to_amount: String,
    /// The dependent amount field is read-only while a quote is loading
    pub dependent_locked: bool,
    /// True only in `ReadyToSubmit` with no submission in flight
    pub submit_enabled: bool,
    pub balances: Option<PairBalances>,
    /// Most recent execution of this session
    pub last_transaction: Option<TransactionRecord>,
    /// User-facing message of the last failure
    pub error: Option<String>,
}

impl Default for OrchestratorView {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            shape: None,
            quote: QuoteState::Idle,
            from_amount: String::new(),
            to_amount: String::new(),
            dependent_locked: false,
            submit_enabled: false,
            balances: None,
            last_transaction: None,
            error: None,
        }
    }
}

/// Mutable state of the single live request
struct Session {
    /// Current workflow phase
    phase: Phase,
    /// Latest request; each edit replaces it
    request: Option<SwapRequest>,
    /// Classification of `request`
    shape: Option<SwapShape>,
    /// Typed amount in base units of the edited token
    amount: Option<U256>,
    /// Identity a quote must carry to apply to this request
    key: Option<QuoteKey>,
    /// Body sent to the quoting service for `key`
    path_request: Option<PathRequest>,
    /// Amount on the side the user did not type
    dependent: Option<U256>,
    /// Last balances read for the pair
    balances: Option<PairBalances>,
    /// Most recent execution
    last_transaction: Option<TransactionRecord>,
    /// Message of the last failure, cleared on the next edit
    error: Option<String>,
}

impl Session {
    fn new() -> Self {
        Self {
            phase: Phase::Idle,
            request: None,
            shape: None,
            amount: None,
            key: None,
            path_request: None,
            dependent: None,
            balances: None,
            last_transaction: None,
            error: None,
        }
    }

    fn advance(&mut self, next: Phase) -> SwapResult<()> {
        let from = self.phase;
        self.phase = from.transition(next)?;
        debug!("Phase {} -> {}", from, next);
        Ok(())
    }

    fn settle_error(&mut self, message: String) {
        if self.phase != Phase::Settled(Settlement::Error) {
            debug!("Phase {} -> {}", self.phase, Phase::Settled(Settlement::Error));
        }
        self.phase = Phase::Settled(Settlement::Error);
        self.error = Some(message);
    }
}

/// Request state captured when a submission starts
struct Snapshot {
    request: SwapRequest,
    shape: SwapShape,
    amount: U256,
    key: Option<QuoteKey>,
    path_request: Option<PathRequest>,
    dependent: Option<U256>,
}

/// Amounts and route for one execution
struct Plan {
    /// Fixed side handed to the executor
    amount: U256,
    bound: U256,
    /// What leaves the user's balance at most
    spend: U256,
    path: Vec<Address>,
}

/// State shared between the orchestrator handle and its quote follower
struct Inner {
    /// Config, wallet and quote source
    context: Arc<AppContext>,
    /// Derives the shape of each request
    classifier: SwapClassifier,
    /// Debounced quotes bound to the live key
    resolver: QuoteResolver,
    /// Allowance checks before any token spend
    approvals: ApprovalManager,
    /// Builds and sends the contract call for a shape
    executor: TransactionExecutor,
    /// Pair balance reads
    balances: ChainBalanceReader,
    /// Bridge fee and minimum reads
    bridge: BridgeTermsReader,
    /// Known and custom tokens
    tokens: TokenRegistry,
    /// The single user-facing notification
    lifecycle: LifecycleTracker,
    /// Live request state
    session: Mutex<Session>,
    /// Published after every change to `session`
    view: watch::Sender<OrchestratorView>,
    /// Set while a submission runs
    submitting: AtomicBool,
    /// Background balance reads
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

/// Clears the in-flight flag however a submission ends
struct SubmitGuard<'a>(&'a AtomicBool);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Coordinates classification, quoting, approval and execution for one
/// session's swap and bridge requests
pub struct SwapOrchestrator {
    /// Shared state; the follower holds only a weak reference
    inner: Arc<Inner>,
    /// Task applying resolver updates to the session
    follower: JoinHandle<()>,
}

impl SwapOrchestrator {
    /// Build the orchestrator and start following quote updates.
    /// Must be called from within a Tokio runtime.
    pub fn new(context: Arc<AppContext>) -> Self {
        let client = context.client.clone();
        let (view, _) = watch::channel(OrchestratorView::default());

        let inner = Arc::new(Inner {
            classifier: SwapClassifier::new(context.networks()),
            resolver: QuoteResolver::new(context.quotes.clone(), context.config.quote_debounce()),
            approvals: ApprovalManager::new(client.clone()),
            executor: TransactionExecutor::new(context.clone()),
            balances: ChainBalanceReader::new(client.clone()),
            bridge: BridgeTermsReader::new(client.clone()),
            tokens: TokenRegistry::new(client, context.networks()),
            lifecycle: LifecycleTracker::new(context.config.notification_dismiss()),
            session: Mutex::new(Session::new()),
            view,
            submitting: AtomicBool::new(false),
            tasks: std::sync::Mutex::new(Vec::new()),
            context,
        });

        let follower = tokio::spawn(follow_quotes(
            Arc::downgrade(&inner),
            inner.resolver.subscribe(),
        ));

        info!("Swap orchestrator started");
        Self { inner, follower }
    }

    pub fn subscribe(&self) -> watch::Receiver<OrchestratorView> {
        self.inner.view.subscribe()
    }

    pub fn view(&self) -> OrchestratorView {
        self.inner.view.borrow().clone()
    }

    pub fn subscribe_lifecycle(&self) -> watch::Receiver<LifecycleState> {
        self.inner.lifecycle.subscribe()
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.inner.lifecycle.current()
    }

    pub fn dismiss_notification(&self) {
        self.inner.lifecycle.dismiss();
    }

    /// Replace the live request. Returns the derived shape.
    pub async fn set_request(&self, request: SwapRequest) -> SwapResult<SwapShape> {
        self.inner.set_request(request).await
    }

    /// Re-run the live request from scratch, e.g. after a failed attempt
    pub async fn retry(&self) -> SwapResult<SwapShape> {
        let request = self
            .inner
            .session
            .lock()
            .await
            .request
            .clone()
            .ok_or_else(|| SwapError::NotReady {
                phase: Phase::Idle.to_string(),
            })?;
        self.inner.set_request(request).await
    }

    /// Run approval (when needed) and execution for the live request
    pub async fn submit(&self) -> SwapResult<TransactionRecord> {
        if self.inner.submitting.swap(true, Ordering::SeqCst) {
            error!("submit() called while a submission is already in flight");
            return Err(SwapError::SubmitInFlight);
        }
        let guard = SubmitGuard(&self.inner.submitting);
        self.inner.publish(&*self.inner.session.lock().await);

        let result = self.inner.submit().await;

        drop(guard);
        self.inner.publish(&*self.inner.session.lock().await);
        result
    }

    /// Ask the wallet to switch to the chain the live request spends from
    pub async fn switch_to_source_chain(&self) -> SwapResult<()> {
        let chain_id = self
            .inner
            .session
            .lock()
            .await
            .request
            .as_ref()
            .map(|r| r.from.chain_id)
            .ok_or_else(|| SwapError::NotReady {
                phase: Phase::Idle.to_string(),
            })?;

        info!("Requesting wallet switch to chain {}", chain_id);
        self.inner.context.client.switch_chain(chain_id).await
    }

    pub async fn refresh_balances(&self) -> SwapResult<PairBalances> {
        self.inner.refresh_balances().await
    }

    /// Known token, or a custom one resolved from chain
    pub async fn resolve_token(&self, chain_id: u64, address: Address) -> SwapResult<Token> {
        self.inner.tokens.resolve(chain_id, address).await
    }

    /// Stop timers and background work
    pub async fn shutdown(&self) {
        self.inner.resolver.shutdown().await;
        self.inner.lifecycle.shutdown();
        self.inner.abort_tasks();
        self.follower.abort();
        info!("Swap orchestrator stopped");
    }
}

impl Drop for SwapOrchestrator {
    fn drop(&mut self) {
        self.follower.abort();
        self.inner.abort_tasks();
    }
}

async fn follow_quotes(inner: Weak<Inner>, mut updates: watch::Receiver<QuoteState>) {
    while updates.changed().await.is_ok() {
        let state = updates.borrow_and_update().clone();
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.on_quote(state).await;
    }
    debug!("Quote follower stopped");
}

impl Inner {
    fn publish(&self, session: &Session) {
        let resolver_state = self.resolver.state();
        let quote = match &session.key {
            Some(key) if resolver_state.key() == Some(key) => resolver_state,
            Some(key) if session.phase == Phase::Quoting => QuoteState::Loading { key: key.clone() },
            _ => QuoteState::Idle,
        };

        let (from_amount, to_amount) = match &session.request {
            Some(request) => {
                let dependent = session
                    .dependent
                    .map(|amount| request.dependent_token().format_amount(amount))
                    .unwrap_or_default();
                match request.edited {
                    EditedSide::From => (request.from_amount.clone(), dependent),
                    EditedSide::To => (dependent, request.to_amount.clone()),
                }
            }
            None => (String::new(), String::new()),
        };

        self.view.send_replace(OrchestratorView {
            phase: session.phase,
            shape: session.shape,
            quote,
            from_amount,
            to_amount,
            dependent_locked: session.phase == Phase::Quoting,
            submit_enabled: session.phase == Phase::ReadyToSubmit
                && !self.submitting.load(Ordering::SeqCst),
            balances: session.balances,
            last_transaction: session.last_transaction.clone(),
            error: session.error.clone(),
        });
    }

    async fn on_quote(&self, state: QuoteState) {
        let mut session = self.session.lock().await;

        if session.phase == Phase::Quoting {
            match state {
                QuoteState::Ready { quote } if session.key.as_ref() == Some(&quote.key) => {
                    session.dependent = Some(quote.dependent_amount());
                    session.error = None;
                    if let Err(e) = session.advance(Phase::ReadyToSubmit) {
                        warn!("Ignoring quote: {}", e);
                    }
                }
                QuoteState::Unavailable { key, reason } if session.key.as_ref() == Some(&key) => {
                    // Recoverable by editing; no notification
                    session.dependent = None;
                    session.settle_error(SwapError::QuoteUnavailable(reason).user_message());
                }
                _ => {}
            }
        }

        self.publish(&session);
    }

    async fn set_request(self: &Arc<Self>, request: SwapRequest) -> SwapResult<SwapShape> {
        if self.submitting.load(Ordering::SeqCst) {
            return Err(SwapError::SubmitInFlight);
        }

        let mut session = self.session.lock().await;
        // Re-check under the lock: a submit may have started while we waited
        if self.submitting.load(Ordering::SeqCst) || session.phase.is_busy() {
            return Err(SwapError::SubmitInFlight);
        }

        let pair_changed = session
            .request
            .as_ref()
            .map_or(true, |r| !r.from.same_as(&request.from) || !r.to.same_as(&request.to));

        session.advance(Phase::Classifying)?;
        session.request = Some(request.clone());
        session.shape = None;
        session.amount = None;
        session.key = None;
        session.path_request = None;
        session.dependent = None;
        session.error = None;
        if pair_changed {
            session.balances = None;
        }
        self.resolver.invalidate().await;

        let result = self.classify(&mut session, &request).await;
        if let Err(e) = &result {
            match e {
                SwapError::SameToken | SwapError::InvalidAmount(_) | SwapError::InvalidSlippage(_) => {
                    debug!("Request not actionable: {}", e);
                    session.advance(Phase::Idle)?;
                    session.error = Some(e.to_string());
                }
                _ => {
                    warn!("Failed to prepare {} -> {}: {}", request.from.symbol, request.to.symbol, e);
                    session.settle_error(e.user_message());
                }
            }
        }
        self.publish(&session);
        drop(session);

        if pair_changed {
            self.spawn_balance_refresh();
        }
        result
    }

    async fn classify(&self, session: &mut Session, request: &SwapRequest) -> SwapResult<SwapShape> {
        let shape = self
            .classifier
            .classify(&request.from, &request.to, request.edited)?;
        session.shape = Some(shape);

        if request.slippage_bps as u64 > BPS_DENOMINATOR {
            return Err(SwapError::InvalidSlippage(request.slippage_bps));
        }

        let Some(amount) = request.parsed_amount()? else {
            // Nothing typed yet
            session.advance(Phase::Idle)?;
            return Ok(shape);
        };
        session.amount = Some(amount);

        match shape {
            SwapShape::Wrap | SwapShape::Unwrap => {
                session.dependent = Some(amount);
                session.advance(Phase::ReadyToSubmit)?;
            }
            SwapShape::CrossChainBridge => {
                let network = self.context.network(request.from.chain_id)?;
                let fee = self.bridge.platform_fee(network).await?;
                let (from, to) = (&request.from, &request.to);
                let dependent = match request.edited {
                    EditedSide::From => {
                        rescale(bridged_amount(amount, fee)?, from.decimals, to.decimals)?
                    }
                    EditedSide::To => {
                        required_input(rescale(amount, to.decimals, from.decimals)?, fee)?
                    }
                };
                session.dependent = Some(dependent);
                session.advance(Phase::ReadyToSubmit)?;
            }
            _ => {
                let network = self.context.network(request.from.chain_id)?;
                let key = QuoteKey::new(request, amount);
                let path_request = PathRequest {
                    from_token: network.route_address(&request.from),
                    to_token: network.route_address(&request.to),
                    amount: amount.to_string(),
                    is_amount_in: key.is_exact_in(),
                };
                session.key = Some(key.clone());
                session.path_request = Some(path_request.clone());
                session.advance(Phase::Quoting)?;
                self.resolver.schedule(key, path_request).await;
            }
        }

        debug!(
            "Classified {} -> {} as {} ({} edited)",
            request.from.symbol, request.to.symbol, shape, request.edited
        );
        Ok(shape)
    }

    async fn submit(&self) -> SwapResult<TransactionRecord> {
        let snapshot = {
            let session = self.session.lock().await;
            let not_ready = || SwapError::NotReady {
                phase: session.phase.to_string(),
            };
            if session.phase != Phase::ReadyToSubmit {
                return Err(not_ready());
            }
            Snapshot {
                request: session.request.clone().ok_or_else(not_ready)?,
                shape: session.shape.ok_or_else(not_ready)?,
                amount: session.amount.ok_or_else(not_ready)?,
                key: session.key.clone(),
                path_request: session.path_request.clone(),
                dependent: session.dependent,
            }
        };

        let network = self.context.network(snapshot.request.from.chain_id)?;
        let plan = match self.plan(&snapshot, network) {
            Ok(plan) => plan,
            Err(e) => return Err(self.fail(&snapshot, e).await),
        };

        if let Err(e) = self.check_preconditions(&snapshot, network, &plan).await {
            // Nothing was signed; the request stays submittable
            warn!("Submission blocked: {}", e);
            self.lifecycle.show_error(e.user_message());
            let mut session = self.session.lock().await;
            session.error = Some(e.user_message());
            self.publish(&session);
            return Err(e);
        }

        match self.approve_and_execute(&snapshot, network, &plan).await {
            Ok(record) => {
                self.settle_success(&snapshot, record.clone()).await;
                Ok(record)
            }
            Err(e) => Err(self.fail(&snapshot, e).await),
        }
    }

    fn plan(&self, snapshot: &Snapshot, network: &Network) -> SwapResult<Plan> {
        let request = &snapshot.request;

        match snapshot.shape {
            SwapShape::Wrap | SwapShape::Unwrap => Ok(Plan {
                amount: snapshot.amount,
                bound: snapshot.amount,
                spend: snapshot.amount,
                path: Vec::new(),
            }),
            SwapShape::CrossChainBridge => {
                let dependent = snapshot.dependent.ok_or(SwapError::QuoteStale)?;
                let (input, output) = match request.edited {
                    EditedSide::From => (snapshot.amount, dependent),
                    EditedSide::To => (dependent, snapshot.amount),
                };
                debug!("Bridging {} to chain {} via {:?}", input, request.to.chain_id, network.bridge);
                Ok(Plan {
                    amount: input,
                    bound: output,
                    spend: input,
                    path: Vec::new(),
                })
            }
            shape => {
                let quote = self.live_quote(snapshot)?;
                let bound = bound_for(shape, &quote, request.slippage_bps)?;
                let key = &quote.key;
                let spend = if key.is_exact_in() { key.amount } else { bound };
                Ok(Plan {
                    amount: key.amount,
                    bound,
                    spend,
                    path: quote.path,
                })
            }
        }
    }

    /// The resolver's quote for the snapshot key, if present and fresh
    fn live_quote(&self, snapshot: &Snapshot) -> SwapResult<Quote> {
        let key = snapshot.key.as_ref().ok_or(SwapError::QuoteStale)?;
        if self.resolver.is_loading() {
            return Err(SwapError::QuoteStale);
        }
        let quote = self.resolver.current_for(key).ok_or(SwapError::QuoteStale)?;

        let max_age = self.context.config.max_quote_age();
        if quote.is_expired(max_age) {
            return Err(SwapError::QuoteExpired {
                age_secs: quote.age().as_secs() as i64,
            });
        }
        Ok(quote)
    }

    async fn check_preconditions(
        &self,
        snapshot: &Snapshot,
        network: &Network,
        plan: &Plan,
    ) -> SwapResult<()> {
        let from = &snapshot.request.from;
        let account = self.context.client.account();

        let balance = self.balances.balance_of(from, account).await?;
        if balance < plan.spend {
            return Err(SwapError::InsufficientBalance {
                symbol: from.symbol.clone(),
                have: from.format_amount(balance),
                need: from.format_amount(plan.spend),
            });
        }

        if snapshot.shape == SwapShape::CrossChainBridge {
            let minimum = self.bridge.minimum_for(network, from).await?;
            if plan.spend < minimum {
                return Err(SwapError::BelowMinimum {
                    symbol: from.symbol.clone(),
                    amount: from.format_amount(plan.spend),
                    minimum: from.format_amount(minimum),
                });
            }
        }

        self.executor.ensure_chain(from.chain_id).await
    }

    async fn approve_and_execute(
        &self,
        snapshot: &Snapshot,
        network: &Network,
        plan: &Plan,
    ) -> SwapResult<TransactionRecord> {
        let SwapRequest { from, to, .. } = &snapshot.request;
        let shape = snapshot.shape;
        let account = self.context.client.account();

        if shape.requires_approval(from) {
            self.advance(Phase::Approving).await?;
            self.lifecycle.show_pending(format!("Approving {}...", from.symbol));

            let spender = match shape {
                SwapShape::CrossChainBridge => network.bridge()?,
                _ => network.router()?,
            };
            let outcome = self
                .approvals
                .ensure_allowance(from, account, spender, plan.spend)
                .await?;
            debug!("Approval outcome for {}: {:?}", from.symbol, outcome);

            // The approval may have taken longer than the quote lives
            if shape.requires_quote() {
                self.live_quote(snapshot)?;
            }
        }

        self.advance(Phase::Executing).await?;
        let destination = self.context.network(to.chain_id)?;
        let (pending, _) = messages(shape, from, to, destination);
        self.lifecycle.show_pending(pending);

        let order = ExecutionOrder {
            from: from.clone(),
            to: to.clone(),
            amount: plan.amount,
            recipient: account,
        };
        let record = self
            .executor
            .submit(shape, &order, plan.bound, &plan.path)
            .await?;

        {
            let mut session = self.session.lock().await;
            session.last_transaction = Some(record.clone());
            self.publish(&session);
        }

        self.executor.confirm(record).await
    }

    async fn advance(&self, next: Phase) -> SwapResult<()> {
        let mut session = self.session.lock().await;
        session.advance(next)?;
        self.publish(&session);
        Ok(())
    }

    async fn settle_success(&self, snapshot: &Snapshot, record: TransactionRecord) {
        let SwapRequest { from, to, .. } = &snapshot.request;
        let success = match self.context.network(to.chain_id) {
            Ok(destination) => messages(snapshot.shape, from, to, destination).1,
            Err(_) => "Transaction completed successfully!".to_string(),
        };
        self.lifecycle
            .show_success(format!("0x{}", hex::encode(record.hash)), success);

        {
            let mut session = self.session.lock().await;
            if let Err(e) = session.advance(Phase::Settled(Settlement::Success)) {
                error!("Settling confirmed transaction: {}", e);
                session.phase = Phase::Settled(Settlement::Success);
            }
            session.last_transaction = Some(record);
            session.key = None;
            session.path_request = None;
            session.error = None;
            self.resolver.invalidate().await;
            self.publish(&session);
        }

        if let Err(e) = self.refresh_balances().await {
            warn!("Balance refresh after settlement failed: {}", e);
        }
    }

    /// Settle the attempt as failed. Stale or expired quotes are fetched again.
    async fn fail(&self, snapshot: &Snapshot, err: SwapError) -> SwapError {
        if err.is_user_rejection() {
            warn!("{} cancelled in wallet: {}", snapshot.shape, err);
        } else {
            error!("{} failed: {}", snapshot.shape, err);
        }
        self.lifecycle.show_error(err.user_message());

        let mut session = self.session.lock().await;
        session.settle_error(err.user_message());
        if let Some(record) = session.last_transaction.as_mut() {
            if record.status == TxStatus::Pending {
                record.status = TxStatus::Failed;
            }
        }

        if matches!(err, SwapError::QuoteStale | SwapError::QuoteExpired { .. }) {
            if let (Some(key), Some(request)) = (snapshot.key.clone(), snapshot.path_request.clone()) {
                info!("Re-quoting {} -> {}", snapshot.request.from.symbol, snapshot.request.to.symbol);
                session.dependent = None;
                let requoted = session
                    .advance(Phase::Classifying)
                    .and_then(|_| session.advance(Phase::Quoting));
                match requoted {
                    Ok(()) => self.resolver.refresh(key, request).await,
                    Err(e) => warn!("Cannot re-quote: {}", e),
                }
            }
        }

        self.publish(&session);
        err
    }

    async fn refresh_balances(&self) -> SwapResult<PairBalances> {
        let request = self
            .session
            .lock()
            .await
            .request
            .clone()
            .ok_or_else(|| SwapError::NotReady {
                phase: Phase::Idle.to_string(),
            })?;

        let account = self.context.client.account();
        let (from, to) = self
            .balances
            .pair_balances(&request.from, &request.to, account)
            .await?;
        let balances = PairBalances { from, to };

        let mut session = self.session.lock().await;
        let same_pair = session
            .request
            .as_ref()
            .map_or(false, |r| r.from.same_as(&request.from) && r.to.same_as(&request.to));
        if same_pair {
            session.balances = Some(balances);
            self.publish(&session);
        }
        Ok(balances)
    }

    fn spawn_balance_refresh(self: &Arc<Self>) {
        let inner = self.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = inner.refresh_balances().await {
                warn!("Balance refresh failed: {}", e);
            }
        });

        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.retain(|t| !t.is_finished());
            tasks.push(handle);
        }
    }

    fn abort_tasks(&self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            for handle in tasks.drain(..) {
                handle.abort();
            }
        }
    }
}

/// Pending and success notification text
fn messages(shape: SwapShape, from: &Token, to: &Token, destination: &Network) -> (String, String) {
    match shape {
        SwapShape::Wrap => (
            format!("Wrapping {}...", from.symbol),
            format!("{} wrapped successfully!", from.symbol),
        ),
        SwapShape::Unwrap => (
            format!("Unwrapping {}...", from.symbol),
            format!("{} unwrapped successfully!", from.symbol),
        ),
        SwapShape::CrossChainBridge => (
            format!("Bridging {} to {}...", from.symbol, destination.name),
            format!(
                "{} bridged successfully! Please wait for the transaction to be confirmed.",
                from.symbol
            ),
        ),
        _ => (
            format!("Swapping {} for {}...", from.symbol, to.symbol),
            format!("Swapped {} for {} successfully!", from.symbol, to.symbol),
        ),
    }
}
