//! User-facing transaction notification
//!
//! A single current notification, last write wins. Success and error
//! notifications close themselves after a fixed delay; pending ones stay open
//! until replaced.

use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStatus {
    Pending,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleState {
    pub is_open: bool,
    pub status: LifecycleStatus,
    pub hash: Option<String>,
    pub message: Option<String>,
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self {
            is_open: false,
            status: LifecycleStatus::Pending,
            hash: None,
            message: None,
        }
    }
}

pub struct LifecycleTracker {
    state: Arc<watch::Sender<LifecycleState>>,
    dismiss_after: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl LifecycleTracker {
    pub fn new(dismiss_after: Duration) -> Self {
        let (state, _) = watch::channel(LifecycleState::default());
        Self {
            state: Arc::new(state),
            dismiss_after,
            timer: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> LifecycleState {
        self.state.borrow().clone()
    }

    pub fn show_pending(&self, message: impl Into<String>) {
        self.show(LifecycleStatus::Pending, None, message.into());
    }

    pub fn show_success(&self, hash: impl Into<String>, message: impl Into<String>) {
        self.show(LifecycleStatus::Success, Some(hash.into()), message.into());
    }

    pub fn show_error(&self, message: impl Into<String>) {
        self.show(LifecycleStatus::Error, None, message.into());
    }

    /// Close the notification, keeping its content
    pub fn dismiss(&self) {
        self.cancel_timer();
        self.state.send_modify(|s| s.is_open = false);
    }

    /// Stop the auto-dismiss timer
    pub fn shutdown(&self) {
        self.cancel_timer();
    }

    fn show(&self, status: LifecycleStatus, hash: Option<String>, message: String) {
        self.cancel_timer();
        debug!("Lifecycle {:?}: {}", status, message);
        self.state.send_replace(LifecycleState {
            is_open: true,
            status,
            hash,
            message: Some(message),
        });

        if status != LifecycleStatus::Pending {
            let state = self.state.clone();
            let delay = self.dismiss_after;
            let handle = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                state.send_modify(|s| s.is_open = false);
            });
            if let Ok(mut timer) = self.timer.lock() {
                *timer = Some(handle);
            }
        }
    }

    fn cancel_timer(&self) {
        if let Ok(mut timer) = self.timer.lock() {
            if let Some(handle) = timer.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for LifecycleTracker {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
