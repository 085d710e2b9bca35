use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, PoisonError,
    },
    time::Duration,
};

use chrono::Utc;
use shared::domain::StatusKind;
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, warn};

use crate::view_state::{StatusAction, StatusMessage, ViewAction, ViewStore};

/// Posts transient status messages and owns the single pending expiry task.
pub struct StatusBoard {
    store: ViewStore,
    ttl: Duration,
    next_id: AtomicU64,
    expiry: Mutex<Option<JoinHandle<()>>>,
}

impl StatusBoard {
    pub fn new(store: ViewStore, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            next_id: AtomicU64::new(0),
            expiry: Mutex::new(None),
        }
    }

    pub fn info(&self, text: impl Into<String>) -> u64 {
        self.post(StatusKind::Info, text.into(), None)
    }

    pub fn success(&self, text: impl Into<String>) -> u64 {
        self.post(StatusKind::Success, text.into(), None)
    }

    pub fn error(&self, text: impl Into<String>) -> u64 {
        self.post(StatusKind::Error, text.into(), None)
    }

    pub fn error_with_retry(&self, text: impl Into<String>) -> u64 {
        self.post(StatusKind::Error, text.into(), Some(StatusAction::RetryFetch))
    }

    pub fn dismiss(&self) {
        self.cancel_expiry();
        self.store.dispatch(ViewAction::DismissStatus);
    }

    /// Clears the current message only if it is a failed-fetch prompt.
    pub fn dismiss_retry_prompt(&self) {
        if self.store.dispatch(ViewAction::DismissRetryPrompt) {
            self.cancel_expiry();
        }
    }

    pub fn shutdown(&self) {
        self.cancel_expiry();
    }

    fn post(&self, kind: StatusKind, text: String, action: Option<StatusAction>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let message = StatusMessage {
            id,
            text,
            kind,
            created_at: Utc::now(),
            action,
        };

        let mut expiry = self.expiry.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = expiry.take() {
            previous.abort();
        }
        self.store.dispatch(ViewAction::ShowStatus(message));

        match Handle::try_current() {
            Ok(runtime) => {
                let store = self.store.clone();
                let ttl = self.ttl;
                *expiry = Some(runtime.spawn(async move {
                    tokio::time::sleep(ttl).await;
                    if store.dispatch(ViewAction::ExpireStatus { id }) {
                        debug!(status_id = id, "status: message expired");
                    }
                }));
            }
            Err(_) => warn!(status_id = id, "status: no runtime available, message will not expire"),
        }
        id
    }

    fn cancel_expiry(&self) {
        let mut expiry = self.expiry.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = expiry.take() {
            handle.abort();
        }
    }
}

impl Drop for StatusBoard {
    fn drop(&mut self) {
        self.cancel_expiry();
    }
}

#[cfg(test)]
#[path = "tests/status_tests.rs"]
mod tests;
