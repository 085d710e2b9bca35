//! Renderable snapshot plus the reducer every controller mutates it through.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::domain::{Document, StatusKind};
use tokio::sync::watch;

use crate::validation::SelectedFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusAction {
    /// The render layer offers a control that calls `DocumentListController::retry`.
    RetryFetch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub id: u64,
    pub text: String,
    pub kind: StatusKind,
    pub created_at: DateTime<Utc>,
    pub action: Option<StatusAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub title: String,
    pub file: Option<SelectedFile>,
    pub documents: Vec<Document>,
    pub upload_busy: bool,
    pub list_busy: bool,
    pub status: Option<StatusMessage>,
    pub retry_token: u64,
    pub list_request_token: u64,
    /// Bumped whenever the presentation layer must clear its file input.
    pub file_input_reset: u64,
}

impl ViewState {
    pub fn busy(&self) -> bool {
        self.upload_busy || self.list_busy
    }
}

#[derive(Debug, Clone)]
pub enum ViewAction {
    SetTitle(String),
    SelectFile(SelectedFile),
    /// A rejected pick: the input is reset, any previously accepted file stays.
    RejectFile,
    ClearFile,
    BeginUpload,
    UploadSucceeded,
    UploadFailed,
    BeginFetch { token: u64 },
    FetchSucceeded { token: u64, documents: Vec<Document> },
    FetchFailed { token: u64 },
    BumpRetryToken,
    ShowStatus(StatusMessage),
    ExpireStatus { id: u64 },
    DismissStatus,
    DismissRetryPrompt,
    ResetForm,
}

/// Applies one action. Returns whether anything changed; a `false` for
/// `BeginUpload`/`BeginFetch` means the busy guard refused the request and a
/// `false` for the fetch settlements means the token was stale.
pub fn reduce(state: &mut ViewState, action: ViewAction) -> bool {
    match action {
        ViewAction::SetTitle(title) => {
            if state.title == title {
                return false;
            }
            state.title = title;
            true
        }
        ViewAction::SelectFile(file) => {
            state.file = Some(file);
            true
        }
        ViewAction::RejectFile => {
            state.file_input_reset += 1;
            true
        }
        ViewAction::ClearFile => {
            if state.file.take().is_none() {
                return false;
            }
            state.file_input_reset += 1;
            true
        }
        ViewAction::BeginUpload => {
            if state.upload_busy {
                return false;
            }
            state.upload_busy = true;
            true
        }
        ViewAction::UploadSucceeded => {
            state.upload_busy = false;
            state.title.clear();
            state.file = None;
            state.file_input_reset += 1;
            true
        }
        ViewAction::UploadFailed => {
            let changed = state.upload_busy;
            state.upload_busy = false;
            changed
        }
        ViewAction::BeginFetch { token } => {
            if state.list_busy {
                return false;
            }
            state.list_busy = true;
            state.list_request_token = token;
            true
        }
        ViewAction::FetchSucceeded { token, documents } => {
            if token != state.list_request_token {
                return false;
            }
            state.list_busy = false;
            state.documents = documents;
            true
        }
        ViewAction::FetchFailed { token } => {
            if token != state.list_request_token {
                return false;
            }
            state.list_busy = false;
            true
        }
        ViewAction::BumpRetryToken => {
            state.retry_token += 1;
            true
        }
        ViewAction::ShowStatus(message) => {
            state.status = Some(message);
            true
        }
        ViewAction::ExpireStatus { id } => match &state.status {
            Some(current) if current.id == id => {
                state.status = None;
                true
            }
            _ => false,
        },
        ViewAction::DismissStatus => state.status.take().is_some(),
        ViewAction::DismissRetryPrompt => match &state.status {
            Some(current) if current.action == Some(StatusAction::RetryFetch) => {
                state.status = None;
                true
            }
            _ => false,
        },
        ViewAction::ResetForm => {
            let had_input = !state.title.is_empty() || state.file.is_some();
            state.title.clear();
            state.file = None;
            if had_input {
                state.file_input_reset += 1;
            }
            had_input
        }
    }
}

/// Single owner of the [`ViewState`]; observers subscribe to change notifications.
#[derive(Clone)]
pub struct ViewStore {
    tx: Arc<watch::Sender<ViewState>>,
}

impl Default for ViewStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ViewState::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn dispatch(&self, action: ViewAction) -> bool {
        self.tx.send_if_modified(|state| reduce(state, action))
    }

    pub fn snapshot(&self) -> ViewState {
        self.tx.borrow().clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&ViewState) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.tx.subscribe()
    }

    /// Arms `action` to be dispatched if the returned guard is dropped before
    /// [`SettleGuard::settle`] runs, so a cancelled request still clears its busy flag.
    pub(crate) fn settle_on_drop(&self, action: ViewAction) -> SettleGuard {
        SettleGuard {
            store: self.clone(),
            fallback: Some(action),
        }
    }
}

pub(crate) struct SettleGuard {
    store: ViewStore,
    fallback: Option<ViewAction>,
}

impl SettleGuard {
    pub(crate) fn settle(mut self, action: ViewAction) -> bool {
        self.fallback = None;
        self.store.dispatch(action)
    }
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        if let Some(action) = self.fallback.take() {
            self.store.dispatch(action);
        }
    }
}

#[cfg(test)]
#[path = "tests/view_state_tests.rs"]
mod tests;
