use std::sync::{Arc, Mutex, PoisonError};

use tokio::{sync::watch, task::JoinHandle};
use tracing::info;

use crate::{
    config::ClientSettings,
    documents::{DocumentListController, FetchOutcome},
    status::StatusBoard,
    transport::{DocumentTransport, ReqwestTransport, TransportError},
    upload::UploadController,
    view_state::{ViewState, ViewStore},
};

/// Wires both controllers to one store and one transport. Mounting kicks off
/// the initial document fetch.
pub struct DocumentPanel {
    store: ViewStore,
    status: Arc<StatusBoard>,
    documents: Arc<DocumentListController>,
    uploads: UploadController,
    initial_load: Mutex<Option<JoinHandle<FetchOutcome>>>,
}

impl DocumentPanel {
    /// Must be called from within a tokio runtime.
    pub fn mount(settings: &ClientSettings, transport: Arc<dyn DocumentTransport>) -> Self {
        let store = ViewStore::new();
        let endpoints = settings.endpoints();
        let status = Arc::new(StatusBoard::new(store.clone(), settings.status_ttl));
        let documents = Arc::new(DocumentListController::new(
            store.clone(),
            status.clone(),
            transport.clone(),
            endpoints.clone(),
            settings.url_rewrite,
        ));
        let uploads = UploadController::new(
            store.clone(),
            status.clone(),
            transport,
            endpoints,
            documents.clone(),
        );

        info!(api_base_url = %settings.api_base_url, "panel: mounted");
        let initial = documents.clone();
        let initial_load = tokio::spawn(async move { initial.fetch().await });

        Self {
            store,
            status,
            documents,
            uploads,
            initial_load: Mutex::new(Some(initial_load)),
        }
    }

    pub fn connect(settings: &ClientSettings) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(settings.request_timeout)?;
        Ok(Self::mount(settings, Arc::new(transport)))
    }

    pub fn uploads(&self) -> &UploadController {
        &self.uploads
    }

    pub fn documents(&self) -> &DocumentListController {
        &self.documents
    }

    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    pub fn snapshot(&self) -> ViewState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.store.subscribe()
    }

    /// Waits for the mount-time fetch. Returns `None` once it has been awaited
    /// already or if the panel was unmounted first.
    pub async fn initial_load(&self) -> Option<FetchOutcome> {
        let handle = self
            .initial_load
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        handle.await.ok()
    }

    pub fn unmount(&self) {
        if let Some(handle) = self
            .initial_load
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        self.uploads.teardown();
        self.status.shutdown();
        info!("panel: unmounted");
    }
}

#[cfg(test)]
#[path = "tests/panel_tests.rs"]
mod tests;
