use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use shared::{
    domain::{Document, DocumentId},
    error::ErrorKind,
    protocol::{DocumentListResponse, DownloadLinkResponse, DOWNLOAD_QUERY_KEY},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::{Endpoints, UrlRewrite},
    error::StoreError,
    status::StatusBoard,
    transport::{decode_store_reply, DocumentTransport},
    view_state::{ViewAction, ViewStore},
};

const LIST_FAILED: &str = "Failed to load documents";
const DOWNLOAD_FAILED: &str = "Failed to resolve download link";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Loaded(usize),
    Failed(ErrorKind),
    /// Dropped by the busy guard.
    Rejected,
    /// A newer request owns the list; this reply was discarded.
    Stale,
}

pub struct DocumentListController {
    store: ViewStore,
    status: Arc<StatusBoard>,
    transport: Arc<dyn DocumentTransport>,
    endpoints: Endpoints,
    url_rewrite: UrlRewrite,
    next_token: AtomicU64,
    refresh_pending: AtomicBool,
}

impl DocumentListController {
    pub fn new(
        store: ViewStore,
        status: Arc<StatusBoard>,
        transport: Arc<dyn DocumentTransport>,
        endpoints: Endpoints,
        url_rewrite: UrlRewrite,
    ) -> Self {
        Self {
            store,
            status,
            transport,
            endpoints,
            url_rewrite,
            next_token: AtomicU64::new(0),
            refresh_pending: AtomicBool::new(false),
        }
    }

    /// Loads the list unless one is already in flight. A refresh requested
    /// through [`refresh`](Self::refresh) during this fetch runs once more
    /// after it settles.
    pub async fn fetch(&self) -> FetchOutcome {
        let mut outcome = self.fetch_once().await;
        if outcome == FetchOutcome::Rejected {
            return outcome;
        }
        while self.refresh_pending.load(Ordering::SeqCst) {
            debug!("documents: running coalesced refresh");
            match self.fetch_once().await {
                FetchOutcome::Rejected => break,
                next => outcome = next,
            }
        }
        outcome
    }

    /// Like [`fetch`](Self::fetch), but if a fetch is already running the
    /// request is folded into it instead of dropped: that fetch repeats once
    /// it settles.
    pub async fn refresh(&self) -> FetchOutcome {
        self.refresh_pending.store(true, Ordering::SeqCst);
        let outcome = self.fetch().await;
        if outcome == FetchOutcome::Rejected {
            debug!("documents: refresh queued behind in-flight fetch");
        }
        outcome
    }

    async fn fetch_once(&self) -> FetchOutcome {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.store.dispatch(ViewAction::BeginFetch { token }) {
            debug!(request_token = token, "documents: fetch dropped, list request in flight");
            return FetchOutcome::Rejected;
        }
        // Anything this request returns already reflects a pending refresh.
        self.refresh_pending.store(false, Ordering::SeqCst);
        let guard = self.store.settle_on_drop(ViewAction::FetchFailed { token });
        info!(request_token = token, "documents: fetching list");

        let result: Result<DocumentListResponse, StoreError> =
            match self.transport.get_json(&self.endpoints.list).await {
                Ok(reply) => decode_store_reply(&reply),
                Err(err) => Err(err.into()),
            };

        match result {
            Ok(body) => {
                let documents: Vec<Document> = body
                    .documents
                    .into_iter()
                    .map(|document| map_document(self.url_rewrite, document))
                    .collect();
                let document_count = documents.len();
                if !guard.settle(ViewAction::FetchSucceeded { token, documents }) {
                    debug!(request_token = token, "documents: discarded stale list reply");
                    return FetchOutcome::Stale;
                }
                self.status.dismiss_retry_prompt();
                info!(request_token = token, document_count, "documents: list refreshed");
                FetchOutcome::Loaded(document_count)
            }
            Err(err) => {
                warn!(request_token = token, "documents: list fetch failed: {err}");
                if !guard.settle(ViewAction::FetchFailed { token }) {
                    debug!(request_token = token, "documents: discarded stale list failure");
                    return FetchOutcome::Stale;
                }
                self.status.error_with_retry(err.user_message(LIST_FAILED));
                FetchOutcome::Failed(err.kind())
            }
        }
    }

    /// Re-runs [`fetch`](Self::fetch). The previous error stays up until it resolves.
    pub async fn retry(&self) -> FetchOutcome {
        if self.store.read(|state| state.list_busy) {
            debug!("documents: retry dropped, list request in flight");
            return FetchOutcome::Rejected;
        }
        self.store.dispatch(ViewAction::BumpRetryToken);
        self.fetch().await
    }

    /// Asks the store for the current link of one document. Failures are posted
    /// as a status message and yield `None`.
    pub async fn resolve_download(&self, document_id: &DocumentId) -> Option<String> {
        let url = self.endpoints.download_link(&document_id.0);
        let result: Result<DownloadLinkResponse, StoreError> =
            match self.transport.get_json(&url).await {
                Ok(reply) => decode_store_reply(&reply),
                Err(err) => Err(err.into()),
            };

        match result {
            Ok(DownloadLinkResponse {
                file_url: Some(file_url),
                ..
            }) if !file_url.trim().is_empty() => Some(self.url_rewrite.apply(file_url.trim())),
            Ok(_) => {
                warn!(document_id = %document_id, "documents: download reply carried no file_url");
                self.status.error(DOWNLOAD_FAILED);
                None
            }
            Err(err) => {
                warn!(document_id = %document_id, "documents: download link lookup failed: {err}");
                self.status.error(err.user_message(DOWNLOAD_FAILED));
                None
            }
        }
    }
}

/// Store-compatibility shim: some deployments serve files under `/documents/`
/// while reporting `/media/` paths.
pub fn rewrite_media_path(url: &str) -> String {
    url.replacen("/media/", "/documents/", 1)
}

fn map_document(rewrite: UrlRewrite, mut document: Document) -> Document {
    document.download_url = rewrite.apply(&document.download_url);
    document
}

/// The document's link, optionally asking the store to serve it as an attachment.
pub fn download_link(document: &Document, force_download: bool) -> String {
    if !force_download {
        return document.download_url.clone();
    }

    match Url::parse(&document.download_url) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair(DOWNLOAD_QUERY_KEY, "true");
            url.to_string()
        }
        Err(_) => {
            let separator = if document.download_url.contains('?') { '&' } else { '?' };
            format!("{}{separator}{DOWNLOAD_QUERY_KEY}=true", document.download_url)
        }
    }
}
