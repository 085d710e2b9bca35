use std::sync::Arc;

use shared::{
    domain::Document,
    error::ErrorKind,
    protocol::{UploadResponse, UPLOAD_FIELD_FILE, UPLOAD_FIELD_TITLE},
};
use tracing::{debug, info, warn};

use crate::{
    config::Endpoints,
    documents::DocumentListController,
    error::StoreError,
    status::StatusBoard,
    transport::{decode_store_reply, DocumentTransport, MultipartForm},
    validation::{validate_file, validate_submission, SelectedFile, ValidationError},
    view_state::{ViewAction, ViewStore},
};

const UPLOAD_FAILED: &str = "Upload failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Uploaded(Option<Document>),
    Invalid(ValidationError),
    Failed(ErrorKind),
    /// Dropped by the busy guard.
    Rejected,
}

impl SubmitOutcome {
    /// Which kind of failure ended the submit, if any.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Invalid(_) => Some(ErrorKind::Validation),
            Self::Failed(kind) => Some(*kind),
            Self::Uploaded(_) | Self::Rejected => None,
        }
    }
}

pub struct UploadController {
    store: ViewStore,
    status: Arc<StatusBoard>,
    transport: Arc<dyn DocumentTransport>,
    endpoints: Endpoints,
    documents: Arc<DocumentListController>,
}

impl UploadController {
    pub fn new(
        store: ViewStore,
        status: Arc<StatusBoard>,
        transport: Arc<dyn DocumentTransport>,
        endpoints: Endpoints,
        documents: Arc<DocumentListController>,
    ) -> Self {
        Self {
            store,
            status,
            transport,
            endpoints,
            documents,
        }
    }

    pub fn set_title(&self, text: impl Into<String>) {
        self.store.dispatch(ViewAction::SetTitle(text.into()));
    }

    /// Accepts the file only if it passes validation; a rejected pick resets the
    /// file input and posts the reason, leaving the title untouched.
    pub fn set_file(&self, file: SelectedFile) -> Result<(), ValidationError> {
        match validate_file(&file) {
            Ok(()) => {
                debug!(file_name = file.name(), size_bytes = file.size_bytes(), "upload: file selected");
                self.store.dispatch(ViewAction::SelectFile(file));
                Ok(())
            }
            Err(err) => {
                warn!(file_name = file.name(), "upload: file rejected: {err}");
                self.store.dispatch(ViewAction::RejectFile);
                self.status.error(err.to_string());
                Err(err)
            }
        }
    }

    pub fn clear_file(&self) {
        self.store.dispatch(ViewAction::ClearFile);
    }

    pub async fn submit(&self) -> SubmitOutcome {
        let (title, file, busy) = self
            .store
            .read(|state| (state.title.clone(), state.file.clone(), state.upload_busy));
        if busy {
            debug!("upload: submit dropped, upload in flight");
            return SubmitOutcome::Rejected;
        }

        let (title, file) = match validate_submission(&title, file.as_ref()) {
            Ok(valid) => valid,
            Err(err) => {
                self.status.error(err.to_string());
                return SubmitOutcome::Invalid(err);
            }
        };

        if !self.store.dispatch(ViewAction::BeginUpload) {
            debug!("upload: submit dropped, upload in flight");
            return SubmitOutcome::Rejected;
        }
        let guard = self.store.settle_on_drop(ViewAction::UploadFailed);
        info!(
            title = %title,
            file_name = file.name(),
            size_bytes = file.size_bytes(),
            "upload: submitting document"
        );

        let form = MultipartForm::new()
            .text(UPLOAD_FIELD_TITLE, title.as_str())
            .file(UPLOAD_FIELD_FILE, file.to_multipart());
        let result: Result<UploadResponse, StoreError> = match self
            .transport
            .post_multipart(&self.endpoints.upload, form)
            .await
        {
            Ok(reply) => decode_store_reply(&reply),
            Err(err) => Err(err.into()),
        };

        match result {
            Ok(body) => {
                guard.settle(ViewAction::UploadSucceeded);
                self.status.success(format!("\"{title}\" uploaded successfully"));
                info!(title = %title, "upload: document stored");
                self.documents.refresh().await;
                SubmitOutcome::Uploaded(body.document)
            }
            Err(err) => {
                warn!(title = %title, "upload: failed: {err}");
                guard.settle(ViewAction::UploadFailed);
                self.status.error(err.user_message(UPLOAD_FAILED));
                SubmitOutcome::Failed(err.kind())
            }
        }
    }

    /// Drops the pending upload, e.g. when the panel goes away.
    pub fn teardown(&self) {
        if self.store.dispatch(ViewAction::ResetForm) {
            debug!("upload: pending upload discarded");
        }
    }
}
