//! Client-side core of the document desk: upload and listing controllers over a
//! shared, observable [`ViewState`].
//!
//! Every mutation of the view goes through [`ViewStore::dispatch`]; the render
//! layer only subscribes. Network access is behind [`DocumentTransport`] so the
//! store can be swapped for a fake in tests.

pub mod config;
pub mod documents;
pub mod error;
pub mod format;
pub mod panel;
pub mod status;
pub mod transport;
pub mod upload;
pub mod validation;
pub mod view_state;

pub use config::{load_settings, ClientSettings, Endpoints, UrlRewrite};
pub use documents::{download_link, rewrite_media_path, DocumentListController, FetchOutcome};
pub use error::StoreError;
pub use panel::DocumentPanel;
pub use status::StatusBoard;
pub use transport::{
    DocumentTransport, HttpReply, MultipartFile, MultipartForm, ReqwestTransport, TransportError,
};
pub use upload::{SubmitOutcome, UploadController};
pub use validation::{validate_file, SelectedFile, ValidationError, MAX_UPLOAD_BYTES};
pub use view_state::{StatusAction, StatusMessage, ViewAction, ViewState, ViewStore};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod controller_tests;
