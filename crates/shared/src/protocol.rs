use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::Document;

pub const LIST_DOCUMENTS_PATH: &str = "/api/documents/";
pub const UPLOAD_DOCUMENT_PATH: &str = "/api/upload/";

pub const UPLOAD_FIELD_TITLE: &str = "title";
pub const UPLOAD_FIELD_FILE: &str = "file";

pub const DOWNLOAD_QUERY_KEY: &str = "download";

pub fn download_link_path(document_id: &str) -> String {
    format!("/api/documents/{document_id}/download/")
}

/// Common shape of every store reply: a success flag plus an optional reason.
pub trait StoreReply {
    fn success(&self) -> bool;
    fn message(&self) -> Option<&str>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub success: bool,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    /// Some store variants return a trimmed record here; anything that does not
    /// parse as a full [`Document`] is treated as absent.
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_document",
        skip_serializing_if = "Option::is_none"
    )]
    pub document: Option<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadLinkResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

macro_rules! impl_store_reply {
    ($name:ident) => {
        impl StoreReply for $name {
            fn success(&self) -> bool {
                self.success
            }

            fn message(&self) -> Option<&str> {
                self.message.as_deref()
            }
        }
    };
}

impl_store_reply!(DocumentListResponse);
impl_store_reply!(UploadResponse);
impl_store_reply!(DownloadLinkResponse);

fn deserialize_lenient_document<'de, D>(deserializer: D) -> Result<Option<Document>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| serde_json::from_value(value).ok()))
}
