use std::{path::Path, sync::Arc};

use mime_guess::mime::Mime;
use serde::Serialize;
use thiserror::Error;

use crate::transport::MultipartFile;

pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["pdf", "doc", "docx", "txt"];
pub const ALLOWED_MIME_TYPES: [&str; 4] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Title is required")]
    MissingTitle,
    #[error("File is required")]
    MissingFile,
    #[error("Title and file are required")]
    MissingTitleAndFile,
    #[error("Unsupported file type for '{file_name}'; allowed types are PDF, DOC, DOCX and TXT")]
    UnsupportedType { file_name: String },
    #[error("File size must be under 10MB ('{file_name}' is {size_bytes} bytes)")]
    TooLarge { file_name: String, size_bytes: u64 },
}

/// File picked by the user, held until submit or teardown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedFile {
    name: String,
    mime_type: String,
    size_bytes: u64,
    #[serde(skip)]
    bytes: Arc<[u8]>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes: bytes.len() as u64,
            bytes: bytes.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub(crate) fn to_multipart(&self) -> MultipartFile {
        MultipartFile {
            file_name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            bytes: self.bytes.to_vec(),
        }
    }
}

/// Both the declared MIME type and the extension must be allowed; type problems
/// are reported ahead of size problems.
pub fn validate_file(file: &SelectedFile) -> Result<(), ValidationError> {
    if !is_allowed_mime(file.mime_type()) || !is_allowed_extension(file.name()) {
        return Err(ValidationError::UnsupportedType {
            file_name: file.name().to_string(),
        });
    }
    if file.size_bytes() > MAX_UPLOAD_BYTES {
        return Err(ValidationError::TooLarge {
            file_name: file.name().to_string(),
            size_bytes: file.size_bytes(),
        });
    }
    Ok(())
}

/// Returns the trimmed title and the file to send.
pub fn validate_submission(
    title: &str,
    file: Option<&SelectedFile>,
) -> Result<(String, SelectedFile), ValidationError> {
    let title = title.trim();
    let file = match (title.is_empty(), file) {
        (true, None) => return Err(ValidationError::MissingTitleAndFile),
        (true, Some(_)) => return Err(ValidationError::MissingTitle),
        (false, None) => return Err(ValidationError::MissingFile),
        (false, Some(file)) => file,
    };
    validate_file(file)?;
    Ok((title.to_string(), file.clone()))
}

fn is_allowed_mime(mime_type: &str) -> bool {
    match mime_type.trim().parse::<Mime>() {
        Ok(mime) => ALLOWED_MIME_TYPES
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(mime.essence_str())),
        Err(_) => false,
    }
}

fn is_allowed_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
