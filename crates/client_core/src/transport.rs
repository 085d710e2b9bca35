//! HTTP capability the controllers depend on, plus the reqwest-backed implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, multipart, Client};
use serde::de::DeserializeOwned;
use shared::{error::ApiError, protocol::StoreReply};
use thiserror::Error;

use crate::error::StoreError;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("store unreachable: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Raw reply as received; interpretation happens in [`decode_store_reply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub reason: Option<String>,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            reason: None,
            body: body.to_string().into_bytes(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn status_line(&self) -> String {
        match self.reason.as_deref() {
            Some(reason) if !reason.is_empty() => format!("{} {reason}", self.status),
            _ => self.status.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    pub text_fields: Vec<(String, String)>,
    pub files: Vec<(String, MultipartFile)>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.text_fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, name: impl Into<String>, file: MultipartFile) -> Self {
        self.files.push((name.into(), file));
        self
    }

    pub fn text_field(&self, name: &str) -> Option<&str> {
        self.text_fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn file_field(&self, name: &str) -> Option<&MultipartFile> {
        self.files
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, file)| file)
    }

    fn into_reqwest(self) -> Result<multipart::Form, TransportError> {
        let mut form = multipart::Form::new();
        for (name, value) in self.text_fields {
            form = form.text(name, value);
        }
        for (name, file) in self.files {
            let part = multipart::Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(&file.mime_type)?;
            form = form.part(name, part);
        }
        Ok(form)
    }
}

#[async_trait]
pub trait DocumentTransport: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<HttpReply, TransportError>;
    async fn post_multipart(
        &self,
        url: &str,
        form: MultipartForm,
    ) -> Result<HttpReply, TransportError>;
}

pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    /// Every request is bounded by `timeout`; expiry surfaces as [`TransportError::Timeout`].
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    async fn collect(response: reqwest::Response) -> Result<HttpReply, TransportError> {
        let status = response.status();
        let body = response.bytes().await?;
        Ok(HttpReply {
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_owned),
            body: body.to_vec(),
        })
    }
}

#[async_trait]
impl DocumentTransport for ReqwestTransport {
    async fn get_json(&self, url: &str) -> Result<HttpReply, TransportError> {
        let response = self
            .http
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        Self::collect(response).await
    }

    async fn post_multipart(
        &self,
        url: &str,
        form: MultipartForm,
    ) -> Result<HttpReply, TransportError> {
        let response = self
            .http
            .post(url)
            .header(header::ACCEPT, "application/json")
            .multipart(form.into_reqwest()?)
            .send()
            .await?;
        Self::collect(response).await
    }
}

/// Interprets a reply: non-2xx, undecodable bodies and `success: false` all become errors.
pub fn decode_store_reply<T>(reply: &HttpReply) -> Result<T, StoreError>
where
    T: DeserializeOwned + StoreReply,
{
    if !reply.is_success() {
        return Err(StoreError::Status {
            status_line: reply.status_line(),
            message: body_message(&reply.body),
        });
    }

    let body: T = serde_json::from_slice(&reply.body)
        .map_err(|err| StoreError::Malformed(err.to_string()))?;
    if !body.success() {
        return Err(StoreError::Rejected {
            message: body
                .message()
                .map(str::trim)
                .filter(|message| !message.is_empty())
                .map(str::to_owned),
        });
    }
    Ok(body)
}

fn body_message(body: &[u8]) -> Option<String> {
    let envelope: ApiError = serde_json::from_slice(body).ok()?;
    let message = envelope.message.trim();
    (!message.is_empty()).then(|| message.to_string())
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
