use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::{
    config::ClientSettings,
    panel::DocumentPanel,
    transport::{DocumentTransport, HttpReply, MultipartForm, TransportError},
};

type Scripted = Result<HttpReply, TransportError>;

/// Replays queued replies in order and records every request it sees.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    gets: Mutex<VecDeque<Scripted>>,
    posts: Mutex<VecDeque<Scripted>>,
    get_urls: Mutex<Vec<String>>,
    posted: Mutex<Vec<(String, MultipartForm)>>,
    upload_gate: Option<Arc<Notify>>,
    list_gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Uploads park until the gate is notified.
    pub(crate) fn with_upload_gate(gate: Arc<Notify>) -> Self {
        Self {
            upload_gate: Some(gate),
            ..Self::default()
        }
    }

    /// The first GET parks until the gate is notified; later ones run freely.
    pub(crate) fn with_first_get_gate(gate: Arc<Notify>) -> Self {
        Self {
            list_gate: Mutex::new(Some(gate)),
            ..Self::default()
        }
    }

    pub(crate) fn push_get(&self, reply: Scripted) {
        self.gets.lock().expect("gets").push_back(reply);
    }

    pub(crate) fn push_list(&self, documents: Value) {
        self.push_get(Ok(HttpReply::json(
            200,
            &json!({"success": true, "documents": documents}),
        )));
    }

    pub(crate) fn push_post(&self, reply: Scripted) {
        self.posts.lock().expect("posts").push_back(reply);
    }

    pub(crate) fn get_count(&self) -> usize {
        self.get_urls.lock().expect("get urls").len()
    }

    pub(crate) fn get_urls(&self) -> Vec<String> {
        self.get_urls.lock().expect("get urls").clone()
    }

    pub(crate) fn posted(&self) -> Vec<(String, MultipartForm)> {
        self.posted.lock().expect("posted").clone()
    }
}

#[async_trait]
impl DocumentTransport for ScriptedTransport {
    async fn get_json(&self, url: &str) -> Scripted {
        self.get_urls.lock().expect("get urls").push(url.to_string());
        let gate = self.list_gate.lock().expect("list gate").take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let next = self.gets.lock().expect("gets").pop_front();
        next.unwrap_or_else(|| Err(TransportError::Request("no scripted reply".into())))
    }

    async fn post_multipart(&self, url: &str, form: MultipartForm) -> Scripted {
        self.posted
            .lock()
            .expect("posted")
            .push((url.to_string(), form));
        if let Some(gate) = &self.upload_gate {
            gate.notified().await;
        }
        let next = self.posts.lock().expect("posts").pop_front();
        next.unwrap_or_else(|| Err(TransportError::Request("no scripted reply".into())))
    }
}

pub(crate) fn test_settings() -> ClientSettings {
    ClientSettings {
        api_base_url: "https://store.test".into(),
        ..ClientSettings::default()
    }
}

/// Mounts a panel and waits for its initial fetch to settle.
pub(crate) async fn mounted(transport: Arc<ScriptedTransport>) -> DocumentPanel {
    let panel = DocumentPanel::mount(&test_settings(), transport);
    panel.initial_load().await;
    panel
}

pub(crate) fn document_json(id: i64, title: &str, file_url: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "file_name": format!("{}.pdf", title.to_lowercase()),
        "file_size": 2048,
        "uploaded_at": "2024-03-01T09:30:00Z",
        "file_url": file_url,
    })
}
