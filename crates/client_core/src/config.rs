use std::{collections::HashMap, fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use shared::protocol::{download_link_path, LIST_DOCUMENTS_PATH, UPLOAD_DOCUMENT_PATH};
use tracing::warn;

/// Deployment default for local development. Not a secret; override with
/// `DOCDESK_API_BASE` or `APP__API_BASE_URL`.
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
pub const SETTINGS_FILE: &str = "docdesk.toml";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_STATUS_TTL: Duration = Duration::from_secs(5);

/// Per-deployment rewrite applied to every download URL the store hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlRewrite {
    None,
    MediaToDocuments,
}

impl UrlRewrite {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" | "off" | "false" => Some(Self::None),
            "media_to_documents" | "on" | "true" => Some(Self::MediaToDocuments),
            _ => None,
        }
    }

    pub fn apply(self, url: &str) -> String {
        match self {
            Self::None => url.to_string(),
            Self::MediaToDocuments => crate::documents::rewrite_media_path(url),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub status_ttl: Duration,
    pub url_rewrite: UrlRewrite,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            status_ttl: DEFAULT_STATUS_TTL,
            url_rewrite: UrlRewrite::MediaToDocuments,
        }
    }
}

impl ClientSettings {
    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(&self.api_base_url)
    }
}

pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the optional settings file, then environment overrides.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("api_base_url") {
                    settings.api_base_url = v.clone();
                }
                if let Some(v) = file_cfg.get("request_timeout_secs") {
                    apply_secs(&mut settings.request_timeout, "request_timeout_secs", v);
                }
                if let Some(v) = file_cfg.get("status_ttl_secs") {
                    apply_secs(&mut settings.status_ttl, "status_ttl_secs", v);
                }
                if let Some(v) = file_cfg.get("url_rewrite") {
                    apply_rewrite(&mut settings.url_rewrite, v);
                }
            }
            Err(err) => warn!(path = %path.display(), "config: ignoring unreadable settings file: {err}"),
        }
    }

    if let Some(v) = env("DOCDESK_API_BASE") {
        settings.api_base_url = v;
    }
    if let Some(v) = env("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        apply_secs(&mut settings.request_timeout, "APP__REQUEST_TIMEOUT_SECS", &v);
    }
    if let Some(v) = env("APP__STATUS_TTL_SECS") {
        apply_secs(&mut settings.status_ttl, "APP__STATUS_TTL_SECS", &v);
    }
    if let Some(v) = env("APP__URL_REWRITE") {
        apply_rewrite(&mut settings.url_rewrite, &v);
    }

    settings.api_base_url = normalize_base_url(&settings.api_base_url);
    settings
}

fn apply_secs(target: &mut Duration, key: &str, raw: &str) {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => *target = Duration::from_secs(secs),
        _ => warn!(key, value = raw, "config: expected a positive number of seconds"),
    }
}

fn apply_rewrite(current: &mut UrlRewrite, raw: &str) {
    match UrlRewrite::parse(raw) {
        Some(rewrite) => *current = rewrite,
        None => warn!(value = raw, "config: unknown url_rewrite, keeping {current:?}"),
    }
}

pub(crate) fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return DEFAULT_API_BASE_URL.to_string();
    }
    trimmed.to_string()
}

/// Store URLs derived from one base origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
    pub list: String,
    pub upload: String,
}

impl Endpoints {
    pub fn new(base: &str) -> Self {
        let base = normalize_base_url(base);
        Self {
            list: format!("{base}{LIST_DOCUMENTS_PATH}"),
            upload: format!("{base}{UPLOAD_DOCUMENT_PATH}"),
            base,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn download_link(&self, document_id: &str) -> String {
        format!("{}{}", self.base, download_link_path(document_id))
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
