use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::records::GrievanceStatus;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base URL: {url}")]
    InvalidBaseUrl { url: String },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request failed: {source}")]
    Request {
        #[source]
        source: reqwest::Error,
    },

    #[error("server answered {status}")]
    Status { status: u16 },

    #[error("could not decode ledger response: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug)]
pub struct ClientOptions {
    pub base_url: String,
    pub timeout: Option<Duration>,
    pub proxy: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            proxy: None,
        }
    }
}

/// Body of `GET /verify_grievance/{id}`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct LedgerLookup {
    pub found: bool,
    #[serde(default)]
    pub block_index: Option<u64>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub blockchain: Option<String>,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default)]
    pub audio_hash: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl LedgerLookup {
    /// Compares the ledger's audio hash with a locally known one, ignoring
    /// case and a `0x` prefix. `None` when either side is missing.
    pub fn hash_matches(&self, local: Option<&str>) -> Option<bool> {
        let remote = normalize_hash(self.audio_hash.as_deref()?);
        let local = normalize_hash(local?);
        if remote.is_empty() || local.is_empty() {
            return None;
        }
        Some(remote == local)
    }
}

fn normalize_hash(value: &str) -> String {
    let trimmed = value.trim();
    let stripped = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    stripped.to_ascii_lowercase()
}

/// Thin client for the two dashboard endpoints.
#[derive(Clone, Debug)]
pub struct DashboardClient {
    http: reqwest::Client,
    base: reqwest::Url,
}

impl DashboardClient {
    pub fn new(options: &ClientOptions) -> Result<Self, ClientError> {
        let mut raw = options.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base = reqwest::Url::parse(&raw)
            .ok()
            .filter(|u| !u.cannot_be_a_base())
            .ok_or_else(|| ClientError::InvalidBaseUrl {
                url: options.base_url.clone(),
            })?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(concat!(
                "prahari-console/",
                env!("CARGO_PKG_VERSION")
            )),
        );

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10));
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(proxy) = options.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            let proxy_cfg = reqwest::Proxy::all(proxy).map_err(|source| ClientError::ProxySetup {
                proxy: proxy.to_string(),
                source,
            })?;
            builder = builder.proxy(proxy_cfg);
        }
        let http = builder
            .build()
            .map_err(|source| ClientError::HttpClientBuild { source })?;
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &reqwest::Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> reqwest::Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
        }
        url
    }

    /// `POST /update_status` with `g_id` and `new_status` form fields. Any
    /// 2xx, after redirects, counts as saved.
    pub async fn update_status(&self, id: &str, status: GrievanceStatus) -> Result<(), ClientError> {
        let url = self.endpoint(&["update_status"]);
        let response = self
            .http
            .post(url)
            .form(&[("g_id", id), ("new_status", status.label())])
            .send()
            .await
            .map_err(|source| ClientError::Request { source })?;
        let code = response.status();
        if !code.is_success() {
            return Err(ClientError::Status {
                status: code.as_u16(),
            });
        }
        Ok(())
    }

    /// `GET /verify_grievance/{id}`. The body decides the outcome whatever
    /// the HTTP status.
    pub async fn verify(&self, id: &str) -> Result<LedgerLookup, ClientError> {
        let url = self.endpoint(&["verify_grievance", id]);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| ClientError::Request { source })?;
        let body = response
            .bytes()
            .await
            .map_err(|source| ClientError::Request { source })?;
        serde_json::from_slice::<LedgerLookup>(&body).map_err(|source| ClientError::Decode { source })
    }
}
