//! reqwest implementation of [`GalaxyApi`].
//!
//! Every request carries the API key in the `x-api-key` header. Non-success
//! statuses are turned into [`GalaxyError`] variants using Galaxy's JSON
//! error body (`{"err_msg": "...", "err_code": ...}`) when it has one.

use super::types::*;
use super::GalaxyApi;
use crate::config::{basename, AssemblyConfig};
use crate::error::GalaxyError;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{multipart, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// HTTP client bound to one Galaxy server and API key.
#[derive(Debug, Clone)]
pub struct GalaxyClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl GalaxyClient {
    /// Build a client for `base_url` authenticating with `api_key`.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, GalaxyError> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|_| GalaxyError::InvalidConfig("API key contains invalid characters".into()))?;
        key.set_sensitive(true);
        headers.insert("x-api-key", key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .user_agent(concat!("galaxy-assemble/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GalaxyError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Client for the server and key in `config`.
    pub fn from_config(config: &AssemblyConfig) -> Result<Self, GalaxyError> {
        Self::new(&config.galaxy_url, &config.api_key, config.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request and return the successful response.
    async fn send(&self, req: RequestBuilder, url: &str) -> Result<reqwest::Response, GalaxyError> {
        debug!("→ {}", url);
        let response = req.send().await.map_err(|e| self.transport_error(url, e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(url, status, &body))
    }

    /// Send a request and decode its JSON body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        url: &str,
    ) -> Result<T, GalaxyError> {
        let response = self.send(req, url).await?;
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(url, e))?;
        serde_json::from_str(&body).map_err(|e| GalaxyError::InvalidResponse {
            url: url.to_string(),
            detail: format!("{e}: {}", truncate(&body, 200)),
        })
    }

    fn transport_error(&self, url: &str, e: reqwest::Error) -> GalaxyError {
        if e.is_timeout() {
            GalaxyError::RequestTimeout {
                url: url.to_string(),
                secs: self.timeout.as_secs(),
            }
        } else {
            GalaxyError::Http {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl GalaxyApi for GalaxyClient {
    async fn whoami(&self) -> Result<User, GalaxyError> {
        let url = self.url("whoami");
        let user: Option<User> = self.send_json(self.http.get(&url), &url).await?;
        // Anonymous sessions get `null`; with an API key that means the key was ignored.
        user.ok_or_else(|| GalaxyError::AuthFailed {
            url: self.base_url.clone(),
            detail: "server did not recognise the API key".into(),
        })
    }

    async fn create_history(&self, name: &str) -> Result<History, GalaxyError> {
        let url = self.url("histories");
        let req = self.http.post(&url).json(&json!({ "name": name }));
        self.send_json(req, &url).await
    }

    async fn upload_file(&self, history_id: &str, path: &Path) -> Result<ToolRun, GalaxyError> {
        let url = self.url("tools");
        let name = basename(path);

        let file = tokio::fs::File::open(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => GalaxyError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => GalaxyError::FileNotFound {
                path: path.to_path_buf(),
            },
        })?;
        let len = file
            .metadata()
            .await
            .map_err(|e| GalaxyError::Internal(format!("stat {}: {e}", path.display())))?
            .len();

        let inputs = json!({
            "files_0|NAME": name,
            "files_0|type": "upload_dataset",
            "dbkey": "?",
            "file_type": "auto",
        });
        let part = multipart::Part::stream_with_length(reqwest::Body::from(file), len)
            .file_name(name.clone());
        let form = multipart::Form::new()
            .text("history_id", history_id.to_string())
            .text("tool_id", "upload1")
            .text("inputs", inputs.to_string())
            .part("files_0|file_data", part);

        info!("Uploading {} ({} bytes) to history {}", name, len, history_id);
        self.send_json(self.http.post(&url).multipart(form), &url)
            .await
    }

    async fn history_contents(&self, history_id: &str) -> Result<Vec<HistoryItem>, GalaxyError> {
        let url = self.url(&format!("histories/{history_id}/contents"));
        self.send_json(self.http.get(&url), &url).await
    }

    async fn list_tools(&self) -> Result<Vec<ToolSummary>, GalaxyError> {
        let url = self.url("tools");
        let req = self.http.get(&url).query(&[("in_panel", "false")]);
        self.send_json(req, &url).await
    }

    async fn show_tool(&self, tool_id: &str) -> Result<ToolInfo, GalaxyError> {
        let url = self.url(&format!("tools/{}", encode_path_segment(tool_id)));
        let req = self.http.get(&url).query(&[("io_details", "true")]);
        self.send_json(req, &url).await
    }

    async fn create_collection(
        &self,
        history_id: &str,
        desc: &CollectionDescription,
    ) -> Result<Collection, GalaxyError> {
        let url = self.url(&format!("histories/{history_id}/contents"));
        let payload = json!({
            "type": "dataset_collection",
            "instance_type": "history",
            "history_id": history_id,
            "name": desc.name,
            "collection_type": desc.collection_type,
            "element_identifiers": desc.elements,
        });
        self.send_json(self.http.post(&url).json(&payload), &url)
            .await
    }

    async fn run_tool(
        &self,
        history_id: &str,
        tool_id: &str,
        inputs: &ToolInputs,
    ) -> Result<ToolRun, GalaxyError> {
        let url = self.url("tools");
        let payload = json!({
            "history_id": history_id,
            "tool_id": tool_id,
            "inputs": inputs,
        });
        self.send_json(self.http.post(&url).json(&payload), &url)
            .await
    }

    async fn download_dataset(
        &self,
        dataset_id: &str,
        ext: &str,
        dest: &Path,
    ) -> Result<u64, GalaxyError> {
        let url = self.url(&format!("datasets/{dataset_id}/display"));
        let req = self.http.get(&url).query(&[("to_ext", ext)]);
        let response = self.send(req, &url).await?;

        let write_err = |source| GalaxyError::OutputWriteFailed {
            path: dest.to_path_buf(),
            source,
        };

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        // Stream to a sibling `.part` file and rename on success; `dest` is
        // never half-written and an empty body never replaces it.
        let tmp_path = part_path(dest);
        let result = self.stream_to(response, &url, &tmp_path, dest).await;
        let written = match result {
            Ok(n) if n > 0 => n,
            other => {
                let _ = tokio::fs::remove_file(&tmp_path).await;
                return other;
            }
        };

        if let Err(e) = tokio::fs::rename(&tmp_path, dest).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(write_err(e));
        }
        debug!("Downloaded {} bytes to {}", written, dest.display());
        Ok(written)
    }
}

impl GalaxyClient {
    /// Write a response body to `tmp_path`, returning the byte count.
    async fn stream_to(
        &self,
        response: reqwest::Response,
        url: &str,
        tmp_path: &Path,
        dest: &Path,
    ) -> Result<u64, GalaxyError> {
        let write_err = |source| GalaxyError::OutputWriteFailed {
            path: dest.to_path_buf(),
            source,
        };
        let mut file = tokio::fs::File::create(tmp_path).await.map_err(write_err)?;
        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.transport_error(url, e))?;
            file.write_all(&chunk).await.map_err(write_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(write_err)?;
        Ok(written)
    }
}

/// Map a non-success status and body to the matching error variant.
fn status_error(url: &str, status: StatusCode, body: &str) -> GalaxyError {
    let message = error_message(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GalaxyError::AuthFailed {
            url: url.to_string(),
            detail: message,
        },
        StatusCode::NOT_FOUND => GalaxyError::NotFound {
            url: url.to_string(),
        },
        _ => GalaxyError::Api {
            url: url.to_string(),
            status: status.as_u16(),
            message,
        },
    }
}

/// Galaxy's `err_msg` if the body is its JSON error shape, else the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("err_msg").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| truncate(body.trim(), 500))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}\u{2026}")
    }
}

/// Tool ids from the tool shed contain `/`; they must stay one path segment.
fn encode_path_segment(s: &str) -> String {
    s.replace('%', "%25").replace('/', "%2F")
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
