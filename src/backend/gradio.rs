//! # Gradio Client
//!
//! A small client for the HTTP API that Gradio apps (including Hugging Face
//! Spaces) expose. It is created once at startup and shared by every request.
//!
//! ## Protocol
//!
//! ```text
//! GET  https://huggingface.co/api/spaces/{owner}/{name}/host   -> {"host": root}   (Space ids only)
//! GET  {root}/config                                           -> {"api_prefix": "/gradio_api", ...}
//! POST {root}{prefix}/upload          multipart "files"        -> ["/tmp/gradio/.../file.jpg"]
//! POST {root}{prefix}/call/{api}      {"data": [...]}          -> {"event_id": "..."}
//! GET  {root}{prefix}/call/{api}/{event_id}                    -> server-sent events
//! GET  {root}{prefix}/file={path}                              -> output bytes (no `url` given)
//! ```
//!
//! The event stream ends with either `event: complete` and a JSON array of
//! outputs, or `event: error`.
//!
//! Input files are uploaded from their stored paths right before the call and
//! referenced in the payload as `gradio.FileData` objects.

use async_trait::async_trait;
use log::{debug, info};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use super::{OutputRef, SynthesisBackend, SynthesisCall};
use crate::error::BackendError;
use crate::storage::sanitize_filename;

const HF_SPACES_API: &str = "https://huggingface.co/api/spaces";

#[derive(Deserialize)]
struct SpaceHost {
    host: String,
}

#[derive(Deserialize)]
struct EventId {
    event_id: String,
}

/// Connected handle to one Gradio app.
#[derive(Debug, Clone)]
pub struct GradioClient {
    http: reqwest::Client,
    /// Base URL without trailing slash
    root: String,
    /// "" for older servers, "/gradio_api" for current ones
    api_prefix: String,
    token: Option<String>,
}

impl GradioClient {
    /// Resolves `source` and performs the initial handshake.
    ///
    /// # Arguments
    /// - `source`: a Hugging Face Space id (`"yisol/IDM-VTON"`) or a base URL
    /// - `token`: optional bearer token for private or rate-limited Spaces
    ///
    /// # Errors
    /// - [`BackendError::Connect`] if the Space cannot be resolved or its config fetched
    pub async fn connect(source: &str, token: Option<String>) -> Result<Self, BackendError> {
        let connect_err = |reason: String| BackendError::Connect {
            source_id: source.to_string(),
            reason,
        };

        let http = reqwest::Client::builder()
            .user_agent(concat!("tryon-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| connect_err(e.to_string()))?;

        let mut client = Self {
            http,
            root: String::new(),
            api_prefix: String::new(),
            token,
        };

        client.root = if source.starts_with("http://") || source.starts_with("https://") {
            source.trim_end_matches('/').to_string()
        } else {
            client
                .resolve_space(source)
                .await
                .map_err(|e| connect_err(e.to_string()))?
        };

        let config = client
            .fetch_config()
            .await
            .map_err(|e| connect_err(e.to_string()))?;
        client.api_prefix = api_prefix_from_config(&config);

        info!(
            "🔌 Connected to Gradio app at {}{}",
            client.root, client.api_prefix
        );
        Ok(client)
    }

    /// Base URL of the connected app.
    pub fn root(&self) -> &str {
        &self.root
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}{}/{}",
            self.root,
            self.api_prefix,
            path.trim_start_matches('/')
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Whether `url` points into the connected app.
    fn is_own_url(&self, url: &str) -> bool {
        url.strip_prefix(&self.root)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    /// GET for a backend output. The token only goes to the connected app.
    fn output_request(&self, url: &str) -> RequestBuilder {
        let request = self.http.get(url);
        if self.is_own_url(url) {
            self.authorized(request)
        } else {
            request
        }
    }

    async fn resolve_space(&self, space_id: &str) -> Result<String, BackendError> {
        let url = format!("{}/{}/host", HF_SPACES_API, space_id);
        let response = self.authorized(self.http.get(&url)).send().await?;
        let SpaceHost { host } = ensure_success(response)?.json().await?;
        debug!("Space {} is served from {}", space_id, host);
        Ok(host.trim_end_matches('/').to_string())
    }

    async fn fetch_config(&self) -> Result<Value, BackendError> {
        let url = format!("{}/config", self.root);
        let response = self.authorized(self.http.get(&url)).send().await?;
        Ok(ensure_success(response)?.json().await?)
    }

    /// Uploads one stored file and returns its `gradio.FileData` descriptor.
    async fn upload(&self, path: &Path) -> Result<Value, BackendError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| BackendError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let form = Form::new().part("files", Part::bytes(bytes).file_name(name.clone()));
        let response = self
            .authorized(self.http.post(self.endpoint("upload")).multipart(form))
            .send()
            .await?;
        let paths: Vec<String> = ensure_success(response)?.json().await?;
        let remote_path = paths.into_iter().next().ok_or_else(|| {
            BackendError::MalformedResult("upload returned no file paths".to_string())
        })?;

        debug!("Uploaded {} as {}", path.display(), remote_path);
        Ok(file_data(&remote_path, &name))
    }

    /// Queues `api_name` with `data` and waits for its outputs.
    async fn call(&self, api_name: &str, data: Vec<Value>) -> Result<Vec<Value>, BackendError> {
        let api = api_name.trim_start_matches('/');

        let response = self
            .authorized(self.http.post(self.endpoint(&format!("call/{}", api))))
            .json(&json!({ "data": data }))
            .send()
            .await?;
        let EventId { event_id } = ensure_success(response)?.json().await?;
        debug!("Queued {} as event {}", api_name, event_id);

        let response = self
            .authorized(self.http.get(self.endpoint(&format!("call/{}/{}", api, event_id))))
            .send()
            .await?;
        let body = ensure_success(response)?.text().await?;
        parse_event_stream(&body)
    }
}

#[async_trait]
impl SynthesisBackend for GradioClient {
    async fn predict(&self, call: &SynthesisCall) -> Result<Vec<Value>, BackendError> {
        let person = self.upload(&call.person).await?;
        let garment = self.upload(&call.garment).await?;
        let params = &call.params;

        let data = vec![
            json!({ "background": person, "layers": [], "composite": null }),
            garment,
            json!(params.description),
            json!(params.auto_mask),
            json!(params.auto_crop),
            json!(params.steps),
            json!(params.seed),
        ];
        self.call(&params.api_name, data).await
    }

    async fn download(&self, output: &OutputRef, dest_dir: &Path) -> Result<PathBuf, BackendError> {
        let url = match &output.url {
            Some(url) => url.clone(),
            None => self.endpoint(&format!("file={}", output.path)),
        };

        let response = self.output_request(&url).send().await?;
        let bytes = ensure_success(response)?.bytes().await?;

        let dest = dest_dir.join(format!("output_{}", sanitize_filename(&output.file_name())));
        tokio::fs::write(&dest, &bytes)
            .await
            .map_err(|source| BackendError::Save {
                path: dest.clone(),
                source,
            })?;

        debug!("Downloaded {} ({} bytes) to {}", url, bytes.len(), dest.display());
        Ok(dest)
    }
}

fn ensure_success(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(BackendError::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

fn api_prefix_from_config(config: &Value) -> String {
    config
        .get("api_prefix")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim_end_matches('/')
        .to_string()
}

fn file_data(remote_path: &str, orig_name: &str) -> Value {
    json!({
        "path": remote_path,
        "orig_name": orig_name,
        "meta": { "_type": "gradio.FileData" }
    })
}

/// Extracts the outcome from a `/call/{api}/{event_id}` event stream.
fn parse_event_stream(body: &str) -> Result<Vec<Value>, BackendError> {
    let mut event = "";
    for line in body.lines() {
        if let Some(name) = line.strip_prefix("event:") {
            event = name.trim();
            continue;
        }
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();
        match event {
            "complete" => {
                return serde_json::from_str(data)
                    .map_err(|e| BackendError::MalformedResult(format!("{}: {}", e, data)));
            }
            "error" => {
                let message = match serde_json::from_str::<Value>(data) {
                    Ok(Value::String(s)) => s,
                    Ok(Value::Null) | Err(_) if data.is_empty() || data == "null" => {
                        "the backend did not give a reason".to_string()
                    }
                    _ => data.to_string(),
                };
                return Err(BackendError::Remote(message));
            }
            _ => {}
        }
    }
    Err(BackendError::MalformedResult(
        "event stream ended without a result".to_string(),
    ))
}
