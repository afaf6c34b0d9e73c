//! # Synthesis Backend
//!
//! Everything between the stored uploads and the generated image.
//!
//! ## Modules
//!
//! - [`params`]: [`SynthesisParameters`] and per-request [`SynthesisOverrides`]
//! - [`adapter`]: [`BackendClientAdapter`], the typed boundary the request handler calls
//! - [`gradio`]: [`GradioClient`], the production [`SynthesisBackend`] speaking the Gradio HTTP API
//!
//! ## Result shape
//!
//! A backend answers with an ordered list of outputs. Only the first one
//! matters: it references the generated image, either as a plain path or as a
//! file descriptor object with `path` and optionally `url`. Any further outputs
//! (the IDM-VTON Space also returns the computed mask) are counted and ignored.

pub mod adapter;
pub mod gradio;
pub mod params;

pub use adapter::BackendClientAdapter;
pub use gradio::GradioClient;
pub use params::{SynthesisOverrides, SynthesisParameters};

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::BackendError;

/// One remote try-on invocation. Images are passed by path and read by the
/// backend client only when it needs their contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisCall {
    pub person: PathBuf,
    pub garment: PathBuf,
    pub params: SynthesisParameters,
}

/// Reference to a file produced by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRef {
    /// Path as the backend sees it; may or may not exist on this host
    pub path: String,
    /// Download location, when the backend exposes one
    pub url: Option<String>,
    /// Original filename reported by the backend
    pub orig_name: Option<String>,
}

impl OutputRef {
    /// Interprets one backend output value.
    ///
    /// Accepts a plain string path or an object carrying `path` and/or `url`.
    pub fn from_value(value: &Value) -> Result<Self, BackendError> {
        match value {
            Value::String(path) if !path.is_empty() => Ok(Self {
                path: path.clone(),
                url: None,
                orig_name: None,
            }),
            Value::Object(map) => {
                let field = |key: &str| {
                    map.get(key)
                        .and_then(Value::as_str)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                };
                let url = field("url");
                let path = match (field("path"), &url) {
                    (Some(path), _) => path,
                    (None, Some(url)) => url.clone(),
                    (None, None) => {
                        return Err(BackendError::MalformedResult(format!(
                            "output object has neither path nor url: {}",
                            value
                        )))
                    }
                };
                Ok(Self {
                    path,
                    url,
                    orig_name: field("orig_name"),
                })
            }
            other => Err(BackendError::MalformedResult(format!(
                "expected a file reference, got {}",
                other
            ))),
        }
    }

    /// Best filename for a local copy of this output.
    pub fn file_name(&self) -> String {
        if let Some(name) = &self.orig_name {
            return name.clone();
        }
        let source = self.url.as_deref().unwrap_or(&self.path);
        source
            .split(['?', '#'])
            .next()
            .and_then(|s| s.rsplit(['/', '\\']).next())
            .filter(|s| !s.is_empty())
            .unwrap_or("result.png")
            .to_string()
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.url {
            Some(url) => write!(f, "{} ({})", self.path, url),
            None => f.write_str(&self.path),
        }
    }
}

/// Typed view of a backend response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisResult {
    /// The generated image
    pub primary_output: OutputRef,
    /// Number of trailing outputs that were ignored
    pub ignored_outputs: usize,
}

impl SynthesisResult {
    /// Builds a result from the backend's ordered outputs.
    ///
    /// # Errors
    /// - [`BackendError::EmptyResult`] when there are no outputs
    /// - [`BackendError::MalformedResult`] when the first output is not a file reference
    pub fn from_outputs(outputs: &[Value]) -> Result<Self, BackendError> {
        let first = outputs.first().ok_or(BackendError::EmptyResult)?;
        Ok(Self {
            primary_output: OutputRef::from_value(first)?,
            ignored_outputs: outputs.len() - 1,
        })
    }
}

/// A remote image-synthesis service.
///
/// Implementations hold no per-request state and are shared across requests
/// behind an `Arc`.
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    /// Runs the named remote operation and returns its ordered outputs.
    async fn predict(&self, call: &SynthesisCall) -> Result<Vec<Value>, BackendError>;

    /// Copies a backend-local output into `dest_dir` and returns the local path.
    async fn download(&self, output: &OutputRef, dest_dir: &Path) -> Result<PathBuf, BackendError> {
        let _ = dest_dir;
        Err(BackendError::UnsupportedOutput(output.to_string()))
    }
}
