//! # Error Taxonomy
//!
//! - [`StorageError`]: the local filesystem refused to create or write a workspace
//! - [`BackendError`]: the remote call failed or returned something unusable
//! - [`ProcessingError`]: anything that went wrong after validation, surfaced as a 500
//! - [`TryOnError`]: what the try-on handler returns; converts into an HTTP response
//!
//! Only the `Display` text of a processing failure crosses the HTTP boundary.
//! The full `source()` chain is logged server-side.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Local filesystem failures while preparing a workspace.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create workspace under {}: {source}", .root.display())]
    CreateWorkspace {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Refusing to store '{0}' outside the workspace")]
    Escape(String),
}

/// Failures of the remote synthesis call.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to connect to backend '{source_id}': {reason}")]
    Connect { source_id: String, reason: String },

    #[error("Backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Backend reported an error: {0}")]
    Remote(String),

    #[error("Backend returned an empty result")]
    EmptyResult,

    #[error("Backend returned a malformed result: {0}")]
    MalformedResult(String),

    #[error("Backend output cannot be fetched by this client: {0}")]
    UnsupportedOutput(String),

    #[error("Backend output {} is not readable: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to save backend output to {}: {source}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Backend output {} is not an image", .path.display())]
    NotAnImage { path: PathBuf },

    #[error("Backend did not answer within {0:?}")]
    Timeout(Duration),
}

/// Any failure past input validation.
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Outcome of a rejected try-on request.
#[derive(Error, Debug)]
pub enum TryOnError {
    /// Client-caused; nothing was created on disk.
    #[error("{0}")]
    Validation(String),

    /// The body went over the configured upload limit.
    #[error("{0}")]
    TooLarge(String),

    #[error(transparent)]
    Processing(#[from] ProcessingError),
}

impl TryOnError {
    pub fn status(&self) -> StatusCode {
        match self {
            TryOnError::Validation(_) => StatusCode::BAD_REQUEST,
            TryOnError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            TryOnError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StorageError> for TryOnError {
    fn from(err: StorageError) -> Self {
        TryOnError::Processing(err.into())
    }
}

impl From<BackendError> for TryOnError {
    fn from(err: BackendError) -> Self {
        TryOnError::Processing(err.into())
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for TryOnError {
    fn into_response(self) -> Response {
        if let TryOnError::Processing(cause) = &self {
            error!("❌ Error: {}", cause);
            let mut source = std::error::Error::source(cause);
            while let Some(inner) = source {
                error!("   caused by: {}", inner);
                source = inner.source();
            }
        }

        let status = self.status();
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
