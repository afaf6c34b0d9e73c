//! # Try-On Request Handling
//!
//! [`virtual_tryon`] is the HTTP entry point; [`TryOnService`] owns the
//! lifecycle of one request once its form has been validated.
//!
//! ## Lifecycle
//!
//! ```text
//! Validating -> Storing -> Calling -> Completing -> Cleanup -> Done
//!      |           |          |                        ^
//!      v           +----------+------------------------+--> Error
//!   400 (nothing created)
//! ```
//!
//! Cleanup runs whenever a workspace was created, before the response is
//! built. The storing/calling/cleanup phases run on their own task, so a client
//! that hangs up does not cancel the backend call or skip the cleanup.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use log::{info, warn};
use std::path::PathBuf;
use uuid::Uuid;

use super::upload::{read_tryon_form, UploadPair, MISSING_IMAGES};
use super::AppState;
use crate::backend::{BackendClientAdapter, SynthesisOverrides, SynthesisParameters};
use crate::error::{BackendError, ProcessingError, TryOnError};
use crate::storage::{TransientStorage, UploadRole, Workspace};

/// Runs validated try-on requests against the shared backend.
pub struct TryOnService {
    storage: TransientStorage,
    adapter: BackendClientAdapter,
    defaults: SynthesisParameters,
}

impl TryOnService {
    pub fn new(
        storage: TransientStorage,
        adapter: BackendClientAdapter,
        defaults: SynthesisParameters,
    ) -> Self {
        Self {
            storage,
            adapter,
            defaults,
        }
    }

    /// Stores the uploads, calls the backend and returns the generated image.
    ///
    /// The workspace created for the request is disposed before this returns,
    /// on success and on failure alike.
    pub async fn process(
        &self,
        request_id: Uuid,
        uploads: UploadPair,
        overrides: &SynthesisOverrides,
    ) -> Result<Vec<u8>, ProcessingError> {
        let params = overrides.apply(&self.defaults);

        let mut workspace = self.storage.create_workspace()?;
        let outcome = self.run(request_id, &mut workspace, &uploads, &params).await;

        // Directory removal is blocking filesystem work.
        if let Err(e) = tokio::task::spawn_blocking(move || workspace.dispose()).await {
            warn!("⚠️  [{}] Workspace cleanup task failed: {}", request_id, e);
        }

        outcome
    }

    async fn run(
        &self,
        request_id: Uuid,
        workspace: &mut Workspace,
        uploads: &UploadPair,
        params: &SynthesisParameters,
    ) -> Result<Vec<u8>, ProcessingError> {
        let person = workspace
            .store(UploadRole::Person, &uploads.person.filename, &uploads.person.bytes)
            .await?;
        let garment = workspace
            .store(UploadRole::Garment, &uploads.garment.filename, &uploads.garment.bytes)
            .await?;

        info!("⚙️  [{}] Processing virtual try-on...", request_id);
        info!("   Person image: {}", person.display());
        info!("   Clothing image: {}", garment.display());

        let output = self
            .adapter
            .synthesize(&person, &garment, params, workspace.path())
            .await?;

        let image = read_output(output).await?;
        info!("✅ [{}] Generated image ready ({} bytes)", request_id, image.len());
        Ok(image)
    }
}

async fn read_output(path: PathBuf) -> Result<Vec<u8>, BackendError> {
    tokio::fs::read(&path)
        .await
        .map_err(|source| BackendError::Unreadable { path, source })
}

/// `POST /api/virtual-tryon`
///
/// Responds with the generated PNG on success, `400 {"error"}` when either
/// photo is missing and `500 {"error"}` for everything else.
pub async fn virtual_tryon(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, TryOnError> {
    let request_id = Uuid::new_v4();

    let multipart = multipart.map_err(|rejection| {
        warn!("⚠️  [{}] Not a multipart request: {}", request_id, rejection);
        TryOnError::Validation(MISSING_IMAGES.to_string())
    })?;

    let form = match read_tryon_form(multipart).await {
        Ok(form) => form,
        Err(e) => {
            warn!("⚠️  [{}] Rejected: {}", request_id, e);
            return Err(e);
        }
    };

    info!(
        "📤 [{}] Received person image '{}' ({} bytes) and clothing image '{}' ({} bytes)",
        request_id,
        form.uploads.person.filename,
        form.uploads.person.bytes.len(),
        form.uploads.garment.filename,
        form.uploads.garment.bytes.len()
    );

    let service = state.service.clone();
    let task = tokio::spawn(async move {
        service
            .process(request_id, form.uploads, &form.overrides)
            .await
    });

    let image = task
        .await
        .map_err(|e| ProcessingError::Internal(anyhow::anyhow!("Try-on task failed: {}", e)))??;

    Ok(([(header::CONTENT_TYPE, "image/png")], image).into_response())
}
