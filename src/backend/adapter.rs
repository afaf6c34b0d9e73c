//! # Backend Client Adapter
//!
//! The typed boundary between the request handler and whatever
//! [`SynthesisBackend`] the process was started with.
//!
//! ## Responsibility
//!
//! - Build a [`SynthesisCall`] from the two stored paths and the parameters
//! - Run it once, optionally bounded by a timeout
//! - Turn the ordered outputs into a [`SynthesisResult`]
//! - Make sure the primary output is a readable image on this host
//!
//! There is no retry. A failed call is reported to the caller as-is.

use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;

use super::{OutputRef, SynthesisBackend, SynthesisCall, SynthesisParameters, SynthesisResult};
use crate::error::BackendError;

/// Bytes read from the head of an output file to recognize its format.
const SNIFF_LEN: u64 = 64;

pub struct BackendClientAdapter {
    backend: Arc<dyn SynthesisBackend>,
    timeout: Option<Duration>,
}

impl BackendClientAdapter {
    /// Wraps a shared backend handle. `timeout` of `None` waits for the backend
    /// for as long as it takes.
    pub fn new(backend: Arc<dyn SynthesisBackend>, timeout: Option<Duration>) -> Self {
        Self { backend, timeout }
    }

    /// Runs one synthesis and returns the local path of the generated image.
    ///
    /// # Arguments
    /// - `person`, `garment`: stored uploads, referenced by path
    /// - `params`: parameters for this call
    /// - `output_dir`: where remote outputs are downloaded to (the request workspace)
    ///
    /// # Errors
    /// Any [`BackendError`]: transport or remote failure, timeout, an empty or
    /// malformed result, or an output that is unreadable or not an image.
    pub async fn synthesize(
        &self,
        person: &Path,
        garment: &Path,
        params: &SynthesisParameters,
        output_dir: &Path,
    ) -> Result<PathBuf, BackendError> {
        let call = SynthesisCall {
            person: person.to_path_buf(),
            garment: garment.to_path_buf(),
            params: params.clone(),
        };

        info!(
            "🤖 Calling backend operation {} (steps={}, seed={})",
            params.api_name, params.steps, params.seed
        );

        let outputs = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.backend.predict(&call))
                .await
                .map_err(|_| BackendError::Timeout(limit))??,
            None => self.backend.predict(&call).await?,
        };

        let result = SynthesisResult::from_outputs(&outputs)?;
        if result.ignored_outputs > 0 {
            debug!("Ignoring {} extra backend output(s)", result.ignored_outputs);
        }
        info!("✅ Result received: {}", result.primary_output);

        let path = self.resolve(&result.primary_output, output_dir).await?;
        ensure_image(&path).await?;
        Ok(path)
    }

    /// Outputs that exist on this host are used in place; anything else is
    /// downloaded into `output_dir`.
    ///
    /// A plain path the backend cannot download is handed back unchanged so
    /// that [`ensure_image`] reports it as unreadable.
    async fn resolve(&self, output: &OutputRef, output_dir: &Path) -> Result<PathBuf, BackendError> {
        let local = PathBuf::from(&output.path);
        if tokio::fs::metadata(&local).await.is_ok_and(|m| m.is_file()) {
            return Ok(local);
        }
        match self.backend.download(output, output_dir).await {
            Err(BackendError::UnsupportedOutput(_)) if output.url.is_none() => Ok(local),
            other => other,
        }
    }
}

/// Checks that `path` can be opened and starts with a known image signature.
async fn ensure_image(path: &Path) -> Result<(), BackendError> {
    let unreadable = |source| BackendError::Unreadable {
        path: path.to_path_buf(),
        source,
    };

    let file = tokio::fs::File::open(path).await.map_err(unreadable)?;
    let mut head = Vec::with_capacity(SNIFF_LEN as usize);
    file.take(SNIFF_LEN)
        .read_to_end(&mut head)
        .await
        .map_err(unreadable)?;

    image::guess_format(&head).map_err(|_| BackendError::NotAnImage {
        path: path.to_path_buf(),
    })?;
    Ok(())
}
