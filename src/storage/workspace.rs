//! # Request Workspaces
//!
//! Every try-on request gets its own uniquely named directory under the storage
//! root. Uploads are written there under sanitized names and the whole directory
//! is removed when the request ends, whatever the outcome.
//!
//! ## Lifecycle
//!
//! 1. [`TransientStorage::create_workspace`] allocates a fresh directory
//! 2. [`Workspace::store`] writes each upload as `{role}_{sanitized filename}`
//! 3. [`Workspace::dispose`] removes the directory and everything in it
//!
//! Disposal is idempotent and never fails. A workspace that is dropped without
//! being disposed is still removed.

use log::{debug, info};
use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::error::StorageError;

const WORKSPACE_PREFIX: &str = "tryon-";

/// Which upload a stored file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadRole {
    Person,
    Garment,
}

impl UploadRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadRole::Person => "person",
            UploadRole::Garment => "garment",
        }
    }
}

impl fmt::Display for UploadRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Factory for request workspaces rooted at one parent directory.
#[derive(Debug, Clone)]
pub struct TransientStorage {
    root: PathBuf,
}

impl TransientStorage {
    /// Creates a storage manager that places workspaces under `root`.
    ///
    /// The root itself is not created here; it must exist when a workspace is
    /// requested.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Allocates a fresh, collision-free workspace directory.
    ///
    /// # Errors
    /// - [`StorageError::CreateWorkspace`] when the filesystem denies creation
    pub fn create_workspace(&self) -> Result<Workspace, StorageError> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(&self.root)
            .map_err(|source| StorageError::CreateWorkspace {
                root: self.root.clone(),
                source,
            })?;

        let path = dir.path().to_path_buf();
        debug!("📁 Created workspace {}", path.display());

        Ok(Workspace {
            dir: Some(dir),
            path,
            files: Vec::new(),
        })
    }
}

/// An exclusively owned request directory holding the stored uploads.
#[derive(Debug)]
pub struct Workspace {
    /// `None` once disposed
    dir: Option<TempDir>,
    path: PathBuf,
    files: Vec<PathBuf>,
}

impl Workspace {
    /// Absolute path of the workspace directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Files written through [`Workspace::store`], in order.
    #[cfg(test)]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn is_disposed(&self) -> bool {
        self.dir.is_none()
    }

    /// Writes `bytes` into the workspace under a sanitized version of `filename`.
    ///
    /// The stored name is prefixed with the upload role so that a person photo
    /// and a garment photo sharing a filename never overwrite each other.
    ///
    /// # Returns
    /// - `Ok(PathBuf)`: Path of the written file, always directly inside the workspace
    ///
    /// # Errors
    /// - [`StorageError::Escape`] if the workspace was disposed or the name would leave it
    /// - [`StorageError::Write`] on I/O failure
    pub async fn store(
        &mut self,
        role: UploadRole,
        filename: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, StorageError> {
        if self.is_disposed() {
            return Err(StorageError::Escape(filename.to_string()));
        }

        let stored_name = format!("{}_{}", role, sanitize_filename(filename));
        let path = self.path.join(&stored_name);

        // The sanitized name has no separators, so the parent must be the workspace.
        if path.parent() != Some(self.path.as_path()) {
            return Err(StorageError::Escape(filename.to_string()));
        }

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| StorageError::Write {
                path: path.clone(),
                source,
            })?;

        self.files.push(path.clone());
        Ok(path)
    }

    /// Removes the workspace directory and everything in it.
    ///
    /// Safe to call more than once. Failures are logged at debug level and
    /// otherwise ignored.
    pub fn dispose(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };

        for file in self.files.drain(..) {
            if let Err(e) = std::fs::remove_file(&file) {
                debug!("🧹 Could not remove {}: {}", file.display(), e);
            }
        }

        match dir.close() {
            Ok(()) => info!("🧹 Removed workspace {}", self.path.display()),
            Err(e) => debug!(
                "🧹 Could not remove workspace {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Reduces an untrusted filename to a safe, single path component.
///
/// Only the last component is kept (both `/` and `\` count as separators),
/// whitespace becomes `_`, and everything outside `[A-Za-z0-9._-]` is dropped.
/// Leading and trailing dots and underscores are trimmed so the result can
/// never be `.` or `..`. Names that end up empty become `upload`.
pub fn sanitize_filename(filename: &str) -> String {
    let last = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let cleaned: String = last
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(*c, '.' | '_' | '-'))
        .collect();

    let trimmed = cleaned.trim_matches(|c: char| c == '.' || c == '_');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("..\\..\\windows\\win.ini"), "win.ini");
        assert_eq!(sanitize_filename("/abs/path/shirt.jpg"), "shirt.jpg");
    }

    #[test]
    fn test_sanitize_cleans_characters() {
        assert_eq!(sanitize_filename("my photo (1).jpg"), "my_photo_1.jpg");
        assert_eq!(sanitize_filename("  spaced  name.png "), "spaced_name.png");
        assert_eq!(sanitize_filename("ünïcödé.jpg"), "ncd.jpg");
    }

    #[test]
    fn test_sanitize_never_returns_dot_names() {
        assert_eq!(sanitize_filename(".."), "upload");
        assert_eq!(sanitize_filename("."), "upload");
        assert_eq!(sanitize_filename("../"), "upload");
        assert_eq!(sanitize_filename(""), "upload");
        assert_eq!(sanitize_filename(".bashrc"), "bashrc");
    }

    #[tokio::test]
    async fn test_store_stays_inside_workspace() {
        let root = tempfile::tempdir().unwrap();
        let storage = TransientStorage::new(root.path());
        let mut workspace = storage.create_workspace().unwrap();

        let stored = workspace
            .store(UploadRole::Garment, "../../etc/passwd", b"not really")
            .await
            .unwrap();

        assert_eq!(stored.parent(), Some(workspace.path()));
        assert!(stored.starts_with(root.path()));
        assert_eq!(stored.file_name().unwrap(), "garment_passwd");
        assert_eq!(std::fs::read(&stored).unwrap(), b"not really");
    }

    #[tokio::test]
    async fn test_same_filename_for_both_roles() {
        let root = tempfile::tempdir().unwrap();
        let storage = TransientStorage::new(root.path());
        let mut workspace = storage.create_workspace().unwrap();

        let person = workspace
            .store(UploadRole::Person, "image.jpg", b"person")
            .await
            .unwrap();
        let garment = workspace
            .store(UploadRole::Garment, "image.jpg", b"garment")
            .await
            .unwrap();

        assert_ne!(person, garment);
        assert_eq!(std::fs::read(&person).unwrap(), b"person");
        assert_eq!(std::fs::read(&garment).unwrap(), b"garment");
        assert_eq!(workspace.files().len(), 2);
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let storage = TransientStorage::new(root.path());
        let mut workspace = storage.create_workspace().unwrap();
        workspace
            .store(UploadRole::Person, "alice.jpg", b"bytes")
            .await
            .unwrap();
        let path = workspace.path().to_path_buf();

        workspace.dispose();
        assert!(!path.exists());
        assert!(workspace.is_disposed());

        workspace.dispose();
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_dispose_after_external_removal() {
        let root = tempfile::tempdir().unwrap();
        let storage = TransientStorage::new(root.path());
        let mut workspace = storage.create_workspace().unwrap();
        std::fs::remove_dir_all(workspace.path()).unwrap();

        workspace.dispose();
        assert!(workspace.is_disposed());
    }

    #[tokio::test]
    async fn test_store_after_dispose_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let storage = TransientStorage::new(root.path());
        let mut workspace = storage.create_workspace().unwrap();
        workspace.dispose();

        let result = workspace.store(UploadRole::Person, "a.jpg", b"x").await;
        assert!(matches!(result, Err(StorageError::Escape(_))));
    }

    #[test]
    fn test_drop_removes_workspace() {
        let root = tempfile::tempdir().unwrap();
        let storage = TransientStorage::new(root.path());
        let path = {
            let workspace = storage.create_workspace().unwrap();
            workspace.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_create_fails_for_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let storage = TransientStorage::new(root.path().join("does-not-exist"));

        let result = storage.create_workspace();
        assert!(matches!(result, Err(StorageError::CreateWorkspace { .. })));
    }

    #[test]
    fn test_workspaces_are_distinct() {
        let root = tempfile::tempdir().unwrap();
        let storage = TransientStorage::new(root.path());
        let a = storage.create_workspace().unwrap();
        let b = storage.create_workspace().unwrap();
        assert_ne!(a.path(), b.path());
    }
}
