//! # Transient Storage
//!
//! Request-scoped workspaces for uploaded images. See [`workspace`] for the
//! lifecycle and the filename sanitization rules.

pub mod workspace;

pub use workspace::{sanitize_filename, TransientStorage, UploadRole, Workspace};
