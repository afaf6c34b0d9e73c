//! # Virtual Try-On Relay
//!
//! Accepts a person photo and a garment photo over HTTP, hands them to a remote
//! image-synthesis backend (the IDM-VTON Gradio Space by default) and streams
//! the generated composite back to the caller.
//!
//! ## Modules
//!
//! - [`server`]: router, status endpoints and the try-on request handler
//! - [`storage`]: request-scoped workspaces for uploaded files
//! - [`backend`]: backend trait, typed result, adapter and Gradio client
//! - [`common`]: configuration and logging
//! - [`error`]: error taxonomy and its HTTP mapping

pub mod backend;
pub mod common;
pub mod error;
pub mod server;
pub mod storage;

pub use backend::{BackendClientAdapter, GradioClient, SynthesisBackend, SynthesisParameters};
pub use common::config::RelayConfig;
pub use server::{build_router, AppState, TryOnService};
pub use storage::TransientStorage;
