//! # Configuration
//!
//! TOML configuration for the relay. Every section is optional: an empty file
//! (or no file at all) yields the built-in defaults, which bind the server to
//! `0.0.0.0:3000` and talk to the public IDM-VTON Space.
//!
//! ## Example TOML
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0:3000"
//! max_upload_bytes = 52428800
//!
//! [backend]
//! source = "yisol/IDM-VTON"
//! # hf_token = "hf_..."
//! # timeout_secs = 300
//!
//! [synthesis]
//! description = "A beautiful garment"
//! auto_mask = true
//! auto_crop = false
//! steps = 30
//! seed = 42
//! api_name = "/tryon"
//!
//! [storage]
//! # root = "/var/tmp/tryon"
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::backend::SynthesisParameters;

/// Load a TOML configuration file and deserialize it into the specified type.
///
/// # Arguments
/// - `path`: Path to the TOML configuration file
///
/// # Returns
/// - `Ok(T)`: Successfully loaded and parsed configuration
/// - `Err`: File I/O or parsing error
///
/// # Example
/// ```ignore
/// let config: RelayConfig = load_config("config/relay.toml")?;
/// ```
pub fn load_config<T>(path: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(path)?;
    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Complete relay configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerSettings,
    /// Remote synthesis backend connection
    #[serde(default)]
    pub backend: BackendSettings,
    /// Default parameters sent with every try-on call
    #[serde(default)]
    pub synthesis: SynthesisParameters,
    /// Where request workspaces are created
    #[serde(default)]
    pub storage: StorageSettings,
}

impl RelayConfig {
    /// Loads the relay configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        load_config(path)
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address the listener binds to (e.g. "0.0.0.0:3000")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Upper bound on the size of a multipart request body, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Remote synthesis backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Hugging Face Space id ("owner/name") or a base URL of a Gradio server
    #[serde(default = "default_backend_source")]
    pub source: String,
    /// Access token sent as a bearer token on every backend request
    #[serde(default)]
    pub hf_token: Option<String>,
    /// Upper bound on one synthesis call; unset means wait for the backend
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl BackendSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            source: default_backend_source(),
            hf_token: None,
            timeout_secs: None,
        }
    }
}

/// Workspace location settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Parent directory for request workspaces (defaults to the OS temp dir)
    #[serde(default)]
    pub root: Option<PathBuf>,
}

impl StorageSettings {
    pub fn root_dir(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(std::env::temp_dir)
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_backend_source() -> String {
    "yisol/IDM-VTON".to_string()
}
