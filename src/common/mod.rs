//! # Common Components
//!
//! Shared utilities used by the library and the server binary.
//!
//! ## Modules
//!
//! - [`config`]: TOML configuration for the listener, backend, synthesis defaults and storage
//! - [`logging`]: `env_logger` setup with timestamped output

pub mod config;
pub mod logging;

pub use config::{load_config, RelayConfig};
