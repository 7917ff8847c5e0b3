//! Observatory Core - Foundation crate for the HTTP Observatory client.
//!
//! This crate provides the configuration layer, its error types and the
//! shared newtypes that the client and the command-line tool depend on.
//!
//! # Modules
//!
//! - [`error`] - Configuration error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Shared newtypes (`Site`)
//!
//! # Example
//!
//! ```rust
//! use observatory_core::{AppConfig, Site};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default().normalized();
//! assert_eq!(config.client.retries, 5);
//!
//! let site = Site::new("www.example.org")?;
//! assert_eq!(site.as_str(), "www.example.org");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, ClientConfig, ProxyConfig, DEFAULT_BASE_URL};
pub use error::{ConfigError, ConfigResult};
pub use types::{InvalidSite, Site};
