//! Consul-backed polling configuration source library

// Public modules
pub mod config;
pub mod consul;
pub mod error;
pub mod logging;
pub mod source;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use error::{ConsulError, SourceError};
pub use source::{ConsulConfigurationSource, Snapshot};
