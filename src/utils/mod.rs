//! Utility modules
//!
//! Contains string helpers and HTTP timeout configuration.

pub mod string;
pub mod timeout;

pub use string::{skip_chars, truncate_with_suffix};
pub use timeout::TimeoutConfig;
