//! Error types

mod types;

pub use types::{BoxError, ConsulError, SourceError};
