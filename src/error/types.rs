//! Consul client and configuration source error types

use reqwest::StatusCode;
use thiserror::Error;

/// Boxed underlying cause of a transport failure
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by a KV store client.
///
/// Only [`ConsulError::Transport`] is treated as a connectivity failure:
/// it is the one kind that makes the source try another endpoint.
#[derive(Error, Debug)]
pub enum ConsulError {
    #[error("Transport error talking to {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: BoxError,
    },

    #[error("Unexpected status {status} from {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: StatusCode,
        body: String,
    },

    #[error("Malformed response from {endpoint}: {message}")]
    Protocol { endpoint: String, message: String },

    #[error("Client construction failed: {0}")]
    Client(String),
}

impl ConsulError {
    /// Wrap a connectivity failure observed on `endpoint`
    pub fn transport(endpoint: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ConsulError::Transport {
            endpoint: endpoint.into(),
            source: source.into(),
        }
    }

    /// Check if this is a connectivity failure
    pub fn is_transport(&self) -> bool {
        matches!(self, ConsulError::Transport { .. })
    }

    /// Endpoint the error was observed on, if known
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ConsulError::Transport { endpoint, .. }
            | ConsulError::Status { endpoint, .. }
            | ConsulError::Protocol { endpoint, .. } => Some(endpoint),
            ConsulError::Client(_) => None,
        }
    }
}

/// Configuration errors detected while building a source.
///
/// These are programming or deployment mistakes and are never masked.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SourceError {
    #[error("Facility prefix must not be empty")]
    EmptyFacility,

    #[error("Invalid endpoint '{entry}': {reason}")]
    InvalidEndpoint { entry: String, reason: String },
}
