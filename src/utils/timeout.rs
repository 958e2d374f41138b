//! Timeout configuration for Consul HTTP calls
//!
//! Deadlines live in the transport: every request made by the HTTP client
//! is bounded by these values, the polling core adds none of its own.

use std::time::Duration;

/// Timeout configuration for the Consul HTTP client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Timeout for establishing a TCP connection (default: 5s)
    pub connect_timeout: Duration,

    /// Timeout for a whole request, including the body (default: 10s)
    pub request_timeout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl TimeoutConfig {
    /// Create a new timeout config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
