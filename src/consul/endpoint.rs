//! Consul endpoint addresses
//!
//! Endpoints are configured as a comma-separated `host[:port]` list.

use crate::error::SourceError;
use std::fmt;

/// Default Consul HTTP API port
pub const DEFAULT_PORT: u16 = 8500;

/// Host used when no endpoint list is configured
pub const LOCAL_AGENT_HOST: &str = "127.0.0.1";

/// One reachable address of a Consul agent or server
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: Option<u16>,
}

impl Endpoint {
    /// Create an endpoint with an explicit port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port: Some(port),
        }
    }

    /// Create an endpoint that uses the default port
    pub fn host_only(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
        }
    }

    /// The local agent address used by the default client
    pub fn local_agent() -> Self {
        Self::new(LOCAL_AGENT_HOST, DEFAULT_PORT)
    }

    /// Parse a single `host[:port]` entry
    pub fn parse(entry: &str) -> Result<Self, SourceError> {
        let entry = entry.trim();
        let invalid = |reason: &str| SourceError::InvalidEndpoint {
            entry: entry.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = entry.split(':');
        let host = parts.next().unwrap_or_default().trim();
        if host.is_empty() {
            return Err(invalid("host is empty"));
        }

        let port = match parts.next() {
            None => None,
            Some(port) => Some(
                port.trim()
                    .parse::<u16>()
                    .map_err(|_| invalid("port is not a number between 0 and 65535"))?,
            ),
        };

        if parts.next().is_some() {
            return Err(invalid("expected host[:port]"));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Port to connect to, falling back to [`DEFAULT_PORT`]
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Whether both endpoints reach the same host and port, defaults applied
    pub fn same_address(&self, other: &Endpoint) -> bool {
        self.host == other.host && self.effective_port() == other.effective_port()
    }

    /// Base URL of the HTTP API behind this endpoint
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.effective_port())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => write!(f, "{}", self.host),
        }
    }
}

/// Parse a comma-separated `host[:port]` list.
///
/// Blank entries are ignored, so an empty or all-blank list yields no
/// endpoints, which means "use the local agent".
pub fn parse_endpoints(hosts: &str) -> Result<Vec<Endpoint>, SourceError> {
    hosts
        .split(',')
        .filter(|entry| !entry.trim().is_empty())
        .map(Endpoint::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_and_port() {
        let endpoint = Endpoint::parse("localhost:8500").unwrap();
        assert_eq!(endpoint.host(), "localhost");
        assert_eq!(endpoint.port(), Some(8500));
        assert_eq!(endpoint.to_string(), "localhost:8500");
    }

    #[test]
    fn test_parse_host_only() {
        let endpoint = Endpoint::parse(" consul.internal ").unwrap();
        assert_eq!(endpoint.host(), "consul.internal");
        assert_eq!(endpoint.port(), None);
        assert_eq!(endpoint.effective_port(), DEFAULT_PORT);
        assert_eq!(endpoint.base_url(), "http://consul.internal:8500");
    }

    #[test]
    fn test_same_address_applies_default_port() {
        let seed = Endpoint::host_only("seed");
        assert!(seed.same_address(&Endpoint::new("seed", DEFAULT_PORT)));
        assert!(!seed.same_address(&Endpoint::new("seed", 8501)));
        assert!(!seed.same_address(&Endpoint::host_only("other")));
        assert_ne!(seed, Endpoint::new("seed", DEFAULT_PORT));
    }

    #[test]
    fn test_parse_rejects_malformed_entries() {
        assert!(matches!(
            Endpoint::parse(":8500"),
            Err(SourceError::InvalidEndpoint { .. })
        ));
        assert!(Endpoint::parse("host:port").is_err());
        assert!(Endpoint::parse("host:70000").is_err());
        assert!(Endpoint::parse("host:1:2").is_err());
    }

    #[test]
    fn test_parse_endpoint_list_keeps_order() {
        let endpoints = parse_endpoints("first:8500, second ,third:8501").unwrap();
        assert_eq!(
            endpoints,
            vec![
                Endpoint::new("first", 8500),
                Endpoint::host_only("second"),
                Endpoint::new("third", 8501),
            ]
        );
    }

    #[test]
    fn test_parse_empty_list() {
        assert!(parse_endpoints("").unwrap().is_empty());
        assert!(parse_endpoints(" , ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_list_propagates_errors() {
        let err = parse_endpoints("good:8500,bad:x").unwrap_err();
        assert_eq!(
            err,
            SourceError::InvalidEndpoint {
                entry: "bad:x".to_string(),
                reason: "port is not a number between 0 and 65535".to_string(),
            }
        );
    }
}
