//! Consul KV store client
//!
//! This module defines the contract the configuration source needs from a
//! KV store client, together with an HTTP implementation backed by the
//! Consul agent API.
//!
//! # Contract
//! - [`KvClient::list`] returns every entry under a prefix, values still
//!   base64 encoded the way Consul ships them.
//! - [`KvClient::probe`] is a cheap liveness check.
//! - [`KvClient::peers`] lists other Consul nodes that can be failed over to.
//! - Connectivity failures surface as [`ConsulError::Transport`]; every
//!   other failure uses a different variant.

mod client;
mod endpoint;
mod models;

pub use client::{ClientOptions, ConsulClient, ConsulClientFactory, CONSUL_SERVICE_NAME};
pub use endpoint::{parse_endpoints, Endpoint, DEFAULT_PORT, LOCAL_AGENT_HOST};
pub use models::{CatalogService, KvPair};

use crate::error::ConsulError;
use async_trait::async_trait;

/// A key as listed from the store, value still in its wire encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    /// Full key path
    pub key: String,
    /// Base64 text, `None` when the key holds no value
    pub value: Option<String>,
}

impl RawEntry {
    pub fn new(key: impl Into<String>, value: Option<String>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

impl From<KvPair> for RawEntry {
    fn from(pair: KvPair) -> Self {
        Self {
            key: pair.key,
            value: pair.value,
        }
    }
}

/// Operations the configuration source needs from a KV store client
#[async_trait]
pub trait KvClient: Send + Sync {
    /// List all entries whose key starts with `prefix`
    async fn list(&self, prefix: &str) -> Result<Vec<RawEntry>, ConsulError>;

    /// Cheap liveness check against the store
    async fn probe(&self) -> Result<(), ConsulError>;

    /// Other store nodes reachable through the same API
    async fn peers(&self) -> Result<Vec<Endpoint>, ConsulError>;
}

/// Builds clients for endpoints
pub trait ClientFactory: Send + Sync {
    type Client: KvClient + std::fmt::Debug;

    /// Build a client for one endpoint
    fn client(&self, endpoint: &Endpoint) -> Result<Self::Client, ConsulError>;

    /// Build a client for the local agent
    fn default_client(&self) -> Result<Self::Client, ConsulError>;
}
