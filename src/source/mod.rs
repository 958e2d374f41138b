//! Polling configuration source
//!
//! This module turns a Consul KV facility into a stream of flat property
//! snapshots.
//!
//! # Components
//! - [`EndpointSelector`] binds a live client, failing over between endpoints
//! - [`SnapshotExtractor`] lists a facility and flattens it into a [`Snapshot`]
//! - [`ConsulConfigurationSource`] ties both together behind `poll()`
//! - [`poller::spawn`] drives a source on a fixed delay
//!
//! # Example
//! ```ignore
//! use consul_config_source::consul::{ClientOptions, ConsulClientFactory};
//! use consul_config_source::source::{ConsulConfigurationSource, PollerConfig};
//!
//! let factory = ConsulClientFactory::new(ClientOptions::default())?;
//! let mut source = ConsulConfigurationSource::new("consul-1:8500,consul-2", "my-service", factory)?;
//!
//! if let Some(snapshot) = source.poll().await {
//!     println!("{} properties", snapshot.len());
//! }
//! ```

mod extractor;
mod polled;
pub mod poller;
mod selector;

#[cfg(test)]
pub(crate) mod testing;

pub use extractor::{
    build_snapshot, extract, strip_length, within_prefix, Snapshot, SnapshotExtractor,
    PATH_SEPARATOR,
};
pub use polled::{ConsulConfigurationSource, SourceState};
pub use poller::{PollerConfig, PollerHandle, SnapshotReceiver};
pub use selector::{BoundClient, EndpointSelector, LOCAL_AGENT_LABEL};
