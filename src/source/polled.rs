//! Polled configuration source
//!
//! `ConsulConfigurationSource::poll` is the single entry point for the
//! polling harness. Each call yields either a full snapshot of the facility
//! or `None` when no data could be fetched this cycle.

use super::extractor::{Snapshot, SnapshotExtractor};
use super::selector::EndpointSelector;
use crate::consul::{parse_endpoints, ClientFactory, ConsulClientFactory};
use crate::error::SourceError;

/// Extract attempts per poll: the first one plus one retry after a rebind
const MAX_ATTEMPTS: u32 = 2;

/// Connection state of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// No client bound
    Unbound,
    /// A client is bound and its last call succeeded
    Bound,
    /// The bound client just failed with a transport error, rebind pending
    Degraded,
}

impl std::fmt::Display for SourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unbound => write!(f, "unbound"),
            Self::Bound => write!(f, "bound"),
            Self::Degraded => write!(f, "degraded"),
        }
    }
}

/// Configuration source backed by a Consul KV facility
#[derive(Debug)]
pub struct ConsulConfigurationSource<F: ClientFactory = ConsulClientFactory> {
    selector: EndpointSelector<F>,
    extractor: SnapshotExtractor,
    state: SourceState,
}

impl<F: ClientFactory> ConsulConfigurationSource<F> {
    /// Create a source for `facility` over a comma-separated `host[:port]`
    /// list. An empty list uses the local agent.
    pub fn new(hosts: &str, facility: &str, factory: F) -> Result<Self, SourceError> {
        let extractor = SnapshotExtractor::new(facility)?;
        let selector = EndpointSelector::new(factory, parse_endpoints(hosts)?);
        Ok(Self::from_parts(selector, extractor))
    }

    /// Create a source from an already configured selector
    pub fn from_parts(selector: EndpointSelector<F>, extractor: SnapshotExtractor) -> Self {
        Self {
            selector,
            extractor,
            state: SourceState::Unbound,
        }
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    pub fn facility(&self) -> &str {
        self.extractor.prefix()
    }

    pub fn selector(&self) -> &EndpointSelector<F> {
        &self.selector
    }

    /// Fetch a full snapshot of the facility.
    ///
    /// A transport failure on the bound client triggers one rebind and one
    /// retry within the same call. `None` means no data this cycle and must
    /// not be read as an emptied facility.
    pub async fn poll(&mut self) -> Option<Snapshot> {
        for attempt in 1..=MAX_ATTEMPTS {
            if self.state != SourceState::Bound && !self.rebind().await {
                return None;
            }
            let bound = self.selector.bound()?;

            match self.extractor.extract(bound.client()).await {
                Ok(snapshot) => {
                    tracing::debug!(
                        endpoint = %bound.label(),
                        facility = %self.extractor.prefix(),
                        properties = snapshot.len(),
                        "Polled configuration"
                    );
                    if !snapshot.is_empty() {
                        self.selector.refresh_peers().await;
                    }
                    return Some(snapshot);
                }
                Err(e) if e.is_transport() => {
                    tracing::error!(
                        endpoint = %bound.label(),
                        attempt,
                        error = %e,
                        "Error while polling configuration. Try another server if available."
                    );
                    self.state = SourceState::Degraded;
                }
                Err(e) => {
                    tracing::error!(
                        endpoint = %bound.label(),
                        error = %e,
                        "Error while polling configuration"
                    );
                    return None;
                }
            }
        }
        None
    }

    async fn rebind(&mut self) -> bool {
        if self.selector.bind().await {
            self.state = SourceState::Bound;
            true
        } else {
            tracing::warn!(
                facility = %self.extractor.prefix(),
                "No configuration available this cycle"
            );
            self.state = SourceState::Unbound;
            false
        }
    }
}
