//! Endpoint selection and failover
//!
//! The selector owns the candidate endpoints and the currently bound client.
//! Binding walks a freshly shuffled copy of the candidates and keeps the
//! first one whose liveness probe succeeds, so a fleet of sources spreads its
//! load across the Consul agents it is given.

use crate::consul::{ClientFactory, Endpoint, KvClient};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Label used for the client built without an endpoint list
pub const LOCAL_AGENT_LABEL: &str = "local agent";

/// A client that passed its probe, with the endpoint it was built for
#[derive(Debug)]
pub struct BoundClient<C> {
    client: C,
    label: String,
}

impl<C> BoundClient<C> {
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Human readable endpoint, used in logs
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Picks a live client out of a set of candidate endpoints
#[derive(Debug)]
pub struct EndpointSelector<F: ClientFactory> {
    factory: F,
    /// Configured endpoints, fixed after construction
    candidates: Vec<Endpoint>,
    /// Peers learned from the catalog of a bound endpoint
    discovered: Vec<Endpoint>,
    discover_peers: bool,
    rng: StdRng,
    bound: Option<BoundClient<F::Client>>,
}

impl<F: ClientFactory> EndpointSelector<F> {
    /// Create a selector; an empty candidate list means "use the local agent"
    pub fn new(factory: F, candidates: Vec<Endpoint>) -> Self {
        Self {
            factory,
            candidates,
            discovered: Vec::new(),
            discover_peers: true,
            rng: StdRng::from_entropy(),
            bound: None,
        }
    }

    /// Use a fixed shuffle seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Enable or disable catalog peer discovery
    pub fn with_peer_discovery(mut self, enabled: bool) -> Self {
        self.discover_peers = enabled;
        self
    }

    pub fn candidates(&self) -> &[Endpoint] {
        &self.candidates
    }

    pub fn discovered(&self) -> &[Endpoint] {
        &self.discovered
    }

    pub fn bound(&self) -> Option<&BoundClient<F::Client>> {
        self.bound.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    /// Forget the bound client
    pub fn invalidate(&mut self) {
        self.bound = None;
    }

    /// Try to bind a working client.
    ///
    /// Returns `false` when no endpoint could be bound; connectivity
    /// problems are logged, never raised. A failed bind leaves the selector
    /// unbound.
    pub async fn bind(&mut self) -> bool {
        self.bound = None;

        if self.candidates.is_empty() {
            return self.bind_local_agent();
        }

        let mut order = self.candidates.clone();
        order.shuffle(&mut self.rng);
        if self.bind_first_live(&order).await {
            return true;
        }

        if self.discover_peers {
            let mut peers: Vec<Endpoint> = self
                .discovered
                .iter()
                .filter(|peer| !order.iter().any(|tried| tried.same_address(peer)))
                .cloned()
                .collect();
            if !peers.is_empty() {
                peers.shuffle(&mut self.rng);
                tracing::info!(
                    peers = peers.len(),
                    "Configured Consul endpoints unavailable, trying discovered peers"
                );
                if self.bind_first_live(&peers).await {
                    return true;
                }
            }
        }

        tracing::error!(
            candidates = self.candidates.len(),
            discovered = self.discovered.len(),
            "No Consul endpoint reachable"
        );
        false
    }

    fn bind_local_agent(&mut self) -> bool {
        match self.factory.default_client() {
            Ok(client) => {
                tracing::info!("Bound Consul client to local agent");
                self.bound = Some(BoundClient {
                    client,
                    label: LOCAL_AGENT_LABEL.to_string(),
                });
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to create Consul client for local agent");
                false
            }
        }
    }

    async fn bind_first_live(&mut self, endpoints: &[Endpoint]) -> bool {
        for endpoint in endpoints {
            if let Some(client) = self.probe(endpoint).await {
                tracing::info!(endpoint = %endpoint, "Bound Consul client");
                if self.discover_peers {
                    if let Some(peers) = fetch_peers(&client).await {
                        self.discovered = peers;
                    }
                }
                self.bound = Some(BoundClient {
                    client,
                    label: endpoint.to_string(),
                });
                return true;
            }
        }
        false
    }

    async fn probe(&self, endpoint: &Endpoint) -> Option<F::Client> {
        let client = match self.factory.client(endpoint) {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(endpoint = %endpoint, error = %e, "Failed to create Consul client");
                return None;
            }
        };

        match client.probe().await {
            Ok(()) => Some(client),
            Err(e) if e.is_transport() => {
                tracing::error!(endpoint = %endpoint, error = %e, "Consul service not reachable");
                None
            }
            Err(e) => {
                tracing::warn!(endpoint = %endpoint, error = %e, "Consul endpoint failed liveness probe");
                None
            }
        }
    }

    /// Re-read the peer list through the bound client.
    ///
    /// Keeps the previous list on failure. The local agent path has no
    /// candidates to fail over from, so it never refreshes.
    pub async fn refresh_peers(&mut self) {
        if !self.discover_peers || self.candidates.is_empty() {
            return;
        }
        let Some(bound) = self.bound.as_ref() else {
            return;
        };
        if let Some(peers) = fetch_peers(&bound.client).await {
            self.discovered = peers;
        }
    }
}

async fn fetch_peers<C: KvClient>(client: &C) -> Option<Vec<Endpoint>> {
    match client.peers().await {
        Ok(peers) => {
            tracing::debug!(peers = peers.len(), "Refreshed Consul peers from catalog");
            Some(peers)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to refresh Consul peers, keeping previous list");
            None
        }
    }
}
