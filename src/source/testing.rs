//! In-memory KV store doubles shared by the source tests

use crate::consul::{ClientFactory, Endpoint, KvClient, RawEntry};
use crate::error::ConsulError;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// What a node answers to `list`
#[derive(Debug, Clone)]
pub enum Reply {
    Ok(Vec<RawEntry>),
    Transport,
    Status,
}

#[derive(Debug)]
struct Node {
    reachable: bool,
    list: Reply,
    peers: Vec<Endpoint>,
    probes: usize,
    lists: Vec<String>,
}

#[derive(Debug, Default)]
struct State {
    nodes: HashMap<String, Node>,
    created: Vec<String>,
    default_unavailable: bool,
}

/// Shared state behind every mock client; nodes are keyed by endpoint label
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    inner: Arc<Mutex<State>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_node<R>(&self, label: &str, f: impl FnOnce(&mut Node) -> R) -> R {
        let mut state = self.inner.lock().unwrap();
        let node = state
            .nodes
            .get_mut(label)
            .unwrap_or_else(|| panic!("unknown node {label}"));
        f(node)
    }

    pub fn add_node(&self, label: &str, list: Reply) {
        self.inner.lock().unwrap().nodes.insert(
            label.to_string(),
            Node {
                reachable: true,
                list,
                peers: Vec::new(),
                probes: 0,
                lists: Vec::new(),
            },
        );
    }

    pub fn add_unreachable(&self, label: &str) {
        self.add_node(label, Reply::Transport);
        self.set_reachable(label, false);
    }

    pub fn set_reachable(&self, label: &str, reachable: bool) {
        self.with_node(label, |node| node.reachable = reachable);
    }

    pub fn set_list(&self, label: &str, list: Reply) {
        self.with_node(label, |node| node.list = list);
    }

    pub fn set_peers(&self, label: &str, peers: Vec<Endpoint>) {
        self.with_node(label, |node| node.peers = peers);
    }

    pub fn set_default_unavailable(&self, unavailable: bool) {
        self.inner.lock().unwrap().default_unavailable = unavailable;
    }

    pub fn probe_count(&self, label: &str) -> usize {
        self.with_node(label, |node| node.probes)
    }

    pub fn list_calls(&self, label: &str) -> Vec<String> {
        self.with_node(label, |node| node.lists.clone())
    }

    /// Labels of every client the factory built, in order
    pub fn created(&self) -> Vec<String> {
        self.inner.lock().unwrap().created.clone()
    }

    pub fn client(&self, label: &str) -> MockClient {
        MockClient {
            label: label.to_string(),
            store: self.clone(),
        }
    }

    pub fn factory(&self) -> MockFactory {
        MockFactory {
            store: self.clone(),
        }
    }
}

fn refused(label: &str) -> ConsulError {
    let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
    ConsulError::transport(label, io)
}

#[derive(Debug, Clone)]
pub struct MockClient {
    label: String,
    store: MockStore,
}

impl MockClient {
    pub fn label(&self) -> &str {
        &self.label
    }
}

#[async_trait]
impl KvClient for MockClient {
    async fn list(&self, prefix: &str) -> Result<Vec<RawEntry>, ConsulError> {
        let reply = self.store.with_node(&self.label, |node| {
            node.lists.push(prefix.to_string());
            if node.reachable {
                node.list.clone()
            } else {
                Reply::Transport
            }
        });
        match reply {
            Reply::Ok(entries) => Ok(entries),
            Reply::Transport => Err(refused(&self.label)),
            Reply::Status => Err(ConsulError::Status {
                endpoint: self.label.clone(),
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "rpc error making call".to_string(),
            }),
        }
    }

    async fn probe(&self) -> Result<(), ConsulError> {
        let reachable = self.store.with_node(&self.label, |node| {
            node.probes += 1;
            node.reachable
        });
        if reachable {
            Ok(())
        } else {
            Err(refused(&self.label))
        }
    }

    async fn peers(&self) -> Result<Vec<Endpoint>, ConsulError> {
        Ok(self.store.with_node(&self.label, |node| node.peers.clone()))
    }
}

#[derive(Debug, Clone)]
pub struct MockFactory {
    store: MockStore,
}

impl ClientFactory for MockFactory {
    type Client = MockClient;

    fn client(&self, endpoint: &Endpoint) -> Result<MockClient, ConsulError> {
        let label = endpoint.to_string();
        self.store.inner.lock().unwrap().created.push(label.clone());
        Ok(self.store.client(&label))
    }

    fn default_client(&self) -> Result<MockClient, ConsulError> {
        let label = Endpoint::local_agent().to_string();
        let mut state = self.store.inner.lock().unwrap();
        if state.default_unavailable {
            return Err(ConsulError::Client("no local agent".to_string()));
        }
        state.created.push(label.clone());
        drop(state);
        Ok(self.store.client(&label))
    }
}
