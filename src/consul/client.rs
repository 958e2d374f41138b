//! Consul HTTP API client
//!
//! Talks to a single Consul agent over `reqwest`. One `ConsulClient` is bound
//! to exactly one endpoint; failover between endpoints is the selector's job.

use super::endpoint::Endpoint;
use super::models::{CatalogService, KvPair};
use super::{ClientFactory, KvClient, RawEntry};
use crate::error::ConsulError;
use crate::utils::{truncate_with_suffix, TimeoutConfig};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

/// Service name Consul registers its own servers under
pub const CONSUL_SERVICE_NAME: &str = "consul";

/// Longest error body kept in a [`ConsulError::Status`]
const MAX_ERROR_BODY_CHARS: usize = 256;

/// Options shared by every client a factory builds
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// ACL token sent as `X-Consul-Token`
    pub token: Option<String>,
    /// Datacenter sent as the `dc` query parameter
    pub datacenter: Option<String>,
    /// Transport deadlines
    pub timeouts: TimeoutConfig,
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.datacenter = Some(datacenter.into());
        self
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }
}

fn build_http_client(timeouts: &TimeoutConfig) -> Result<reqwest::Client, ConsulError> {
    reqwest::Client::builder()
        .connect_timeout(timeouts.connect_timeout)
        .timeout(timeouts.request_timeout)
        .build()
        .map_err(|e| ConsulError::Client(e.to_string()))
}

/// HTTP client bound to one Consul endpoint
#[derive(Debug, Clone)]
pub struct ConsulClient {
    endpoint: Endpoint,
    base_url: String,
    http: reqwest::Client,
    token: Option<String>,
    datacenter: Option<String>,
}

impl ConsulClient {
    /// Create a client for `endpoint` with its own connection pool
    pub fn new(endpoint: Endpoint, options: &ClientOptions) -> Result<Self, ConsulError> {
        let http = build_http_client(&options.timeouts)?;
        Ok(Self::with_http_client(endpoint, http, options))
    }

    /// Create a client reusing an existing `reqwest::Client`
    pub fn with_http_client(
        endpoint: Endpoint,
        http: reqwest::Client,
        options: &ClientOptions,
    ) -> Self {
        Self {
            base_url: endpoint.base_url(),
            endpoint,
            http,
            token: options.token.clone(),
            datacenter: options.datacenter.clone(),
        }
    }

    /// Endpoint this client talks to
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let mut request = self.http.get(url);
        if let Some(token) = &self.token {
            request = request.header("X-Consul-Token", token);
        }
        if let Some(dc) = &self.datacenter {
            request = request.query(&[("dc", dc)]);
        }
        request
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ConsulError> {
        request
            .send()
            .await
            .map_err(|e| ConsulError::transport(self.endpoint.to_string(), e))
    }

    /// Read the whole body; a failure mid-body is a connectivity failure
    async fn read_body(&self, response: Response) -> Result<Vec<u8>, ConsulError> {
        response
            .bytes()
            .await
            .map(|body| body.to_vec())
            .map_err(|e| ConsulError::transport(self.endpoint.to_string(), e))
    }

    async fn error_for_status(&self, response: Response) -> ConsulError {
        let status = response.status();
        match self.read_body(response).await {
            Ok(body) => ConsulError::Status {
                endpoint: self.endpoint.to_string(),
                status,
                body: truncate_with_suffix(
                    &String::from_utf8_lossy(&body),
                    MAX_ERROR_BODY_CHARS,
                    "...",
                ),
            },
            Err(e) => e,
        }
    }

    async fn json<T: DeserializeOwned>(&self, response: Response) -> Result<T, ConsulError> {
        let body = self.read_body(response).await?;
        serde_json::from_slice(&body).map_err(|e| ConsulError::Protocol {
            endpoint: self.endpoint.to_string(),
            message: e.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ConsulError> {
        let response = self.send(self.get(url)).await?;
        if !response.status().is_success() {
            return Err(self.error_for_status(response).await);
        }
        self.json(response).await
    }
}

#[async_trait]
impl KvClient for ConsulClient {
    async fn list(&self, prefix: &str) -> Result<Vec<RawEntry>, ConsulError> {
        let url = format!(
            "{}/v1/kv/{}?recurse",
            self.base_url,
            prefix.trim_start_matches('/')
        );

        tracing::debug!(endpoint = %self.endpoint, prefix = %prefix, "Listing Consul keys");

        let response = self.send(self.get(&url)).await?;
        // Consul answers 404 when nothing lives under the prefix
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(self.error_for_status(response).await);
        }

        let pairs: Option<Vec<KvPair>> = self.json(response).await?;
        Ok(pairs
            .unwrap_or_default()
            .into_iter()
            .map(RawEntry::from)
            .collect())
    }

    async fn probe(&self) -> Result<(), ConsulError> {
        let url = format!(
            "{}/v1/health/service/{}",
            self.base_url, CONSUL_SERVICE_NAME
        );
        let _checks: Vec<serde_json::Value> = self.get_json(&url).await?;
        Ok(())
    }

    async fn peers(&self) -> Result<Vec<Endpoint>, ConsulError> {
        let url = format!(
            "{}/v1/catalog/service/{}",
            self.base_url, CONSUL_SERVICE_NAME
        );
        let nodes: Vec<CatalogService> = self.get_json(&url).await?;

        // ServicePort of the consul service is the server RPC port; peers are
        // reached on the same HTTP port as this endpoint.
        let port = self.endpoint.effective_port();
        Ok(nodes
            .iter()
            .filter_map(CatalogService::reachable_address)
            .map(|address| Endpoint::new(address, port))
            .collect())
    }
}

/// Factory producing [`ConsulClient`]s that share one connection pool
#[derive(Debug, Clone)]
pub struct ConsulClientFactory {
    http: reqwest::Client,
    options: ClientOptions,
}

impl ConsulClientFactory {
    pub fn new(options: ClientOptions) -> Result<Self, ConsulError> {
        let http = build_http_client(&options.timeouts)?;
        Ok(Self { http, options })
    }
}

impl ClientFactory for ConsulClientFactory {
    type Client = ConsulClient;

    fn client(&self, endpoint: &Endpoint) -> Result<ConsulClient, ConsulError> {
        Ok(ConsulClient::with_http_client(
            endpoint.clone(),
            self.http.clone(),
            &self.options,
        ))
    }

    fn default_client(&self) -> Result<ConsulClient, ConsulError> {
        self.client(&Endpoint::local_agent())
    }
}
