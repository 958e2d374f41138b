//! Consul HTTP API response models
//!
//! Only the fields this crate reads are modelled; unknown fields are ignored.

use serde::Deserialize;

/// One entry of a `GET /v1/kv/<prefix>?recurse` response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KvPair {
    #[serde(rename = "Key")]
    pub key: String,

    /// Base64 encoded value, `null` for keys stored without a value
    #[serde(rename = "Value", default)]
    pub value: Option<String>,

    #[serde(rename = "ModifyIndex", default)]
    pub modify_index: u64,
}

/// One node of a `GET /v1/catalog/service/<name>` response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogService {
    #[serde(rename = "Node", default)]
    pub node: String,

    #[serde(rename = "Address", default)]
    pub address: String,

    #[serde(rename = "ServiceAddress", default)]
    pub service_address: String,

    #[serde(rename = "ServicePort", default)]
    pub service_port: u16,
}

impl CatalogService {
    /// Address to reach this node on, preferring the service address
    pub fn reachable_address(&self) -> Option<&str> {
        [self.service_address.as_str(), self.address.as_str()]
            .into_iter()
            .find(|addr| !addr.is_empty())
    }
}
