//! Discovery through the Consul health API.
//!
//! # Design Decisions
//! - Only instances passing every health check are candidates
//! - No caching: each resolution is one HTTP round trip

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::discovery::balancer::Balancer;
use crate::discovery::{Discovery, DiscoveryError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthEntry {
    node: NodeInfo,
    service: ServiceInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NodeInfo {
    #[serde(default)]
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceInfo {
    #[serde(default)]
    address: String,
    port: u16,
}

impl HealthEntry {
    fn instance(&self) -> String {
        let host = if self.service.address.is_empty() {
            &self.node.address
        } else {
            &self.service.address
        };
        format!("{}:{}", host, self.service.port)
    }
}

#[derive(Debug)]
pub struct ConsulDiscovery {
    base: Url,
    client: reqwest::Client,
    balancer: Box<dyn Balancer>,
}

impl ConsulDiscovery {
    pub fn new(base: Url, balancer: Box<dyn Balancer>) -> Self {
        Self {
            base,
            client: reqwest::Client::new(),
            balancer,
        }
    }

    fn health_url(&self, service: &str) -> Result<Url, DiscoveryError> {
        let mut url = self
            .base
            .join(&format!("v1/health/service/{service}"))
            .map_err(|e| lookup_error(service, e))?;
        url.query_pairs_mut().append_pair("passing", "true");
        Ok(url)
    }

    async fn passing_instances(&self, service: &str) -> Result<Vec<String>, DiscoveryError> {
        let url = self.health_url(service)?;
        let entries: Vec<HealthEntry> = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| lookup_error(service, e))?
            .json()
            .await
            .map_err(|e| lookup_error(service, e))?;

        Ok(entries.iter().map(HealthEntry::instance).collect())
    }
}

fn lookup_error(service: &str, error: impl std::fmt::Display) -> DiscoveryError {
    DiscoveryError::Lookup {
        service: service.to_string(),
        message: error.to_string(),
    }
}

#[async_trait]
impl Discovery for ConsulDiscovery {
    async fn resolve(&self, service: &str) -> Result<String, DiscoveryError> {
        let instances = self.passing_instances(service).await?;
        tracing::trace!(service = %service, instances = instances.len(), "Consul lookup");
        self.balancer
            .pick(&instances)
            .cloned()
            .ok_or_else(|| DiscoveryError::NoInstances(service.to_string()))
    }
}
