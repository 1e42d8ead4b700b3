//! Discovery from fixed address lists in the gateway configuration.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::discovery::balancer::Balancer;
use crate::discovery::{Discovery, DiscoveryError};

#[derive(Debug)]
pub struct StaticDiscovery {
    services: BTreeMap<String, Vec<String>>,
    balancer: Box<dyn Balancer>,
}

impl StaticDiscovery {
    pub fn new(services: BTreeMap<String, Vec<String>>, balancer: Box<dyn Balancer>) -> Self {
        Self { services, balancer }
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn resolve(&self, service: &str) -> Result<String, DiscoveryError> {
        let instances = self.services.get(service).map(Vec::as_slice).unwrap_or_default();
        self.balancer
            .pick(instances)
            .cloned()
            .ok_or_else(|| DiscoveryError::NoInstances(service.to_string()))
    }
}
