//! The per-zone load-balancer query contract.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use routegrid_core::{LoadBalancer, ZoneId};
use tokio::sync::RwLock;

use crate::error::{SourceError, SourceResult};

/// Reports the exclusive load balancers of a zone.
#[async_trait]
pub trait LoadBalancerSource: Send + Sync {
    async fn load_balancers(&self, zone: &ZoneId) -> SourceResult<Vec<LoadBalancer>>;
}

/// A source serving fixed per-zone answers. Zones never set report no load
/// balancers.
#[derive(Default)]
pub struct MemoryLoadBalancerSource {
    zones: RwLock<BTreeMap<ZoneId, Vec<LoadBalancer>>>,
    failing: RwLock<BTreeSet<ZoneId>>,
}

impl MemoryLoadBalancerSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, zone: ZoneId, load_balancers: Vec<LoadBalancer>) {
        self.zones.write().await.insert(zone, load_balancers);
    }

    /// Make queries for `zone` fail until [`recover`](Self::recover) is called.
    pub async fn fail(&self, zone: ZoneId) {
        self.failing.write().await.insert(zone);
    }

    pub async fn recover(&self, zone: &ZoneId) {
        self.failing.write().await.remove(zone);
    }
}

#[async_trait]
impl LoadBalancerSource for MemoryLoadBalancerSource {
    async fn load_balancers(&self, zone: &ZoneId) -> SourceResult<Vec<LoadBalancer>> {
        if self.failing.read().await.contains(zone) {
            return Err(SourceError::Unavailable(zone.clone()));
        }
        Ok(self
            .zones
            .read()
            .await
            .get(zone)
            .cloned()
            .unwrap_or_default())
    }
}
