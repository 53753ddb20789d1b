//! Per-tick load balancer snapshot.

use std::collections::{BTreeMap, BTreeSet};

use routegrid_core::{DeploymentId, HostName, LoadBalancer, ZoneId};
use tracing::{debug, warn};

use crate::source::LoadBalancerSource;
use crate::zones::ZoneRegistry;

/// Live load balancers of every ready zone, grouped by deployment.
///
/// Immutable once built. Zones whose query failed are listed in
/// [`failed_zones`](Self::failed_zones) and contribute no load balancers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadBalancerSnapshot {
    deployments: BTreeMap<DeploymentId, Vec<LoadBalancer>>,
    failed_zones: BTreeSet<ZoneId>,
}

impl LoadBalancerSnapshot {
    /// Query every zone in `zones` and group the answers.
    pub async fn build(zones: &ZoneRegistry, source: &dyn LoadBalancerSource) -> Self {
        let mut snapshot = Self::default();
        for zone in zones.zones() {
            match source.load_balancers(zone).await {
                Ok(load_balancers) => {
                    debug!(%zone, count = load_balancers.len(), "zone load balancers listed");
                    for load_balancer in load_balancers {
                        snapshot.insert(zone.clone(), load_balancer);
                    }
                }
                Err(e) => {
                    warn!(%zone, error = %e, "could not list load balancers, skipping zone this tick");
                    snapshot.failed_zones.insert(zone.clone());
                }
            }
        }
        snapshot
    }

    /// Append `load_balancer` to its deployment in `zone`.
    pub fn insert(&mut self, zone: ZoneId, load_balancer: LoadBalancer) {
        self.deployments
            .entry(DeploymentId::new(load_balancer.application.clone(), zone))
            .or_default()
            .push(load_balancer);
    }

    pub fn deployments(&self) -> &BTreeMap<DeploymentId, Vec<LoadBalancer>> {
        &self.deployments
    }

    /// Every live load balancer, in deployment order.
    pub fn load_balancers(&self) -> impl Iterator<Item = &LoadBalancer> {
        self.deployments.values().flatten()
    }

    pub fn active_hostnames(&self) -> BTreeSet<&HostName> {
        self.load_balancers().map(|lb| &lb.hostname).collect()
    }

    pub fn failed_zones(&self) -> &BTreeSet<ZoneId> {
        &self.failed_zones
    }

    pub fn is_failed(&self, zone: &ZoneId) -> bool {
        self.failed_zones.contains(zone)
    }

    pub fn is_empty(&self) -> bool {
        self.deployments.is_empty()
    }
}
