//! Routing policies — the persisted desired state of the maintainer.
//!
//! A policy records that a load balancer existed for `(owner, cluster, zone)`
//! and which DNS records were requested for it. The key deliberately excludes
//! the hostname and DNS zone: a load balancer that changes either is the same
//! policy, updated in place.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{ApplicationId, ClusterId, DnsZone, HostName, RotationName, ZoneId};
use crate::load_balancer::LoadBalancer;

/// Identity of a routing policy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PolicyKey {
    pub owner: ApplicationId,
    pub cluster: ClusterId,
    pub zone: ZoneId,
}

impl fmt::Display for PolicyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} in {}", self.owner, self.cluster, self.zone)
    }
}

/// DNS routing state for one exclusive load balancer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingPolicy {
    pub owner: ApplicationId,
    pub cluster: ClusterId,
    pub zone: ZoneId,
    pub canonical_name: HostName,
    pub dns_zone: Option<DnsZone>,
    pub rotations: BTreeSet<RotationName>,
}

impl RoutingPolicy {
    /// Build the policy for a load balancer observed in `zone`.
    pub fn from_load_balancer(zone: &ZoneId, load_balancer: &LoadBalancer) -> Self {
        Self {
            owner: load_balancer.application.clone(),
            cluster: load_balancer.cluster.clone(),
            zone: zone.clone(),
            canonical_name: load_balancer.hostname.clone(),
            dns_zone: load_balancer.dns_zone.clone(),
            rotations: load_balancer.rotations.clone(),
        }
    }

    pub fn key(&self) -> PolicyKey {
        PolicyKey {
            owner: self.owner.clone(),
            cluster: self.cluster.clone(),
            zone: self.zone.clone(),
        }
    }

    /// The alias target this policy contributes to its rotations, if its
    /// load balancer lives in an alias-capable DNS zone.
    pub fn alias_target(&self) -> Option<AliasTarget> {
        self.dns_zone.as_ref().map(|dns_zone| AliasTarget {
            canonical_name: self.canonical_name.clone(),
            dns_zone: dns_zone.clone(),
            zone: self.zone.clone(),
        })
    }
}

/// The routing policies of one application, keyed by `(owner, cluster, zone)`.
///
/// Iteration is in key order. Persisted as a plain list of policies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<RoutingPolicy>", into = "Vec<RoutingPolicy>")]
pub struct RoutingPolicies {
    policies: BTreeMap<PolicyKey, RoutingPolicy>,
}

impl RoutingPolicies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the policy with the same key. Returns the replaced policy.
    pub fn upsert(&mut self, policy: RoutingPolicy) -> Option<RoutingPolicy> {
        self.policies.insert(policy.key(), policy)
    }

    pub fn get(&self, key: &PolicyKey) -> Option<&RoutingPolicy> {
        self.policies.get(key)
    }

    pub fn remove(&mut self, key: &PolicyKey) -> Option<RoutingPolicy> {
        self.policies.remove(key)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoutingPolicy> {
        self.policies.values()
    }
}

impl FromIterator<RoutingPolicy> for RoutingPolicies {
    fn from_iter<I: IntoIterator<Item = RoutingPolicy>>(iter: I) -> Self {
        let mut policies = Self::new();
        for policy in iter {
            policies.upsert(policy);
        }
        policies
    }
}

impl IntoIterator for RoutingPolicies {
    type Item = RoutingPolicy;
    type IntoIter = std::collections::btree_map::IntoValues<PolicyKey, RoutingPolicy>;

    fn into_iter(self) -> Self::IntoIter {
        self.policies.into_values()
    }
}

impl From<Vec<RoutingPolicy>> for RoutingPolicies {
    fn from(value: Vec<RoutingPolicy>) -> Self {
        value.into_iter().collect()
    }
}

impl From<RoutingPolicies> for Vec<RoutingPolicy> {
    fn from(value: RoutingPolicies) -> Self {
        value.into_iter().collect()
    }
}

/// Identity of a global rotation: one ALIAS record spanning zones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoutingId {
    pub application: ApplicationId,
    pub rotation: RotationName,
}

impl RoutingId {
    pub fn new(application: ApplicationId, rotation: RotationName) -> Self {
        Self {
            application,
            rotation,
        }
    }
}

impl fmt::Display for RoutingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.application, self.rotation)
    }
}

/// One member of a global rotation's ALIAS record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AliasTarget {
    pub canonical_name: HostName,
    pub dns_zone: DnsZone,
    pub zone: ZoneId,
}
