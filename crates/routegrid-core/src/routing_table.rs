//! Routing table computation.
//!
//! The routing table maps each global rotation to the policies that
//! contribute to it. It is re-derived from the stored policies whenever it is
//! needed and never persisted.

use std::collections::{BTreeMap, BTreeSet};

use crate::load_balancer::LoadBalancer;
use crate::policy::{AliasTarget, RoutingId, RoutingPolicy};

/// Rotation → contributing policies, in input order.
pub type RoutingTable = BTreeMap<RoutingId, Vec<RoutingPolicy>>;

/// Group policies by the rotations they declare.
///
/// A policy declaring several rotations appears under each of them. Policies
/// are not deduplicated: two policies under one id differ by cluster or zone.
pub fn routing_table_from<'a>(policies: impl IntoIterator<Item = &'a RoutingPolicy>) -> RoutingTable {
    let mut table = RoutingTable::new();
    for policy in policies {
        for rotation in &policy.rotations {
            table
                .entry(RoutingId::new(policy.owner.clone(), rotation.clone()))
                .or_default()
                .push(policy.clone());
        }
    }
    table
}

/// Rotations referenced by live load balancers.
pub fn routing_ids_from<'a>(
    load_balancers: impl IntoIterator<Item = &'a LoadBalancer>,
) -> BTreeSet<RoutingId> {
    load_balancers
        .into_iter()
        .flat_map(|lb| {
            lb.rotations
                .iter()
                .map(|rotation| RoutingId::new(lb.application.clone(), rotation.clone()))
        })
        .collect()
}

/// Rotations that have at least one live, alias-capable load balancer.
pub fn aliased_routing_ids_from<'a>(
    load_balancers: impl IntoIterator<Item = &'a LoadBalancer>,
) -> BTreeSet<RoutingId> {
    routing_ids_from(load_balancers.into_iter().filter(|lb| lb.dns_zone.is_some()))
}

/// Union of the alias targets contributed by `policies`.
pub fn alias_targets<'a>(policies: impl IntoIterator<Item = &'a RoutingPolicy>) -> BTreeSet<AliasTarget> {
    policies
        .into_iter()
        .filter_map(RoutingPolicy::alias_target)
        .collect()
}
