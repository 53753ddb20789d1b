//! The four-phase reconciliation loop.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use routegrid_core::{
    Endpoint, Priority, RecordType, RoutingId, RoutingPolicy, SystemName, alias_targets,
    aliased_routing_ids_from, routing_table_from,
};
use routegrid_dns::NameServiceForwarder;
use routegrid_lb::{LoadBalancerSnapshot, LoadBalancerSource, ZoneRegistry};
use routegrid_state::StateStore;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::MaintainerResult;
use crate::stats::{MaintenanceStats, Phase};

/// Keeps per-zone CNAMEs and global ALIAS records converged with the live
/// exclusive load balancers of every controller-ready zone.
pub struct RoutingPolicyMaintainer {
    store: StateStore,
    forwarder: Arc<dyn NameServiceForwarder>,
    source: Arc<dyn LoadBalancerSource>,
    zones: ZoneRegistry,
    system: SystemName,
}

impl RoutingPolicyMaintainer {
    pub fn new(
        store: StateStore,
        forwarder: Arc<dyn NameServiceForwarder>,
        source: Arc<dyn LoadBalancerSource>,
        zones: ZoneRegistry,
        system: SystemName,
    ) -> Self {
        Self {
            store,
            forwarder,
            source,
            zones,
            system,
        }
    }

    /// Run one tick: snapshot the zones, then run every phase in order.
    ///
    /// A failed phase is logged and recorded in the returned stats; the
    /// following phases still run.
    pub async fn maintain(&self) -> MaintenanceStats {
        let snapshot = LoadBalancerSnapshot::build(&self.zones, self.source.as_ref()).await;
        self.maintain_with(&snapshot).await
    }

    /// Run every phase against an already built snapshot.
    pub async fn maintain_with(&self, snapshot: &LoadBalancerSnapshot) -> MaintenanceStats {
        let mut stats = MaintenanceStats {
            failed_zones: snapshot.failed_zones().len(),
            ..Default::default()
        };

        for phase in [
            Phase::RemoveObsoleteAliases,
            Phase::RegisterCnames,
            Phase::RemoveObsoleteCnames,
            Phase::RegisterAliases,
        ] {
            let result = match phase {
                Phase::RemoveObsoleteAliases => self.remove_obsolete_aliases(snapshot, &mut stats).await,
                Phase::RegisterCnames => self.register_cnames(snapshot, &mut stats).await,
                Phase::RemoveObsoleteCnames => self.remove_obsolete_cnames(snapshot, &mut stats).await,
                Phase::RegisterAliases => self.register_aliases(&mut stats).await,
            };
            if let Err(e) = result {
                error!(%phase, error = %e, "maintenance phase aborted, retrying next tick");
                stats.failed_phases.push(phase);
            }
        }

        info!(
            aliases_removed = stats.aliases_removed,
            cnames_registered = stats.cnames_registered,
            cnames_removed = stats.cnames_removed,
            aliases_registered = stats.aliases_registered,
            forward_failures = stats.forward_failures,
            failed_zones = stats.failed_zones,
            failed_phases = stats.failed_phases.len(),
            "routing policy maintenance complete"
        );
        stats
    }

    /// Remove ALIAS records of rotations that no longer have any live
    /// alias-capable load balancer.
    ///
    /// Only rotations whose stored policies contribute an alias target can
    /// have an ALIAS record. Rotations with a contributor in a zone that
    /// failed to answer this tick are left alone.
    pub async fn remove_obsolete_aliases(
        &self,
        snapshot: &LoadBalancerSnapshot,
        stats: &mut MaintenanceStats,
    ) -> MaintainerResult<()> {
        let _lock = self.store.lock_routing_policies().await?;
        let stored = self.store.read_all_routing_policies()?;
        let table = routing_table_from(stored.values().flat_map(|policies| policies.iter()));
        let live: BTreeSet<RoutingId> = aliased_routing_ids_from(snapshot.load_balancers());

        for (id, policies) in &table {
            if live.contains(id) || alias_targets(policies).is_empty() {
                continue;
            }
            if policies.iter().any(|policy| snapshot.is_failed(&policy.zone)) {
                debug!(routing_id = %id, "rotation has a contributor in a failed zone, keeping alias");
                continue;
            }

            let endpoint = Endpoint::of_routing_id(id, self.system);
            match self
                .forwarder
                .remove_records(RecordType::Alias, endpoint.record_name(), Priority::Normal)
            {
                Ok(()) => {
                    info!(routing_id = %id, name = %endpoint, "obsolete ALIAS removal requested");
                    stats.aliases_removed += 1;
                }
                Err(e) => {
                    warn!(name = %endpoint, error = %e, "could not request ALIAS removal, retrying next tick");
                    stats.forward_failures += 1;
                }
            }
        }
        Ok(())
    }

    /// Register a CNAME for every live load balancer and persist its policy.
    ///
    /// Each deployment is handled under its application's lock, with one
    /// store write. A load balancer whose request is refused keeps its
    /// previous policy, if any.
    pub async fn register_cnames(
        &self,
        snapshot: &LoadBalancerSnapshot,
        stats: &mut MaintenanceStats,
    ) -> MaintainerResult<()> {
        for (deployment, load_balancers) in snapshot.deployments() {
            let application = &deployment.application;
            let _lock = self.store.lock_application(application).await?;
            let mut policies = self.store.read_routing_policies(application)?;

            for load_balancer in load_balancers {
                let policy = RoutingPolicy::from_load_balancer(&deployment.zone, load_balancer);
                let endpoint = Endpoint::of_policy(&policy, self.system);
                match self.forwarder.create_cname(
                    endpoint.record_name(),
                    policy.canonical_name.clone(),
                    Priority::Normal,
                ) {
                    Ok(()) => {
                        debug!(name = %endpoint, target = %policy.canonical_name, "CNAME requested");
                        policies.upsert(policy);
                        stats.cnames_registered += 1;
                    }
                    Err(e) => {
                        warn!(
                            load_balancer = %load_balancer.hostname,
                            %deployment,
                            error = %e,
                            "could not request CNAME, retrying next tick"
                        );
                        stats.forward_failures += 1;
                    }
                }
            }

            self.store.write_routing_policies(application, &policies)?;
        }
        Ok(())
    }

    /// Remove CNAMEs of stored policies whose load balancer is no longer live,
    /// and delete those policies.
    ///
    /// Policies in zones that failed to answer this tick are kept. A policy
    /// whose removal request is refused is kept and retried next tick.
    pub async fn remove_obsolete_cnames(
        &self,
        snapshot: &LoadBalancerSnapshot,
        stats: &mut MaintenanceStats,
    ) -> MaintainerResult<()> {
        let _lock = self.store.lock_routing_policies().await?;
        let stored = self.store.read_all_routing_policies()?;
        let active = snapshot.active_hostnames();

        let mut removed = Vec::new();
        for policy in stored.values().flat_map(|policies| policies.iter()) {
            if active.contains(&policy.canonical_name) || snapshot.is_failed(&policy.zone) {
                continue;
            }

            let endpoint = Endpoint::of_policy(policy, self.system);
            match self
                .forwarder
                .remove_records(RecordType::Cname, endpoint.record_name(), Priority::Normal)
            {
                Ok(()) => {
                    info!(
                        name = %endpoint,
                        load_balancer = %policy.canonical_name,
                        "obsolete CNAME removal requested"
                    );
                    removed.push(policy.clone());
                }
                Err(e) => {
                    warn!(name = %endpoint, error = %e, "could not request CNAME removal, retrying next tick");
                    stats.forward_failures += 1;
                }
            }
        }

        if !removed.is_empty() {
            self.store.delete_routing_policies(&removed)?;
        }
        stats.cnames_removed += removed.len();
        Ok(())
    }

    /// Register an ALIAS per rotation, targeting every stored policy that
    /// contributes to it from an alias-capable DNS zone.
    pub async fn register_aliases(&self, stats: &mut MaintenanceStats) -> MaintainerResult<()> {
        let _lock = self.store.lock_routing_policies().await?;
        let stored = self.store.read_all_routing_policies()?;
        let table = routing_table_from(stored.values().flat_map(|policies| policies.iter()));

        for (id, policies) in &table {
            let targets = alias_targets(policies);
            let endpoint = Endpoint::of_routing_id(id, self.system);
            if targets.is_empty() {
                debug!(name = %endpoint, "no alias-capable load balancer for rotation");
                continue;
            }

            let count = targets.len();
            match self
                .forwarder
                .create_alias(endpoint.record_name(), targets, Priority::Normal)
            {
                Ok(()) => {
                    debug!(name = %endpoint, targets = count, "ALIAS requested");
                    stats.aliases_registered += 1;
                }
                Err(e) => {
                    warn!(name = %endpoint, error = %e, "could not request ALIAS, retrying next tick");
                    stats.forward_failures += 1;
                }
            }
        }
        Ok(())
    }

    /// Tick every `interval` until shutdown is signalled. A tick that is
    /// still running when the next is due causes that trigger to be skipped.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = interval.as_secs(),
            zones = self.zones.zones().len(),
            system = %self.system,
            "routing policy maintainer started"
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.maintain().await;
                }
                _ = shutdown.changed() => {
                    info!("routing policy maintainer shutting down");
                    break;
                }
            }
        }
    }
}
