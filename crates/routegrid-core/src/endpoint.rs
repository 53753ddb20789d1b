//! Endpoint naming.
//!
//! Endpoint names are never stored: they are recomputed on every tick and
//! used as DNS record keys, so the scheme must stay stable.
//!
//! ```text
//! deployment: {cluster}--{app}.{region}.{environment}.{suffix}
//! rotation:   {rotation}--{app}.global.{suffix}
//! app:        [{instance}--]{application}--{tenant}   (instance omitted when "default")
//! ```

use std::fmt;

use crate::ids::{ApplicationId, ClusterId, RecordName, RotationName, SystemName, ZoneId};
use crate::policy::{RoutingId, RoutingPolicy};

/// A DNS name served by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    dns_name: String,
}

impl Endpoint {
    /// Per-deployment endpoint of one cluster in one zone.
    pub fn of_deployment(
        application: &ApplicationId,
        cluster: &ClusterId,
        zone: &ZoneId,
        system: SystemName,
    ) -> Self {
        let dns_name = format!(
            "{}--{}.{}.{}.{}",
            sanitize(cluster.as_str()),
            application_part(application),
            sanitize(zone.region()),
            sanitize(zone.environment()),
            system.dns_suffix()
        );
        Self { dns_name }
    }

    /// Global endpoint of an application's rotation.
    pub fn of_rotation(
        application: &ApplicationId,
        rotation: &RotationName,
        system: SystemName,
    ) -> Self {
        let dns_name = format!(
            "{}--{}.global.{}",
            sanitize(rotation.as_str()),
            application_part(application),
            system.dns_suffix()
        );
        Self { dns_name }
    }

    /// Endpoint of the load balancer a policy describes.
    pub fn of_policy(policy: &RoutingPolicy, system: SystemName) -> Self {
        Self::of_deployment(&policy.owner, &policy.cluster, &policy.zone, system)
    }

    pub fn of_routing_id(id: &RoutingId, system: SystemName) -> Self {
        Self::of_rotation(&id.application, &id.rotation, system)
    }

    pub fn dns_name(&self) -> &str {
        &self.dns_name
    }

    pub fn record_name(&self) -> RecordName {
        RecordName::new(self.dns_name.clone())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dns_name)
    }
}

fn application_part(application: &ApplicationId) -> String {
    let base = format!(
        "{}--{}",
        sanitize(application.application()),
        sanitize(application.tenant())
    );
    if application.instance() == ApplicationId::DEFAULT_INSTANCE {
        base
    } else {
        format!("{}--{}", sanitize(application.instance()), base)
    }
}

fn sanitize(label: &str) -> String {
    label.to_ascii_lowercase().replace('_', "-")
}
