//! Load balancers as observed in a zone.
//!
//! RouteGrid does not own load balancers; zone config servers report them
//! and the maintainer derives DNS state from what they report.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{ApplicationId, ClusterId, DnsZone, HostName, RotationName, ZoneId};

/// An application deployed to a zone: the unit at which load balancers exist.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeploymentId {
    pub application: ApplicationId,
    pub zone: ZoneId,
}

impl DeploymentId {
    pub fn new(application: ApplicationId, zone: ZoneId) -> Self {
        Self { application, zone }
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.application, self.zone)
    }
}

/// An exclusive load balancer serving one application cluster in one zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub application: ApplicationId,
    pub cluster: ClusterId,
    /// The load balancer's own DNS name.
    pub hostname: HostName,
    /// Hosted zone of `hostname`, present where the provider supports aliasing.
    pub dns_zone: Option<DnsZone>,
    /// Global rotations this cluster is a member of.
    pub rotations: BTreeSet<RotationName>,
}

impl LoadBalancer {
    pub fn new(application: ApplicationId, cluster: ClusterId, hostname: HostName) -> Self {
        Self {
            application,
            cluster,
            hostname,
            dns_zone: None,
            rotations: BTreeSet::new(),
        }
    }

    pub fn with_dns_zone(mut self, dns_zone: DnsZone) -> Self {
        self.dns_zone = Some(dns_zone);
        self
    }

    pub fn with_rotation(mut self, rotation: RotationName) -> Self {
        self.rotations.insert(rotation);
        self
    }
}
