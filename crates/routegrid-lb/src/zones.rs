//! Zones eligible for controller-driven routing.

use routegrid_core::ZoneId;
use routegrid_core::config::ZoneConfig;

/// Ordered list of zones whose load balancers the maintainer routes to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneRegistry {
    zones: Vec<ZoneId>,
}

impl ZoneRegistry {
    pub fn new(zones: Vec<ZoneId>) -> Self {
        Self { zones }
    }

    /// Controller-upgraded zones, in configuration order.
    pub fn from_config(zones: &[ZoneConfig]) -> Self {
        Self::new(
            zones
                .iter()
                .filter(|zone| zone.controller_upgraded)
                .map(|zone| zone.id.clone())
                .collect(),
        )
    }

    pub fn zones(&self) -> &[ZoneId] {
        &self.zones
    }
}
