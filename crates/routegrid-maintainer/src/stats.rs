//! Tick report.

use std::fmt;

use serde::Serialize;

/// The four maintenance phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    RemoveObsoleteAliases,
    RegisterCnames,
    RemoveObsoleteCnames,
    RegisterAliases,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::RemoveObsoleteAliases => "remove-obsolete-aliases",
            Phase::RegisterCnames => "register-cnames",
            Phase::RemoveObsoleteCnames => "remove-obsolete-cnames",
            Phase::RegisterAliases => "register-aliases",
        };
        f.write_str(name)
    }
}

/// What one tick did. Counts are requests accepted by the forwarder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceStats {
    pub aliases_removed: usize,
    pub cnames_registered: usize,
    pub cnames_removed: usize,
    pub aliases_registered: usize,
    /// Requests the forwarder refused; retried next tick.
    pub forward_failures: usize,
    pub failed_zones: usize,
    /// Phases aborted by a lock timeout or store error.
    pub failed_phases: Vec<Phase>,
}

impl MaintenanceStats {
    pub fn is_clean(&self) -> bool {
        self.forward_failures == 0 && self.failed_zones == 0 && self.failed_phases.is_empty()
    }
}
