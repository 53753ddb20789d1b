//! routegrid-maintainer — the routing policy maintainer.
//!
//! Every tick the maintainer takes a snapshot of the exclusive load
//! balancers in all controller-ready zones and runs four phases against the
//! policy store:
//!
//! 1. remove ALIAS records of rotations no live load balancer serves
//! 2. register a CNAME per load balancer and upsert its routing policy
//! 3. remove CNAMEs (and policies) of load balancers that are gone
//! 4. register an ALIAS per rotation over the stored alias targets
//!
//! DNS changes are handed to a forwarder and never awaited. Every phase is
//! idempotent, so a failed request or phase is simply retried next tick.

pub mod error;
pub mod maintainer;
pub mod stats;

pub use error::{MaintainerError, MaintainerResult};
pub use maintainer::RoutingPolicyMaintainer;
pub use stats::{MaintenanceStats, Phase};
