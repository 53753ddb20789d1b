//! routegrid-core — the data model shared by every RouteGrid crate.
//!
//! # Components
//!
//! - **`ids`** — typed identifiers (applications, zones, clusters, rotations, hostnames)
//! - **`load_balancer`** — load balancers as reported by zone config servers
//! - **`policy`** — persisted routing policies, keyed by `(owner, cluster, zone)`
//! - **`endpoint`** — DNS names for deployments and global rotations
//! - **`routing_table`** — rotation → contributing policies, derived every tick
//! - **`record`** — DNS record requests handed to the name-service forwarder
//! - **`config`** — `routegrid.toml` parsing

pub mod config;
pub mod endpoint;
pub mod error;
pub mod ids;
pub mod load_balancer;
pub mod policy;
pub mod record;
pub mod routing_table;

pub use config::RoutegridConfig;
pub use endpoint::Endpoint;
pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use load_balancer::{DeploymentId, LoadBalancer};
pub use policy::{AliasTarget, PolicyKey, RoutingId, RoutingPolicies, RoutingPolicy};
pub use record::{NameServiceRequest, Priority, RecordOperation, RecordType};
pub use routing_table::{
    RoutingTable, alias_targets, aliased_routing_ids_from, routing_ids_from, routing_table_from,
};
