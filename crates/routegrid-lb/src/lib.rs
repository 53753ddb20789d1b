//! routegrid-lb — load-balancer discovery for RouteGrid.
//!
//! Each tick the maintainer asks every controller-ready zone for its
//! exclusive load balancers and groups the answers into a
//! [`LoadBalancerSnapshot`]. A zone that cannot be queried is recorded as
//! failed and contributes nothing; the other zones are unaffected.

pub mod config_server;
pub mod error;
pub mod snapshot;
pub mod source;
pub mod zones;

pub use config_server::ConfigServerClient;
pub use error::{SourceError, SourceResult};
pub use snapshot::LoadBalancerSnapshot;
pub use source::{LoadBalancerSource, MemoryLoadBalancerSource};
pub use zones::ZoneRegistry;
