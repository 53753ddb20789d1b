//! routegrid-dns — DNS record forwarding for RouteGrid.
//!
//! The maintainer hands [`NameServiceRequest`](routegrid_core::NameServiceRequest)s
//! to a [`NameServiceForwarder`] and never waits for them to take effect.
//! The default forwarder, [`QueueForwarder`], persists requests in the state
//! store; a [`NameServiceDispatcher`] drains that queue into a
//! [`NameService`] provider in the background.

pub mod dispatcher;
pub mod error;
pub mod forwarder;
pub mod memory;
pub mod service;

pub use dispatcher::NameServiceDispatcher;
pub use error::{ForwardError, ForwardResult, NameServiceError, NameServiceResult};
pub use forwarder::{NameServiceForwarder, QueueForwarder};
pub use memory::{MemoryNameService, Record};
pub use service::{NameService, apply_request};
