//! routegrid-state — the durable policy store for RouteGrid.
//!
//! Backed by [redb](https://docs.rs/redb), holds the routing policies of
//! every application and the queue of pending name-service requests.
//!
//! # Architecture
//!
//! Values are JSON-serialized into redb's `&[u8]` value columns. Routing
//! policies are stored one row per application, keyed by
//! `tenant:application:instance`, so a phase rewriting an application's
//! policies does so in a single transaction.
//!
//! The store also owns the two lock scopes of the policy table: a global
//! lock for cross-application scans and one lock per application. Locks are
//! RAII guards, released when dropped on every exit path.
//!
//! Clones of a `StateStore` share the database and the lock table, so every
//! component of a process works against clones of one store.

pub mod error;
pub mod lock;
pub mod queue;
pub mod store;
pub mod tables;

pub use error::{StateError, StateResult};
pub use lock::PolicyLock;
pub use queue::{EnqueueOutcome, QueuedRequest};
pub use store::StateStore;
