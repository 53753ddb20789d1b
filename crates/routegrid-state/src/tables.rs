//! redb table definitions for the RouteGrid state store.

use redb::TableDefinition;

/// Routing policies of one application keyed by `tenant:application:instance`.
pub const ROUTING_POLICIES: TableDefinition<&str, &[u8]> = TableDefinition::new("routing_policies");

/// Pending name-service requests keyed by `{priority_rank}:{sequence}`.
pub const NAME_SERVICE_QUEUE: TableDefinition<&str, &[u8]> = TableDefinition::new("name_service_queue");

/// Monotonic counters keyed by name.
pub const COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("counters");

/// Counter naming the last sequence number handed to a queued request.
pub const QUEUE_SEQUENCE: &str = "name_service_queue.sequence";
