//! StateStore — redb-backed persistence of routing policies.
//!
//! Each application owns one row in [`ROUTING_POLICIES`] holding its whole
//! policy set. Writing an empty set removes the row, so the table never
//! holds applications without policies.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use redb::{Database, ReadableDatabase, ReadableTable};
use routegrid_core::{ApplicationId, RoutingPolicies, RoutingPolicy};
use tracing::{debug, warn};

use crate::error::{StateError, StateResult, map_err};
use crate::lock::LockTable;
use crate::tables::*;

/// Default wait for a policy lock before giving up.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    pub(crate) db: Arc<Database>,
    pub(crate) locks: Arc<LockTable>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self::from_database(db);
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self::from_database(db);
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Use `timeout` as the maximum wait when acquiring policy locks.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.locks = Arc::new(LockTable::new(timeout));
        self
    }

    fn from_database(db: Database) -> Self {
        Self {
            db: Arc::new(db),
            locks: Arc::new(LockTable::new(DEFAULT_LOCK_TIMEOUT)),
        }
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Storage))?;
        txn.open_table(ROUTING_POLICIES).map_err(map_err!(Storage))?;
        txn.open_table(NAME_SERVICE_QUEUE).map_err(map_err!(Storage))?;
        txn.open_table(COUNTERS).map_err(map_err!(Storage))?;
        txn.commit().map_err(map_err!(Storage))?;
        Ok(())
    }

    // ── Routing policies ───────────────────────────────────────────

    /// Read the policies owned by `application`. Empty if it has none.
    pub fn read_routing_policies(&self, application: &ApplicationId) -> StateResult<RoutingPolicies> {
        let key = application.serialized_form();
        let txn = self.db.begin_read().map_err(map_err!(Storage))?;
        let table = txn.open_table(ROUTING_POLICIES).map_err(map_err!(Storage))?;
        match table.get(key.as_str()).map_err(map_err!(Storage))? {
            Some(guard) => decode_policies(&key, guard.value()),
            None => Ok(RoutingPolicies::new()),
        }
    }

    /// Read the policies of every application, in application order.
    ///
    /// Rows that cannot be decoded are logged and left out, so one bad row
    /// does not hide every other application.
    pub fn read_all_routing_policies(&self) -> StateResult<BTreeMap<ApplicationId, RoutingPolicies>> {
        let txn = self.db.begin_read().map_err(map_err!(Storage))?;
        let table = txn.open_table(ROUTING_POLICIES).map_err(map_err!(Storage))?;
        let mut results = BTreeMap::new();
        for entry in table.iter().map_err(map_err!(Storage))? {
            let (key, value) = entry.map_err(map_err!(Storage))?;
            let key = key.value();
            let decoded = key
                .parse::<ApplicationId>()
                .map_err(|e| StateError::corrupt(key, e))
                .and_then(|application| Ok((application, decode_policies(key, value.value())?)));
            match decoded {
                Ok((application, policies)) => {
                    results.insert(application, policies);
                }
                Err(e) => warn!(error = %e, "skipping undecodable routing policy row"),
            }
        }
        Ok(results)
    }

    /// Replace the policies owned by `application` in one transaction.
    pub fn write_routing_policies(
        &self,
        application: &ApplicationId,
        policies: &RoutingPolicies,
    ) -> StateResult<()> {
        let key = application.serialized_form();
        let txn = self.db.begin_write().map_err(map_err!(Storage))?;
        {
            let mut table = txn.open_table(ROUTING_POLICIES).map_err(map_err!(Storage))?;
            if policies.is_empty() {
                table.remove(key.as_str()).map_err(map_err!(Storage))?;
            } else {
                let value = serde_json::to_vec(policies).map_err(map_err!(Encode))?;
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(map_err!(Storage))?;
            }
        }
        txn.commit().map_err(map_err!(Storage))?;
        debug!(application = %key, policies = policies.len(), "routing policies stored");
        Ok(())
    }

    /// Delete the given policies in one transaction.
    ///
    /// Rows are re-read inside the write transaction and a policy is deleted
    /// only while its stored hostname and DNS zone still equal the given
    /// ones. A policy refreshed concurrently under the application lock
    /// survives. Returns the number deleted.
    pub fn delete_routing_policies(&self, stale: &[RoutingPolicy]) -> StateResult<usize> {
        let owners: BTreeSet<&ApplicationId> = stale.iter().map(|policy| &policy.owner).collect();
        let txn = self.db.begin_write().map_err(map_err!(Storage))?;
        let mut deleted = 0;
        {
            let mut table = txn.open_table(ROUTING_POLICIES).map_err(map_err!(Storage))?;
            for owner in owners {
                let row_key = owner.serialized_form();
                let existing = table
                    .get(row_key.as_str())
                    .map_err(map_err!(Storage))?
                    .map(|guard| guard.value().to_vec());
                let Some(bytes) = existing else { continue };

                let mut policies = decode_policies(&row_key, &bytes)?;
                for policy in stale.iter().filter(|policy| &policy.owner == owner) {
                    let key = policy.key();
                    let unchanged = policies.get(&key).is_some_and(|stored| {
                        stored.canonical_name == policy.canonical_name
                            && stored.dns_zone == policy.dns_zone
                    });
                    if unchanged {
                        policies.remove(&key);
                        deleted += 1;
                    } else {
                        debug!(policy = %key, "policy changed since read, not deleting");
                    }
                }

                if policies.is_empty() {
                    table.remove(row_key.as_str()).map_err(map_err!(Storage))?;
                } else {
                    let value = serde_json::to_vec(&policies).map_err(map_err!(Encode))?;
                    table
                        .insert(row_key.as_str(), value.as_slice())
                        .map_err(map_err!(Storage))?;
                }
            }
        }
        txn.commit().map_err(map_err!(Storage))?;
        debug!(deleted, "routing policies deleted");
        Ok(deleted)
    }
}

fn decode_policies(key: &str, bytes: &[u8]) -> StateResult<RoutingPolicies> {
    serde_json::from_slice(bytes).map_err(|e| StateError::corrupt(key, e))
}
