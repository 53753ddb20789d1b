//! Durable queue of pending name-service requests.
//!
//! Keys are `{rank}:{sequence}` with high-priority requests ranked first,
//! so iterating the table yields requests by priority, then FIFO.

use redb::{ReadableDatabase, ReadableTable};
use routegrid_core::{NameServiceRequest, Priority};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StateError, StateResult, map_err};
use crate::store::StateStore;
use crate::tables::*;

/// Result of offering a request to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued,
    /// The request would be applied right after an identical one for the
    /// same name and record type.
    Duplicate,
    /// The queue holds `max_queued` requests already.
    Full,
}

/// A queued request and its queue key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedRequest {
    pub id: String,
    pub request: NameServiceRequest,
}

fn rank(priority: Priority) -> u8 {
    match priority {
        Priority::High => 0,
        Priority::Normal => 1,
    }
}

fn queue_key(priority: Priority, sequence: u64) -> String {
    format!("{}:{sequence:020}", rank(priority))
}

impl StateStore {
    /// Append `request` unless the queue is full or the request dispatched
    /// last before it for the same name and record type is identical.
    ///
    /// Only the latest request per name counts. A create queued behind a
    /// removal of the same record is still queued.
    pub fn enqueue_name_service_request(
        &self,
        request: &NameServiceRequest,
        max_queued: usize,
    ) -> StateResult<EnqueueOutcome> {
        let value = serde_json::to_vec(request).map_err(map_err!(Encode))?;
        let txn = self.db.begin_write().map_err(map_err!(Storage))?;
        let outcome;
        {
            let mut queue = txn.open_table(NAME_SERVICE_QUEUE).map_err(map_err!(Storage))?;
            let mut queued = 0;
            let mut previous: Option<NameServiceRequest> = None;
            for entry in queue.iter().map_err(map_err!(Storage))? {
                let (key, existing) = entry.map_err(map_err!(Storage))?;
                queued += 1;
                let existing: NameServiceRequest = serde_json::from_slice(existing.value())
                    .map_err(|e| StateError::corrupt(key.value(), e))?;
                if rank(existing.priority) <= rank(request.priority)
                    && existing.name == request.name
                    && existing.record_type() == request.record_type()
                {
                    previous = Some(existing);
                }
            }
            let duplicate = previous.as_ref() == Some(request);

            outcome = if duplicate {
                EnqueueOutcome::Duplicate
            } else if queued >= max_queued {
                EnqueueOutcome::Full
            } else {
                let mut counters = txn.open_table(COUNTERS).map_err(map_err!(Storage))?;
                let sequence = counters
                    .get(QUEUE_SEQUENCE)
                    .map_err(map_err!(Storage))?
                    .map(|guard| guard.value())
                    .unwrap_or(0)
                    + 1;
                counters
                    .insert(QUEUE_SEQUENCE, sequence)
                    .map_err(map_err!(Storage))?;
                let key = queue_key(request.priority, sequence);
                queue
                    .insert(key.as_str(), value.as_slice())
                    .map_err(map_err!(Storage))?;
                EnqueueOutcome::Queued
            };
        }
        txn.commit().map_err(map_err!(Storage))?;
        debug!(%request, ?outcome, "name service request offered");
        Ok(outcome)
    }

    /// Up to `limit` requests in dispatch order, without removing them.
    pub fn peek_name_service_requests(&self, limit: usize) -> StateResult<Vec<QueuedRequest>> {
        let txn = self.db.begin_read().map_err(map_err!(Storage))?;
        let queue = txn.open_table(NAME_SERVICE_QUEUE).map_err(map_err!(Storage))?;
        let mut results = Vec::new();
        for entry in queue.iter().map_err(map_err!(Storage))?.take(limit) {
            let (key, value) = entry.map_err(map_err!(Storage))?;
            let id = key.value().to_string();
            let request: NameServiceRequest =
                serde_json::from_slice(value.value()).map_err(|e| StateError::corrupt(&id, e))?;
            results.push(QueuedRequest { id, request });
        }
        Ok(results)
    }

    /// Remove a dispatched request. Returns true if it was still queued.
    pub fn remove_name_service_request(&self, id: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Storage))?;
        let existed;
        {
            let mut queue = txn.open_table(NAME_SERVICE_QUEUE).map_err(map_err!(Storage))?;
            existed = queue.remove(id).map_err(map_err!(Storage))?.is_some();
        }
        txn.commit().map_err(map_err!(Storage))?;
        Ok(existed)
    }

    pub fn name_service_queue_len(&self) -> StateResult<usize> {
        let txn = self.db.begin_read().map_err(map_err!(Storage))?;
        let queue = txn.open_table(NAME_SERVICE_QUEUE).map_err(map_err!(Storage))?;
        let mut count = 0;
        for entry in queue.iter().map_err(map_err!(Storage))? {
            entry.map_err(map_err!(Storage))?;
            count += 1;
        }
        Ok(count)
    }
}
