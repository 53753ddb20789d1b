//! The forwarder contract and its queue-backed implementation.

use std::collections::BTreeSet;

use routegrid_core::{
    AliasTarget, HostName, NameServiceRequest, Priority, RecordName, RecordType,
};
use routegrid_state::{EnqueueOutcome, StateStore};
use tracing::{debug, warn};

use crate::error::{ForwardError, ForwardResult};

/// Accepts DNS record requests for asynchronous, at-least-once application.
///
/// Forwarding returns as soon as the request is accepted. Duplicate requests
/// are harmless.
pub trait NameServiceForwarder: Send + Sync {
    fn forward(&self, request: NameServiceRequest) -> ForwardResult<()>;

    fn create_cname(&self, name: RecordName, target: HostName, priority: Priority) -> ForwardResult<()> {
        self.forward(NameServiceRequest::create_cname(name, target, priority))
    }

    fn create_alias(
        &self,
        name: RecordName,
        targets: BTreeSet<AliasTarget>,
        priority: Priority,
    ) -> ForwardResult<()> {
        self.forward(NameServiceRequest::create_alias(name, targets, priority))
    }

    fn remove_records(
        &self,
        record_type: RecordType,
        name: RecordName,
        priority: Priority,
    ) -> ForwardResult<()> {
        self.forward(NameServiceRequest::remove_records(name, record_type, priority))
    }
}

/// Forwards requests into the durable queue of a [`StateStore`].
#[derive(Clone)]
pub struct QueueForwarder {
    store: StateStore,
    max_queued: usize,
}

impl QueueForwarder {
    pub fn new(store: StateStore, max_queued: usize) -> Self {
        Self { store, max_queued }
    }
}

impl NameServiceForwarder for QueueForwarder {
    fn forward(&self, request: NameServiceRequest) -> ForwardResult<()> {
        match self.store.enqueue_name_service_request(&request, self.max_queued)? {
            EnqueueOutcome::Queued => Ok(()),
            EnqueueOutcome::Duplicate => {
                debug!(name = %request.name, "identical request already queued");
                Ok(())
            }
            EnqueueOutcome::Full => {
                warn!(
                    name = %request.name,
                    max_queued = self.max_queued,
                    "name service queue full, dropping request"
                );
                Err(ForwardError::QueueFull(request.name))
            }
        }
    }
}
