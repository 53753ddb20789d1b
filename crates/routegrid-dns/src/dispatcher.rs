//! Queue dispatcher.
//!
//! Drains the durable name-service queue into a [`NameService`] in dispatch
//! order. A request is removed from the queue only after it was applied; on
//! the first failure the batch stops, leaving the failed request and
//! everything behind it queued for the next round.

use std::sync::Arc;
use std::time::Duration;

use routegrid_state::StateStore;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::NameServiceResult;
use crate::service::{NameService, apply_request};

pub struct NameServiceDispatcher {
    store: StateStore,
    service: Arc<dyn NameService>,
    batch_size: usize,
}

impl NameServiceDispatcher {
    pub fn new(store: StateStore, service: Arc<dyn NameService>, batch_size: usize) -> Self {
        Self {
            store,
            service,
            batch_size,
        }
    }

    /// Apply up to one batch of queued requests. Returns how many were applied.
    pub async fn dispatch_batch(&self) -> NameServiceResult<usize> {
        let batch = self.store.peek_name_service_requests(self.batch_size)?;
        let mut applied = 0;
        for queued in batch {
            if let Err(e) = apply_request(self.service.as_ref(), &queued.request).await {
                warn!(
                    error = %e,
                    request = %queued.request,
                    "name service request failed, will retry"
                );
                break;
            }
            self.store.remove_name_service_request(&queued.id)?;
            debug!(request = %queued.request, "name service request applied");
            applied += 1;
        }
        Ok(applied)
    }

    /// Dispatch a batch every `interval` until shutdown is signalled.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = interval.as_secs(),
            batch_size = self.batch_size,
            "name service dispatcher started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    match self.dispatch_batch().await {
                        Ok(0) => {}
                        Ok(applied) => info!(applied, "name service requests dispatched"),
                        Err(e) => error!(error = %e, "name service dispatch failed"),
                    }
                }
                _ = shutdown.changed() => {
                    info!("name service dispatcher shutting down");
                    break;
                }
            }
        }
    }
}
