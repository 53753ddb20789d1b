//! Policy lock scopes.
//!
//! Two scopes guard the policy table: one global scope for operations that
//! scan every application, and one scope per application for operations
//! that rewrite a single application's policies. Acquisition waits at most
//! the store's lock timeout and fails with [`StateError::LockTimeout`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use routegrid_core::ApplicationId;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::store::StateStore;

/// A held policy lock. Released on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct PolicyLock {
    scope: String,
    _guard: OwnedMutexGuard<()>,
}

impl PolicyLock {
    pub fn scope(&self) -> &str {
        &self.scope
    }
}

impl Drop for PolicyLock {
    fn drop(&mut self) {
        debug!(scope = %self.scope, "policy lock released");
    }
}

pub(crate) struct LockTable {
    timeout: Duration,
    global: Arc<Mutex<()>>,
    applications: StdMutex<HashMap<ApplicationId, Arc<Mutex<()>>>>,
}

impl LockTable {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            global: Arc::new(Mutex::new(())),
            applications: StdMutex::new(HashMap::new()),
        }
    }

    /// The mutex for `application`. Mutexes no guard or waiter holds are
    /// evicted first, so the map only tracks applications in use.
    fn application_mutex(&self, application: &ApplicationId) -> Arc<Mutex<()>> {
        let mut applications = self
            .applications
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        applications.retain(|_, mutex| Arc::strong_count(mutex) > 1);
        applications
            .entry(application.clone())
            .or_default()
            .clone()
    }

    async fn acquire(&self, mutex: Arc<Mutex<()>>, scope: String) -> StateResult<PolicyLock> {
        match tokio::time::timeout(self.timeout, mutex.lock_owned()).await {
            Ok(guard) => {
                debug!(%scope, "policy lock acquired");
                Ok(PolicyLock {
                    scope,
                    _guard: guard,
                })
            }
            Err(_) => Err(StateError::LockTimeout(scope)),
        }
    }
}

impl StateStore {
    /// Lock the whole policy table.
    pub async fn lock_routing_policies(&self) -> StateResult<PolicyLock> {
        self.locks
            .acquire(self.locks.global.clone(), "routing-policies".to_string())
            .await
    }

    /// Lock the policies of one application.
    pub async fn lock_application(&self, application: &ApplicationId) -> StateResult<PolicyLock> {
        let mutex = self.locks.application_mutex(application);
        self.locks
            .acquire(mutex, format!("routing-policies/{application}"))
            .await
    }

    pub fn lock_timeout(&self) -> Duration {
        self.locks.timeout
    }
}
