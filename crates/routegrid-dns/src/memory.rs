//! In-process DNS provider.
//!
//! Keeps records in memory. Used by the daemon when no external provider is
//! configured, and by tests to observe what the dispatcher applied.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use routegrid_core::{AliasTarget, HostName, RecordName, RecordType};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{NameServiceError, NameServiceResult};
use crate::service::NameService;

/// Record data held by [`MemoryNameService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Cname(HostName),
    Alias(BTreeSet<AliasTarget>),
}

#[derive(Default)]
pub struct MemoryNameService {
    records: RwLock<BTreeMap<(RecordName, RecordType), Record>>,
    rejected: RwLock<BTreeSet<RecordName>>,
}

impl MemoryNameService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every future change to `name`.
    pub async fn reject(&self, name: RecordName) {
        self.rejected.write().await.insert(name);
    }

    pub async fn record(&self, name: &RecordName, record_type: RecordType) -> Option<Record> {
        self.records
            .read()
            .await
            .get(&(name.clone(), record_type))
            .cloned()
    }

    pub async fn records(&self) -> BTreeMap<(RecordName, RecordType), Record> {
        self.records.read().await.clone()
    }

    async fn check(&self, name: &RecordName) -> NameServiceResult<()> {
        if self.rejected.read().await.contains(name) {
            return Err(NameServiceError::Rejected {
                name: name.clone(),
                reason: "rejected by test provider".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl NameService for MemoryNameService {
    async fn create_cname(&self, name: &RecordName, target: &HostName) -> NameServiceResult<()> {
        self.check(name).await?;
        self.records
            .write()
            .await
            .insert((name.clone(), RecordType::Cname), Record::Cname(target.clone()));
        debug!(%name, %target, "CNAME written");
        Ok(())
    }

    async fn create_alias(
        &self,
        name: &RecordName,
        targets: &BTreeSet<AliasTarget>,
    ) -> NameServiceResult<()> {
        self.check(name).await?;
        self.records
            .write()
            .await
            .insert((name.clone(), RecordType::Alias), Record::Alias(targets.clone()));
        debug!(%name, targets = targets.len(), "ALIAS written");
        Ok(())
    }

    async fn remove_records(&self, record_type: RecordType, name: &RecordName) -> NameServiceResult<()> {
        self.check(name).await?;
        let removed = self
            .records
            .write()
            .await
            .remove(&(name.clone(), record_type))
            .is_some();
        debug!(%name, %record_type, removed, "records removed");
        Ok(())
    }
}
