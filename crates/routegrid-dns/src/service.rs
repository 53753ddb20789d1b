//! The DNS provider contract.

use std::collections::BTreeSet;

use async_trait::async_trait;
use routegrid_core::{AliasTarget, HostName, NameServiceRequest, RecordName, RecordOperation, RecordType};

use crate::error::NameServiceResult;

/// A DNS provider able to apply record changes.
///
/// Every operation replaces whatever record of the same type exists at the
/// name, so applying a request twice has the same effect as applying it once.
#[async_trait]
pub trait NameService: Send + Sync {
    async fn create_cname(&self, name: &RecordName, target: &HostName) -> NameServiceResult<()>;

    async fn create_alias(
        &self,
        name: &RecordName,
        targets: &BTreeSet<AliasTarget>,
    ) -> NameServiceResult<()>;

    async fn remove_records(&self, record_type: RecordType, name: &RecordName) -> NameServiceResult<()>;
}

/// Apply one queued request to `service`.
pub async fn apply_request(service: &dyn NameService, request: &NameServiceRequest) -> NameServiceResult<()> {
    match &request.operation {
        RecordOperation::CreateCname { target } => service.create_cname(&request.name, target).await,
        RecordOperation::CreateAlias { targets } => service.create_alias(&request.name, targets).await,
        RecordOperation::RemoveRecords { record_type } => {
            service.remove_records(*record_type, &request.name).await
        }
    }
}
