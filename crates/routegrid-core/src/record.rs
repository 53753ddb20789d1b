//! DNS record requests.
//!
//! The maintainer never talks to a DNS provider directly. It emits
//! `NameServiceRequest`s which are queued and applied asynchronously.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{HostName, RecordName};
use crate::policy::AliasTarget;

/// DNS record types managed by RouteGrid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    Cname,
    Alias,
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::Cname => write!(f, "CNAME"),
            RecordType::Alias => write!(f, "ALIAS"),
        }
    }
}

/// Dispatch priority of a queued request. Higher priorities are applied first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Normal,
    High,
}

/// What to do with the record at a request's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordOperation {
    /// Create or replace a CNAME pointing at `target`.
    CreateCname { target: HostName },
    /// Create or replace an ALIAS record with the given target set.
    CreateAlias { targets: BTreeSet<AliasTarget> },
    /// Remove all records of `record_type` at the name.
    RemoveRecords { record_type: RecordType },
}

/// A single create/remove request for the name service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameServiceRequest {
    pub name: RecordName,
    pub priority: Priority,
    pub operation: RecordOperation,
}

impl NameServiceRequest {
    pub fn create_cname(name: RecordName, target: HostName, priority: Priority) -> Self {
        Self {
            name,
            priority,
            operation: RecordOperation::CreateCname { target },
        }
    }

    pub fn create_alias(
        name: RecordName,
        targets: BTreeSet<AliasTarget>,
        priority: Priority,
    ) -> Self {
        Self {
            name,
            priority,
            operation: RecordOperation::CreateAlias { targets },
        }
    }

    pub fn remove_records(name: RecordName, record_type: RecordType, priority: Priority) -> Self {
        Self {
            name,
            priority,
            operation: RecordOperation::RemoveRecords { record_type },
        }
    }

    /// The record type this request affects.
    pub fn record_type(&self) -> RecordType {
        match &self.operation {
            RecordOperation::CreateCname { .. } => RecordType::Cname,
            RecordOperation::CreateAlias { .. } => RecordType::Alias,
            RecordOperation::RemoveRecords { record_type } => *record_type,
        }
    }

    pub fn is_removal(&self) -> bool {
        matches!(self.operation, RecordOperation::RemoveRecords { .. })
    }
}

impl fmt::Display for NameServiceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operation {
            RecordOperation::CreateCname { target } => {
                write!(f, "create CNAME {} -> {}", self.name, target)
            }
            RecordOperation::CreateAlias { targets } => {
                write!(f, "create ALIAS {} -> {} target(s)", self.name, targets.len())
            }
            RecordOperation::RemoveRecords { record_type } => {
                write!(f, "remove {} {}", record_type, self.name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_type_follows_operation() {
        let name = RecordName::from("a.example.net");
        let cname = NameServiceRequest::create_cname(name.clone(), HostName::from("lb"), Priority::Normal);
        assert_eq!(cname.record_type(), RecordType::Cname);
        assert!(!cname.is_removal());

        let alias = NameServiceRequest::create_alias(name.clone(), BTreeSet::new(), Priority::High);
        assert_eq!(alias.record_type(), RecordType::Alias);

        let remove = NameServiceRequest::remove_records(name, RecordType::Alias, Priority::Normal);
        assert_eq!(remove.record_type(), RecordType::Alias);
        assert!(remove.is_removal());
    }

    #[test]
    fn operation_is_tagged_in_json() {
        let request = NameServiceRequest::remove_records(
            RecordName::from("a.example.net"),
            RecordType::Cname,
            Priority::Normal,
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["operation"]["type"], "remove_records");
        assert_eq!(json["operation"]["record_type"], "CNAME");
        assert_eq!(json["priority"], "normal");
    }

    #[test]
    fn high_priority_orders_after_normal() {
        assert!(Priority::High > Priority::Normal);
    }
}
