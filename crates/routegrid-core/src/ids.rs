//! Typed identifiers.
//!
//! Applications and zones have structured string forms
//! (`tenant:application:instance`, `environment.region`) and serialize as
//! those strings. The remaining identifiers are plain string newtypes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Generates a transparent string newtype.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// A container cluster within an application, e.g. `default`.
    ClusterId
);
string_id!(
    /// Name of a global rotation declared by an application.
    RotationName
);
string_id!(
    /// A fully-qualified hostname, e.g. a load balancer's canonical name.
    HostName
);
string_id!(
    /// A DNS provider's hosted-zone identifier, needed to build alias targets.
    DnsZone
);
string_id!(
    /// Name of a DNS record.
    RecordName
);

// ── ApplicationId ─────────────────────────────────────────────────

/// Identity of a tenant application instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApplicationId {
    tenant: String,
    application: String,
    instance: String,
}

impl ApplicationId {
    pub const DEFAULT_INSTANCE: &'static str = "default";

    pub fn new(
        tenant: impl Into<String>,
        application: impl Into<String>,
        instance: impl Into<String>,
    ) -> Self {
        Self {
            tenant: tenant.into(),
            application: application.into(),
            instance: instance.into(),
        }
    }

    /// Like [`new`](Self::new), but rejects components that would not
    /// survive a round trip through the `tenant:application:instance` form.
    pub fn try_new(
        tenant: impl Into<String>,
        application: impl Into<String>,
        instance: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let id = Self::new(tenant, application, instance);
        let valid = [&id.tenant, &id.application, &id.instance]
            .iter()
            .all(|part| !part.is_empty() && !part.contains(':'));
        if valid {
            Ok(id)
        } else {
            Err(CoreError::InvalidApplicationId(id.to_string()))
        }
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// `tenant:application:instance`, also used as the store key.
    pub fn serialized_form(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.tenant, self.application, self.instance)
    }
}

impl FromStr for ApplicationId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [tenant, application, instance] => Self::try_new(*tenant, *application, *instance),
            _ => Err(CoreError::InvalidApplicationId(s.to_string())),
        }
    }
}

impl TryFrom<String> for ApplicationId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ApplicationId> for String {
    fn from(value: ApplicationId) -> Self {
        value.to_string()
    }
}

// ── ZoneId ────────────────────────────────────────────────────────

/// A deployment zone: an environment in a region, e.g. `prod.us-east-1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ZoneId {
    environment: String,
    region: String,
}

impl ZoneId {
    pub fn new(environment: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            region: region.into(),
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.environment, self.region)
    }
}

impl FromStr for ZoneId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((environment, region))
                if !environment.is_empty() && !region.is_empty() && !region.contains('.') =>
            {
                Ok(Self::new(environment, region))
            }
            _ => Err(CoreError::InvalidZoneId(s.to_string())),
        }
    }
}

impl TryFrom<String> for ZoneId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ZoneId> for String {
    fn from(value: ZoneId) -> Self {
        value.to_string()
    }
}

// ── SystemName ────────────────────────────────────────────────────

/// The platform system this controller runs in. Determines the DNS suffix
/// of every endpoint it manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemName {
    #[default]
    Main,
    Cd,
    Dev,
}

impl SystemName {
    pub fn dns_suffix(&self) -> &'static str {
        match self {
            SystemName::Main => "routegrid.net",
            SystemName::Cd => "cd.routegrid.net",
            SystemName::Dev => "dev.routegrid.net",
        }
    }
}

impl fmt::Display for SystemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemName::Main => write!(f, "main"),
            SystemName::Cd => write!(f, "cd"),
            SystemName::Dev => write!(f, "dev"),
        }
    }
}

impl FromStr for SystemName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" => Ok(SystemName::Main),
            "cd" => Ok(SystemName::Cd),
            "dev" => Ok(SystemName::Dev),
            other => Err(CoreError::UnknownSystem(other.to_string())),
        }
    }
}
