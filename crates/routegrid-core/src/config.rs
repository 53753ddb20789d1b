//! routegrid.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::ids::{SystemName, ZoneId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutegridConfig {
    #[serde(default)]
    pub system: SystemName,
    #[serde(default)]
    pub maintainer: MaintainerConfig,
    #[serde(default)]
    pub name_service: NameServiceConfig,
    #[serde(default)]
    pub zones: Vec<ZoneConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintainerConfig {
    /// Time between reconciliation ticks.
    #[serde(default = "default_interval")]
    pub interval: String,
    /// Maximum wait for a policy store lock before the phase is skipped.
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameServiceConfig {
    /// Requests beyond this many queued are dropped.
    #[serde(default = "default_max_queued_requests")]
    pub max_queued_requests: usize,
    #[serde(default = "default_dispatch_interval")]
    pub dispatch_interval: String,
    #[serde(default = "default_dispatch_batch_size")]
    pub dispatch_batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub id: ZoneId,
    /// Only upgraded zones take part in controller-driven routing.
    #[serde(default)]
    pub controller_upgraded: bool,
    /// `host:port` of the zone's config server.
    pub config_server: Option<String>,
}

impl Default for MaintainerConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            lock_timeout: default_lock_timeout(),
        }
    }
}

impl Default for NameServiceConfig {
    fn default() -> Self {
        Self {
            max_queued_requests: default_max_queued_requests(),
            dispatch_interval: default_dispatch_interval(),
            dispatch_batch_size: default_dispatch_batch_size(),
        }
    }
}

fn default_interval() -> String {
    "5m".to_string()
}

fn default_lock_timeout() -> String {
    "30s".to_string()
}

fn default_max_queued_requests() -> usize {
    400
}

fn default_dispatch_interval() -> String {
    "30s".to_string()
}

fn default_dispatch_batch_size() -> usize {
    50
}

impl MaintainerConfig {
    pub fn interval(&self) -> CoreResult<Duration> {
        parse_duration(&self.interval)
    }

    pub fn lock_timeout(&self) -> CoreResult<Duration> {
        parse_duration(&self.lock_timeout)
    }
}

impl NameServiceConfig {
    pub fn dispatch_interval(&self) -> CoreResult<Duration> {
        parse_duration(&self.dispatch_interval)
    }
}

impl RoutegridConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: RoutegridConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.maintainer.interval().context("maintainer.interval")?.is_zero() {
            anyhow::bail!("maintainer.interval must be positive");
        }
        self.maintainer.lock_timeout().context("maintainer.lock_timeout")?;
        let dispatch_interval = self
            .name_service
            .dispatch_interval()
            .context("name_service.dispatch_interval")?;
        if dispatch_interval.is_zero() {
            anyhow::bail!("name_service.dispatch_interval must be positive");
        }
        if self.name_service.dispatch_batch_size == 0 {
            anyhow::bail!("name_service.dispatch_batch_size must be positive");
        }
        let mut seen = std::collections::BTreeSet::new();
        for zone in &self.zones {
            if !seen.insert(&zone.id) {
                anyhow::bail!("zone {} is configured twice", zone.id);
            }
        }
        Ok(())
    }
}

/// Parse a duration string like "500ms", "30s", "5m" or "1h".
pub fn parse_duration(s: &str) -> CoreResult<Duration> {
    let s = s.trim();
    let invalid = || CoreError::InvalidDuration(s.to_string());
    let (value, unit) = if let Some(ms) = s.strip_suffix("ms") {
        (ms, 1)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1_000)
    } else if let Some(mins) = s.strip_suffix('m') {
        (mins, 60_000)
    } else if let Some(hours) = s.strip_suffix('h') {
        (hours, 3_600_000)
    } else {
        return Err(invalid());
    };
    let value: u64 = value.parse().map_err(|_| invalid())?;
    let millis = value.checked_mul(unit).ok_or_else(invalid)?;
    Ok(Duration::from_millis(millis))
}
