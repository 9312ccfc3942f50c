//! hostwatch.toml configuration parser.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, MonitorResult};

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 2;
pub const DEFAULT_BACKOFF_MINUTES: u32 = 15;
/// One day.
pub const DEFAULT_REQUEST_LOG_MINUTES: u32 = 60 * 24;
/// One week.
pub const DEFAULT_FAILURE_LOG_MINUTES: u32 = 60 * 24 * 7;
pub const DEFAULT_STATUS_CACHE_MINUTES: u32 = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub monitor: DecisionConfig,
    pub retention: RetentionConfig,
    pub notify: NotifyConfig,
    pub storage: StorageConfig,
}

/// Inputs to the notification decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Consecutive failures required before a host is reported down.
    pub failure_threshold: u32,
    /// Base gap between notifications; doubles with every message sent.
    pub backoff_minutes: u32,
    /// Prefix for notification subjects and bodies.
    pub subject_prefix: String,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            backoff_minutes: DEFAULT_BACKOFF_MINUTES,
            subject_prefix: "hostwatch".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub request_log_minutes: u32,
    pub failure_log_minutes: u32,
    /// Idle time after which a cached host status is evicted.
    pub status_cache_minutes: u32,
    pub purge_interval_secs: u64,
    /// Delay before the first purge run.
    pub purge_delay_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            request_log_minutes: DEFAULT_REQUEST_LOG_MINUTES,
            failure_log_minutes: DEFAULT_FAILURE_LOG_MINUTES,
            status_cache_minutes: DEFAULT_STATUS_CACHE_MINUTES,
            purge_interval_secs: 5 * 60,
            purge_delay_secs: 60,
        }
    }
}

impl RetentionConfig {
    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs)
    }

    pub fn purge_delay(&self) -> Duration {
        Duration::from_secs(self.purge_delay_secs)
    }
}

/// Recipients handed to the notifier with every message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub to: String,
    pub from: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            to: "ops@localhost".to_string(),
            from: "hostwatch@localhost".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for `.response` failure artifacts. Disabled when unset.
    pub artifact_dir: Option<PathBuf>,
}

impl MonitorConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MonitorConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> MonitorResult<()> {
        if self.monitor.failure_threshold == 0 {
            return Err(MonitorError::Config(
                "failure_threshold must be at least 1".to_string(),
            ));
        }
        if self.retention.purge_interval_secs == 0 {
            return Err(MonitorError::Config(
                "purge_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
