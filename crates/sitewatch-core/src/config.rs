//! sitewatch.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use thiserror::Error;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/sitewatch.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// URLs probed on every regular run, in report order.
    pub targets: Vec<String>,
    #[serde(default)]
    pub recipients: Vec<String>,
    /// IANA timezone used when rendering timestamps in alerts.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub alerting: AlertingConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Attempts per target before giving up on a connection-level failure.
    pub max_retries: u32,
    /// Seconds slept between attempts.
    pub retry_delay: u64,
    /// Seconds allowed for establishing the connection.
    pub connect_timeout: u64,
    /// Seconds allowed for a whole attempt.
    pub max_timeout: u64,
    pub method: ProbeMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    Head,
    #[default]
    Get,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertingConfig {
    /// Consecutive DOWN observations before a DOWN alert fires.
    pub grace_period: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub status_file: PathBuf,
    pub lock_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// mail(1)-compatible program invoked as `<command> -s <subject> <recipient>`.
    pub command: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: 5,
            connect_timeout: 10,
            max_timeout: 20,
            method: ProbeMethod::Get,
        }
    }
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self { grace_period: 2 }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            status_file: PathBuf::from("/var/lib/sitewatch/status"),
            lock_file: PathBuf::from("/run/lock/sitewatch.lock"),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            command: "mail".to_string(),
        }
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl ProbeConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn max_timeout(&self) -> Duration {
        Duration::from_secs(self.max_timeout)
    }
}

impl WatchConfig {
    /// Read, parse and validate a config file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: WatchConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.targets.is_empty() {
            return Err(ConfigError::Invalid("no targets configured".into()));
        }
        if let Some(bad) = self.targets.iter().find(|t| t.trim().is_empty() || t.contains(' ')) {
            return Err(ConfigError::Invalid(format!(
                "target {bad:?} must be a non-empty URL without spaces"
            )));
        }
        if self.alerting.grace_period == 0 {
            return Err(ConfigError::Invalid("alerting.grace_period must be >= 1".into()));
        }
        if self.probe.max_retries == 0 {
            return Err(ConfigError::Invalid("probe.max_retries must be >= 1".into()));
        }
        if self.probe.connect_timeout == 0 {
            return Err(ConfigError::Invalid("probe.connect_timeout must be >= 1".into()));
        }
        if self.probe.max_timeout == 0 {
            return Err(ConfigError::Invalid("probe.max_timeout must be >= 1".into()));
        }
        self.tz()?;
        Ok(())
    }

    /// The configured timezone.
    pub fn tz(&self) -> ConfigResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Invalid(format!("unknown timezone {:?}", self.timezone)))
    }
}
