//! Rotating file handler configuration

use crate::error::{Error, Result};
use ferrolog::Flags;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default number of archives kept
pub const DEFAULT_MAX_FILES: usize = 4;
/// Default size threshold (4 MiB)
pub const DEFAULT_MAX_SIZE: u64 = 4 * 1024 * 1024;
/// Default interval between size checks
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for [`RotatingFileHandler`](crate::RotatingFileHandler)
///
/// `max_files` of 0 or 1, or a `max_size` of 0, disables rotation and lets
/// the live file grow without bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotatingFileConfig {
    /// Directory holding the live file and its archives
    pub dir: PathBuf,
    /// Name of the live file inside `dir`
    pub filename: String,
    /// Number of archives kept before the oldest slot is reused
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// Size in bytes at which the live file is rotated
    #[serde(default = "default_max_size")]
    pub max_size: u64,
    /// How often the monitor re-checks the live file size
    #[serde(
        default = "default_check_interval",
        rename = "check_interval_ms",
        with = "millis"
    )]
    pub check_interval: Duration,
    /// Text written in front of every record
    #[serde(default)]
    pub prefix: String,
    /// Prefix flags
    #[serde(default)]
    pub flags: Flags,
}

impl RotatingFileConfig {
    /// Create a configuration with default limits
    pub fn new(dir: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            filename: filename.into(),
            max_files: DEFAULT_MAX_FILES,
            max_size: DEFAULT_MAX_SIZE,
            check_interval: DEFAULT_CHECK_INTERVAL,
            prefix: String::new(),
            flags: Flags::STD,
        }
    }

    /// Start a builder
    pub fn builder(
        dir: impl Into<PathBuf>,
        filename: impl Into<String>,
    ) -> RotatingFileConfigBuilder {
        RotatingFileConfigBuilder {
            config: Self::new(dir, filename),
        }
    }

    /// Parse a TOML table such as
    ///
    /// ```toml
    /// dir = "/var/log/app"
    /// filename = "app.log"
    /// max_files = 4
    /// max_size = 4194304
    /// check_interval_ms = 1000
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::Toml`] for malformed input and
    /// [`Error::Configuration`] for values that fail validation.
    pub fn from_toml(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would make the handler unusable
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the filename is empty or contains
    /// a path separator, or when the check interval is zero.
    pub fn validate(&self) -> Result<()> {
        if self.filename.is_empty() {
            return Err(Error::Configuration("filename must not be empty".into()));
        }
        if self.filename.contains(['/', '\\']) {
            return Err(Error::Configuration(format!(
                "filename must not contain a path separator: {}",
                self.filename
            )));
        }
        if self.check_interval.is_zero() {
            return Err(Error::Configuration(
                "check interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Whether these limits allow rotation at all
    pub const fn rotation_enabled(&self) -> bool {
        self.max_files > 1 && self.max_size > 0
    }

    /// Path of the live file
    pub fn live_path(&self) -> PathBuf {
        self.dir.join(&self.filename)
    }

    /// Path of archive slot `suffix`: `<dir>/<filename>.<suffix>.log`
    pub fn archive_path(&self, suffix: usize) -> PathBuf {
        archive_path(&self.dir, &self.filename, suffix)
    }
}

pub(crate) fn archive_path(dir: &Path, filename: &str, suffix: usize) -> PathBuf {
    dir.join(format!("{filename}.{suffix}.log"))
}

/// Builder for [`RotatingFileConfig`]
#[derive(Debug, Clone)]
pub struct RotatingFileConfigBuilder {
    config: RotatingFileConfig,
}

impl RotatingFileConfigBuilder {
    /// Number of archives kept
    #[must_use]
    pub const fn max_files(mut self, max_files: usize) -> Self {
        self.config.max_files = max_files;
        self
    }

    /// Size in bytes at which the live file is rotated
    #[must_use]
    pub const fn max_size(mut self, max_size: u64) -> Self {
        self.config.max_size = max_size;
        self
    }

    /// Interval between size checks
    #[must_use]
    pub const fn check_interval(mut self, interval: Duration) -> Self {
        self.config.check_interval = interval;
        self
    }

    /// Text written in front of every record
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = prefix.into();
        self
    }

    /// Prefix flags
    #[must_use]
    pub const fn flags(mut self, flags: Flags) -> Self {
        self.config.flags = flags;
        self
    }

    /// Validate and return the configuration
    ///
    /// # Errors
    ///
    /// See [`RotatingFileConfig::validate`].
    pub fn build(self) -> Result<RotatingFileConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

const fn default_max_files() -> usize {
    DEFAULT_MAX_FILES
}

const fn default_max_size() -> u64 {
    DEFAULT_MAX_SIZE
}

const fn default_check_interval() -> Duration {
    DEFAULT_CHECK_INTERVAL
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(
        value: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
