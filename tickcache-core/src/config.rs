//! Export run configuration.
//!
//! Stored as TOML:
//!
//! ```toml
//! months = 1
//! output_dir = "data"
//! timezone = "Europe/Helsinki"   # optional
//!
//! [[symbols]]
//! source = "EUR/USD"
//! export = "EURUSD"
//! ```
//!
//! The export timezone is ordinary configuration handed to each run; it is
//! validated when set and an invalid name leaves the previous value in place.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Export timezone used when none is configured.
pub const DEFAULT_TIMEZONE: &str = "Europe/Helsinki";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("no symbols configured")]
    NoSymbols,

    #[error("symbol pair '{0}' must look like SOURCE=EXPORT with both sides non-empty")]
    BadSymbolPair(String),
}

/// A validated IANA timezone for export timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportTimezone(Tz);

impl ExportTimezone {
    /// Resolve an IANA name such as `Europe/Helsinki`.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        name.parse::<Tz>()
            .map(Self)
            .map_err(|_| ConfigError::UnknownTimezone(name.to_string()))
    }

    pub fn tz(&self) -> Tz {
        self.0
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Name with `/` replaced by `_`, as used in export file names.
    pub fn file_suffix(&self) -> String {
        self.name().replace('/', "_")
    }
}

impl Default for ExportTimezone {
    fn default() -> Self {
        Self(Tz::Europe__Helsinki)
    }
}

impl fmt::Display for ExportTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Source symbol as the provider knows it, and the name used for the export file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolPair {
    pub source: String,
    pub export: String,
}

impl SymbolPair {
    pub fn new(source: impl Into<String>, export: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            export: export.into(),
        }
    }
}

impl FromStr for SymbolPair {
    type Err = ConfigError;

    /// Parse `EUR/USD=EURUSD`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, export) = s
            .split_once('=')
            .ok_or_else(|| ConfigError::BadSymbolPair(s.to_string()))?;
        let (source, export) = (source.trim(), export.trim());
        if source.is_empty() || export.is_empty() {
            return Err(ConfigError::BadSymbolPair(s.to_string()));
        }
        Ok(Self::new(source, export))
    }
}

/// On-disk shape of the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default = "default_months")]
    months: u32,
    #[serde(default = "default_output_dir")]
    output_dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timezone: Option<String>,
    #[serde(default)]
    symbols: Vec<SymbolPair>,
}

fn default_months() -> u32 {
    1
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Everything one export run needs besides the provider and the clock.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    /// Calendar months of history ending at the run's `now`.
    pub months: u32,
    pub symbols: Vec<SymbolPair>,
    /// Root for `raw_cache/` and `processed_data/`.
    pub output_dir: PathBuf,
    timezone: ExportTimezone,
}

impl ExportConfig {
    pub fn new(months: u32, symbols: Vec<SymbolPair>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            months,
            symbols,
            output_dir: output_dir.into(),
            timezone: ExportTimezone::default(),
        }
    }

    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string. Symbols may be empty here; see [`Self::validate`].
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        let timezone = match file.timezone.as_deref() {
            Some(name) => ExportTimezone::parse(name)?,
            None => ExportTimezone::default(),
        };
        for pair in &file.symbols {
            if pair.source.trim().is_empty() || pair.export.trim().is_empty() {
                return Err(ConfigError::BadSymbolPair(format!("{}={}", pair.source, pair.export)));
            }
        }
        Ok(Self {
            months: file.months,
            symbols: file.symbols,
            output_dir: file.output_dir,
            timezone,
        })
    }

    /// Serialize the config to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let file = ConfigFile {
            months: self.months,
            output_dir: self.output_dir.clone(),
            timezone: Some(self.timezone.name().to_string()),
            symbols: self.symbols.clone(),
        };
        Ok(toml::to_string_pretty(&file)?)
    }

    pub fn timezone(&self) -> ExportTimezone {
        self.timezone
    }

    /// Change the export timezone. On an unknown name the current one is kept.
    pub fn set_timezone(&mut self, name: &str) -> Result<(), ConfigError> {
        self.timezone = ExportTimezone::parse(name)?;
        Ok(())
    }

    /// A run needs at least one symbol pair.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::NoSymbols);
        }
        Ok(())
    }
}
