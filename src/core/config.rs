//! Runtime configuration
//!
//! Defaults can be overridden by a TOML file and then by command line flags:
//!
//! ```toml
//! buddyinfo = "/proc/buddyinfo"
//! format = "json"
//! empty_zone = "zero"
//! ```

use crate::core::error::{FragError, Result};
use crate::core::fragmentation::EmptyZonePolicy;
use crate::core::source::{ProcBuddyInfo, DEFAULT_BUDDYINFO_PATH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned text tables
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

impl FromStr for OutputFormat {
    type Err = FragError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(FragError::InvalidOption(format!(
                "Invalid output format '{}'. Valid options: text, json",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// File holding the buddyinfo snapshot
    pub buddyinfo: PathBuf,

    pub format: OutputFormat,

    pub empty_zone: EmptyZonePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            buddyinfo: PathBuf::from(DEFAULT_BUDDYINFO_PATH),
            format: OutputFormat::default(),
            empty_zone: EmptyZonePolicy::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a TOML config file; missing keys keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from {:?}", path);

        let text = std::fs::read_to_string(path).map_err(|source| FragError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn with_buddyinfo<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.buddyinfo = path.into();
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_empty_zone(mut self, policy: EmptyZonePolicy) -> Self {
        self.empty_zone = policy;
        self
    }

    /// Data source this config points at
    pub fn source(&self) -> ProcBuddyInfo {
        ProcBuddyInfo::at(&self.buddyinfo)
    }
}
