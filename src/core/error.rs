use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FragError {
    #[error("{} not readable. Does your kernel support it?", path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed buddyinfo line {line}: {reason} (line: {content:?})")]
    Format {
        line: usize,
        reason: String,
        content: String,
    },

    #[error("Zone {zone} on {node} reports no free pages; fragmentation is undefined")]
    EmptyZone { node: String, zone: String },

    #[error("Cannot read config file {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidOption(String),
}

pub type Result<T> = std::result::Result<T, FragError>;
