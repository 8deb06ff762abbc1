//! Where buddyinfo text comes from
//!
//! The live source is the kernel's `/proc/buddyinfo`. It is a virtual file:
//! every read produces a fresh snapshot, so nothing here caches.

use crate::core::error::{FragError, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Location of the live histogram on Linux
pub const DEFAULT_BUDDYINFO_PATH: &str = "/proc/buddyinfo";

/// Anything that can hand over a complete buddyinfo snapshot
pub trait BuddyInfoSource {
    /// Read the whole snapshot
    fn read_buddyinfo(&self) -> Result<String>;

    /// Human-readable name for diagnostics
    fn describe(&self) -> String;
}

/// Buddyinfo read from a file, `/proc/buddyinfo` by default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcBuddyInfo {
    path: PathBuf,
}

impl ProcBuddyInfo {
    pub fn new() -> Self {
        Self::at(DEFAULT_BUDDYINFO_PATH)
    }

    /// Read from `path` instead, e.g. a captured snapshot
    pub fn at<P: Into<PathBuf>>(path: P) -> Self {
        ProcBuddyInfo { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for ProcBuddyInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl BuddyInfoSource for ProcBuddyInfo {
    fn read_buddyinfo(&self) -> Result<String> {
        let unavailable = |source: std::io::Error| FragError::Unavailable {
            path: self.path.clone(),
            source,
        };

        debug!("Reading {:?}", self.path);

        // The handle is closed when it drops, on success or error
        let mut file = File::open(&self.path).map_err(unavailable)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(unavailable)?;

        debug!("Read {} bytes from {:?}", bytes.len(), self.path);
        decode_utf8(bytes)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Turn raw snapshot bytes into text
///
/// Invalid bytes are a format error on the line holding them.
fn decode_utf8(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|err| {
        let bytes = err.as_bytes();
        let valid_up_to = err.utf8_error().valid_up_to();

        let line_start = bytes[..valid_up_to]
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |pos| pos + 1);
        let line_end = bytes[valid_up_to..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(bytes.len(), |pos| valid_up_to + pos);
        let line = bytes[..valid_up_to].iter().filter(|&&b| b == b'\n').count() + 1;

        FragError::Format {
            line,
            reason: "invalid UTF-8".to_string(),
            content: String::from_utf8_lossy(&bytes[line_start..line_end]).into_owned(),
        }
    })
}

/// In-memory snapshot
impl BuddyInfoSource for str {
    fn read_buddyinfo(&self) -> Result<String> {
        Ok(self.to_string())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}

impl BuddyInfoSource for String {
    fn read_buddyinfo(&self) -> Result<String> {
        self.as_str().read_buddyinfo()
    }

    fn describe(&self) -> String {
        self.as_str().describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_path() {
        assert_eq!(ProcBuddyInfo::new().path(), Path::new("/proc/buddyinfo"));
        assert_eq!(ProcBuddyInfo::default(), ProcBuddyInfo::new());
    }

    #[test]
    fn test_read_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Node 0, zone DMA 1 1 1 1 1 1 1 1 1 1 1").unwrap();

        let source = ProcBuddyInfo::at(file.path());
        let text = source.read_buddyinfo().unwrap();
        assert!(text.starts_with("Node 0, zone DMA"));
        assert_eq!(source.describe(), file.path().display().to_string());
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("buddyinfo");

        match ProcBuddyInfo::at(&missing).read_buddyinfo() {
            Err(FragError::Unavailable { path, source }) => {
                assert_eq!(path, missing);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected unavailable error, got {:?}", other),
        }
    }

    #[test]
    fn test_unavailable_message() {
        let err = ProcBuddyInfo::at("/nonexistent/buddyinfo")
            .read_buddyinfo()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "/nonexistent/buddyinfo not readable. Does your kernel support it?"
        );
    }

    #[test]
    fn test_invalid_utf8_is_format_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Node 0, zone DMA 1 1 1 1 1 1 1 1 1 1 1\n").unwrap();
        file.write_all(b"Node 0, zone DMA32 \xff 1 1 1 1 1 1 1 1 1 1\n").unwrap();
        file.write_all(b"Node 0, zone Normal 1 1 1 1 1 1 1 1 1 1 1\n").unwrap();
        file.flush().unwrap();

        match ProcBuddyInfo::at(file.path()).read_buddyinfo() {
            Err(FragError::Format { line, reason, content }) => {
                assert_eq!(line, 2);
                assert_eq!(reason, "invalid UTF-8");
                assert_eq!(content, "Node 0, zone DMA32 \u{FFFD} 1 1 1 1 1 1 1 1 1 1");
            }
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn test_in_memory_source() {
        let text = "Node 0, zone DMA 0 0 0 0 0 0 0 0 0 0 1";
        assert_eq!(text.read_buddyinfo().unwrap(), text);
        assert_eq!(text.to_string().read_buddyinfo().unwrap(), text);
    }
}
