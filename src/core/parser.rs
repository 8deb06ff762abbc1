//! Parser for the kernel's `/proc/buddyinfo` layout
//!
//! Each line describes one zone of one node:
//!
//! ```text
//! Node 0, zone   Normal   1568   1499   1075    407     51      6      3      3      1      1     20
//! ```
//!
//! Everything before the first comma is the node label. After it come the
//! literal keyword `zone`, the zone name, and one free block count per order.

use crate::core::error::{FragError, Result};
use crate::core::fragmentation::{EmptyZonePolicy, SystemFragmentation, ZoneFragmentation};
use crate::core::histogram::{FreePageHistogram, ORDER_COUNT};
use tracing::{debug, warn};

/// Keyword separating the node label from the zone name
const ZONE_KEYWORD: &str = "zone";

/// One parsed buddyinfo line, before any fragmentation math
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneLine {
    pub node: String,
    pub zone: String,
    pub histogram: FreePageHistogram,
}

/// Parse a single line
///
/// `line_no` is 1-based and only used for error reporting.
pub fn parse_line(line: &str, line_no: usize) -> Result<ZoneLine> {
    let malformed = |reason: String| FragError::Format {
        line: line_no,
        reason,
        content: line.to_string(),
    };

    let (node, rest) = line
        .split_once(',')
        .ok_or_else(|| malformed("missing ',' after node label".to_string()))?;

    let mut tokens = rest.split_whitespace();

    match tokens.next() {
        Some(ZONE_KEYWORD) => {}
        Some(other) => {
            return Err(malformed(format!(
                "expected keyword '{}', found '{}'",
                ZONE_KEYWORD, other
            )))
        }
        None => return Err(malformed("missing zone description".to_string())),
    }

    let zone = tokens
        .next()
        .ok_or_else(|| malformed("missing zone name".to_string()))?;

    let counts = tokens
        .map(|token| {
            token
                .parse::<u64>()
                .map_err(|_| malformed(format!("free block count '{}' is not an integer", token)))
        })
        .collect::<Result<Vec<u64>>>()?;

    let histogram = FreePageHistogram::try_from(counts.as_slice()).map_err(|found| {
        malformed(format!(
            "expected {} free block counts, found {}",
            ORDER_COUNT, found
        ))
    })?;

    if histogram.checked_total_free_pages().is_none() {
        return Err(malformed("free page total overflows u64".to_string()));
    }

    Ok(ZoneLine {
        node: node.trim().to_string(),
        zone: zone.to_string(),
        histogram,
    })
}

/// Parse buddyinfo text and compute fragmentation for every zone
///
/// Blank lines are skipped. The first malformed line aborts the whole parse,
/// so callers never see a partial result.
pub fn parse_buddyinfo(text: &str, policy: EmptyZonePolicy) -> Result<SystemFragmentation> {
    let mut system = SystemFragmentation::new();

    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let ZoneLine {
            node,
            zone,
            histogram,
        } = parse_line(line, idx + 1)?;

        let fragmentation = ZoneFragmentation::compute(histogram, policy).ok_or_else(|| {
            FragError::EmptyZone {
                node: node.clone(),
                zone: zone.clone(),
            }
        })?;

        debug!(
            "{} zone {}: {} free pages, overall fragmentation {:.4}",
            node,
            zone,
            fragmentation.total_free_pages(),
            fragmentation.overall_fragmentation()
        );

        if system.insert_zone(node.as_str(), zone.as_str(), fragmentation).is_some() {
            warn!("Duplicate entry for {} zone {}; keeping the later one", node, zone);
        }
    }

    Ok(system)
}
