//! # fraglevel - Linux Memory Fragmentation Estimator
//!
//! `fraglevel` reads the kernel's free page histogram (`/proc/buddyinfo`) and
//! estimates, for every zone of every NUMA node, how much free memory is
//! unusable for allocations of each order. The metric follows Samsung's
//! "Controlling Linux Memory Fragmentation and Higher Order Allocation
//! Failure" analysis:
//!
//! - **Order `o` fragmentation**: share of a zone's free pages held in blocks
//!   smaller than `2^o` pages
//! - **Overall fragmentation**: mean of the per-order values
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fraglevel::{collect, render_text, EmptyZonePolicy, ProcBuddyInfo, Result};
//!
//! # fn main() -> Result<()> {
//! let system = collect(&ProcBuddyInfo::new(), EmptyZonePolicy::Error)?;
//! print!("{}", render_text(&system));
//! # Ok(())
//! # }
//! ```
//!
//! ## Captured Snapshots
//!
//! ```rust
//! use fraglevel::{collect, EmptyZonePolicy};
//!
//! let snapshot = "Node 0, zone DMA 2 1 2 1 0 2 1 0 1 1 1";
//! let system = collect(snapshot, EmptyZonePolicy::Error).unwrap();
//! let dma = system.zone("Node 0", "DMA").unwrap();
//!
//! assert_eq!(dma.total_free_pages(), 1940);
//! assert_eq!(dma.fragmentation(0), Some(0.0));
//! ```

pub mod core;
pub mod selftest;

pub use crate::core::{
    config::{Config, OutputFormat},
    error::{FragError, Result},
    fragmentation::{
        EmptyZonePolicy, NodeFragmentation, OrderFragmentation, SystemFragmentation,
        ZoneFragmentation,
    },
    histogram::{order_to_pages, FreePageHistogram, ORDER_COUNT},
    parser::{parse_buddyinfo, parse_line, ZoneLine},
    report::{format_percent, render_json, render_text, TextReport},
    source::{BuddyInfoSource, ProcBuddyInfo, DEFAULT_BUDDYINFO_PATH},
};

use tracing::info;

/// Read one snapshot from `source` and compute fragmentation for every zone
///
/// The source is read exactly once. Any parse or empty-zone error aborts the
/// whole collection.
pub fn collect<S: BuddyInfoSource + ?Sized>(
    source: &S,
    policy: EmptyZonePolicy,
) -> Result<SystemFragmentation> {
    info!("Collecting buddyinfo from {}", source.describe());

    let text = source.read_buddyinfo()?;
    let system = parse_buddyinfo(&text, policy)?;

    info!(
        "Parsed {} zones across {} nodes",
        system.zone_count(),
        system.node_names().count()
    );
    Ok(system)
}

/// Render `system` in the requested format
pub fn render(system: &SystemFragmentation, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(system)),
        OutputFormat::Json => Ok(format!("{}\n", render_json(system)?)),
    }
}

/// Collect from the configured source and render the report
pub fn run(config: &Config) -> Result<String> {
    let system = collect(&config.source(), config.empty_zone)?;
    render(&system, config.format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selftest::fixtures::{SMALL_ZONE_REPORT, TWO_NODE_BUDDYINFO};

    #[test]
    fn test_collect_from_memory() {
        let system = collect(TWO_NODE_BUDDYINFO, EmptyZonePolicy::Error).unwrap();
        assert_eq!(system.zone_count(), 4);
    }

    #[test]
    fn test_render_formats() {
        let system = collect(
            "Node 0, zone DMA 2 1 2 1 0 2 1 0 1 1 1\n",
            EmptyZonePolicy::Error,
        )
        .unwrap();

        assert_eq!(render(&system, OutputFormat::Text).unwrap(), SMALL_ZONE_REPORT);
        assert!(render(&system, OutputFormat::Json)
            .unwrap()
            .contains("\"total_free_pages\": 1940"));
    }

    #[test]
    fn test_run_with_missing_source() {
        let config = Config::default().with_buddyinfo("/nonexistent/fraglevel/buddyinfo");
        assert!(matches!(run(&config), Err(FragError::Unavailable { .. })));
    }
}
