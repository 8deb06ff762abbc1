//! Built-in self checks, run by `fraglevel --test`
//!
//! Exercises the parser, the fragmentation math and the text renderer against
//! fixed histograms with known answers, without touching `/proc`.

use crate::core::error::FragError;
use crate::core::fragmentation::{EmptyZonePolicy, SystemFragmentation, ZoneFragmentation};
use crate::core::histogram::{FreePageHistogram, ORDER_COUNT};
use crate::core::parser::parse_buddyinfo;
use crate::core::report::render_text;
use std::fmt;
use tracing::{debug, warn};

/// Known-answer inputs and outputs
pub mod fixtures {
    pub const SMALL_ZONE: [u64; 11] = [2, 1, 2, 1, 0, 2, 1, 0, 1, 1, 1];

    pub const ORDER0_HEAVY_ZONE: [u64; 11] = [25386, 2028, 87, 18, 4, 1, 0, 1, 1, 0, 0];

    /// `SMALL_ZONE` rendered as "Node 0" / "DMA"
    pub const SMALL_ZONE_REPORT: &str = concat!(
        "Node 0, Zone: DMA\n",
        "Order    Free Pages    Fragmentation[%]\n",
        "  0          2                0%      \n",
        "  1          1                0%      \n",
        "  2          2                0%      \n",
        "  3          1                1%      \n",
        "  4          0                1%      \n",
        "  5          2                1%      \n",
        "  6          1                4%      \n",
        "  7          0                8%      \n",
        "  8          1                8%      \n",
        "  9          1               21%      \n",
        " 10          1               47%      \n",
        "Total Free Pages: 1940\n",
        "Overall Fragmentation: 8%\n",
        "\n",
    );

    /// `ORDER0_HEAVY_ZONE` rendered as "Node 0" / "DMA"
    pub const ORDER0_HEAVY_ZONE_REPORT: &str = concat!(
        "Node 0, Zone: DMA\n",
        "Order    Free Pages    Fragmentation[%]\n",
        "  0        25386               0%     \n",
        "  1         2028              83%     \n",
        "  2           87              97%     \n",
        "  3           18              98%     \n",
        "  4            4              98%     \n",
        "  5            1              99%     \n",
        "  6            0              99%     \n",
        "  7            1              99%     \n",
        "  8            1              99%     \n",
        "  9            0             100%     \n",
        " 10            0             100%     \n",
        "Total Free Pages: 30414\n",
        "Overall Fragmentation: 88%\n",
        "\n",
    );

    /// A two-node snapshot in the kernel's own spacing
    pub const TWO_NODE_BUDDYINFO: &str = "\
Node 0, zone      DMA      0      0      0      0      0      0      0      0      1      1      3
Node 0, zone    DMA32      2      2      2      2      2      2      5      2      2      2    754
Node 0, zone   Normal   1568   1499   1075    407     51      6      3      3      1      1     20
Node 1, zone   Normal   3107    976    210     37      9      2      1      0      0      0      0
";
}

use fixtures::*;

/// Tolerance for ratio comparisons
const EPSILON: f64 = 1e-9;

type CheckFn = fn() -> Result<(), String>;

/// Outcome of one named check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: &'static str,
    pub outcome: Result<(), String>,
}

impl CheckResult {
    pub fn passed(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Results of a full self-check run
#[derive(Debug, Clone, Default)]
pub struct SelfTestReport {
    pub results: Vec<CheckResult>,
}

impl SelfTestReport {
    pub fn passed(&self) -> bool {
        self.results.iter().all(CheckResult::passed)
    }

    pub fn pass_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn fail_count(&self) -> usize {
        self.results.len() - self.pass_count()
    }
}

impl fmt::Display for SelfTestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for result in &self.results {
            match &result.outcome {
                Ok(()) => writeln!(f, "{} ... ok", result.name)?,
                Err(msg) => writeln!(f, "{} ... FAILED: {}", result.name, msg)?,
            }
        }
        writeln!(f)?;
        write!(
            f,
            "{} passed; {} failed",
            self.pass_count(),
            self.fail_count()
        )
    }
}

fn ensure(condition: bool, msg: impl FnOnce() -> String) -> Result<(), String> {
    if condition {
        Ok(())
    } else {
        Err(msg())
    }
}

fn ensure_close(actual: f64, expected: f64, what: &str) -> Result<(), String> {
    ensure((actual - expected).abs() < EPSILON, || {
        format!("{}: expected {:.10}, got {:.10}", what, expected, actual)
    })
}

fn compute(counts: [u64; ORDER_COUNT]) -> Result<ZoneFragmentation, String> {
    ZoneFragmentation::compute(FreePageHistogram::new(counts), EmptyZonePolicy::Error)
        .ok_or_else(|| "unexpected empty zone".to_string())
}

fn ratio(frag: &ZoneFragmentation, order: usize) -> Result<f64, String> {
    frag.fragmentation(order)
        .ok_or_else(|| format!("missing order {}", order))
}

fn check_parse_nodes_and_zones() -> Result<(), String> {
    let system =
        parse_buddyinfo(TWO_NODE_BUDDYINFO, EmptyZonePolicy::Error).map_err(|e| e.to_string())?;

    let nodes: Vec<&str> = system.node_names().collect();
    ensure(nodes == ["Node 0", "Node 1"], || format!("nodes: {:?}", nodes))?;

    let node0 = system.node("Node 0").ok_or("Node 0 missing")?;
    let zones: Vec<&str> = node0.zone_names().collect();
    ensure(zones == ["DMA", "DMA32", "Normal"], || {
        format!("Node 0 zones: {:?}", zones)
    })?;

    for (node, zone, frag) in system.zones() {
        let orders: Vec<usize> = frag.orders().map(|o| o.order).collect();
        ensure(orders == (0..ORDER_COUNT).collect::<Vec<_>>(), || {
            format!("{} {} orders: {:?}", node, zone, orders)
        })?;
    }
    Ok(())
}

fn check_small_zone_ratios() -> Result<(), String> {
    let frag = compute(SMALL_ZONE)?;
    ensure(frag.total_free_pages() == 1940, || {
        format!("total free pages: {}", frag.total_free_pages())
    })?;
    ensure_close(ratio(&frag, 0)?, 0.0, "order 0")?;
    ensure_close(ratio(&frag, 3)?, 0.0061855670, "order 3")?;
    ensure_close(ratio(&frag, 6)?, 0.0432989690, "order 6")?;
    ensure_close(ratio(&frag, 10)?, 0.4721649484, "order 10")
}

fn check_order0_heavy_ratios() -> Result<(), String> {
    let frag = compute(ORDER0_HEAVY_ZONE)?;
    ensure(frag.total_free_pages() == 30414, || {
        format!("total free pages: {}", frag.total_free_pages())
    })?;
    ensure_close(ratio(&frag, 1)?, 0.8346813967, "order 1")?;
    ensure_close(ratio(&frag, 9)?, 1.0, "order 9")
}

fn check_monotonic() -> Result<(), String> {
    for counts in [SMALL_ZONE, ORDER0_HEAVY_ZONE] {
        let frag = compute(counts)?;
        let ratios: Vec<f64> = frag.orders().map(|o| o.fragmentation).collect();
        ensure(ratios[0] == 0.0, || format!("order 0 ratio {}", ratios[0]))?;
        ensure(ratios.windows(2).all(|w| w[0] <= w[1]), || {
            format!("not monotonic: {:?}", ratios)
        })?;
    }
    Ok(())
}

fn check_idempotent() -> Result<(), String> {
    let first = compute(ORDER0_HEAVY_ZONE)?;
    let second = compute(ORDER0_HEAVY_ZONE)?;
    ensure(first == second, || "recomputation differs".to_string())
}

fn check_text_report() -> Result<(), String> {
    let mut system = SystemFragmentation::new();
    system.insert_zone("Node 0", "DMA", compute(SMALL_ZONE)?);

    let rendered = render_text(&system);
    ensure(rendered == SMALL_ZONE_REPORT, || {
        format!("rendered report differs:\n{}", rendered)
    })
}

fn check_empty_input() -> Result<(), String> {
    let system = parse_buddyinfo("", EmptyZonePolicy::Error).map_err(|e| e.to_string())?;
    ensure(system.is_empty(), || "expected no nodes".to_string())?;
    ensure(render_text(&system).is_empty(), || {
        "expected empty report".to_string()
    })
}

fn check_malformed_line() -> Result<(), String> {
    let text = "Node 0, zone DMA 1 2 3 4 5 6 7 8 9 10";
    match parse_buddyinfo(text, EmptyZonePolicy::Error) {
        Err(FragError::Format { .. }) => Ok(()),
        other => Err(format!("expected format error, got {:?}", other)),
    }
}

fn check_empty_zone_policy() -> Result<(), String> {
    let text = "Node 0, zone Movable 0 0 0 0 0 0 0 0 0 0 0";
    match parse_buddyinfo(text, EmptyZonePolicy::Error) {
        Err(FragError::EmptyZone { .. }) => {}
        other => return Err(format!("expected empty zone error, got {:?}", other)),
    }

    let system = parse_buddyinfo(text, EmptyZonePolicy::Zero).map_err(|e| e.to_string())?;
    let movable = system
        .zone("Node 0", "Movable")
        .ok_or("Movable zone missing")?;
    ensure(movable.overall_fragmentation() == 0.0, || {
        format!("overall {}", movable.overall_fragmentation())
    })
}

const CHECKS: &[(&str, CheckFn)] = &[
    ("parse_nodes_and_zones", check_parse_nodes_and_zones),
    ("small_zone_ratios", check_small_zone_ratios),
    ("order0_heavy_ratios", check_order0_heavy_ratios),
    ("monotonic", check_monotonic),
    ("idempotent", check_idempotent),
    ("text_report", check_text_report),
    ("empty_input", check_empty_input),
    ("malformed_line", check_malformed_line),
    ("empty_zone_policy", check_empty_zone_policy),
];

/// Run every check and collect the results
pub fn run() -> SelfTestReport {
    let results = CHECKS
        .iter()
        .map(|&(name, check)| {
            let outcome = check();
            match &outcome {
                Ok(()) => debug!("self check {} passed", name),
                Err(msg) => warn!("self check {} failed: {}", name, msg),
            }
            CheckResult { name, outcome }
        })
        .collect();

    SelfTestReport { results }
}
