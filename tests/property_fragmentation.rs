//! Property-based tests for the fragmentation calculator
//!
//! Uses proptest to verify the invariants hold across random histograms

use fraglevel::{
    parse_buddyinfo, render_text, EmptyZonePolicy, FreePageHistogram, ZoneFragmentation,
    ORDER_COUNT,
};
use proptest::prelude::*;

fn histogram() -> impl Strategy<Value = [u64; ORDER_COUNT]> {
    prop::array::uniform11(0u64..1_000_000)
}

fn non_empty_histogram() -> impl Strategy<Value = [u64; ORDER_COUNT]> {
    histogram().prop_filter("zone needs free pages", |counts| {
        counts.iter().any(|&c| c > 0)
    })
}

/// Render counts the way the kernel pads them
fn buddyinfo_line(node: usize, zone: &str, counts: &[u64; ORDER_COUNT]) -> String {
    let cols: Vec<String> = counts.iter().map(|c| format!("{:>6}", c)).collect();
    format!("Node {}, zone {:>8} {}", node, zone, cols.join(" "))
}

proptest! {
    #[test]
    fn prop_ratios_monotonic_and_bounded(counts in non_empty_histogram()) {
        let frag = ZoneFragmentation::compute(
            FreePageHistogram::new(counts),
            EmptyZonePolicy::Error,
        ).unwrap();

        let ratios: Vec<f64> = frag.orders().map(|o| o.fragmentation).collect();
        prop_assert_eq!(ratios[0], 0.0);

        for pair in ratios.windows(2) {
            prop_assert!(pair[0] <= pair[1], "not monotonic: {:?}", ratios);
        }
        for &r in &ratios {
            prop_assert!((0.0..=1.0).contains(&r), "ratio out of range: {}", r);
        }

        let overall = frag.overall_fragmentation();
        prop_assert!((0.0..=1.0).contains(&overall));
    }

    #[test]
    fn prop_compute_is_idempotent(counts in histogram()) {
        let hist = FreePageHistogram::new(counts);
        let first = ZoneFragmentation::compute(hist, EmptyZonePolicy::Zero);
        let second = ZoneFragmentation::compute(hist, EmptyZonePolicy::Zero);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_empty_policy_only_matters_for_empty_zones(counts in histogram()) {
        let hist = FreePageHistogram::new(counts);
        let strict = ZoneFragmentation::compute(hist, EmptyZonePolicy::Error);
        let lenient = ZoneFragmentation::compute(hist, EmptyZonePolicy::Zero);

        if hist.total_free_pages() == 0 {
            prop_assert!(strict.is_none());
            prop_assert!(lenient.is_some());
        } else {
            prop_assert_eq!(strict, lenient);
        }
    }

    #[test]
    fn prop_generated_lines_parse_back(
        zones in prop::collection::vec(non_empty_histogram(), 1..6)
    ) {
        let names = ["DMA", "DMA32", "Normal", "HighMem", "Movable", "Device"];
        let text: String = zones
            .iter()
            .enumerate()
            .map(|(i, counts)| buddyinfo_line(i % 2, names[i], counts) + "\n")
            .collect();

        let system = parse_buddyinfo(&text, EmptyZonePolicy::Error).unwrap();
        prop_assert_eq!(system.zone_count(), zones.len());

        for (i, counts) in zones.iter().enumerate() {
            let node = format!("Node {}", i % 2);
            let zone = system.zone(&node, names[i]).unwrap();
            prop_assert_eq!(zone.histogram().counts(), counts);
        }

        // 16 lines per zone: header, column row, 11 orders, 2 footers, blank
        let report = render_text(&system);
        prop_assert_eq!(report.lines().count(), zones.len() * 16);
    }

    #[test]
    fn prop_short_lines_are_rejected(
        counts in prop::collection::vec(0u64..1000, 0..ORDER_COUNT)
    ) {
        let cols: Vec<String> = counts.iter().map(u64::to_string).collect();
        let line = format!("Node 0, zone Normal {}", cols.join(" "));
        prop_assert!(parse_buddyinfo(&line, EmptyZonePolicy::Zero).is_err());
    }
}
