//! Text and JSON rendering of fragmentation results
//!
//! The text layout approximates the tables in Samsung's "Controlling Linux
//! Memory Fragmentation" presentation, minus anything `/proc/buddyinfo`
//! cannot provide (such as per-migratetype counts).

use crate::core::error::Result;
use crate::core::fragmentation::{SystemFragmentation, ZoneFragmentation};
use std::fmt;

const HEADERS: [&str; 3] = ["Order", "Free Pages", "Fragmentation[%]"];

/// Field widths the columns are centered in
const WIDTHS: [usize; 3] = [4, 9, 15];

const HEADER_SEPARATOR: &str = "    ";
const ROW_SEPARATOR: &str = "     ";

/// Center `text` in `width` columns
///
/// When the leftover padding is odd the extra space goes right, unless the
/// width is odd too, in which case it goes left. Text wider than `width` is
/// returned unchanged.
fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }

    let margin = width - len;
    let left = margin / 2 + (margin & width & 1);
    let right = margin - left;

    format!("{}{}{}", " ".repeat(left), text, " ".repeat(right))
}

/// Right-align each cell to its column's content width, center it in the
/// column's field width, and join the cells with `separator`
fn columnize(cells: &[String; 3], content_widths: &[usize; 3], separator: &str) -> String {
    cells
        .iter()
        .zip(content_widths)
        .zip(WIDTHS)
        .map(|((cell, &content_width), width)| {
            let aligned = format!("{:>content_width$}", cell, content_width = content_width);
            center(&aligned, width)
        })
        .collect::<Vec<_>>()
        .join(separator)
}

/// Ratio as a whole percentage, e.g. `0.621` → `62%`
pub fn format_percent(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

fn write_zone(
    f: &mut fmt::Formatter<'_>,
    node: &str,
    zone: &str,
    frag: &ZoneFragmentation,
) -> fmt::Result {
    writeln!(f, "{}, Zone: {}", node, zone)?;

    let headers = HEADERS.map(String::from);
    let header_widths = HEADERS.map(str::len);
    writeln!(f, "{}", columnize(&headers, &header_widths, HEADER_SEPARATOR))?;

    let rows: Vec<[String; 3]> = frag
        .orders()
        .map(|o| {
            [
                o.order.to_string(),
                o.free_blocks.to_string(),
                format_percent(o.fragmentation),
            ]
        })
        .collect();

    let mut content_widths = [0usize; 3];
    for row in &rows {
        for (width, cell) in content_widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    for row in &rows {
        writeln!(f, "{}", columnize(row, &content_widths, ROW_SEPARATOR))?;
    }

    writeln!(f, "Total Free Pages: {}", frag.total_free_pages())?;
    writeln!(
        f,
        "Overall Fragmentation: {}",
        format_percent(frag.overall_fragmentation())
    )?;
    writeln!(f)
}

/// Text table view over a [`SystemFragmentation`]
///
/// One block per zone, in encounter order, each followed by a blank line.
pub struct TextReport<'a>(pub &'a SystemFragmentation);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (node, zone, frag) in self.0.zones() {
            write_zone(f, node, zone, frag)?;
        }
        Ok(())
    }
}

pub fn render_text(system: &SystemFragmentation) -> String {
    TextReport(system).to_string()
}

/// Pretty-printed JSON keyed by node, then zone
pub fn render_json(system: &SystemFragmentation) -> Result<String> {
    Ok(serde_json::to_string_pretty(system)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fragmentation::EmptyZonePolicy;
    use crate::core::histogram::FreePageHistogram;
    use crate::selftest::fixtures::{
        ORDER0_HEAVY_ZONE, ORDER0_HEAVY_ZONE_REPORT, SMALL_ZONE, SMALL_ZONE_REPORT,
    };

    fn single_zone(counts: [u64; 11]) -> SystemFragmentation {
        let frag =
            ZoneFragmentation::compute(FreePageHistogram::new(counts), EmptyZonePolicy::Error)
                .unwrap();
        let mut system = SystemFragmentation::new();
        system.insert_zone("Node 0", "DMA", frag);
        system
    }

    #[test]
    fn test_center() {
        assert_eq!(center("0", 4), " 0  ");
        assert_eq!(center(" 0", 4), "  0 ");
        assert_eq!(center("2", 9), "    2    ");
        assert_eq!(center(" 0%", 15), "       0%      ");
        assert_eq!(center("100%", 15), "      100%     ");
        assert_eq!(center("Order", 4), "Order");
    }

    #[test]
    fn test_center_odd_margin_odd_width() {
        // margin 3, width 9: extra space on the left
        assert_eq!(center("abcdef", 9), "  abcdef ");
        // margin 11, width 15
        assert_eq!(center("  0%", 15), "        0%     ");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.0), "0%");
        assert_eq!(format_percent(0.621), "62%");
        assert_eq!(format_percent(0.4721649484), "47%");
        assert_eq!(format_percent(1.0), "100%");
    }

    #[test]
    fn test_header_row() {
        let headers = HEADERS.map(String::from);
        let widths = HEADERS.map(str::len);
        assert_eq!(
            columnize(&headers, &widths, HEADER_SEPARATOR),
            "Order    Free Pages    Fragmentation[%]"
        );
    }

    #[test]
    fn test_render_fixture() {
        let system = single_zone(SMALL_ZONE);
        assert_eq!(render_text(&system), SMALL_ZONE_REPORT);
    }

    #[test]
    fn test_render_wide_counts() {
        let system = single_zone(ORDER0_HEAVY_ZONE);
        assert_eq!(render_text(&system), ORDER0_HEAVY_ZONE_REPORT);
    }

    #[test]
    fn test_render_two_zones_in_order() {
        let mut system = single_zone(SMALL_ZONE);
        let normal = ZoneFragmentation::compute(
            FreePageHistogram::new(ORDER0_HEAVY_ZONE),
            EmptyZonePolicy::Error,
        )
        .unwrap();
        system.insert_zone("Node 0", "Normal", normal);

        let rendered = render_text(&system);
        let expected_tail = ORDER0_HEAVY_ZONE_REPORT.replacen("Zone: DMA", "Zone: Normal", 1);
        assert_eq!(rendered, format!("{}{}", SMALL_ZONE_REPORT, expected_tail));
    }

    #[test]
    fn test_render_empty_system() {
        assert_eq!(render_text(&SystemFragmentation::new()), "");
    }

    #[test]
    fn test_render_json_shape() {
        let system = single_zone(SMALL_ZONE);
        let json: serde_json::Value = serde_json::from_str(&render_json(&system).unwrap()).unwrap();

        let dma = &json["Node 0"]["DMA"];
        assert_eq!(dma["total_free_pages"], 1940);
        assert_eq!(dma["orders"].as_array().unwrap().len(), 11);
        assert_eq!(dma["orders"][10]["order"], 10);
        assert_eq!(dma["orders"][10]["free_blocks"], 1);
        let last = dma["orders"][10]["fragmentation"].as_f64().unwrap();
        assert!((last - 0.4721649484).abs() < 1e-9);
    }
}
