//! Per-order fragmentation derived from a free page histogram
//!
//! For an allocation of order `o`, only blocks of order `o` or higher can
//! satisfy it directly. The fragmentation ratio at `o` is the share of the
//! zone's free pages that sits in smaller blocks:
//!
//! ```text
//! total      = Σ_{k=0..10} 2^k * count[k]
//! usable(o)  = Σ_{k=o..10} 2^k * count[k]
//! frag(o)    = (total - usable(o)) / total
//! ```

use crate::core::error::FragError;
use crate::core::histogram::{FreePageHistogram, ORDER_COUNT};
use indexmap::IndexMap;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::str::FromStr;

/// What to do with a zone whose histogram holds no free pages at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyZonePolicy {
    /// Fail the whole collection with [`FragError::EmptyZone`]
    #[default]
    Error,
    /// Treat every ratio of the zone as 0.0
    Zero,
}

impl FromStr for EmptyZonePolicy {
    type Err = FragError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(EmptyZonePolicy::Error),
            "zero" => Ok(EmptyZonePolicy::Zero),
            _ => Err(FragError::InvalidOption(format!(
                "Invalid empty zone policy '{}'. Valid options: error, zero",
                s
            ))),
        }
    }
}

/// Free block count and fragmentation ratio for one order
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrderFragmentation {
    pub order: usize,
    pub free_blocks: u64,
    /// Fraction in `[0, 1]`
    pub fragmentation: f64,
}

/// Fragmentation of one zone, for every order
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneFragmentation {
    histogram: FreePageHistogram,
    total_free_pages: u64,
    ratios: [f64; ORDER_COUNT],
}

impl ZoneFragmentation {
    /// Compute fragmentation for every order of `histogram`
    ///
    /// Returns `None` when the zone has no free pages and `policy` is
    /// [`EmptyZonePolicy::Error`]; the caller knows which zone it was and
    /// reports it. Also `None` if the free page total does not fit a `u64`,
    /// which [`parse_line`](crate::core::parser::parse_line) already rejects.
    pub fn compute(histogram: FreePageHistogram, policy: EmptyZonePolicy) -> Option<Self> {
        let total_free_pages = histogram.checked_total_free_pages()?;

        if total_free_pages == 0 {
            return match policy {
                EmptyZonePolicy::Error => None,
                EmptyZonePolicy::Zero => Some(ZoneFragmentation {
                    histogram,
                    total_free_pages,
                    ratios: [0.0; ORDER_COUNT],
                }),
            };
        }

        let usable = histogram.pages_at_or_above();
        let mut ratios = [0.0f64; ORDER_COUNT];
        for (order, ratio) in ratios.iter_mut().enumerate() {
            *ratio = (total_free_pages - usable[order]) as f64 / total_free_pages as f64;
        }

        Some(ZoneFragmentation {
            histogram,
            total_free_pages,
            ratios,
        })
    }

    pub fn histogram(&self) -> &FreePageHistogram {
        &self.histogram
    }

    pub fn total_free_pages(&self) -> u64 {
        self.total_free_pages
    }

    pub fn free_blocks(&self, order: usize) -> Option<u64> {
        self.histogram.count(order)
    }

    pub fn fragmentation(&self, order: usize) -> Option<f64> {
        self.ratios.get(order).copied()
    }

    /// Mean of the per-order ratios over all [`ORDER_COUNT`] orders
    pub fn overall_fragmentation(&self) -> f64 {
        self.ratios.iter().sum::<f64>() / ORDER_COUNT as f64
    }

    pub fn orders(&self) -> impl Iterator<Item = OrderFragmentation> + '_ {
        self.histogram
            .iter()
            .zip(self.ratios.iter())
            .map(|((order, free_blocks), &fragmentation)| OrderFragmentation {
                order,
                free_blocks,
                fragmentation,
            })
    }
}

impl Serialize for ZoneFragmentation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let orders: Vec<OrderFragmentation> = self.orders().collect();

        let mut state = serializer.serialize_struct("ZoneFragmentation", 3)?;
        state.serialize_field("total_free_pages", &self.total_free_pages)?;
        state.serialize_field("overall_fragmentation", &self.overall_fragmentation())?;
        state.serialize_field("orders", &orders)?;
        state.end()
    }
}

/// Zones of one NUMA node, in the order they were first seen
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NodeFragmentation {
    zones: IndexMap<String, ZoneFragmentation>,
}

impl NodeFragmentation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a zone, returning the entry it replaced
    ///
    /// A replaced zone keeps its original position.
    pub fn insert(
        &mut self,
        zone: impl Into<String>,
        fragmentation: ZoneFragmentation,
    ) -> Option<ZoneFragmentation> {
        self.zones.insert(zone.into(), fragmentation)
    }

    pub fn get(&self, zone: &str) -> Option<&ZoneFragmentation> {
        self.zones.get(zone)
    }

    pub fn zones(&self) -> impl Iterator<Item = (&str, &ZoneFragmentation)> {
        self.zones.iter().map(|(name, frag)| (name.as_str(), frag))
    }

    pub fn zone_names(&self) -> impl Iterator<Item = &str> {
        self.zones.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

/// Fragmentation of every zone on every node
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SystemFragmentation {
    nodes: IndexMap<String, NodeFragmentation>,
}

impl SystemFragmentation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a zone under its node, creating the node on first sight
    pub fn insert_zone(
        &mut self,
        node: impl Into<String>,
        zone: impl Into<String>,
        fragmentation: ZoneFragmentation,
    ) -> Option<ZoneFragmentation> {
        self.nodes
            .entry(node.into())
            .or_default()
            .insert(zone, fragmentation)
    }

    pub fn node(&self, node: &str) -> Option<&NodeFragmentation> {
        self.nodes.get(node)
    }

    pub fn zone(&self, node: &str, zone: &str) -> Option<&ZoneFragmentation> {
        self.node(node).and_then(|n| n.get(zone))
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&str, &NodeFragmentation)> {
        self.nodes.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Every `(node, zone, fragmentation)` triple in encounter order
    pub fn zones(&self) -> impl Iterator<Item = (&str, &str, &ZoneFragmentation)> {
        self.nodes().flat_map(|(node, zones)| {
            zones.zones().map(move |(zone, frag)| (node, zone, frag))
        })
    }

    pub fn zone_count(&self) -> usize {
        self.nodes.values().map(NodeFragmentation::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
