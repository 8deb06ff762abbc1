//! Free page histogram for a single zone
//!
//! One entry per allocation order, holding the number of free contiguous
//! blocks of `2^order` pages the buddy allocator currently tracks.

/// Number of orders the kernel reports per zone (`MAX_ORDER`)
pub const ORDER_COUNT: usize = 11;

/// Base pages held by one block of the given order
#[inline]
pub const fn order_to_pages(order: usize) -> u64 {
    1u64 << order
}

/// Free block counts indexed by order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FreePageHistogram([u64; ORDER_COUNT]);

impl FreePageHistogram {
    pub fn new(counts: [u64; ORDER_COUNT]) -> Self {
        FreePageHistogram(counts)
    }

    /// Free block count at `order`, or `None` past the last order
    pub fn count(&self, order: usize) -> Option<u64> {
        self.0.get(order).copied()
    }

    pub fn counts(&self) -> &[u64; ORDER_COUNT] {
        &self.0
    }

    /// Iterate `(order, free_blocks)` pairs from order 0 upwards
    pub fn iter(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.0.iter().copied().enumerate()
    }

    /// Total free memory in base pages
    ///
    /// Saturates at `u64::MAX`; see [`checked_total_free_pages`].
    ///
    /// [`checked_total_free_pages`]: FreePageHistogram::checked_total_free_pages
    pub fn total_free_pages(&self) -> u64 {
        self.iter().fold(0u64, |total, (order, count)| {
            total.saturating_add(order_to_pages(order).saturating_mul(count))
        })
    }

    /// Total free memory in base pages, or `None` if it does not fit a `u64`
    pub fn checked_total_free_pages(&self) -> Option<u64> {
        self.iter().try_fold(0u64, |total, (order, count)| {
            order_to_pages(order)
                .checked_mul(count)
                .and_then(|pages| total.checked_add(pages))
        })
    }

    /// Pages held in blocks of each order or higher
    ///
    /// Entry `o` is `Σ_{k >= o} 2^k * count[k]`, built in one pass from the
    /// top order down. Entry 0 always equals [`total_free_pages`].
    ///
    /// [`total_free_pages`]: FreePageHistogram::total_free_pages
    pub fn pages_at_or_above(&self) -> [u64; ORDER_COUNT] {
        let mut suffix = [0u64; ORDER_COUNT];
        let mut running = 0u64;

        for order in (0..ORDER_COUNT).rev() {
            let pages = order_to_pages(order).saturating_mul(self.0[order]);
            running = running.saturating_add(pages);
            suffix[order] = running;
        }

        suffix
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&count| count == 0)
    }
}

impl From<[u64; ORDER_COUNT]> for FreePageHistogram {
    fn from(counts: [u64; ORDER_COUNT]) -> Self {
        FreePageHistogram(counts)
    }
}

impl TryFrom<&[u64]> for FreePageHistogram {
    type Error = usize;

    /// Fails with the slice length when it is not exactly [`ORDER_COUNT`]
    fn try_from(counts: &[u64]) -> std::result::Result<Self, Self::Error> {
        <[u64; ORDER_COUNT]>::try_from(counts)
            .map(FreePageHistogram)
            .map_err(|_| counts.len())
    }
}
