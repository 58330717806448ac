//! Merge sample records into distinct stacks.
//!
//! Records are keyed by their exact program counter sequence; two records
//! with the same sequence are one stack and their counts add up.

use crate::parser::schema::StackRecord;
use log::debug;
use std::collections::HashMap;

/// Running aggregate owned by a single decode pass
#[derive(Debug, Default)]
pub struct StackAggregator {
    counts: HashMap<Vec<u64>, u64>,
    total: u64,
}

impl StackAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` samples of the stack `pcs`
    ///
    /// Counts are modular `u64` sums; a stream whose counts overflow wraps
    /// instead of aborting the decode.
    pub fn add(&mut self, pcs: Vec<u64>, count: u64) {
        let entry = self.counts.entry(pcs).or_insert(0);
        *entry = entry.wrapping_add(count);
        self.total = self.total.wrapping_add(count);
    }

    /// Number of samples added so far
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of distinct stacks seen so far
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Materialize the aggregate, sorted by count (descending)
    ///
    /// Ties are ordered by program counters so the output is deterministic.
    pub fn finish(self) -> (Vec<StackRecord>, u64) {
        let mut stacks: Vec<StackRecord> = self
            .counts
            .into_iter()
            .map(|(pcs, count)| StackRecord::new(pcs, count))
            .collect();

        stacks.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.pcs.cmp(&b.pcs)));

        debug!("Built {} distinct stacks", stacks.len());

        (stacks, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merges_equal_stacks() {
        let mut agg = StackAggregator::new();
        agg.add(vec![0x1000, 0x2000], 5);
        agg.add(vec![0x1000, 0x2000], 3);
        agg.add(vec![0x2000], 2);

        let (stacks, total) = agg.finish();
        assert_eq!(total, 10);
        assert_eq!(stacks.len(), 2);
        assert_eq!(stacks[0], StackRecord::new(vec![0x1000, 0x2000], 8));
        assert_eq!(stacks[1], StackRecord::new(vec![0x2000], 2));
    }

    #[test]
    fn test_prefix_is_a_different_stack() {
        let mut agg = StackAggregator::new();
        agg.add(vec![0x1000], 1);
        agg.add(vec![0x1000, 0x2000], 1);
        assert_eq!(agg.len(), 2);
    }

    #[test]
    fn test_arrival_order_does_not_matter() {
        let records = [(vec![1u64], 4u64), (vec![2], 7), (vec![1], 6), (vec![3], 1)];

        let mut forward = StackAggregator::new();
        for (pcs, n) in records.iter() {
            forward.add(pcs.clone(), *n);
        }
        let mut backward = StackAggregator::new();
        for (pcs, n) in records.iter().rev() {
            backward.add(pcs.clone(), *n);
        }

        assert_eq!(forward.finish(), backward.finish());
    }

    #[test]
    fn test_sorted_descending() {
        let mut agg = StackAggregator::new();
        for (i, n) in [3u64, 9, 1, 9, 4].iter().enumerate() {
            agg.add(vec![i as u64], *n);
        }
        let (stacks, _) = agg.finish();
        assert!(stacks.windows(2).all(|w| w[0].count >= w[1].count));
        assert_eq!(stacks[0].pcs, vec![1]);
        assert_eq!(stacks[1].pcs, vec![3]);
    }

    #[test]
    fn test_overflowing_counts_wrap() {
        let mut agg = StackAggregator::new();
        agg.add(vec![0x1000], u64::MAX);
        agg.add(vec![0x1000], 2);
        agg.add(vec![0x2000], 1);

        assert_eq!(agg.total(), 2);
        let (stacks, _) = agg.finish();
        assert_eq!(stacks[0], StackRecord::new(vec![0x1000], 1));
        assert_eq!(stacks[1], StackRecord::new(vec![0x2000], 1));
    }

    #[test]
    fn test_empty() {
        let agg = StackAggregator::new();
        assert!(agg.is_empty());
        let (stacks, total) = agg.finish();
        assert!(stacks.is_empty());
        assert_eq!(total, 0);
    }
}
