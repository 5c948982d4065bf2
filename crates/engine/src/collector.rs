use std::collections::BTreeMap;

use crate::model::{Discrepancy, DiscrepancyType};

/// Retained discrepancies per type.
pub const RETAIN_CAP: usize = 1000;

#[derive(Debug, Default)]
struct Bucket {
    retained: Vec<Discrepancy>,
    count: u64,
    cost_total: f64,
}

/// Accepts every discrepancy but retains at most `RETAIN_CAP` per type,
/// keeping the largest absolute cost differences. Counts and cost sums
/// cover everything offered, retained or not.
#[derive(Debug, Default)]
pub struct BoundedCollector {
    buckets: BTreeMap<DiscrepancyType, Bucket>,
}

impl BoundedCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, d: Discrepancy) {
        let bucket = self.buckets.entry(d.kind).or_default();
        bucket.count += 1;
        bucket.cost_total += d.cost_difference;

        if bucket.retained.len() < RETAIN_CAP {
            bucket.retained.push(d);
            return;
        }

        let weakest = bucket
            .retained
            .iter()
            .enumerate()
            .min_by(|(_, x), (_, y)| {
                x.cost_difference.abs().total_cmp(&y.cost_difference.abs())
            })
            .map(|(i, r)| (i, r.cost_difference.abs()));
        if let Some((i, magnitude)) = weakest {
            // Strictly greater: at saturation, equal-magnitude newcomers drop.
            if d.cost_difference.abs() > magnitude {
                bucket.retained[i] = d;
            }
        }
    }

    pub fn count(&self, kind: DiscrepancyType) -> u64 {
        self.buckets.get(&kind).map_or(0, |b| b.count)
    }

    pub fn cost_total(&self, kind: DiscrepancyType) -> f64 {
        self.buckets.get(&kind).map_or(0.0, |b| b.cost_total)
    }

    pub fn total_count(&self) -> u64 {
        self.buckets.values().map(|b| b.count).sum()
    }

    /// Readout in report order: type order first, absolute cost difference
    /// descending within each type.
    pub fn into_sorted(self) -> Vec<Discrepancy> {
        let mut out = Vec::new();
        for (_, mut bucket) in self.buckets {
            bucket
                .retained
                .sort_by(|x, y| y.cost_difference.abs().total_cmp(&x.cost_difference.abs()));
            out.extend(bucket.retained);
        }
        out
    }
}
