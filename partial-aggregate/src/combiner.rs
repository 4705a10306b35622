use std::cell::RefCell;

use hashbrown::HashMap;
use thread_local::ThreadLocal;

use common::{BucketAccumulator, BucketId, FanOut, NumericRecord};

/// Map-side combine: every worker keeps its own `(sum, count)` per bucket.
///
/// Workers never touch each other's accumulators, and a worker only holds an
/// entry for buckets it actually routed a record to, so memory follows the
/// input rather than the fan-out. [`BucketCombiner::into_buckets`] regroups
/// the per-worker entries by bucket for reduction.
pub struct BucketCombiner {
    aggs: ThreadLocal<RefCell<HashMap<usize, BucketAccumulator>>>,
    fan_out: FanOut,
}

impl BucketCombiner {
    pub fn with_fan_out_and_threads(fan_out: FanOut, threads: usize) -> Self {
        Self {
            aggs: ThreadLocal::with_capacity(threads),
            fan_out,
        }
    }

    pub fn fan_out(&self) -> FanOut {
        self.fan_out
    }

    pub fn update_vec(&self, buckets: &[BucketId], values: &[NumericRecord]) {
        let mut aggs = self.aggs.get_or(Default::default).borrow_mut();
        for (bucket, value) in buckets.iter().zip(values.iter()) {
            debug_assert!(bucket.index() < self.fan_out.get());
            aggs.entry(bucket.index()).or_default().push(*value);
        }
    }

    /// Buckets that received at least one record, each with the accumulators
    /// of the workers that touched it. Buckets come out in no particular order.
    pub fn into_buckets(self) -> Vec<(BucketId, Vec<BucketAccumulator>)> {
        let mut buckets: HashMap<usize, Vec<BucketAccumulator>> = HashMap::new();

        self.aggs
            .into_iter()
            .map(|cell| cell.into_inner())
            .for_each(|thread_aggs| {
                thread_aggs
                    .into_iter()
                    .filter(|(_, acc)| !acc.is_empty())
                    .for_each(|(idx, acc)| buckets.entry(idx).or_default().push(acc));
            });

        buckets
            .into_iter()
            .map(|(idx, accs)| (BucketId::new(idx), accs))
            .collect()
    }
}
