use std::cell::RefCell;

use thread_local::ThreadLocal;

use common::{BucketAccumulator, BucketId, NumericRecord, PartialAggregate};
use partial_aggregate::{BucketCombiner, reduce_accumulators};
use partition::Partitioner;

use crate::base_finalizer::BaseFinalizer;
use crate::{BucketFinalizer, BucketedAggregator};

/// Sums each worker's share of a bucket while mapping, so the reduce stage
/// only folds one accumulator per worker instead of every record.
pub struct CombiningAggregator<P> {
    partitioner: P,
    combiner: BucketCombiner,
    assignments: ThreadLocal<RefCell<Vec<BucketId>>>,
}

fn reduce_combined(accs: &[BucketAccumulator]) -> Option<PartialAggregate> {
    reduce_accumulators(accs)
}

impl<P: Partitioner> BucketedAggregator<P> for CombiningAggregator<P> {
    fn with_partitioner_and_threads(partitioner: P, threads: usize) -> Self {
        Self {
            combiner: BucketCombiner::with_fan_out_and_threads(partitioner.fan_out(), threads),
            partitioner,
            assignments: ThreadLocal::with_capacity(threads),
        }
    }

    fn aggregate_vec(&self, records: &[NumericRecord]) {
        let mut assignments = self.assignments.get_or(Default::default).borrow_mut();
        assignments.clear();
        assignments.resize(records.len(), BucketId::default());
        self.partitioner.assign_vec(records, &mut assignments);
        self.combiner.update_vec(&assignments, records);
    }

    fn into_finalizer(self) -> Box<dyn BucketFinalizer> {
        let pending = self.combiner.into_buckets();
        Box::new(BaseFinalizer::new(pending, reduce_combined))
    }
}
