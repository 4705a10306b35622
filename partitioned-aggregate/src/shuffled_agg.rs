use std::cell::RefCell;

use hashbrown::HashMap;
use thread_local::ThreadLocal;

use common::{BucketId, NumericRecord, PartialAggregate};
use partial_aggregate::reduce;
use partition::Partitioner;

use crate::base_finalizer::BaseFinalizer;
use crate::{BucketFinalizer, BucketedAggregator};

/// Routes every record to a per-worker partition of its bucket. At the end of
/// the map stage the partitions are regrouped by bucket, so each reduction
/// unit sees exactly the values assigned to its bucket.
///
/// Partitions exist only for buckets that received a record, so the fan-out
/// can be arbitrarily large.
pub struct ShuffledAggregator<P> {
    partitioner: P,
    partitions: ThreadLocal<RefCell<HashMap<usize, Vec<NumericRecord>>>>,
    assignments: ThreadLocal<RefCell<Vec<BucketId>>>,
}

fn reduce_chunks(chunks: &[Vec<NumericRecord>]) -> Option<PartialAggregate> {
    reduce(chunks.iter().flatten())
}

impl<P: Partitioner> BucketedAggregator<P> for ShuffledAggregator<P> {
    fn with_partitioner_and_threads(partitioner: P, threads: usize) -> Self {
        Self {
            partitioner,
            partitions: ThreadLocal::with_capacity(threads),
            assignments: ThreadLocal::with_capacity(threads),
        }
    }

    fn aggregate_vec(&self, records: &[NumericRecord]) {
        let mut partitions = self.partitions.get_or(Default::default).borrow_mut();
        let mut assignments = self.assignments.get_or(Default::default).borrow_mut();

        assignments.clear();
        assignments.resize(records.len(), BucketId::default());
        self.partitioner.assign_vec(records, &mut assignments);

        for (bucket, record) in assignments.iter().zip(records.iter()) {
            partitions.entry(bucket.index()).or_default().push(*record);
        }
    }

    fn into_finalizer(self) -> Box<dyn BucketFinalizer> {
        let mut reshuffled: HashMap<usize, Vec<Vec<NumericRecord>>> = HashMap::new();

        self.partitions.into_iter().for_each(|thread_partitions| {
            thread_partitions
                .into_inner()
                .into_iter()
                .filter(|(_, partition)| !partition.is_empty())
                .for_each(|(idx, partition)| reshuffled.entry(idx).or_default().push(partition));
        });

        let pending = reshuffled
            .into_iter()
            .map(|(idx, chunks)| (BucketId::new(idx), chunks))
            .collect();

        Box::new(BaseFinalizer::new(pending, reduce_chunks))
    }
}
