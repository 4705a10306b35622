use common::{AbortHandle, NumericRecord, PartialAggregate};
use partition::Partitioner;

/// Map stage of a bucketed average: routes parsed records into buckets.
pub trait BucketedAggregator<P: Partitioner>: Sync + Send {
    fn with_partitioner_and_threads(partitioner: P, threads: usize) -> Self;

    fn aggregate_vec(&self, records: &[NumericRecord]);

    /// Ends the map stage. Buckets that received nothing are dropped here.
    fn into_finalizer(self) -> Box<dyn BucketFinalizer>;
}

/// Reduce stage: any number of threads call `finalize_thread` concurrently,
/// each taking whole buckets until none are left.
pub trait BucketFinalizer: Sync + Send {
    fn pending_buckets(&self) -> usize;

    /// Returns early, leaving buckets unreduced, once `abort` fires.
    fn finalize_thread(&self, abort: &AbortHandle);

    fn into_partials(self: Box<Self>) -> Vec<PartialAggregate>;
}
