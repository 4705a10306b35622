use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use common::{AbortHandle, BucketId, PartialAggregate};

use crate::BucketFinalizer;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Queue of non-empty buckets shared by the reduce workers.
///
/// A bucket is owned by exactly one worker once popped. Each worker keeps its
/// partials locally and hands them over once when the queue runs dry.
pub(crate) struct BaseFinalizer<T> {
    pending: Mutex<Vec<(BucketId, Vec<T>)>>,
    partials: Mutex<Vec<PartialAggregate>>,
    reduce: fn(&[T]) -> Option<PartialAggregate>,
}

impl<T> BaseFinalizer<T> {
    pub(crate) fn new(pending: Vec<(BucketId, Vec<T>)>, reduce: fn(&[T]) -> Option<PartialAggregate>) -> Self {
        Self {
            partials: Mutex::new(Vec::with_capacity(pending.len())),
            pending: Mutex::new(pending),
            reduce,
        }
    }
}

impl<T: Send> BucketFinalizer for BaseFinalizer<T> {
    fn pending_buckets(&self) -> usize {
        lock(&self.pending).len()
    }

    fn finalize_thread(&self, abort: &AbortHandle) {
        let mut local = Vec::new();

        loop {
            if abort.is_aborted() {
                debug!(reduced = local.len(), "Reduce worker aborted, dropping its partials");
                return;
            }
            let Some((bucket, items)) = lock(&self.pending).pop() else {
                break;
            };
            if let Some(partial) = (self.reduce)(&items) {
                debug!(bucket = bucket.index(), sum = partial.sum(), count = partial.count(), "Reduced bucket");
                local.push(partial);
            }
        }

        lock(&self.partials).extend(local);
    }

    fn into_partials(self: Box<Self>) -> Vec<PartialAggregate> {
        self.partials.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}
