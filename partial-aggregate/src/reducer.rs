use common::{BucketAccumulator, NumericRecord, PartialAggregate};

/// Reduces every value routed to one bucket to its sum and count.
///
/// Values are added in iteration order with plain `f64` addition, so very
/// large buckets carry the usual accumulated rounding error. Returns `None`
/// when the bucket received nothing.
pub fn reduce<'a, I>(values: I) -> Option<PartialAggregate>
where
    I: IntoIterator<Item = &'a NumericRecord>,
{
    values
        .into_iter()
        .fold(BucketAccumulator::default(), |mut acc, v| {
            acc.push(*v);
            acc
        })
        .finish()
}

/// Same as [`reduce`] for a bucket whose values were already combined per worker.
pub fn reduce_accumulators<'a, I>(accs: I) -> Option<PartialAggregate>
where
    I: IntoIterator<Item = &'a BucketAccumulator>,
{
    accs.into_iter()
        .fold(BucketAccumulator::default(), |mut acc, other| {
            acc.absorb(other);
            acc
        })
        .finish()
}
