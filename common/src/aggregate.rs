use bytemuck::{Pod, Zeroable};

use crate::NumericRecord;

/// Running `(sum, count)` of one bucket while values are still arriving.
///
/// All-zero bytes are an empty accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct BucketAccumulator {
    sum: f64,
    count: u64,
}

impl BucketAccumulator {
    #[inline]
    pub fn push(&mut self, record: NumericRecord) {
        self.sum += record.value();
        self.count += 1;
    }

    #[inline]
    pub fn absorb(&mut self, other: &BucketAccumulator) {
        self.sum += other.sum;
        self.count += other.count;
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Seals the accumulator. Buckets that never saw a value emit nothing.
    pub fn finish(self) -> Option<PartialAggregate> {
        PartialAggregate::new(self.sum, self.count)
    }
}

/// Sum and count emitted by a non-empty bucket. `count` is always at least 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartialAggregate {
    sum: f64,
    count: u64,
}

impl PartialAggregate {
    pub fn new(sum: f64, count: u64) -> Option<Self> {
        (count > 0).then_some(Self { sum, count })
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalResult {
    average: f64,
}

impl FinalResult {
    pub fn new(average: f64) -> Self {
        Self { average }
    }

    pub fn average(&self) -> f64 {
        self.average
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_accumulator_emits_nothing() {
        let acc = BucketAccumulator::default();
        assert!(acc.is_empty());
        assert_eq!(acc.finish(), None);
    }

    #[test]
    fn accumulator_tracks_sum_and_count() {
        let mut acc = BucketAccumulator::default();
        for v in [1.5, 2.5, -1.0] {
            acc.push(NumericRecord::new(v));
        }
        let mut other = BucketAccumulator::default();
        other.push(NumericRecord::new(7.0));
        acc.absorb(&other);

        let partial = acc.finish().unwrap();
        assert_eq!(partial.sum(), 10.0);
        assert_eq!(partial.count(), 4);
    }

    #[test]
    fn zeroed_accumulators_are_empty() {
        let accs: Vec<BucketAccumulator> = bytemuck::zeroed_vec(4);
        assert!(accs.iter().all(|a| a.is_empty()));
    }

    #[test]
    fn partial_requires_positive_count() {
        assert!(PartialAggregate::new(0.0, 0).is_none());
        assert_eq!(PartialAggregate::new(3.0, 2).map(|p| p.count()), Some(2));
    }
}
