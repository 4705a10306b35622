use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use thread_local::ThreadLocal;

use common::{BucketId, FanOut, NumericRecord};

use crate::Partitioner;

/// Uniform random bucketing with one generator per worker thread.
///
/// Every call draws independently from `[0, K)`; there is no attempt to
/// balance buckets. Generators are never shared, so the hot path takes no
/// lock.
pub struct RandomPartitioner {
    fan_out: FanOut,
    rngs: ThreadLocal<RefCell<SmallRng>>,
    seed: Option<u64>,
    streams: AtomicU64,
}

impl RandomPartitioner {
    // Spreads consecutive stream numbers over the seed space.
    const STREAM_STEP: u64 = 0x9E37_79B9_7F4A_7C15;

    pub fn new(fan_out: FanOut) -> Self {
        Self {
            fan_out,
            rngs: ThreadLocal::new(),
            seed: None,
            streams: AtomicU64::new(0),
        }
    }

    /// Seeds worker generators from `seed` plus a per-worker stream number.
    /// Which worker gets which stream still depends on scheduling.
    pub fn with_seed(fan_out: FanOut, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::new(fan_out)
        }
    }

    fn new_rng(&self) -> SmallRng {
        match self.seed {
            Some(seed) => {
                let stream = self.streams.fetch_add(1, Ordering::Relaxed);
                SmallRng::seed_from_u64(seed.wrapping_add(stream.wrapping_mul(Self::STREAM_STEP)))
            }
            None => SmallRng::seed_from_u64(rand::random()),
        }
    }
}

impl Partitioner for RandomPartitioner {
    fn fan_out(&self) -> FanOut {
        self.fan_out
    }

    fn assign(&self, _record: &NumericRecord) -> BucketId {
        let mut rng = self.rngs.get_or(|| RefCell::new(self.new_rng())).borrow_mut();
        BucketId::new(rng.random_range(0..self.fan_out.get()))
    }

    fn assign_vec(&self, records: &[NumericRecord], output: &mut [BucketId]) {
        let mut rng = self.rngs.get_or(|| RefCell::new(self.new_rng())).borrow_mut();
        let k = self.fan_out.get();
        for out in output.iter_mut().take(records.len()) {
            *out = BucketId::new(rng.random_range(0..k));
        }
    }
}
