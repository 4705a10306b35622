mod parser;
mod partitioner;
mod random_partitioner;

pub use parser::parse;
pub use partitioner::Partitioner;
pub use random_partitioner::RandomPartitioner;

#[cfg(test)]
mod tests {
    use std::thread;

    use itertools::Itertools;
    use fastrand::Rng;
    use common::{BucketId, FanOut, NumericRecord};
    use super::*;

    fn records(n: usize, seed: u64) -> Vec<NumericRecord> {
        let mut rng = Rng::with_seed(seed);
        (0..n).map(|_| NumericRecord::new(rng.f64() * 100.0)).collect_vec()
    }

    fn range_test<P: Partitioner>(p: P) {
        let k = p.fan_out().get();
        let recs = records(10_000, 1);
        let mut out = vec![BucketId::default(); recs.len()];
        p.assign_vec(&recs, &mut out);
        assert!(out.iter().all(|b| b.index() < k));
        assert!(recs.iter().all(|r| p.assign(r).index() < k));
    }

    fn thread_test<P: Partitioner>(p: P) {
        const THREADS: usize = 4;
        const PER_THREAD: usize = 50_000;

        let k = p.fan_out().get();
        let counts = thread::scope(|s| {
            let p_ref = &p;
            (0..THREADS)
                .map(|t_id| s.spawn(move || {
                    let recs = records(PER_THREAD, t_id as u64);
                    let mut out = vec![BucketId::default(); recs.len()];
                    p_ref.assign_vec(&recs, &mut out);
                    out.iter().counts_by(|b| b.index())
                }))
                .collect_vec()
                .into_iter()
                .map(|jh| jh.join().unwrap())
                .collect_vec()
        });

        let mut totals = vec![0usize; k];
        for thread_counts in counts {
            for (bucket, count) in thread_counts {
                assert!(bucket < k);
                totals[bucket] += count;
            }
        }
        assert_eq!(totals.iter().sum::<usize>(), THREADS * PER_THREAD);
        // Uniform: each bucket gets 20k expected, far from either extreme.
        let expected = (THREADS * PER_THREAD / k) as f64;
        assert!(totals.iter().all(|&c| (c as f64 - expected).abs() < expected * 0.1), "{:?}", totals);
    }

    #[test]
    fn range_test_random() {
        range_test(RandomPartitioner::new(FanOut::default()));
    }

    #[test]
    fn range_test_seeded() {
        range_test(RandomPartitioner::with_seed(FanOut::new(3).unwrap(), 7));
    }

    #[test]
    fn thread_test_random() {
        thread_test(RandomPartitioner::new(FanOut::default()));
    }

    #[test]
    fn thread_test_seeded() {
        thread_test(RandomPartitioner::with_seed(FanOut::default(), 42));
    }

    #[test]
    fn single_bucket_gets_everything() {
        let p = RandomPartitioner::new(FanOut::new(1).unwrap());
        let recs = records(1_000, 3);
        assert!(recs.iter().all(|r| p.assign(r) == BucketId::new(0)));
    }

    #[test]
    fn seeded_single_worker_is_reproducible() {
        let recs = records(1_000, 5);
        let run = || {
            let p = RandomPartitioner::with_seed(FanOut::default(), 99);
            let mut out = vec![BucketId::default(); recs.len()];
            p.assign_vec(&recs, &mut out);
            out
        };
        assert_eq!(run(), run());
    }
}
