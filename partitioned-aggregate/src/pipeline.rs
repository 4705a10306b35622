use std::convert::Infallible;
use std::error::Error;
use std::num::NonZeroUsize;
use std::panic;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use itertools::Itertools;
use tracing::{debug, info, warn};

use common::{AbortHandle, FanOut, FinalResult, MalformedRecordPolicy, NumericRecord};
use partial_aggregate::merge;
use partition::{Partitioner, RandomPartitioner, parse};

use crate::base_finalizer::lock;
use crate::{BucketedAggregator, CombiningAggregator, PipelineError, ShuffledAggregator};

pub const CHUNK_SIZE: usize = 1 << 16;

/// How bucket contents travel from the map stage to the reduce stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strategy {
    /// Ship raw records to their bucket, reduce each bucket afterwards.
    #[default]
    Shuffled,
    /// Combine per worker and bucket while mapping.
    Combining,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub fan_out: FanOut,
    pub threads: usize,
    /// Lines a map worker pulls from the source per task.
    pub chunk_size: usize,
    pub on_malformed: MalformedRecordPolicy,
    pub strategy: Strategy,
    /// Fixes the partitioner's seeds. Bucket assignment never changes the
    /// result, only how work is spread.
    pub seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fan_out: FanOut::default(),
            threads: thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1),
            chunk_size: CHUNK_SIZE,
            on_malformed: MalformedRecordPolicy::default(),
            strategy: Strategy::default(),
            seed: None,
        }
    }
}

impl PipelineConfig {
    pub fn with_fan_out(mut self, fan_out: FanOut) -> Self {
        self.fan_out = fan_out;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_malformed_policy(mut self, policy: MalformedRecordPolicy) -> Self {
        self.on_malformed = policy;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
}

struct ChunkedSource<It> {
    lines: It,
    next_line: u64,
}

impl<It, S, E> ChunkedSource<It>
where
    It: Iterator<Item = Result<S, E>>,
    E: Into<Box<dyn Error + Send + Sync>>,
{
    fn new(lines: It) -> Self {
        Self { lines, next_line: 1 }
    }

    /// Next run of consecutive lines and the 1-based number of the first one.
    fn next_chunk(&mut self, size: usize) -> Result<Option<(u64, Vec<S>)>, PipelineError> {
        let first = self.next_line;
        let mut chunk = Vec::with_capacity(size);
        for line in self.lines.by_ref().take(size) {
            match line {
                Ok(line) => chunk.push(line),
                Err(err) => {
                    let line = first + chunk.len() as u64;
                    return Err(PipelineError::Source { line, source: err.into() });
                }
            }
        }
        self.next_line += chunk.len() as u64;
        Ok((!chunk.is_empty()).then_some((first, chunk)))
    }
}

/// Of the errors the map workers ran into, the one earliest in the input.
pub(crate) fn first_failure(errors: Vec<PipelineError>) -> Option<PipelineError> {
    errors.into_iter().min_by_key(|e| match e {
        PipelineError::Parse { line, .. } | PipelineError::Source { line, .. } => *line,
        _ => u64::MAX,
    })
}

#[derive(Default)]
struct MapStats {
    parsed: AtomicU64,
    skipped: AtomicU64,
}

/// Parses, buckets, reduces and merges a line-oriented dataset on a fixed
/// pool of scoped worker threads.
pub struct Pipeline {
    config: PipelineConfig,
    abort: AbortHandle,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config, abort: AbortHandle::new() }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Aborting this handle cancels the current run and every later one.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn run_lines<I, S>(&self, lines: I) -> Result<FinalResult, PipelineError>
    where
        I: IntoIterator<Item = S>,
        I::IntoIter: Send,
        S: AsRef<str> + Send,
    {
        self.run(lines.into_iter().map(Ok::<S, Infallible>))
    }

    pub fn run<I, S, E>(&self, source: I) -> Result<FinalResult, PipelineError>
    where
        I: IntoIterator<Item = Result<S, E>>,
        I::IntoIter: Send,
        S: AsRef<str> + Send,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        let PipelineConfig { fan_out, threads, seed, strategy, .. } = self.config;
        let partitioner = match seed {
            Some(seed) => RandomPartitioner::with_seed(fan_out, seed),
            None => RandomPartitioner::new(fan_out),
        };

        match strategy {
            Strategy::Shuffled => {
                self.run_with::<_, RandomPartitioner, _, _, _>(ShuffledAggregator::with_partitioner_and_threads(partitioner, threads), source)
            }
            Strategy::Combining => {
                self.run_with::<_, RandomPartitioner, _, _, _>(CombiningAggregator::with_partitioner_and_threads(partitioner, threads), source)
            }
        }
    }

    /// Runs with a caller-built aggregator. Its partitioner decides the fan-out.
    pub fn run_with<A, P, I, S, E>(&self, aggregator: A, source: I) -> Result<FinalResult, PipelineError>
    where
        A: BucketedAggregator<P>,
        P: Partitioner,
        I: IntoIterator<Item = Result<S, E>>,
        I::IntoIter: Send,
        S: AsRef<str> + Send,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        let threads = self.config.threads.max(1);
        let chunk_size = self.config.chunk_size.max(1);
        let abort = self.abort.child();
        let source = Mutex::new(ChunkedSource::new(source.into_iter()));
        let stats = MapStats::default();

        info!(
            threads,
            chunk_size,
            policy = ?self.config.on_malformed,
            "Starting map stage"
        );

        let errors = thread::scope(|s| {
            (0..threads)
                .map(|_| s.spawn(|| self.map_worker::<A, P, _, _, _>(&aggregator, &source, chunk_size, &abort, &stats)))
                .collect_vec() // Force iterator evaluation.
                .into_iter()
                .filter_map(|jh| jh.join().unwrap_or_else(|p| panic::resume_unwind(p)).err())
                .collect_vec()
        });

        if self.abort.is_aborted() {
            return Err(PipelineError::Cancelled);
        }
        if let Some(err) = first_failure(errors) {
            return Err(err);
        }

        let finalizer = aggregator.into_finalizer();
        let buckets = finalizer.pending_buckets();
        debug!(buckets, "Starting reduce stage");

        thread::scope(|s| {
            (0..threads.min(buckets))
                .map(|_| s.spawn(|| finalizer.finalize_thread(&abort)))
                .collect_vec()
                .into_iter()
                .for_each(|jh| jh.join().unwrap_or_else(|p| panic::resume_unwind(p)));
        });

        if abort.is_aborted() {
            return Err(PipelineError::Cancelled);
        }

        let partials = finalizer.into_partials();
        let result = merge(&partials)?;

        info!(
            records = stats.parsed.load(Ordering::Relaxed),
            skipped = stats.skipped.load(Ordering::Relaxed),
            buckets = partials.len(),
            average = result.average(),
            "Pipeline finished"
        );
        Ok(result)
    }

    fn map_worker<A, P, It, S, E>(
        &self,
        aggregator: &A,
        source: &Mutex<ChunkedSource<It>>,
        chunk_size: usize,
        abort: &AbortHandle,
        stats: &MapStats,
    ) -> Result<(), PipelineError>
    where
        A: BucketedAggregator<P>,
        P: Partitioner,
        It: Iterator<Item = Result<S, E>>,
        S: AsRef<str>,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        let mut records: Vec<NumericRecord> = Vec::with_capacity(chunk_size);

        loop {
            if abort.is_aborted() {
                return Ok(());
            }

            let next = lock(source).next_chunk(chunk_size);
            let (first_line, lines) = match next {
                Ok(Some(chunk)) => chunk,
                Ok(None) => return Ok(()),
                Err(err) => {
                    abort.abort();
                    return Err(err);
                }
            };

            records.clear();
            for (offset, line) in lines.iter().enumerate() {
                let line_no = first_line + offset as u64;
                match parse(line.as_ref()) {
                    Ok(record) => records.push(record),
                    Err(err) => match self.config.on_malformed {
                        MalformedRecordPolicy::Abort => {
                            abort.abort();
                            return Err(PipelineError::Parse { line: line_no, source: err });
                        }
                        MalformedRecordPolicy::Skip => {
                            warn!(line = line_no, raw = err.raw(), "Skipping malformed record");
                            stats.skipped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                }
            }

            stats.parsed.fetch_add(records.len() as u64, Ordering::Relaxed);
            aggregator.aggregate_vec(&records);
        }
    }
}
