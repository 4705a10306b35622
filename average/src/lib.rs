use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use peak_alloc::PeakAlloc;
use rand::prelude::*;
use rand_distr::{Distribution, Normal, Uniform};
use rayon::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::FinalResult;
use partitioned_aggregate::{Pipeline, CHUNK_SIZE};

/// Name of the file the result lands in inside the output directory.
pub const RESULT_FILE: &str = "part-00000";

const TIMEOUT: f64 = 600f64;

#[global_allocator]
static PEAK_ALLOC: PeakAlloc = PeakAlloc;

pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // RUST_LOG, when set, overrides the verbosity flag.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(verbose >= 2)
        .with_thread_ids(verbose >= 3)
        .init();
}

pub fn open_source(input: &Path) -> Result<io::Lines<BufReader<File>>> {
    let file = File::open(input).with_context(|| format!("Failed to open input {}", input.display()))?;
    Ok(BufReader::new(file).lines())
}

/// Averages a text file holding one number per line.
pub fn average_file(pipeline: &Pipeline, input: &Path) -> Result<FinalResult> {
    let lines = open_source(input)?;
    let result = pipeline
        .run(lines)
        .with_context(|| format!("Failed to average {}", input.display()))?;
    Ok(result)
}

pub fn format_result(result: &FinalResult) -> String {
    format!("Average\t{:?}\n", result.average())
}

/// Writes the result into `<output>/part-00000`, or to stdout without an output directory.
pub fn write_result(output: Option<&Path>, result: &FinalResult) -> Result<()> {
    let line = format_result(result);
    match output {
        Some(dir) => {
            fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory {}", dir.display()))?;
            let path = dir.join(RESULT_FILE);
            fs::write(&path, line).with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Result written");
        }
        None => {
            io::stdout().lock().write_all(line.as_bytes()).context("Failed to write result to stdout")?;
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueDistribution {
    Uniform,
    Normal,
}

pub struct Dataset {
    pub lines: Vec<String>,
    pub mean: f64,
}

fn fill_values<D: Distribution<f64> + Sync>(values: &mut [f64], distr: &D, seed: u64) {
    values
        .par_chunks_mut(CHUNK_SIZE)
        .enumerate()
        .for_each(|(chunk_num, values)| {
            let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(chunk_num as u64));
            values.iter_mut().for_each(|v| *v = distr.sample(&mut rng));
        });
}

/// Reproducible synthetic input: `elements` numeric lines and their exact mean.
pub fn generate_dataset(elements: usize, distribution: ValueDistribution, seed: u64) -> Result<Dataset> {
    let mut values = vec![0f64; elements];

    match distribution {
        ValueDistribution::Uniform => {
            let distr = Uniform::new(-10_000f64, 10_000f64).map_err(|e| anyhow!("Invalid uniform range: {:?}", e))?;
            fill_values(&mut values, &distr, seed);
        }
        ValueDistribution::Normal => {
            let distr = Normal::new(0f64, 1_000f64).map_err(|e| anyhow!("Invalid normal parameters: {:?}", e))?;
            fill_values(&mut values, &distr, seed);
        }
    }

    let mean = values.iter().sum::<f64>() / elements.max(1) as f64;
    let lines = values.par_iter().map(|v| v.to_string()).collect();
    Ok(Dataset { lines, mean })
}

/// Runs `workload` a few times to warm up, then `iterations` timed times.
/// Returns per-iteration seconds, peak memory in GB above the starting point,
/// and the outputs.
pub fn benchmark_harness<I, O, W>(input: &mut I, workload: W, iterations: usize) -> (Vec<f64>, Vec<f64>, Vec<O>)
where
    W: Fn(&mut I) -> O,
{
    let mut times = Vec::with_capacity(iterations);
    let mut mems = Vec::with_capacity(iterations);
    let mut outputs = Vec::with_capacity(iterations);

    // Warmup.
    let timeout = Instant::now();
    for _ in 0..iterations.div_ceil(4) {
        workload(input);
        thread::sleep(Duration::from_millis(100));

        if timeout.elapsed().as_secs_f64() > TIMEOUT / 4f64 {
            break;
        }
    }

    // Workload.
    let timeout = Instant::now();
    for _ in 0..iterations {
        let init_mem = PEAK_ALLOC.current_usage_as_gb() as f64;
        let time = Instant::now();
        let o = workload(input);
        times.push(time.elapsed().as_secs_f64());
        outputs.push(o);
        mems.push(PEAK_ALLOC.peak_usage_as_gb() as f64 - init_mem);
        PEAK_ALLOC.reset_peak_usage();

        if timeout.elapsed().as_secs_f64() > TIMEOUT {
            warn!(completed = times.len(), "Benchmark timed out");
            break;
        }
    }

    (times, mems, outputs)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use common::FanOut;
    use partitioned_aggregate::{PipelineConfig, PipelineError, Strategy};

    use super::*;

    fn pipeline(k: usize) -> Pipeline {
        Pipeline::new(PipelineConfig::default().with_fan_out(FanOut::new(k).unwrap()).with_threads(2))
    }

    #[test]
    fn average_file_end_to_end() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "10\n20\n30\n40").unwrap();

        let result = average_file(&pipeline(2), file.path()).unwrap();
        assert_eq!(result.average(), 25.0);
    }

    #[test]
    fn average_file_reports_malformed_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1.5\nabc\n2.5").unwrap();

        let err = average_file(&pipeline(10), file.path()).unwrap_err();
        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::Parse { line, source }) => {
                assert_eq!(*line, 2);
                assert_eq!(source.raw(), "abc");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = average_file(&pipeline(10), &dir.path().join("missing.txt")).unwrap_err();
        assert!(err.to_string().contains("Failed to open input"));
    }

    #[test]
    fn result_lands_in_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        write_result(Some(&out), &FinalResult::new(25.0)).unwrap();

        let written = fs::read_to_string(out.join(RESULT_FILE)).unwrap();
        assert_eq!(written, "Average\t25.0\n");
    }

    #[test]
    fn generated_dataset_is_reproducible() {
        let a = generate_dataset(10_000, ValueDistribution::Normal, 42).unwrap();
        let b = generate_dataset(10_000, ValueDistribution::Normal, 42).unwrap();
        assert_eq!(a.lines, b.lines);
        assert_eq!(a.mean, b.mean);
    }

    #[test]
    fn generated_dataset_round_trips_through_pipeline() {
        let data = generate_dataset(20_000, ValueDistribution::Uniform, 1).unwrap();
        for strategy in [Strategy::Shuffled, Strategy::Combining] {
            let pipeline = Pipeline::new(
                PipelineConfig::default().with_threads(4).with_chunk_size(1_000).with_strategy(strategy),
            );
            let avg = pipeline.run_lines(&data.lines).unwrap().average();
            assert!((avg - data.mean).abs() < 1e-6, "{} != {}", avg, data.mean);
        }
    }

    #[test]
    fn harness_collects_every_iteration() {
        let mut counter = 0usize;
        let (times, mems, outputs) = benchmark_harness(&mut counter, |c| { *c += 1; *c }, 3);
        assert_eq!(times.len(), 3);
        assert_eq!(mems.len(), 3);
        assert_eq!(outputs.len(), 3);
        // One warmup run precedes the timed ones.
        assert_eq!(outputs, vec![2, 3, 4]);
    }
}
