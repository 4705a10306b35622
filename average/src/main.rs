use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use itertools::Itertools;
use medians::Medianf64;
use tracing::{debug, info, warn};

use average::*;
use common::{FanOut, MalformedRecordPolicy};
use partitioned_aggregate::{Pipeline, PipelineConfig, Strategy, CHUNK_SIZE};

#[derive(Parser, Debug)]
#[command(version, about = "Average a list of numbers by bucketing them across parallel workers", long_about = None)]
struct Cli {
    /// -v for info, -vv for debug, -vvv for trace. RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Average a text file holding one number per line.
    Run {
        input: PathBuf,

        /// Directory to write `part-00000` into. Prints to stdout when omitted.
        output: Option<PathBuf>,

        /// Number of buckets. Anything but a positive integer means 10.
        fan_out: Option<String>,

        #[command(flatten)]
        pipeline_args: PipelineArgs,
    },
    /// Time the pipeline on a generated dataset.
    Bench {
        #[arg(short, long)]
        elements: usize,

        /// Bucket counts to try, resolved like `run`'s fan-out.
        #[arg(short = 'k', long, num_args = 1.., default_value = "10")]
        fan_out: Vec<String>,

        #[arg(long, value_enum, default_value_t = DistributionArg::Uniform)]
        distribution: DistributionArg,

        #[arg(short, long, default_value_t = 5)]
        iterations: usize,

        #[arg(long)]
        table: bool,

        #[command(flatten)]
        pipeline_args: PipelineArgs,
    },
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// Worker threads per stage. Defaults to the available parallelism.
    #[arg(short, long)]
    threads: Option<usize>,

    #[arg(long, value_enum, num_args = 1.., default_values_t = [StrategyArg::Shuffled])]
    strategy: Vec<StrategyArg>,

    /// Drop malformed lines instead of failing the run.
    #[arg(long)]
    skip_malformed: bool,

    #[arg(long, default_value_t = CHUNK_SIZE)]
    chunk_size: usize,

    #[arg(long)]
    seed: Option<u64>,
}

#[derive(ValueEnum, Debug, Copy, Clone)]
#[clap(rename_all = "kebab_case")]
enum StrategyArg {
    Shuffled,
    Combining,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Shuffled => Strategy::Shuffled,
            StrategyArg::Combining => Strategy::Combining,
        }
    }
}

#[derive(ValueEnum, Debug, Copy, Clone)]
enum DistributionArg {
    Uniform,
    Normal,
}

impl From<DistributionArg> for ValueDistribution {
    fn from(arg: DistributionArg) -> Self {
        match arg {
            DistributionArg::Uniform => ValueDistribution::Uniform,
            DistributionArg::Normal => ValueDistribution::Normal,
        }
    }
}

impl PipelineArgs {
    fn config(&self, fan_out: FanOut, strategy: StrategyArg) -> PipelineConfig {
        let policy = if self.skip_malformed { MalformedRecordPolicy::Skip } else { MalformedRecordPolicy::Abort };
        let mut config = PipelineConfig::default()
            .with_fan_out(fan_out)
            .with_chunk_size(self.chunk_size)
            .with_malformed_policy(policy)
            .with_strategy(strategy.into())
            .with_seed(self.seed);
        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        config
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    debug!(args = ?cli, "Parsed arguments");

    match cli.command {
        Commands::Run { input, output, fan_out, pipeline_args } => {
            let fan_out = FanOut::resolve(fan_out.as_deref());
            let strategy = pipeline_args.strategy.first().copied().unwrap_or(StrategyArg::Shuffled);
            if pipeline_args.strategy.len() > 1 {
                warn!(?strategy, "Several strategies given, running only the first");
            }

            let pipeline = Pipeline::new(pipeline_args.config(fan_out, strategy));
            info!(input = %input.display(), fan_out = fan_out.get(), "Averaging file");
            let result = average_file(&pipeline, &input)?;
            write_result(output.as_deref(), &result)?;
        }
        Commands::Bench { elements, fan_out, distribution, iterations, table, pipeline_args } => {
            let iterations = iterations.max(1);
            let seed = pipeline_args.seed.unwrap_or(42);
            let mut dataset = generate_dataset(elements, distribution.into(), seed)?;
            let mean = dataset.mean;

            for (&strategy, k) in pipeline_args.strategy.iter().cartesian_product(fan_out.iter()) {
                let fan_out = FanOut::resolve(Some(k));
                let pipeline = Pipeline::new(pipeline_args.config(fan_out, strategy));
                let threads = pipeline.config().threads;

                let (mut times, mut mems, outputs) = benchmark_harness(
                    &mut dataset,
                    |data| pipeline.run_lines(&data.lines).map(|r| r.average()),
                    iterations,
                );
                let average = outputs.into_iter().last().transpose()?.unwrap_or(f64::NAN);
                if (average - mean).abs() > 1e-6 * mean.abs().max(1.0) {
                    warn!(average, mean, "Pipeline average drifted from the generated mean");
                }

                let time = times.as_mut_slice().medf_unchecked();
                let mem = mems.as_mut_slice().medf_unchecked();
                if table {
                    println!(
                        "{:?},{},{},{},{:?},{:+e},{:+e},{:?}",
                        strategy, threads, fan_out.get(), elements, distribution, time, mem, average,
                    );
                } else {
                    println!("Strategy: {:?}", strategy);
                    println!("Threads: {}", threads);
                    println!("Fan-out: {}", fan_out.get());
                    println!("Elements: {}", elements);
                    println!("Distribution: {:?}", distribution);
                    println!("Trials: {:?}", times);
                    println!("Median time: {:+e}", time);
                    println!("Median memory: {:+e}", mem);
                    println!("Average: {:?}", average);
                }
            }
        }
    }

    Ok(())
}
