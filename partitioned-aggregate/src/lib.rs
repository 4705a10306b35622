mod base_finalizer;
mod bucketed_aggregator;
mod combining_agg;
mod error;
mod pipeline;
mod shuffled_agg;

pub use bucketed_aggregator::{BucketFinalizer, BucketedAggregator};
pub use combining_agg::CombiningAggregator;
pub use error::PipelineError;
pub use pipeline::{CHUNK_SIZE, Pipeline, PipelineConfig, Strategy};
pub use shuffled_agg::ShuffledAggregator;
