mod combiner;
mod merger;
mod reducer;

pub use combiner::BucketCombiner;
pub use merger::merge;
pub use reducer::{reduce, reduce_accumulators};
