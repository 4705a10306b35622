mod abort;
mod aggregate;
mod config;
mod error;
mod record;

pub use abort::AbortHandle;
pub use aggregate::{BucketAccumulator, FinalResult, PartialAggregate};
pub use config::{FanOut, MalformedRecordPolicy};
pub use error::{EmptyDatasetError, ParseError};
pub use record::{BucketId, NumericRecord};
