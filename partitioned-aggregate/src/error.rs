use thiserror::Error;

use common::{EmptyDatasetError, ParseError};

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A line failed to parse while the abort policy was active.
    #[error("malformed record on line {line}")]
    Parse {
        line: u64,
        #[source]
        source: ParseError,
    },

    /// The record source failed while yielding the given line.
    #[error("record source failed at line {line}")]
    Source {
        line: u64,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    EmptyDataset(#[from] EmptyDatasetError),

    /// The pipeline's abort handle fired before the merge.
    #[error("pipeline cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn parse_error_preserves_source() {
        let err = PipelineError::Parse { line: 2, source: ParseError::new("abc") };
        assert_eq!(err.to_string(), "malformed record on line 2");
        assert_eq!(err.source().unwrap().to_string(), "invalid number (=abc) in the input");
    }

    #[test]
    fn source_error_reports_line() {
        let err = PipelineError::Source { line: 4, source: "disk gone".into() };
        assert_eq!(err.to_string(), "record source failed at line 4");
        assert_eq!(err.source().unwrap().to_string(), "disk gone");
    }

    #[test]
    fn empty_dataset_is_transparent() {
        let err = PipelineError::from(EmptyDatasetError);
        assert_eq!(err.to_string(), "cannot average an empty dataset");
    }
}
