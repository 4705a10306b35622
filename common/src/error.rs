use thiserror::Error;

/// A line that is not a decimal floating-point literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid number (={raw}) in the input")]
pub struct ParseError {
    raw: String,
}

impl ParseError {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The line exactly as it was read, before trimming.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// No valid record reached the merge, so there is no average to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot average an empty dataset")]
pub struct EmptyDatasetError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_keeps_raw_line() {
        let err = ParseError::new(" abc ");
        assert_eq!(err.raw(), " abc ");
        assert_eq!(err.to_string(), "invalid number (= abc ) in the input");
    }

    #[test]
    fn empty_dataset_display() {
        assert_eq!(EmptyDatasetError.to_string(), "cannot average an empty dataset");
    }
}
