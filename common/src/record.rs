/// A single validated value taken from one input line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRecord(f64);

impl NumericRecord {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl From<f64> for NumericRecord {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

/// Index of a bucket in `[0, K)`. Only groups work, so no ordering is defined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BucketId(usize);

impl BucketId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}
