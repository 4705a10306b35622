use std::num::NonZeroUsize;

use tracing::debug;

/// Number of buckets `K`, which also bounds how many reduction units run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanOut(NonZeroUsize);

impl FanOut {
    pub const DEFAULT: usize = 10;

    pub fn new(buckets: usize) -> Option<Self> {
        NonZeroUsize::new(buckets).map(Self)
    }

    /// Reads a user-supplied fan-out. Anything that is not a positive integer
    /// falls back to [`FanOut::DEFAULT`]; this is never an error.
    pub fn resolve(arg: Option<&str>) -> Self {
        match arg.and_then(|s| s.parse::<usize>().ok()).and_then(Self::new) {
            Some(fan_out) => fan_out,
            None => {
                debug!(arg = ?arg, fallback = Self::DEFAULT, "Fan-out not a positive integer, using default");
                Self::default()
            }
        }
    }

    #[inline]
    pub fn get(&self) -> usize {
        self.0.get()
    }
}

impl Default for FanOut {
    fn default() -> Self {
        Self(NonZeroUsize::new(Self::DEFAULT).unwrap_or(NonZeroUsize::MIN))
    }
}

/// What the driver does with a line that fails to parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedRecordPolicy {
    /// Stop the whole run on the first malformed line.
    #[default]
    Abort,
    /// Log the line and continue without it.
    Skip,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_accepts_positive_integers() {
        assert_eq!(FanOut::resolve(Some("1")).get(), 1);
        assert_eq!(FanOut::resolve(Some("32")).get(), 32);
        assert_eq!(FanOut::resolve(Some("+4")).get(), 4);
    }

    #[test]
    fn resolve_falls_back_to_default() {
        for arg in [None, Some("not-a-number"), Some(""), Some("0"), Some("-3"), Some("2.5")] {
            assert_eq!(FanOut::resolve(arg).get(), FanOut::DEFAULT, "arg {:?}", arg);
        }
    }

    #[test]
    fn zero_is_not_a_fan_out() {
        assert!(FanOut::new(0).is_none());
        assert_eq!(FanOut::default().get(), 10);
    }

    #[test]
    fn abort_is_default_policy() {
        assert_eq!(MalformedRecordPolicy::default(), MalformedRecordPolicy::Abort);
    }
}
