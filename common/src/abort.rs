use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct Inner {
    aborted: AtomicBool,
    parent: Option<AbortHandle>,
}

/// Shared cancellation flag checked by every stage between units of work.
#[derive(Clone)]
pub struct AbortHandle {
    inner: Arc<Inner>,
}

impl Default for AbortHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner { aborted: AtomicBool::new(false), parent: None }),
        }
    }

    /// A handle that sees this handle's abort, but whose own abort stays local.
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(Inner { aborted: AtomicBool::new(false), parent: Some(self.clone()) }),
        }
    }

    pub fn abort(&self) {
        self.inner.aborted.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::Acquire)
            || self.inner.parent.as_ref().is_some_and(|p| p.is_aborted())
    }
}

impl std::fmt::Debug for AbortHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbortHandle").field("aborted", &self.is_aborted()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_sees_parent_abort() {
        let parent = AbortHandle::new();
        let child = parent.child();
        assert!(!child.is_aborted());
        parent.abort();
        assert!(child.is_aborted());
    }

    #[test]
    fn child_abort_stays_local() {
        let parent = AbortHandle::new();
        let child = parent.child();
        child.abort();
        assert!(child.is_aborted());
        assert!(!parent.is_aborted());
    }

    #[test]
    fn clones_share_state() {
        let handle = AbortHandle::new();
        let clone = handle.clone();
        clone.abort();
        assert!(handle.is_aborted());
    }
}
