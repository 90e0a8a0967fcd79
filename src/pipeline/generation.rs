use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifies one selection; results carry the epoch they were requested under
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(u64);

/// Monotonic selection counter shared between the UI thread and its workers.
///
/// The UI thread advances it on every selection change. Workers hold a clone to stop
/// early once superseded; the UI thread re-checks before applying any result.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    counter: Arc<AtomicU64>,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new epoch, invalidating every earlier one
    pub fn advance(&self) -> Epoch {
        Epoch(self.counter.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn current(&self) -> Epoch {
        Epoch(self.counter.load(Ordering::Acquire))
    }

    pub fn is_current(&self, epoch: Epoch) -> bool {
        self.current() == epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_invalidates_previous_epoch() {
        let generation = Generation::new();
        let first = generation.advance();
        assert!(generation.is_current(first));

        let second = generation.advance();
        assert!(!generation.is_current(first));
        assert!(generation.is_current(second));
        assert!(second > first);
    }

    #[test]
    fn test_clones_share_counter() {
        let generation = Generation::new();
        let worker_view = generation.clone();
        let epoch = generation.advance();
        assert!(worker_view.is_current(epoch));

        generation.advance();
        assert!(!worker_view.is_current(epoch));
    }

    #[test]
    fn test_advance_from_other_thread_is_visible() {
        let generation = Generation::new();
        let epoch = generation.advance();
        let remote = generation.clone();
        std::thread::spawn(move || {
            remote.advance();
        })
        .join()
        .unwrap();
        assert!(!generation.is_current(epoch));
    }
}
