//! Cross-queue synchronization primitives.
//!
//! Ordering between the graphics and compute queues is expressed only through
//! fence Signal/Wait pairs. A fence is identified by a [`FenceId`] that is
//! unique per manager; every value the graph emits for it is `1`.

use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a queue fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FenceId(pub u64);

/// Value every graph-generated fence is signaled with and waited for.
pub const FENCE_SIGNAL_VALUE: u64 = 1;

/// Hands out unique fence ids.
#[derive(Debug, Default)]
pub struct FenceAllocator {
    next: AtomicU64,
}

impl FenceAllocator {
    /// Create a new allocator. The first id handed out is `FenceId(1)`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh fence id.
    pub fn allocate(&self) -> FenceId {
        FenceId(self.next.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Number of fence ids handed out so far.
    pub fn allocated(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fence_ids_are_unique() {
        let fences = FenceAllocator::new();
        let a = fences.allocate();
        let b = fences.allocate();
        assert_eq!(a, FenceId(1));
        assert_ne!(a, b);
        assert_eq!(fences.allocated(), 2);
    }
}
