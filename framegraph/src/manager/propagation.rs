//! Frame-to-frame resource propagation.

use std::collections::{HashMap, HashSet};

use super::PooledResourceId;
use crate::graph::ResourceHandle;

/// Maps propagated handles to the pooled resource compile bound them to.
///
/// Two buffers alternate per frame: graphs of frame N write into one while
/// reading what frame N-1 wrote into the other. A separate same-frame map
/// lets a later graph in frame N consume what an earlier graph of frame N
/// propagated.
#[derive(Debug, Default)]
pub struct PropagationMaps {
    buffers: [HashMap<ResourceHandle, PooledResourceId>; 2],
    write: usize,
    same_frame: HashMap<ResourceHandle, PooledResourceId>,
}

impl PropagationMaps {
    /// Create empty maps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a handle propagated by the previous frame or earlier this frame.
    pub fn lookup(&self, handle: ResourceHandle) -> Option<PooledResourceId> {
        self.same_frame
            .get(&handle)
            .or_else(|| self.buffers[self.write ^ 1].get(&handle))
            .copied()
    }

    /// Record that `handle` maps to `id` for the rest of this frame and the next one.
    pub fn commit(&mut self, handle: ResourceHandle, id: PooledResourceId) {
        self.buffers[self.write].insert(handle, id);
        self.same_frame.insert(handle, id);
    }

    /// Frame boundary: what was written becomes readable, the old read buffer is discarded.
    pub fn flip(&mut self) {
        self.write ^= 1;
        self.buffers[self.write].clear();
        self.same_frame.clear();
    }

    /// Every pooled resource some handle is still propagated to.
    pub fn reserved(&self) -> HashSet<PooledResourceId> {
        self.buffers
            .iter()
            .flat_map(|buffer| buffer.values())
            .chain(self.same_frame.values())
            .copied()
            .collect()
    }

    /// Number of handles readable by graphs of the current frame.
    pub fn readable_len(&self) -> usize {
        let previous = &self.buffers[self.write ^ 1];
        previous.len()
            + self
                .same_frame
                .keys()
                .filter(|handle| !previous.contains_key(handle))
                .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::HandleFlags;
    use slotmap::SlotMap;

    fn ids(n: usize) -> Vec<PooledResourceId> {
        let mut map: SlotMap<PooledResourceId, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    fn handle(id: u64) -> ResourceHandle {
        ResourceHandle::new(id, HandleFlags::empty())
    }

    #[test]
    fn test_same_frame_visibility() {
        let ids = ids(1);
        let mut maps = PropagationMaps::new();
        maps.commit(handle(1), ids[0]);
        assert_eq!(maps.lookup(handle(1)), Some(ids[0]));
    }

    #[test]
    fn test_survives_exactly_one_frame() {
        let ids = ids(1);
        let mut maps = PropagationMaps::new();
        maps.commit(handle(1), ids[0]);

        maps.flip();
        assert_eq!(maps.lookup(handle(1)), Some(ids[0]));
        assert!(maps.reserved().contains(&ids[0]));

        maps.flip();
        assert_eq!(maps.lookup(handle(1)), None);
        assert!(maps.reserved().is_empty());
    }

    #[test]
    fn test_same_frame_wins_over_previous_frame() {
        let ids = ids(2);
        let mut maps = PropagationMaps::new();
        maps.commit(handle(1), ids[0]);
        maps.flip();
        maps.commit(handle(1), ids[1]);
        assert_eq!(maps.lookup(handle(1)), Some(ids[1]));
        assert_eq!(maps.readable_len(), 1);
        assert_eq!(maps.reserved().len(), 2);
    }
}
