//! Task nodes.

use std::fmt;

use super::{AccessType, GraphContext, ResourceHandle};
use crate::command::CommandBufferAllocator;
use crate::types::QueueType;

/// Kind of GPU work a node performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Runs on the graphics queue and may use any access type.
    Graphics,
    /// Runs on the compute queue; limited to shader reads and unordered access.
    Compute,
}

impl TaskKind {
    /// Queue the node's command buffers are submitted to.
    pub fn queue(self) -> QueueType {
        match self {
            Self::Graphics => QueueType::Graphics,
            Self::Compute => QueueType::Compute,
        }
    }
}

/// Handle to a node in a graph.
///
/// Only valid within the builder that created it. The index is the node's
/// position in the execution sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Position of the node in the sequence.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Deferred recording callback of a node.
pub type RenderFn =
    Box<dyn FnOnce(&GraphContext<'_>, &mut CommandBufferAllocator<'_>) + Send + 'static>;

/// A recorded unit of GPU work.
pub struct TaskNode {
    pub(crate) name: String,
    pub(crate) kind: TaskKind,
    pub(crate) accesses: Vec<(ResourceHandle, AccessType)>,
    pub(crate) render: Option<RenderFn>,
}

impl TaskNode {
    pub(crate) fn new(name: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            name: name.into(),
            kind,
            accesses: Vec::new(),
            render: None,
        }
    }

    /// Debug name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Task kind.
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Accesses in recording order.
    pub fn accesses(&self) -> &[(ResourceHandle, AccessType)] {
        &self.accesses
    }

    /// Access this node recorded for a handle (the first one, if duplicated).
    pub fn access_to(&self, handle: ResourceHandle) -> Option<AccessType> {
        self.accesses
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, access)| *access)
    }

    /// Returns true if a render function is attached.
    pub fn has_render_function(&self) -> bool {
        self.render.is_some()
    }
}

impl fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskNode")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("accesses", &self.accesses)
            .field("has_render_function", &self.render.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::HandleFlags;

    #[test]
    fn test_kind_queue() {
        assert_eq!(TaskKind::Graphics.queue(), QueueType::Graphics);
        assert_eq!(TaskKind::Compute.queue(), QueueType::Compute);
    }

    #[test]
    fn test_access_lookup() {
        let handle = ResourceHandle::new(1, HandleFlags::empty());
        let mut node = TaskNode::new("gbuffer", TaskKind::Graphics);
        node.accesses.push((handle, AccessType::RenderTarget));
        assert_eq!(node.access_to(handle), Some(AccessType::RenderTarget));
        assert_eq!(node.access_to(ResourceHandle::INVALID), None);
        assert!(!node.has_render_function());
    }
}
