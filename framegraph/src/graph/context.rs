//! Read-only view of a compiled graph handed to node callbacks.

use super::registry::ResourceRegistry;
use super::{AllocatedResource, CompiledPlan, NodeId, ResourceDescription, ResourceHandle, TaskKind};
use crate::error::GraphError;
use crate::types::Extent2d;

/// What a node callback can see of its graph.
///
/// The context is shared, never mutable: callbacks of different nodes may run
/// concurrently and only read the resolved plan.
#[derive(Clone, Copy)]
pub struct GraphContext<'a> {
    plan: &'a CompiledPlan,
    registry: &'a ResourceRegistry,
    node: NodeId,
    node_name: &'a str,
    kind: TaskKind,
    base_resolution: Extent2d,
    frame_index: u64,
}

impl<'a> GraphContext<'a> {
    pub(crate) fn new(
        plan: &'a CompiledPlan,
        registry: &'a ResourceRegistry,
        node: NodeId,
        node_name: &'a str,
        kind: TaskKind,
        base_resolution: Extent2d,
        frame_index: u64,
    ) -> Self {
        Self {
            plan,
            registry,
            node,
            node_name,
            kind,
            base_resolution,
            frame_index,
        }
    }

    /// The node being recorded.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Debug name of the node being recorded.
    pub fn node_name(&self) -> &'a str {
        self.node_name
    }

    /// Kind of the node being recorded.
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Base resolution relative sizes were resolved against.
    pub fn base_resolution(&self) -> Extent2d {
        self.base_resolution
    }

    /// Index of the manager frame the graph executes in.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// The compiled plan.
    pub fn plan(&self) -> &'a CompiledPlan {
        self.plan
    }

    /// Resolve a handle the current node accessed.
    pub fn allocated_resource(
        &self,
        handle: ResourceHandle,
    ) -> Result<AllocatedResource<'a>, GraphError> {
        self.plan.allocated_resource(self.node, handle)
    }

    /// Resolve a handle for any node of the graph.
    pub fn allocated_resource_for(
        &self,
        node: NodeId,
        handle: ResourceHandle,
    ) -> Result<AllocatedResource<'a>, GraphError> {
        self.plan.allocated_resource(node, handle)
    }

    /// Recorded description of a handle.
    pub fn resource_desc(&self, handle: ResourceHandle) -> Option<&'a ResourceDescription> {
        self.registry.get(handle).map(|record| &record.desc)
    }

    /// Size a handle resolved to.
    pub fn resource_extent(&self, handle: ResourceHandle) -> Option<Extent2d> {
        self.resource_desc(handle)
            .map(|desc| desc.resolve_extent(self.base_resolution))
    }
}

impl std::fmt::Debug for GraphContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphContext")
            .field("node", &self.node)
            .field("node_name", &self.node_name)
            .field("kind", &self.kind)
            .field("frame_index", &self.frame_index)
            .finish_non_exhaustive()
    }
}
