//! One-shot per-frame graph builder.

use std::sync::Arc;

use super::compiler::{CompileInput, CompiledPlan};
use super::executor::{ExecuteInput, NodeInfo};
use super::registry::{ExternalResource, HandleOrigin, HandleRecord, ResourceRegistry};
use super::{
    AccessType, AllocatedResource, GraphContext, HandleFlags, NodeId, ResourceDescription,
    ResourceHandle, TaskKind, TaskNode,
};
use crate::backend::{GpuTexture, TextureState, TextureViews};
use crate::command::CommandBufferAllocator;
use crate::error::GraphError;
use crate::jobs::JobSystem;
use crate::manager::GraphManager;
use crate::scheduler::FrameSubmission;
use crate::types::Extent2d;

/// Lifecycle state of a [`GraphBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuilderState {
    /// Nodes, resources and accesses can be recorded.
    Recording,
    /// Resources are resolved; the graph can be executed.
    Compiled,
    /// The graph produced its submission and must be discarded.
    Executed,
}

/// Records one frame's task nodes and resource accesses, then compiles and
/// executes them.
///
/// A builder goes through [`BuilderState::Recording`],
/// [`BuilderState::Compiled`] and [`BuilderState::Executed`] exactly once and
/// is never reset.
///
/// # Example
///
/// ```ignore
/// let mut graph = GraphBuilder::new(&manager);
/// let hdr = graph.create_resource(ResourceDescription::full_resolution(TextureFormat::Rgba16Float))?;
///
/// let lighting = graph.append_task_node("lighting", TaskKind::Graphics)?;
/// graph.record_resource_access(lighting, hdr, AccessType::RenderTarget)?;
/// graph.register_task_node_render_function(lighting, move |ctx, cmds| {
///     let target = ctx.allocated_resource(hdr).unwrap();
///     draw_lighting(cmds.get_or_create_front().unwrap(), target.views);
/// })?;
///
/// graph.compile()?;
/// let submission = graph.execute()?;
/// submit_frame(backend.as_ref(), &submission)?;
/// ```
pub struct GraphBuilder {
    manager: Arc<GraphManager>,
    state: BuilderState,
    base_resolution: Extent2d,
    nodes: Vec<TaskNode>,
    registry: ResourceRegistry,
    plan: Option<CompiledPlan>,
}

impl GraphBuilder {
    /// Create a builder bound to a manager.
    pub fn new(manager: &Arc<GraphManager>) -> Self {
        Self {
            manager: manager.clone(),
            state: BuilderState::Recording,
            base_resolution: manager.config().base_resolution,
            nodes: Vec::new(),
            registry: ResourceRegistry::default(),
            plan: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BuilderState {
        self.state
    }

    /// The manager this builder compiles against.
    pub fn manager(&self) -> &Arc<GraphManager> {
        &self.manager
    }

    /// Base resolution relative resource sizes resolve against.
    pub fn base_resolution(&self) -> Extent2d {
        self.base_resolution
    }

    /// Override the base resolution for this graph.
    pub fn set_base_resolution(&mut self, resolution: Extent2d) -> Result<(), GraphError> {
        self.expect_state("set the base resolution", BuilderState::Recording)?;
        self.base_resolution = resolution;
        Ok(())
    }

    /// Number of appended nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get a node.
    pub fn node(&self, node: NodeId) -> Option<&TaskNode> {
        self.nodes.get(node.index())
    }

    /// Number of handles known to this graph.
    pub fn resource_count(&self) -> usize {
        self.registry.len()
    }

    /// Create a fresh internal resource handle.
    pub fn create_resource(&mut self, desc: ResourceDescription) -> Result<ResourceHandle, GraphError> {
        self.expect_state("create a resource", BuilderState::Recording)?;
        let handle = ResourceHandle::new(self.manager.allocate_handle_id(), HandleFlags::empty());
        log::trace!(
            "Created resource {} ({:?}, {:?})",
            handle.id(),
            desc.label,
            desc.format
        );
        self.registry.insert(
            handle,
            HandleRecord {
                desc,
                origin: HandleOrigin::Internal,
            },
        );
        Ok(handle)
    }

    /// Import a resource owned outside the graph.
    ///
    /// The graph transitions it from `current_state` as nodes need and leaves
    /// it in `required_end_state` after the final barrier pass.
    pub fn register_external_resource(
        &mut self,
        texture: GpuTexture,
        views: TextureViews,
        current_state: TextureState,
        required_end_state: TextureState,
    ) -> Result<ResourceHandle, GraphError> {
        self.register_external(
            HandleFlags::EXTERNAL,
            texture,
            views,
            current_state,
            required_end_state,
        )
    }

    /// Import a swap chain image.
    pub fn register_swapchain_resource(
        &mut self,
        texture: GpuTexture,
        views: TextureViews,
        current_state: TextureState,
        required_end_state: TextureState,
    ) -> Result<ResourceHandle, GraphError> {
        self.register_external(
            HandleFlags::EXTERNAL | HandleFlags::SWAPCHAIN,
            texture,
            views,
            current_state,
            required_end_state,
        )
    }

    fn register_external(
        &mut self,
        flags: HandleFlags,
        texture: GpuTexture,
        views: TextureViews,
        current_state: TextureState,
        required_end_state: TextureState,
    ) -> Result<ResourceHandle, GraphError> {
        self.expect_state("register an external resource", BuilderState::Recording)?;
        let handle = ResourceHandle::new(self.manager.allocate_handle_id(), flags);
        let name = texture.debug_name();
        let inserted = self.registry.insert_external(ExternalResource {
            handle,
            texture,
            views,
            current_state,
            required_end_state,
        });
        if !inserted {
            log::error!("External resource {name} is already registered");
            return Err(GraphError::DuplicateExternalResource(name));
        }
        log::trace!(
            "Registered external resource {name} as {} ({current_state:?} -> {required_end_state:?})",
            handle.id()
        );
        Ok(handle)
    }

    /// Keep the resource bound to `handle` alive into the next frame.
    ///
    /// A graph of the next frame (or a later graph of this frame) that records
    /// an access to the returned handle gets the same physical resource. The
    /// handle's lifetime in this graph extends to the graph's end.
    pub fn propagate_resource_to_next_frame(
        &mut self,
        handle: ResourceHandle,
    ) -> Result<ResourceHandle, GraphError> {
        self.expect_state("propagate a resource", BuilderState::Recording)?;
        self.ensure_known(handle)?;
        if handle.is_external() {
            log::error!(
                "External resource {} cannot be propagated; it is not pooled",
                handle.id()
            );
            return Err(GraphError::PropagateExternal(handle));
        }
        if self.registry.mark_propagated(handle) {
            log::trace!("Resource {} marked for propagation", handle.id());
        }
        Ok(handle)
    }

    /// Recorded description of a handle.
    ///
    /// Works for handles propagated by an earlier graph before any access is
    /// recorded.
    pub fn resource_desc(&self, handle: ResourceHandle) -> Result<ResourceDescription, GraphError> {
        if let Some(record) = self.registry.get(handle) {
            return Ok(record.desc.clone());
        }
        if handle.is_valid() && !handle.is_external() {
            if let Some((_, desc)) = self.manager.propagated_description(handle) {
                return Ok(desc);
            }
        }
        log::error!("Unknown resource handle {}", handle.id());
        Err(GraphError::UnknownHandle(handle))
    }

    /// Check whether a handle can be used in this graph.
    ///
    /// Returns false for [`ResourceHandle::INVALID`] and for propagated
    /// handles whose resource has expired; neither is an error.
    pub fn is_resource_available(&self, handle: ResourceHandle) -> bool {
        if !handle.is_valid() {
            return false;
        }
        self.registry.contains(handle)
            || (!handle.is_external() && self.manager.propagated_description(handle).is_some())
    }

    /// Append a node to the execution sequence.
    pub fn append_task_node(
        &mut self,
        name: impl Into<String>,
        kind: TaskKind,
    ) -> Result<NodeId, GraphError> {
        self.expect_state("append a task node", BuilderState::Recording)?;
        let id = NodeId::new(self.nodes.len());
        let node = TaskNode::new(name, kind);
        log::trace!("Appended {kind:?} node '{}' at {}", node.name, id.index());
        self.nodes.push(node);
        Ok(id)
    }

    /// Record that `node` uses `handle` as `access`. Returns the handle.
    ///
    /// Compute nodes may only record [`AccessType::ShaderRead`] and
    /// [`AccessType::UnorderedAccess`]. Recording the same handle twice from
    /// one node is reported by compile.
    pub fn record_resource_access(
        &mut self,
        node: NodeId,
        handle: ResourceHandle,
        access: AccessType,
    ) -> Result<ResourceHandle, GraphError> {
        self.expect_state("record a resource access", BuilderState::Recording)?;
        let Some(kind) = self.nodes.get(node.index()).map(|n| n.kind) else {
            log::error!("Unknown node {}", node.index());
            return Err(GraphError::UnknownNode(node));
        };
        self.ensure_known(handle)?;
        if !access.allowed_for(kind) {
            log::error!(
                "Compute node '{}' cannot access resource {} as {access:?}",
                self.nodes[node.index()].name,
                handle.id()
            );
            return Err(GraphError::ComputeAccessNotAllowed {
                node,
                handle,
                access,
            });
        }

        let task = &mut self.nodes[node.index()];
        log::trace!(
            "Node '{}' accesses resource {} as {access:?}",
            task.name,
            handle.id()
        );
        task.accesses.push((handle, access));
        Ok(handle)
    }

    /// Attach the deferred recording callback of a node.
    pub fn register_task_node_render_function<F>(
        &mut self,
        node: NodeId,
        render: F,
    ) -> Result<(), GraphError>
    where
        F: FnOnce(&GraphContext<'_>, &mut CommandBufferAllocator<'_>) + Send + 'static,
    {
        self.expect_state("register a render function", BuilderState::Recording)?;
        let Some(task) = self.nodes.get_mut(node.index()) else {
            log::error!("Unknown node {}", node.index());
            return Err(GraphError::UnknownNode(node));
        };
        if task.render.is_some() {
            log::error!("Node '{}' already has a render function", task.name);
            return Err(GraphError::DuplicateRenderFunction(node));
        }
        task.render = Some(Box::new(render));
        Ok(())
    }

    /// Compile against the owning manager.
    pub fn compile(&mut self) -> Result<(), GraphError> {
        let manager = self.manager.clone();
        manager.compile(self)
    }

    /// The compiled plan, once compiled.
    pub fn plan(&self) -> Option<&CompiledPlan> {
        self.plan.as_ref()
    }

    /// Resolve a handle for a node after compile.
    pub fn allocated_resource(
        &self,
        node: NodeId,
        handle: ResourceHandle,
    ) -> Result<AllocatedResource<'_>, GraphError> {
        match &self.plan {
            Some(plan) => plan.allocated_resource(node, handle),
            None => {
                log::error!("Cannot resolve resources of an uncompiled graph");
                Err(GraphError::InvalidState {
                    operation: "resolve a resource",
                    state: self.state,
                })
            }
        }
    }

    /// Run every node and assemble the submission, using the manager's job
    /// system if it has one.
    pub fn execute(&mut self) -> Result<FrameSubmission, GraphError> {
        let manager = self.manager.clone();
        self.execute_with(manager.job_system())
    }

    /// Run every node, in parallel when `jobs` is given.
    ///
    /// The builder is [`BuilderState::Executed`] afterwards even if a backend
    /// call failed, since render functions have been consumed.
    pub fn execute_with(
        &mut self,
        jobs: Option<&dyn JobSystem>,
    ) -> Result<FrameSubmission, GraphError> {
        self.expect_state("execute", BuilderState::Compiled)?;
        self.state = BuilderState::Executed;

        let Some(plan) = self.plan.as_ref() else {
            log::error!("Compiled graph has no plan");
            return Err(GraphError::InvalidState {
                operation: "execute",
                state: BuilderState::Recording,
            });
        };

        let renders = self.nodes.iter_mut().map(|n| n.render.take()).collect();
        let input = ExecuteInput {
            plan,
            registry: &self.registry,
            nodes: self
                .nodes
                .iter()
                .map(|n| NodeInfo {
                    name: &n.name,
                    kind: n.kind,
                })
                .collect(),
            base_resolution: self.base_resolution,
            frame_index: self.manager.frame_index(),
        };
        super::executor::execute(input, renders, self.manager.command_pool(), jobs)
    }

    pub(crate) fn compile_input(&self) -> CompileInput<'_> {
        CompileInput {
            nodes: &self.nodes,
            registry: &self.registry,
            base_resolution: self.base_resolution,
        }
    }

    pub(crate) fn set_compiled(&mut self, plan: CompiledPlan) {
        self.plan = Some(plan);
        self.state = BuilderState::Compiled;
    }

    pub(crate) fn expect_state(
        &self,
        operation: &'static str,
        expected: BuilderState,
    ) -> Result<(), GraphError> {
        if self.state != expected {
            log::error!("Cannot {operation} while the graph is {:?}", self.state);
            return Err(GraphError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    /// Make sure a handle is in the registry, importing it from the
    /// manager's propagation maps if an earlier graph propagated it.
    fn ensure_known(&mut self, handle: ResourceHandle) -> Result<(), GraphError> {
        if self.registry.contains(handle) {
            return Ok(());
        }
        if handle.is_valid() && !handle.is_external() {
            if let Some((id, desc)) = self.manager.propagated_description(handle) {
                log::trace!("Imported propagated resource {}", handle.id());
                self.registry.insert(
                    handle,
                    HandleRecord {
                        desc,
                        origin: HandleOrigin::Propagated(id),
                    },
                );
                return Ok(());
            }
        }
        log::error!("Unknown resource handle {}", handle.id());
        Err(GraphError::UnknownHandle(handle))
    }
}

impl Drop for GraphBuilder {
    fn drop(&mut self) {
        if self.state == BuilderState::Compiled {
            log::warn!(
                "Graph with {} node(s) was compiled but never executed",
                self.nodes.len()
            );
        }
    }
}

impl std::fmt::Debug for GraphBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("state", &self.state)
            .field("base_resolution", &self.base_resolution)
            .field("nodes", &self.nodes)
            .field("resources", &self.registry.len())
            .finish_non_exhaustive()
    }
}
