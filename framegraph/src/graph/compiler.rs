//! Frame graph compilation.
//!
//! Turns the recorded node sequence into a [`CompiledPlan`]:
//!
//! 1. Validation of every recorded access (before anything is mutated)
//! 2. Cross-queue dependency discovery, one fence per retained edge
//! 3. Lifetime computation in manager-global stages
//! 4. Resource assignment: externals, propagated resources, pool search
//! 5. State-transition resolution and cached-state update
//! 6. Propagation commit for the following frame
//!
//! Stages come from a cursor owned by the manager that only moves forward, so
//! lifetimes of consecutive graphs never overlap and a pooled texture used by
//! an earlier graph is always free for a later one.

use std::collections::{HashMap, HashSet};

use super::registry::{HandleOrigin, ResourceRegistry};
use super::{AccessType, NodeId, ResourceHandle, TaskKind, TaskNode};
use crate::backend::{GpuBackend, GpuTexture, TextureBarrier, TextureState, TextureViews};
use crate::error::{GraphError, GraphicsError};
use crate::manager::{ManagerState, PoolRequest, PooledResourceId};
use crate::scheduler::{FenceAllocator, FenceId};
use crate::types::{Extent2d, TextureUsage};

/// Concrete resource a handle resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceId {
    /// Texture owned by the manager's pool.
    Pooled(PooledResourceId),
    /// Registered external resource, by registration index.
    External(usize),
}

/// First and last stage at which a handle is accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifetime {
    pub first: u64,
    pub last: u64,
}

/// State change a node needs for one handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// State before the node runs.
    pub prev: TextureState,
    /// State the node needs.
    pub next: TextureState,
}

/// An ordering constraint between nodes on different queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyEdge {
    /// Earlier node; its queue signals the fence after it.
    pub from: NodeId,
    /// Later node; its queue waits for the fence before it.
    pub to: NodeId,
    /// Fence carrying the dependency.
    pub fence: FenceId,
}

/// Resource assignment statistics of one compile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileStats {
    /// Internal handles served by an existing pooled texture.
    pub pool_hits: usize,
    /// Internal handles that needed a new pooled texture.
    pub pool_misses: usize,
    /// Handles bound to a resource propagated by an earlier graph.
    pub propagated_reuses: usize,
    /// Handles that no node accessed and that were not propagated.
    pub unused_handles: usize,
}

/// A resolved resource as seen by a node callback.
#[derive(Debug, Clone, Copy)]
pub struct AllocatedResource<'a> {
    pub texture: &'a GpuTexture,
    pub views: &'a TextureViews,
    /// State before the node's barriers.
    pub prev_state: TextureState,
    /// State during the node.
    pub curr_state: TextureState,
}

#[derive(Debug)]
struct ResolvedResource {
    handle: ResourceHandle,
    id: ResourceId,
    texture: GpuTexture,
    views: TextureViews,
    lifetime: Lifetime,
}

/// The execution plan produced by compile.
#[derive(Debug)]
pub struct CompiledPlan {
    base_stage: u64,
    terminal_stage: u64,
    linear: HashMap<ResourceHandle, usize>,
    resources: Vec<ResolvedResource>,
    transitions: HashMap<(NodeId, ResourceHandle), Transition>,
    node_barriers: Vec<Vec<TextureBarrier>>,
    dependencies: Vec<DependencyEdge>,
    compute_barrier_fences: HashMap<NodeId, FenceId>,
    reconcile_barriers: Vec<TextureBarrier>,
    reconcile_fence: Option<FenceId>,
    external_states: Vec<(ResourceHandle, TextureState)>,
    stats: CompileStats,
}

impl CompiledPlan {
    /// Resolve a handle for a node that recorded an access to it.
    pub fn allocated_resource(
        &self,
        node: NodeId,
        handle: ResourceHandle,
    ) -> Result<AllocatedResource<'_>, GraphError> {
        let Some(&index) = self.linear.get(&handle) else {
            log::error!("No resource was allocated for handle {}", handle.id());
            return Err(GraphError::UnknownHandle(handle));
        };
        let Some(transition) = self.transitions.get(&(node, handle)) else {
            log::error!(
                "Node {} asked for handle {} without recording an access",
                node.index(),
                handle.id()
            );
            return Err(GraphError::HandleNotAccessed { node, handle });
        };
        let resource = &self.resources[index];
        Ok(AllocatedResource {
            texture: &resource.texture,
            views: &resource.views,
            prev_state: transition.prev,
            curr_state: transition.next,
        })
    }

    /// Linear index of a handle's resource.
    pub fn linear_index(&self, handle: ResourceHandle) -> Option<usize> {
        self.linear.get(&handle).copied()
    }

    /// Concrete resource assigned to a handle.
    pub fn resource_id(&self, handle: ResourceHandle) -> Option<ResourceId> {
        self.linear.get(&handle).map(|&i| self.resources[i].id)
    }

    /// Concrete resource behind a linear index.
    pub fn resource_id_at(&self, index: usize) -> Option<ResourceId> {
        self.resources.get(index).map(|r| r.id)
    }

    /// Texture assigned to a handle.
    pub fn texture(&self, handle: ResourceHandle) -> Option<&GpuTexture> {
        self.linear.get(&handle).map(|&i| &self.resources[i].texture)
    }

    /// Lifetime of a handle, in manager stages.
    pub fn lifetime(&self, handle: ResourceHandle) -> Option<Lifetime> {
        self.linear.get(&handle).map(|&i| self.resources[i].lifetime)
    }

    /// Number of resolved handles.
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Stage of a node.
    pub fn stage_of(&self, node: NodeId) -> u64 {
        self.base_stage + node.index() as u64
    }

    /// Stage right after the last node.
    pub fn terminal_stage(&self) -> u64 {
        self.terminal_stage
    }

    /// Transition a node needs for a handle.
    pub fn transition(&self, node: NodeId, handle: ResourceHandle) -> Option<Transition> {
        self.transitions.get(&(node, handle)).copied()
    }

    /// Barriers issued before a node, skipping no-op transitions.
    pub fn node_barriers(&self, node: NodeId) -> &[TextureBarrier] {
        self.node_barriers
            .get(node.index())
            .map_or(&[], |barriers| barriers.as_slice())
    }

    /// Retained cross-queue dependency edges.
    pub fn dependencies(&self) -> &[DependencyEdge] {
        &self.dependencies
    }

    /// Fence a compute node's graphics-queue barrier pass signals.
    pub fn compute_barrier_fence(&self, node: NodeId) -> Option<FenceId> {
        self.compute_barrier_fences.get(&node).copied()
    }

    /// Barriers moving external resources into their required end state.
    pub fn reconcile_barriers(&self) -> &[TextureBarrier] {
        &self.reconcile_barriers
    }

    /// Fence from the compute queue to the reconcile pass, if one is needed.
    pub fn reconcile_fence(&self) -> Option<FenceId> {
        self.reconcile_fence
    }

    /// Final state of every external resource.
    pub fn external_states(&self) -> &[(ResourceHandle, TextureState)] {
        &self.external_states
    }

    /// Assignment statistics.
    pub fn stats(&self) -> CompileStats {
        self.stats
    }
}

/// What compile reads from a builder.
pub(crate) struct CompileInput<'a> {
    pub nodes: &'a [TaskNode],
    pub registry: &'a ResourceRegistry,
    pub base_resolution: Extent2d,
}

/// Per-handle facts gathered from the node sequence.
struct HandleUse {
    accessors: Vec<(NodeId, AccessType)>,
    usage: TextureUsage,
}

/// Compile a recorded graph against the manager state.
///
/// Must run under the manager's compile lock.
pub(crate) fn compile(
    input: CompileInput<'_>,
    state: &mut ManagerState,
    backend: &dyn GpuBackend,
    fences: &FenceAllocator,
) -> Result<CompiledPlan, GraphError> {
    let uses = validate(&input)?;
    let propagated = resolve_propagated(&input, state)?;

    let node_count = input.nodes.len() as u64;
    let base_stage = state.stage_cursor;
    let terminal_stage = base_stage + node_count;
    // Claimed before assignment: a failure below may already have moved pool
    // entries' last-access marks into this range.
    state.stage_cursor = terminal_stage + 1;

    let dependencies = find_dependencies(input.nodes, fences);

    let mut stats = CompileStats::default();
    let mut order: Vec<(ResourceHandle, Lifetime)> = Vec::new();
    for &handle in input.registry.handles() {
        let flagged = input.registry.is_propagated(handle);
        let lifetime = match uses.get(&handle) {
            Some(used) => {
                let first = used.accessors.first().map_or(0, |(n, _)| n.index() as u64);
                let last = used.accessors.last().map_or(0, |(n, _)| n.index() as u64);
                Lifetime {
                    first: base_stage + first,
                    last: if flagged {
                        terminal_stage
                    } else {
                        base_stage + last
                    },
                }
            }
            None if flagged || handle.is_external() => Lifetime {
                first: terminal_stage,
                last: terminal_stage,
            },
            None => {
                log::warn!(
                    "Resource handle {} is never accessed and will not be allocated",
                    handle.id()
                );
                stats.unused_handles += 1;
                continue;
            }
        };
        order.push((handle, lifetime));
    }
    order.sort_by_key(|(_, lifetime)| lifetime.first);

    let reserved = state.propagation.reserved();
    let mut resources = Vec::with_capacity(order.len());
    let mut linear = HashMap::with_capacity(order.len());

    for (handle, lifetime) in order {
        let Some(record) = input.registry.get(handle) else {
            continue;
        };
        let id = match record.origin {
            HandleOrigin::External(index) => ResourceId::External(index),
            HandleOrigin::Propagated(_) => {
                let Some(&pooled) = propagated.get(&handle) else {
                    continue;
                };
                stats.propagated_reuses += 1;
                ResourceId::Pooled(pooled)
            }
            HandleOrigin::Internal => {
                let mut usage = uses.get(&handle).map_or(TextureUsage::empty(), |u| u.usage);
                if input.registry.is_propagated(handle) {
                    usage |= TextureUsage::SHADER_READ;
                }
                let request = PoolRequest {
                    label: record.desc.label.as_deref(),
                    format: record.desc.format,
                    extent: record.desc.resolve_extent(input.base_resolution),
                    usage,
                    first_access: lifetime.first,
                };
                let (pooled, hit) = state
                    .pool
                    .get_or_create(backend, &request, &reserved)
                    .map_err(|err| {
                        log::error!(
                            "Failed to allocate a pooled resource for handle {}: {err}",
                            handle.id()
                        );
                        GraphError::ResourceAllocation(err)
                    })?;
                if hit {
                    stats.pool_hits += 1;
                } else {
                    stats.pool_misses += 1;
                }
                ResourceId::Pooled(pooled)
            }
        };

        let (texture, views) = match id {
            ResourceId::External(index) => {
                let external = input.registry.external(index);
                (external.texture.clone(), external.views)
            }
            ResourceId::Pooled(pooled) => {
                state.pool.set_last_access(pooled, lifetime.last);
                match state.pool.get(pooled) {
                    Some(resource) => (resource.texture().clone(), *resource.views()),
                    None => {
                        log::error!("Pooled resource for handle {} vanished", handle.id());
                        return Err(GraphError::UnknownHandle(handle));
                    }
                }
            }
        };

        linear.insert(handle, resources.len());
        resources.push(ResolvedResource {
            handle,
            id,
            texture,
            views,
            lifetime,
        });
    }

    // State transitions, walking resources in first-access order so that
    // textures shared by consecutive handles chain their states.
    let mut transitions = HashMap::new();
    let mut node_barriers = vec![Vec::new(); input.nodes.len()];
    let mut external_final: Vec<TextureState> = input
        .registry
        .externals()
        .iter()
        .map(|e| e.current_state)
        .collect();

    for resource in &resources {
        let handle = resource.handle;
        let mut current = match resource.id {
            ResourceId::External(index) => external_final[index],
            ResourceId::Pooled(pooled) => state
                .pool
                .get(pooled)
                .map_or(TextureState::Undefined, |r| r.state()),
        };

        if let Some(used) = uses.get(&handle) {
            for &(node, access) in &used.accessors {
                let next = access.target_state();
                transitions.insert((node, handle), Transition { prev: current, next });
                if current != next {
                    node_barriers[node.index()].push(TextureBarrier {
                        texture: resource.texture.id(),
                        old_state: current,
                        new_state: next,
                    });
                }
                current = next;
            }
        }

        match resource.id {
            ResourceId::External(index) => external_final[index] = current,
            ResourceId::Pooled(pooled) => state.pool.set_state(pooled, current),
        }
    }

    let mut compute_barrier_fences = HashMap::new();
    for (index, node) in input.nodes.iter().enumerate() {
        if node.kind == TaskKind::Compute && !node_barriers[index].is_empty() {
            compute_barrier_fences.insert(NodeId::new(index), fences.allocate());
        }
    }

    let mut reconcile_barriers = Vec::new();
    let mut reconcile_after_compute = false;
    let mut external_states = Vec::with_capacity(external_final.len());
    for (index, external) in input.registry.externals().iter().enumerate() {
        let last = external_final[index];
        if last != external.required_end_state {
            reconcile_barriers.push(TextureBarrier {
                texture: external.texture.id(),
                old_state: last,
                new_state: external.required_end_state,
            });
            let last_kind = uses
                .get(&external.handle)
                .and_then(|used| used.accessors.last())
                .map(|(node, _)| input.nodes[node.index()].kind);
            reconcile_after_compute |= last_kind == Some(TaskKind::Compute);
        }
        external_states.push((external.handle, external.required_end_state));
    }
    let reconcile_fence = reconcile_after_compute.then(|| fences.allocate());

    for &handle in input.registry.propagated() {
        if let Some(ResourceId::Pooled(pooled)) = linear.get(&handle).map(|&i| resources[i].id) {
            state.propagation.commit(handle, pooled);
            log::trace!("Propagating handle {} to the next frame", handle.id());
        }
    }

    log::debug!(
        "Compiled graph: {} node(s), {} resource(s), {} pool hit(s), {} pool miss(es), {} propagated, {} cross-queue edge(s)",
        input.nodes.len(),
        resources.len(),
        stats.pool_hits,
        stats.pool_misses,
        stats.propagated_reuses,
        dependencies.len()
    );

    Ok(CompiledPlan {
        base_stage,
        terminal_stage,
        linear,
        resources,
        transitions,
        node_barriers,
        dependencies,
        compute_barrier_fences,
        reconcile_barriers,
        reconcile_fence,
        external_states,
        stats,
    })
}

/// Check every recorded access and gather per-handle usage.
fn validate(input: &CompileInput<'_>) -> Result<HashMap<ResourceHandle, HandleUse>, GraphError> {
    let mut uses: HashMap<ResourceHandle, HandleUse> = HashMap::new();

    for (index, node) in input.nodes.iter().enumerate() {
        let id = NodeId::new(index);
        let mut seen = HashSet::with_capacity(node.accesses.len());
        for &(handle, access) in &node.accesses {
            if !seen.insert(handle) {
                log::error!(
                    "Node '{}' accesses resource {} more than once",
                    node.name,
                    handle.id()
                );
                return Err(GraphError::DuplicateAccess { node: id, handle });
            }
            if !access.allowed_for(node.kind) {
                log::error!(
                    "Compute node '{}' cannot access resource {} as {access:?}",
                    node.name,
                    handle.id()
                );
                return Err(GraphError::ComputeAccessNotAllowed {
                    node: id,
                    handle,
                    access,
                });
            }
            if !input.registry.contains(handle) {
                log::error!(
                    "Node '{}' accesses unknown resource {}",
                    node.name,
                    handle.id()
                );
                return Err(GraphError::UnknownHandle(handle));
            }

            let used = uses.entry(handle).or_insert_with(|| HandleUse {
                accessors: Vec::new(),
                usage: TextureUsage::empty(),
            });
            used.accessors.push((id, access));
            used.usage |= access.required_usage();
        }
    }

    for &handle in input.registry.handles() {
        if let Some(used) = uses.get(&handle) {
            if used
                .usage
                .contains(TextureUsage::RENDER_TARGET | TextureUsage::DEPTH_STENCIL)
            {
                log::error!(
                    "Resource {} is used as both render target and depth target",
                    handle.id()
                );
                return Err(GraphError::ConflictingTargetAccess(handle));
            }
        }
    }

    Ok(uses)
}

/// Re-resolve handles imported from earlier graphs against the live propagation maps.
fn resolve_propagated(
    input: &CompileInput<'_>,
    state: &ManagerState,
) -> Result<HashMap<ResourceHandle, PooledResourceId>, GraphError> {
    let mut resolved = HashMap::new();

    for &handle in input.registry.handles() {
        let Some(record) = input.registry.get(handle) else {
            continue;
        };
        let HandleOrigin::Propagated(recorded) = record.origin else {
            continue;
        };

        let Some((pooled, resource)) = state
            .propagation
            .lookup(handle)
            .and_then(|id| state.pool.get(id).map(|resource| (id, resource)))
        else {
            log::error!(
                "Propagated resource for handle {} expired before compile",
                handle.id()
            );
            return Err(GraphError::UnknownHandle(handle));
        };
        if pooled != recorded {
            log::debug!(
                "Handle {} was re-propagated since it was recorded",
                handle.id()
            );
        }

        let mut required = TextureUsage::empty();
        for node in input.nodes {
            if let Some(access) = node.access_to(handle) {
                required |= access.required_usage();
            }
        }
        let available = resource.texture().descriptor().usage;
        if !available.contains(required) {
            log::error!(
                "Propagated resource {} lacks usage {:?} for handle {}",
                resource.texture().debug_name(),
                required - available,
                handle.id()
            );
            return Err(GraphError::ResourceAllocation(
                GraphicsError::InvalidParameter(format!(
                    "propagated resource {} lacks usage {:?}",
                    resource.texture().debug_name(),
                    required - available
                )),
            ));
        }

        resolved.insert(handle, pooled);
    }

    Ok(resolved)
}

/// Find, for every node, the nearest earlier node of the other kind it conflicts with.
fn find_dependencies(nodes: &[TaskNode], fences: &FenceAllocator) -> Vec<DependencyEdge> {
    let mut edges = Vec::new();

    for (index, node) in nodes.iter().enumerate() {
        let nearest = nodes[..index]
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, earlier)| earlier.kind != node.kind)
            .find(|(_, earlier)| conflicts(earlier, node));

        if let Some((from, earlier)) = nearest {
            let edge = DependencyEdge {
                from: NodeId::new(from),
                to: NodeId::new(index),
                fence: fences.allocate(),
            };
            log::trace!(
                "Cross-queue dependency '{}' -> '{}' (fence {})",
                earlier.name,
                node.name,
                edge.fence.0
            );
            edges.push(edge);
        }
    }

    edges
}

/// Two nodes conflict when they share a handle and at least one of them writes it.
fn conflicts(earlier: &TaskNode, later: &TaskNode) -> bool {
    later.accesses.iter().any(|&(handle, later_access)| {
        earlier
            .access_to(handle)
            .is_some_and(|earlier_access| earlier_access.is_write() || later_access.is_write())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::graph::{GraphBuilder, ResourceDescription};
    use crate::manager::{GraphManager, GraphManagerConfig};
    use crate::types::TextureFormat;
    use std::sync::Arc;

    fn manager() -> (Arc<DummyBackend>, Arc<GraphManager>) {
        let backend = Arc::new(DummyBackend::new());
        let manager = GraphManager::new(backend.clone(), GraphManagerConfig::default());
        (backend, manager)
    }

    fn color() -> ResourceDescription {
        ResourceDescription::new_2d(256, 256, TextureFormat::Rgba16Float)
    }

    #[test]
    fn test_graphics_to_compute_dependency() {
        let (_, manager) = manager();
        let mut graph = GraphBuilder::new(&manager);
        let h = graph.create_resource(color()).unwrap();
        let a = graph.append_task_node("a", TaskKind::Graphics).unwrap();
        let b = graph.append_task_node("b", TaskKind::Compute).unwrap();
        graph
            .record_resource_access(a, h, AccessType::RenderTarget)
            .unwrap();
        graph
            .record_resource_access(b, h, AccessType::ShaderRead)
            .unwrap();
        graph.compile().unwrap();

        let plan = graph.plan().unwrap();
        assert_eq!(plan.dependencies().len(), 1);
        let edge = plan.dependencies()[0];
        assert_eq!((edge.from, edge.to), (a, b));
    }

    #[test]
    fn test_only_nearest_predecessor_is_kept() {
        let (_, manager) = manager();
        let mut graph = GraphBuilder::new(&manager);
        let h = graph.create_resource(color()).unwrap();
        let c0 = graph.append_task_node("c0", TaskKind::Compute).unwrap();
        let c1 = graph.append_task_node("c1", TaskKind::Compute).unwrap();
        let g2 = graph.append_task_node("g2", TaskKind::Graphics).unwrap();
        graph
            .record_resource_access(c0, h, AccessType::UnorderedAccess)
            .unwrap();
        graph
            .record_resource_access(c1, h, AccessType::UnorderedAccess)
            .unwrap();
        graph
            .record_resource_access(g2, h, AccessType::ShaderRead)
            .unwrap();
        graph.compile().unwrap();

        let edges = graph.plan().unwrap().dependencies();
        assert_eq!(edges.len(), 1);
        assert_eq!((edges[0].from, edges[0].to), (c1, g2));
    }

    #[test]
    fn test_shared_reads_need_no_fence() {
        let (_, manager) = manager();
        let mut graph = GraphBuilder::new(&manager);
        let h = graph.create_resource(color()).unwrap();
        let g = graph.append_task_node("g", TaskKind::Graphics).unwrap();
        let c = graph.append_task_node("c", TaskKind::Compute).unwrap();
        graph.record_resource_access(g, h, AccessType::ShaderRead).unwrap();
        graph.record_resource_access(c, h, AccessType::ShaderRead).unwrap();
        graph.compile().unwrap();
        assert!(graph.plan().unwrap().dependencies().is_empty());
    }

    #[test]
    fn test_edges_get_unique_fences() {
        let (_, manager) = manager();
        let mut graph = GraphBuilder::new(&manager);
        let h = graph.create_resource(color()).unwrap();
        let kinds = [TaskKind::Graphics, TaskKind::Compute, TaskKind::Graphics];
        let access = [
            AccessType::RenderTarget,
            AccessType::UnorderedAccess,
            AccessType::ShaderRead,
        ];
        for (i, (kind, access)) in kinds.into_iter().zip(access).enumerate() {
            let node = graph.append_task_node(format!("n{i}"), kind).unwrap();
            graph.record_resource_access(node, h, access).unwrap();
        }
        graph.compile().unwrap();

        let edges = graph.plan().unwrap().dependencies();
        assert_eq!(edges.len(), 2);
        assert_ne!(edges[0].fence, edges[1].fence);
    }

    #[test]
    fn test_sequential_handles_share_a_texture() {
        let (backend, manager) = manager();
        let mut graph = GraphBuilder::new(&manager);
        let first = graph.create_resource(color()).unwrap();
        let second = graph.create_resource(color()).unwrap();
        let n0 = graph.append_task_node("n0", TaskKind::Graphics).unwrap();
        let n1 = graph.append_task_node("n1", TaskKind::Graphics).unwrap();
        graph
            .record_resource_access(n0, first, AccessType::RenderTarget)
            .unwrap();
        graph
            .record_resource_access(n1, second, AccessType::RenderTarget)
            .unwrap();
        graph.compile().unwrap();

        let plan = graph.plan().unwrap();
        assert_eq!(plan.resource_id(first), plan.resource_id(second));
        assert_eq!(
            plan.stats(),
            CompileStats {
                pool_hits: 1,
                pool_misses: 1,
                ..CompileStats::default()
            }
        );
        assert_eq!(backend.created_texture_count(), 1);
    }

    #[test]
    fn test_overlapping_handles_get_distinct_textures() {
        let (_, manager) = manager();
        let mut graph = GraphBuilder::new(&manager);
        let first = graph.create_resource(color()).unwrap();
        let second = graph.create_resource(color()).unwrap();
        let n0 = graph.append_task_node("n0", TaskKind::Graphics).unwrap();
        let n1 = graph.append_task_node("n1", TaskKind::Graphics).unwrap();
        graph
            .record_resource_access(n0, first, AccessType::RenderTarget)
            .unwrap();
        graph
            .record_resource_access(n1, first, AccessType::ShaderRead)
            .unwrap();
        graph
            .record_resource_access(n1, second, AccessType::RenderTarget)
            .unwrap();
        graph.compile().unwrap();

        let plan = graph.plan().unwrap();
        assert_ne!(plan.resource_id(first), plan.resource_id(second));
        assert_eq!(manager.pooled_resource_count(), 2);
    }

    #[test]
    fn test_transitions_chain_through_nodes() {
        let (_, manager) = manager();
        let mut graph = GraphBuilder::new(&manager);
        let h = graph.create_resource(color()).unwrap();
        let n0 = graph.append_task_node("n0", TaskKind::Graphics).unwrap();
        let n1 = graph.append_task_node("n1", TaskKind::Graphics).unwrap();
        let n2 = graph.append_task_node("n2", TaskKind::Graphics).unwrap();
        graph
            .record_resource_access(n0, h, AccessType::RenderTarget)
            .unwrap();
        graph.record_resource_access(n1, h, AccessType::ShaderRead).unwrap();
        graph.record_resource_access(n2, h, AccessType::ShaderRead).unwrap();
        graph.compile().unwrap();

        let plan = graph.plan().unwrap();
        assert_eq!(
            plan.transition(n0, h),
            Some(Transition {
                prev: TextureState::Undefined,
                next: TextureState::RenderTarget
            })
        );
        assert_eq!(
            plan.transition(n1, h),
            Some(Transition {
                prev: TextureState::RenderTarget,
                next: TextureState::ShaderRead
            })
        );
        assert_eq!(plan.node_barriers(n1).len(), 1);
        assert!(plan.node_barriers(n2).is_empty());

        let id = match plan.resource_id(h) {
            Some(ResourceId::Pooled(id)) => id,
            other => panic!("expected a pooled resource, got {other:?}"),
        };
        assert_eq!(manager.cached_state(id), Some(TextureState::ShaderRead));
    }

    #[test]
    fn test_duplicate_access_fails_without_side_effects() {
        let (backend, manager) = manager();
        let mut graph = GraphBuilder::new(&manager);
        let h = graph.create_resource(color()).unwrap();
        let n = graph.append_task_node("n", TaskKind::Graphics).unwrap();
        graph.record_resource_access(n, h, AccessType::ShaderRead).unwrap();
        graph.record_resource_access(n, h, AccessType::ShaderRead).unwrap();

        assert_eq!(
            graph.compile(),
            Err(GraphError::DuplicateAccess { node: n, handle: h })
        );
        assert_eq!(graph.state(), crate::graph::BuilderState::Recording);
        assert_eq!(manager.pooled_resource_count(), 0);
        assert_eq!(backend.created_texture_count(), 0);
    }

    #[test]
    fn test_render_and_depth_target_conflict() {
        let (_, manager) = manager();
        let mut graph = GraphBuilder::new(&manager);
        let h = graph
            .create_resource(ResourceDescription::new_2d(
                64,
                64,
                TextureFormat::Depth32Float,
            ))
            .unwrap();
        let n0 = graph.append_task_node("n0", TaskKind::Graphics).unwrap();
        let n1 = graph.append_task_node("n1", TaskKind::Graphics).unwrap();
        graph
            .record_resource_access(n0, h, AccessType::DepthTarget)
            .unwrap();
        graph
            .record_resource_access(n1, h, AccessType::RenderTarget)
            .unwrap();
        assert_eq!(graph.compile(), Err(GraphError::ConflictingTargetAccess(h)));
    }

    #[test]
    fn test_compute_barrier_gets_fence() {
        let (_, manager) = manager();
        let mut graph = GraphBuilder::new(&manager);
        let h = graph.create_resource(color()).unwrap();
        let g = graph.append_task_node("g", TaskKind::Graphics).unwrap();
        let c = graph.append_task_node("c", TaskKind::Compute).unwrap();
        graph
            .record_resource_access(g, h, AccessType::RenderTarget)
            .unwrap();
        graph
            .record_resource_access(c, h, AccessType::UnorderedAccess)
            .unwrap();
        graph.compile().unwrap();

        let plan = graph.plan().unwrap();
        assert!(plan.compute_barrier_fence(c).is_some());
        assert!(plan.compute_barrier_fence(g).is_none());
        assert_ne!(
            plan.compute_barrier_fence(c),
            Some(plan.dependencies()[0].fence)
        );
    }

    #[test]
    fn test_stages_advance_across_graphs() {
        let (_, manager) = manager();
        let mut stages = Vec::new();
        for _ in 0..2 {
            let mut graph = GraphBuilder::new(&manager);
            let h = graph.create_resource(color()).unwrap();
            let n0 = graph.append_task_node("n0", TaskKind::Graphics).unwrap();
            let n1 = graph.append_task_node("n1", TaskKind::Graphics).unwrap();
            graph
                .record_resource_access(n0, h, AccessType::RenderTarget)
                .unwrap();
            graph.record_resource_access(n1, h, AccessType::ShaderRead).unwrap();
            graph.compile().unwrap();
            let plan = graph.plan().unwrap();
            stages.push((plan.stage_of(n0), plan.terminal_stage(), plan.lifetime(h)));
        }
        assert_eq!(stages[0].0, 0);
        assert_eq!(stages[0].1, 2);
        assert_eq!(stages[1].0, 3);
        assert_eq!(stages[1].2, Some(Lifetime { first: 3, last: 4 }));
    }
}
