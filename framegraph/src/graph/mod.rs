//! Frame graph infrastructure.
//!
//! A frame graph records one frame's GPU work as an ordered sequence of task
//! nodes together with the resources they touch, then compiles that record
//! into a concrete plan:
//!
//! - Resource allocation and lifetime-based reuse from the manager's pool
//! - State-transition (barrier) placement per node
//! - Cross-queue fences between graphics and compute nodes
//! - An ordered submission sequence per queue
//!
//! Append order is the only ordering contract. Nodes may record in parallel,
//! but their command buffers are always submitted in append order.
//!
//! # Example
//!
//! ```ignore
//! let mut graph = GraphBuilder::new(&manager);
//! let depth = graph.create_resource(ResourceDescription::full_resolution(TextureFormat::Depth32Float))?;
//! let ao = graph.create_resource(ResourceDescription::relative(0.5, 0.5, TextureFormat::R8Unorm))?;
//!
//! let prepass = graph.append_task_node("depth prepass", TaskKind::Graphics)?;
//! graph.record_resource_access(prepass, depth, AccessType::DepthTarget)?;
//!
//! let ssao = graph.append_task_node("ssao", TaskKind::Compute)?;
//! graph.record_resource_access(ssao, depth, AccessType::ShaderRead)?;
//! graph.record_resource_access(ssao, ao, AccessType::UnorderedAccess)?;
//!
//! graph.compile()?;
//! let submission = graph.execute()?;
//! ```

mod access;
mod builder;
mod compiler;
mod context;
mod executor;
mod handle;
mod node;
mod registry;
mod resource;

pub use access::AccessType;
pub use builder::{BuilderState, GraphBuilder};
pub use compiler::{
    AllocatedResource, CompileStats, CompiledPlan, DependencyEdge, Lifetime, ResourceId,
    Transition,
};
pub use context::GraphContext;
pub use handle::{HandleFlags, ResourceHandle};
pub use node::{NodeId, RenderFn, TaskKind, TaskNode};
pub use registry::ExternalResource;
pub use resource::{ResourceDescription, ResourceSize};

pub(crate) use compiler::compile;
