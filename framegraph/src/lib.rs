//! # RedLilium Frame Graph
//!
//! Per-frame GPU work scheduling built around a declarative task graph.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`GraphBuilder`] - Records task nodes and the resources they access, then
//!   compiles and executes them
//! - [`GraphManager`] - Cross-frame owner of the texture pool, the resource
//!   propagation maps and the command buffer pool
//! - [`GpuBackend`] - Trait the graph drives, with a recording [`DummyBackend`]
//!   for tests and tooling
//! - [`submit_frame`] - Hands an executed frame to the backend queues
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use redlilium_framegraph::{
//!     AccessType, DummyBackend, GraphManager, GraphManagerConfig, ResourceDescription,
//!     TaskKind, TextureFormat, submit_frame,
//! };
//!
//! let backend = Arc::new(DummyBackend::new());
//! let manager = GraphManager::new(backend.clone(), GraphManagerConfig::default());
//!
//! let mut graph = manager.create_builder();
//! let color = graph
//!     .create_resource(ResourceDescription::full_resolution(TextureFormat::Rgba8Unorm))
//!     .unwrap();
//! let node = graph.append_task_node("main", TaskKind::Graphics).unwrap();
//! graph.record_resource_access(node, color, AccessType::RenderTarget).unwrap();
//! graph
//!     .register_task_node_render_function(node, |ctx, cmds| {
//!         let cmd = cmds.get_or_create_back().unwrap();
//!         cmd.debug_marker(ctx.node_name());
//!     })
//!     .unwrap();
//!
//! graph.compile().unwrap();
//! let submission = graph.execute().unwrap();
//! submit_frame(backend.as_ref(), &submission).unwrap();
//! manager.begin_frame();
//! ```

pub mod backend;
pub mod command;
pub mod error;
pub mod graph;
pub mod jobs;
pub mod manager;
pub mod profiling;
pub mod scheduler;
pub mod types;

// Re-export main types for convenience
pub use backend::{
    BackendEvent, DummyBackend, GpuBackend, GpuCommandBuffer, GpuTexture, GpuTextureView,
    TextureBarrier, TextureId, TextureState, TextureViews, ViewKind,
};
pub use command::{CommandBuffer, CommandBufferAllocator, CommandBufferPool};
pub use error::{GraphError, GraphicsError};
pub use graph::{
    AccessType, AllocatedResource, BuilderState, CompileStats, CompiledPlan, GraphBuilder,
    GraphContext, HandleFlags, NodeId, ResourceDescription, ResourceHandle, ResourceSize,
    TaskKind,
};
pub use jobs::{JobSystem, ThreadPool};
pub use manager::{GraphManager, GraphManagerConfig, PooledResourceId};
pub use scheduler::{FenceId, FrameSubmission, SubmitItem, SubmitStats, submit_frame};
pub use types::{Extent2d, QueueType, TextureDescriptor, TextureFormat, TextureUsage};

/// Frame graph library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
