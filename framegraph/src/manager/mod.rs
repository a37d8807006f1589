//! Long-lived, cross-frame frame graph state.
//!
//! A [`GraphManager`] owns everything that outlives a single graph:
//! - the pool of reusable GPU textures ([`ResourcePool`])
//! - the frame-to-frame propagation maps ([`PropagationMaps`])
//! - the command buffer pool
//! - an optional job system for parallel node recording
//!
//! Compiles of builders sharing a manager are serialized by one lock. Because
//! compile updates each pooled texture's cached state and execute consumes
//! it, builders must be executed in the order they were compiled.

mod config;
mod propagation;
mod resource_pool;

pub use config::GraphManagerConfig;
pub use propagation::PropagationMaps;
pub use resource_pool::{PoolRequest, PooledResource, PooledResourceId, ResourcePool};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::backend::{GpuBackend, GpuTexture, TextureState};
use crate::command::CommandBufferPool;
use crate::error::GraphError;
use crate::graph::{GraphBuilder, ResourceDescription, ResourceHandle};
use crate::jobs::{JobSystem, ThreadPool};
use crate::scheduler::FenceAllocator;

/// State mutated only under the compile lock.
#[derive(Debug, Default)]
pub(crate) struct ManagerState {
    pub pool: ResourcePool,
    pub propagation: PropagationMaps,
    /// First stage of the next compiled graph.
    pub stage_cursor: u64,
}

/// Owns the resource pool, propagation maps, command buffer pool and job
/// system shared by every graph built against it.
pub struct GraphManager {
    backend: Arc<dyn GpuBackend>,
    config: GraphManagerConfig,
    next_handle_id: AtomicU64,
    frame_index: AtomicU64,
    fences: FenceAllocator,
    state: Mutex<ManagerState>,
    command_pool: CommandBufferPool,
    job_system: Option<Arc<dyn JobSystem>>,
}

impl GraphManager {
    /// Create a manager. A [`ThreadPool`] is created when the config asks for
    /// worker threads.
    pub fn new(backend: Arc<dyn GpuBackend>, config: GraphManagerConfig) -> Arc<Self> {
        let job_system = config
            .worker_threads
            .map(|threads| Arc::new(ThreadPool::new(threads)) as Arc<dyn JobSystem>);
        Self::build(backend, config, job_system)
    }

    /// Create a manager that records nodes on a caller-provided job system.
    pub fn with_job_system(
        backend: Arc<dyn GpuBackend>,
        config: GraphManagerConfig,
        job_system: Arc<dyn JobSystem>,
    ) -> Arc<Self> {
        Self::build(backend, config, Some(job_system))
    }

    fn build(
        backend: Arc<dyn GpuBackend>,
        config: GraphManagerConfig,
        job_system: Option<Arc<dyn JobSystem>>,
    ) -> Arc<Self> {
        if config.eviction_idle_frames < config.frames_in_flight {
            log::warn!(
                "Eviction after {} idle frames is shorter than {} frames in flight; textures may be destroyed while the GPU still uses them",
                config.eviction_idle_frames,
                config.frames_in_flight
            );
        }
        log::info!(
            "Frame graph manager on {} backend ({} worker(s))",
            backend.name(),
            job_system.as_ref().map_or(1, |jobs| jobs.worker_count())
        );

        Arc::new(Self {
            command_pool: CommandBufferPool::new(backend.clone(), config.frames_in_flight),
            backend,
            config,
            next_handle_id: AtomicU64::new(0),
            frame_index: AtomicU64::new(0),
            fences: FenceAllocator::new(),
            state: Mutex::new(ManagerState::default()),
            job_system,
        })
    }

    /// Create a builder for a new graph.
    pub fn create_builder(self: &Arc<Self>) -> GraphBuilder {
        GraphBuilder::new(self)
    }

    /// The backend.
    pub fn backend(&self) -> &Arc<dyn GpuBackend> {
        &self.backend
    }

    /// The configuration.
    pub fn config(&self) -> &GraphManagerConfig {
        &self.config
    }

    /// The job system used by [`GraphBuilder::execute`], if any.
    pub fn job_system(&self) -> Option<&dyn JobSystem> {
        self.job_system.as_deref()
    }

    /// The command buffer pool.
    pub fn command_pool(&self) -> &CommandBufferPool {
        &self.command_pool
    }

    /// Resolve a recorded graph into an execution plan.
    ///
    /// On failure the builder stays in [`BuilderState::Recording`](crate::graph::BuilderState::Recording).
    /// Validation failures leave the manager untouched.
    pub fn compile(&self, builder: &mut GraphBuilder) -> Result<(), GraphError> {
        crate::profile_scope!("framegraph_compile");

        if !std::ptr::eq(Arc::as_ptr(builder.manager()), self) {
            log::error!("Graph was created by a different manager");
            return Err(GraphError::ForeignManager);
        }
        builder.expect_state("compile", crate::graph::BuilderState::Recording)?;

        let plan = {
            let mut state = self.state.lock();
            crate::graph::compile(
                builder.compile_input(),
                &mut state,
                self.backend.as_ref(),
                &self.fences,
            )?
        };
        builder.set_compiled(plan);
        Ok(())
    }

    /// Frame boundary.
    ///
    /// Flips the propagation maps, ages the pool (destroying textures idle for
    /// longer than the configured number of frames) and recycles command
    /// buffers whose frame has retired.
    pub fn begin_frame(&self) {
        crate::profile_scope!("framegraph_begin_frame");

        let frame = self.frame_index.fetch_add(1, Ordering::AcqRel) + 1;
        let evicted = {
            let mut state = self.state.lock();
            state.propagation.flip();
            let reserved = state.propagation.reserved();
            let evicted = state.pool.age(
                self.backend.as_ref(),
                self.config.eviction_idle_frames,
                &reserved,
            );
            crate::profile_plot!("framegraph_pooled_textures", state.pool.len());
            evicted
        };
        self.command_pool.advance_frame();

        log::debug!("Frame {frame} begins ({evicted} pooled texture(s) evicted)");
        crate::frame_mark!();
    }

    /// Index of the current frame; starts at 0 and grows with every [`Self::begin_frame`].
    pub fn frame_index(&self) -> u64 {
        self.frame_index.load(Ordering::Acquire)
    }

    /// Number of textures in the pool.
    pub fn pooled_resource_count(&self) -> usize {
        self.state.lock().pool.len()
    }

    /// Pooled resource a handle is currently propagated to.
    pub fn propagated_resource(&self, handle: ResourceHandle) -> Option<PooledResourceId> {
        self.state.lock().propagation.lookup(handle)
    }

    /// State a pooled texture was left in by the last compiled graph.
    pub fn cached_state(&self, id: PooledResourceId) -> Option<TextureState> {
        self.state.lock().pool.get(id).map(|resource| resource.state())
    }

    /// Texture of a pooled resource.
    pub fn pooled_texture(&self, id: PooledResourceId) -> Option<GpuTexture> {
        self.state
            .lock()
            .pool
            .get(id)
            .map(|resource| resource.texture().clone())
    }

    pub(crate) fn allocate_handle_id(&self) -> u64 {
        self.next_handle_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Pooled resource and description of a handle propagated by an earlier graph.
    pub(crate) fn propagated_description(
        &self,
        handle: ResourceHandle,
    ) -> Option<(PooledResourceId, ResourceDescription)> {
        let state = self.state.lock();
        let id = state.propagation.lookup(handle)?;
        let resource = state.pool.get(id)?;
        Some((id, ResourceDescription::from_texture(resource.texture())))
    }
}

impl Drop for GraphManager {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        log::debug!(
            "Destroying {} pooled texture(s) with the frame graph manager",
            state.pool.len()
        );
        state.pool.clear(self.backend.as_ref());
    }
}

impl std::fmt::Debug for GraphManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphManager")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .field("frame_index", &self.frame_index())
            .finish_non_exhaustive()
    }
}
