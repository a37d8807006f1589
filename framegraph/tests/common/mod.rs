//! Common utilities for frame graph integration tests.
//!
//! Every test drives the graph against the [`DummyBackend`], whose event log
//! lets assertions inspect barriers, submits and fence operations.

#![allow(dead_code)]

use std::sync::Arc;

use redlilium_framegraph::{
    DummyBackend, FrameSubmission, GpuBackend, GpuTexture, GraphBuilder, GraphManager,
    GraphManagerConfig, SubmitItem, TextureDescriptor, TextureFormat, TextureUsage, TextureViews,
    ThreadPool,
};

/// How a compiled graph records its nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// Every node on the calling thread.
    Sequential,
    /// Nodes as jobs on a four-worker [`ThreadPool`].
    Parallel,
}

/// A dummy backend together with a manager bound to it.
pub struct TestContext {
    pub backend: Arc<DummyBackend>,
    pub manager: Arc<GraphManager>,
    jobs: ThreadPool,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(GraphManagerConfig::default())
    }

    pub fn with_config(config: GraphManagerConfig) -> Self {
        init_logging();
        let backend = Arc::new(DummyBackend::new());
        let manager = GraphManager::new(backend.clone(), config);
        Self {
            backend,
            manager,
            jobs: ThreadPool::new(4),
        }
    }

    pub fn builder(&self) -> GraphBuilder {
        self.manager.create_builder()
    }

    /// Execute a compiled graph in the requested mode.
    pub fn execute(&self, graph: &mut GraphBuilder, execution: Execution) -> FrameSubmission {
        let jobs = match execution {
            Execution::Sequential => None,
            Execution::Parallel => Some(&self.jobs as &dyn redlilium_framegraph::JobSystem),
        };
        graph.execute_with(jobs).expect("graph execution failed")
    }

    /// Create a texture the graph does not own, with views for its usage.
    pub fn external_texture(
        &self,
        label: &str,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> (GpuTexture, TextureViews) {
        let descriptor = TextureDescriptor::new_2d(800, 600, format, usage).with_label(label);
        let texture = self
            .backend
            .create_texture(&descriptor)
            .expect("external texture creation failed");
        let views = TextureViews::create_for(self.backend.as_ref(), &texture)
            .expect("external view creation failed");
        (texture, views)
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Index of the first item matching a predicate.
pub fn position_of(items: &[SubmitItem], pred: impl Fn(&SubmitItem) -> bool) -> Option<usize> {
    items.iter().position(pred)
}

/// Index of the first command buffer in a sequence.
pub fn first_command_buffer(items: &[SubmitItem]) -> Option<usize> {
    position_of(items, |item| matches!(item, SubmitItem::CommandBuffer(_)))
}

/// Index of the last command buffer in a sequence.
pub fn last_command_buffer(items: &[SubmitItem]) -> Option<usize> {
    items
        .iter()
        .rposition(|item| matches!(item, SubmitItem::CommandBuffer(_)))
}
