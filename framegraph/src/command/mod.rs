//! Command buffers.
//!
//! - [`CommandBuffer`] - a recording command buffer handed to node callbacks
//! - [`CommandBufferPool`] - per-frame reuse of backend command buffers
//! - [`CommandBufferAllocator`] - lazy per-node access to pooled command buffers

mod allocator;
mod pool;

pub use allocator::CommandBufferAllocator;
pub use pool::CommandBufferPool;

use std::fmt;
use std::sync::Arc;

use crate::backend::{GpuBackend, GpuCommandBuffer, TextureBarrier};
use crate::error::GraphicsError;
use crate::types::QueueType;

/// A command buffer in the recording state.
///
/// Obtained from a [`CommandBufferPool`]. The frame graph ends it before
/// submission, so callbacks only record.
pub struct CommandBuffer {
    raw: GpuCommandBuffer,
    backend: Arc<dyn GpuBackend>,
}

impl CommandBuffer {
    pub(crate) fn new(raw: GpuCommandBuffer, backend: Arc<dyn GpuBackend>) -> Self {
        Self { raw, backend }
    }

    /// Get the backend command buffer.
    pub fn raw(&self) -> GpuCommandBuffer {
        self.raw
    }

    /// Get the queue this command buffer records for.
    pub fn queue(&self) -> QueueType {
        self.raw.queue
    }

    /// Record texture state transitions. Barriers whose old and new state match are skipped.
    pub fn texture_barriers(&self, barriers: &[TextureBarrier]) {
        let barriers: Vec<TextureBarrier> = barriers
            .iter()
            .filter(|b| b.old_state != b.new_state)
            .copied()
            .collect();
        if !barriers.is_empty() {
            self.backend.texture_barriers(self.raw, &barriers);
        }
    }

    /// Record a debug marker.
    pub fn debug_marker(&self, label: &str) {
        self.backend.insert_debug_marker(self.raw, label);
    }

    pub(crate) fn end(&self) -> Result<(), GraphicsError> {
        self.backend.end_command_buffer(self.raw)
    }
}

impl fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("raw", &self.raw.raw)
            .field("queue", &self.raw.queue)
            .finish_non_exhaustive()
    }
}
