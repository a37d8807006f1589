//! Frame submission.
//!
//! Executing a compiled graph produces a [`FrameSubmission`]: one ordered
//! sequence of [`SubmitItem`]s per queue. [`submit_frame`] hands both
//! sequences to the backend, coalescing runs of consecutive command buffers
//! into single submit calls and issuing fence Signal/Wait between them in
//! order.
//!
//! # Example
//!
//! ```ignore
//! let submission = builder.execute()?;
//! let stats = submit_frame(backend.as_ref(), &submission)?;
//! log::debug!("{} graphics submits", stats.graphics_submits);
//! ```

mod sync;

pub use sync::{FENCE_SIGNAL_VALUE, FenceAllocator, FenceId};

use crate::backend::{GpuBackend, GpuCommandBuffer, TextureState};
use crate::command::CommandBuffer;
use crate::error::GraphicsError;
use crate::graph::ResourceHandle;
use crate::types::QueueType;

/// One element of a queue's submission sequence.
#[derive(Debug)]
pub enum SubmitItem {
    /// A recorded command buffer.
    CommandBuffer(CommandBuffer),
    /// Signal a fence once everything before it on this queue completes.
    Signal { fence: FenceId, value: u64 },
    /// Block later work on this queue until the fence reaches the value.
    Wait { fence: FenceId, value: u64 },
}

impl SubmitItem {
    /// Get the command buffer, if this item is one.
    pub fn as_command_buffer(&self) -> Option<&CommandBuffer> {
        match self {
            Self::CommandBuffer(cmd) => Some(cmd),
            _ => None,
        }
    }
}

/// The result of executing a frame graph.
#[derive(Debug, Default)]
pub struct FrameSubmission {
    /// Graphics queue sequence.
    pub graphics: Vec<SubmitItem>,
    /// Compute queue sequence.
    pub compute: Vec<SubmitItem>,
    /// State every external resource is left in after the final barrier pass.
    pub external_states: Vec<(ResourceHandle, TextureState)>,
}

impl FrameSubmission {
    /// Get the sequence for a queue.
    pub fn items(&self, queue: QueueType) -> &[SubmitItem] {
        match queue {
            QueueType::Graphics => &self.graphics,
            QueueType::Compute => &self.compute,
        }
    }

    /// Number of command buffers in a queue's sequence.
    pub fn command_buffer_count(&self, queue: QueueType) -> usize {
        self.items(queue)
            .iter()
            .filter(|item| matches!(item, SubmitItem::CommandBuffer(_)))
            .count()
    }

    /// Final state of an external resource.
    pub fn final_state_of(&self, handle: ResourceHandle) -> Option<TextureState> {
        self.external_states
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, state)| *state)
    }

    /// Returns true if neither queue has anything to submit.
    pub fn is_empty(&self) -> bool {
        self.graphics.is_empty() && self.compute.is_empty()
    }
}

/// Number of backend submit calls issued per queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitStats {
    pub graphics_submits: usize,
    pub compute_submits: usize,
}

/// Submit both queue sequences of a frame.
pub fn submit_frame(
    backend: &dyn GpuBackend,
    submission: &FrameSubmission,
) -> Result<SubmitStats, GraphicsError> {
    crate::profile_function!();

    Ok(SubmitStats {
        graphics_submits: submit_queue(backend, QueueType::Graphics, &submission.graphics)?,
        compute_submits: submit_queue(backend, QueueType::Compute, &submission.compute)?,
    })
}

/// Submit one queue's sequence, returning the number of submit calls.
pub fn submit_queue(
    backend: &dyn GpuBackend,
    queue: QueueType,
    items: &[SubmitItem],
) -> Result<usize, GraphicsError> {
    let mut batch: Vec<GpuCommandBuffer> = Vec::new();
    let mut submits = 0;

    for item in items {
        match item {
            SubmitItem::CommandBuffer(cmd) => batch.push(cmd.raw()),
            SubmitItem::Signal { fence, value } => {
                submits += flush(backend, queue, &mut batch)?;
                backend.signal_fence(queue, *fence, *value)?;
            }
            SubmitItem::Wait { fence, value } => {
                submits += flush(backend, queue, &mut batch)?;
                backend.wait_fence(queue, *fence, *value)?;
            }
        }
    }
    submits += flush(backend, queue, &mut batch)?;

    log::trace!(
        "Submitted {} item(s) to the {} queue in {submits} batch(es)",
        items.len(),
        queue.name()
    );
    Ok(submits)
}

fn flush(
    backend: &dyn GpuBackend,
    queue: QueueType,
    batch: &mut Vec<GpuCommandBuffer>,
) -> Result<usize, GraphicsError> {
    if batch.is_empty() {
        return Ok(0);
    }
    backend.submit(queue, batch)?;
    batch.clear();
    Ok(1)
}
