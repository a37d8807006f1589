//! Lazy per-node command buffer allocator.

use super::{CommandBuffer, CommandBufferPool};
use crate::error::GraphicsError;
use crate::types::QueueType;

/// Hands command buffers to a node callback on demand.
///
/// Buffers are acquired from the pool the first time they are asked for and
/// are submitted in slot order. For graphics nodes slot 0 is pre-filled and
/// already carries the node's barriers.
///
/// ```ignore
/// builder.register_task_node_render_function(node, |ctx, cmds| {
///     let buffers = cmds.alloc(4).unwrap();
///     std::thread::scope(|s| {
///         for cmd in buffers {
///             s.spawn(move || record_chunk(ctx, cmd));
///         }
///     });
/// })?;
/// ```
pub struct CommandBufferAllocator<'a> {
    pool: &'a CommandBufferPool,
    queue: QueueType,
    label: &'a str,
    buffers: Vec<CommandBuffer>,
    error: Option<GraphicsError>,
}

impl<'a> CommandBufferAllocator<'a> {
    pub(crate) fn new(pool: &'a CommandBufferPool, queue: QueueType, label: &'a str) -> Self {
        Self {
            pool,
            queue,
            label,
            buffers: Vec::new(),
            error: None,
        }
    }

    pub(crate) fn with_front(
        pool: &'a CommandBufferPool,
        queue: QueueType,
        label: &'a str,
        front: CommandBuffer,
    ) -> Self {
        let mut allocator = Self::new(pool, queue, label);
        allocator.buffers.push(front);
        allocator
    }

    /// Queue the allocated command buffers are submitted to.
    pub fn queue(&self) -> QueueType {
        self.queue
    }

    /// Number of command buffers allocated so far.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Returns true if no command buffer has been allocated yet.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Make sure at least `count` command buffers exist and return all of them.
    pub fn alloc(&mut self, count: usize) -> Result<&[CommandBuffer], GraphicsError> {
        self.grow_to(count)?;
        Ok(&self.buffers)
    }

    /// Get the command buffer in slot `index`, allocating every slot up to it.
    pub fn get_or_create(&mut self, index: usize) -> Result<&CommandBuffer, GraphicsError> {
        self.grow_to(index + 1)?;
        Ok(&self.buffers[index])
    }

    /// Get the first command buffer, allocating it if needed.
    pub fn get_or_create_front(&mut self) -> Result<&CommandBuffer, GraphicsError> {
        self.get_or_create(0)
    }

    /// Get the last command buffer, allocating one if none exists.
    pub fn get_or_create_back(&mut self) -> Result<&CommandBuffer, GraphicsError> {
        let index = self.buffers.len().max(1) - 1;
        self.get_or_create(index)
    }

    fn grow_to(&mut self, count: usize) -> Result<(), GraphicsError> {
        while self.buffers.len() < count {
            match self.pool.acquire(self.queue, self.label) {
                Ok(cmd) => self.buffers.push(cmd),
                Err(err) => {
                    log::error!(
                        "Failed to allocate a {} command buffer for '{}': {err}",
                        self.queue.name(),
                        self.label
                    );
                    self.error.get_or_insert(err.clone());
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Consume the allocator, returning the buffers in slot order or the first
    /// allocation failure the callback saw.
    pub(crate) fn finish(self) -> Result<Vec<CommandBuffer>, GraphicsError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.buffers),
        }
    }
}
