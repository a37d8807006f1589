//! Per-frame command buffer pool.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::CommandBuffer;
use crate::backend::{GpuBackend, GpuCommandBuffer};
use crate::error::GraphicsError;
use crate::types::QueueType;

/// Supplies command buffers to node callbacks and to the graph's own
/// barrier passes.
///
/// Command buffers handed out during a frame stay reserved until
/// `frames_in_flight` further frames have begun, after which they return to
/// the free list of their queue and are reused instead of created.
pub struct CommandBufferPool {
    backend: Arc<dyn GpuBackend>,
    frames_in_flight: u64,
    inner: Mutex<PoolInner>,
}

#[derive(Default)]
struct PoolInner {
    frame: u64,
    free_graphics: Vec<GpuCommandBuffer>,
    free_compute: Vec<GpuCommandBuffer>,
    current: Vec<GpuCommandBuffer>,
    in_flight: VecDeque<(u64, Vec<GpuCommandBuffer>)>,
    created: usize,
}

impl PoolInner {
    fn free_list(&mut self, queue: QueueType) -> &mut Vec<GpuCommandBuffer> {
        match queue {
            QueueType::Graphics => &mut self.free_graphics,
            QueueType::Compute => &mut self.free_compute,
        }
    }
}

impl CommandBufferPool {
    /// Create a new pool.
    pub fn new(backend: Arc<dyn GpuBackend>, frames_in_flight: u32) -> Self {
        Self {
            backend,
            frames_in_flight: u64::from(frames_in_flight.max(1)),
            inner: Mutex::new(PoolInner::default()),
        }
    }

    /// Acquire a command buffer for a queue, already in the recording state.
    pub fn acquire(&self, queue: QueueType, label: &str) -> Result<CommandBuffer, GraphicsError> {
        let recycled = {
            let mut inner = self.inner.lock();
            inner.free_list(queue).pop()
        };

        let raw = match recycled {
            Some(raw) => raw,
            None => {
                let raw = self.backend.create_command_buffer(queue)?;
                self.inner.lock().created += 1;
                raw
            }
        };

        self.backend.begin_command_buffer(raw)?;
        self.inner.lock().current.push(raw);
        log::trace!(
            "Acquired {} command buffer {} for '{label}'",
            queue.name(),
            raw.raw
        );
        Ok(CommandBuffer::new(raw, self.backend.clone()))
    }

    /// Start a new frame, recycling command buffers whose frame has retired.
    pub fn advance_frame(&self) {
        let mut inner = self.inner.lock();
        let frame = inner.frame;
        let current = std::mem::take(&mut inner.current);
        if !current.is_empty() {
            inner.in_flight.push_back((frame, current));
        }
        inner.frame += 1;

        let now = inner.frame;
        while let Some((submitted, _)) = inner.in_flight.front() {
            if now - submitted < self.frames_in_flight {
                break;
            }
            if let Some((_, retired)) = inner.in_flight.pop_front() {
                for raw in retired {
                    inner.free_list(raw.queue).push(raw);
                }
            }
        }
    }

    /// Total number of backend command buffers created by this pool.
    pub fn created_count(&self) -> usize {
        self.inner.lock().created
    }

    /// Number of command buffers ready for reuse on a queue.
    pub fn free_count(&self, queue: QueueType) -> usize {
        self.inner.lock().free_list(queue).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    fn pool(frames_in_flight: u32) -> CommandBufferPool {
        CommandBufferPool::new(Arc::new(DummyBackend::new()), frames_in_flight)
    }

    #[test]
    fn test_acquire_creates_buffers() {
        let pool = pool(2);
        let a = pool.acquire(QueueType::Graphics, "a").unwrap();
        let b = pool.acquire(QueueType::Compute, "b").unwrap();
        assert_ne!(a.raw(), b.raw());
        assert_eq!(a.queue(), QueueType::Graphics);
        assert_eq!(b.queue(), QueueType::Compute);
        assert_eq!(pool.created_count(), 2);
    }

    #[test]
    fn test_buffers_recycle_after_frames_in_flight() {
        let pool = pool(2);
        let first = pool.acquire(QueueType::Graphics, "frame0").unwrap().raw();

        pool.advance_frame();
        assert_eq!(pool.free_count(QueueType::Graphics), 0);
        let second = pool.acquire(QueueType::Graphics, "frame1").unwrap().raw();
        assert_ne!(first, second);

        pool.advance_frame();
        assert_eq!(pool.free_count(QueueType::Graphics), 1);
        let reused = pool.acquire(QueueType::Graphics, "frame2").unwrap().raw();
        assert_eq!(reused, first);
        assert_eq!(pool.created_count(), 2);
    }

    #[test]
    fn test_free_lists_are_per_queue() {
        let pool = pool(1);
        pool.acquire(QueueType::Compute, "c").unwrap();
        pool.advance_frame();
        assert_eq!(pool.free_count(QueueType::Compute), 1);
        assert_eq!(pool.free_count(QueueType::Graphics), 0);

        pool.acquire(QueueType::Graphics, "g").unwrap();
        assert_eq!(pool.created_count(), 2);
    }
}
