//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations. It hands out fresh
//! ids for every created object and appends each call to an event log, so
//! tests can assert on the exact barrier, submission and fence sequence a
//! frame graph produced.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::GraphicsError;
use crate::scheduler::FenceId;
use crate::types::{QueueType, TextureDescriptor};

use super::{
    GpuBackend, GpuCommandBuffer, GpuTexture, GpuTextureView, TextureBarrier, TextureId, ViewKind,
};

/// A call recorded by the [`DummyBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    CreateTexture {
        texture: TextureId,
        descriptor: TextureDescriptor,
    },
    CreateView {
        texture: TextureId,
        kind: ViewKind,
    },
    DestroyTexture(TextureId),
    CreateCommandBuffer(GpuCommandBuffer),
    BeginCommandBuffer(GpuCommandBuffer),
    EndCommandBuffer(GpuCommandBuffer),
    Barriers {
        cmd: GpuCommandBuffer,
        barriers: Vec<TextureBarrier>,
    },
    DebugMarker {
        cmd: GpuCommandBuffer,
        label: String,
    },
    Submit {
        queue: QueueType,
        command_buffers: Vec<GpuCommandBuffer>,
    },
    Signal {
        queue: QueueType,
        fence: FenceId,
        value: u64,
    },
    Wait {
        queue: QueueType,
        fence: FenceId,
        value: u64,
    },
}

/// Dummy GPU backend.
#[derive(Debug, Default)]
pub struct DummyBackend {
    next_id: AtomicU64,
    events: Mutex<Vec<BackendEvent>>,
    live_textures: Mutex<HashSet<TextureId>>,
    fail_texture_creation: AtomicBool,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent texture creation fail with [`GraphicsError::OutOfMemory`].
    pub fn set_fail_texture_creation(&self, fail: bool) {
        self.fail_texture_creation.store(fail, Ordering::Release);
    }

    /// Snapshot of all recorded events.
    pub fn events(&self) -> Vec<BackendEvent> {
        self.events.lock().clone()
    }

    /// Take all recorded events, leaving the log empty.
    pub fn take_events(&self) -> Vec<BackendEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Number of textures created and not yet destroyed.
    pub fn live_texture_count(&self) -> usize {
        self.live_textures.lock().len()
    }

    /// Number of texture creations recorded in the event log.
    pub fn created_texture_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| matches!(event, BackendEvent::CreateTexture { .. }))
            .count()
    }

    /// All barriers recorded into the given command buffer.
    pub fn barriers_in(&self, cmd: GpuCommandBuffer) -> Vec<TextureBarrier> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                BackendEvent::Barriers { cmd: c, barriers } if *c == cmd => Some(barriers.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// All debug markers recorded into the given command buffer.
    pub fn markers_in(&self, cmd: GpuCommandBuffer) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                BackendEvent::DebugMarker { cmd: c, label } if *c == cmd => Some(label.clone()),
                _ => None,
            })
            .collect()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn record(&self, event: BackendEvent) {
        self.events.lock().push(event);
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy"
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<GpuTexture, GraphicsError> {
        if self.fail_texture_creation.load(Ordering::Acquire) {
            log::trace!(
                "DummyBackend: failing texture creation {:?}",
                descriptor.label
            );
            return Err(GraphicsError::OutOfMemory);
        }
        let id = TextureId(self.next_id());
        log::trace!(
            "DummyBackend: creating texture {:?} ({}x{} {:?})",
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.format
        );
        self.live_textures.lock().insert(id);
        self.record(BackendEvent::CreateTexture {
            texture: id,
            descriptor: descriptor.clone(),
        });
        Ok(GpuTexture::new(id, descriptor.clone()))
    }

    fn create_texture_view(
        &self,
        texture: &GpuTexture,
        kind: ViewKind,
    ) -> Result<GpuTextureView, GraphicsError> {
        if !texture.descriptor().usage.contains(kind.required_usage()) {
            return Err(GraphicsError::InvalidParameter(format!(
                "{} lacks usage for a {kind:?} view",
                texture.debug_name()
            )));
        }
        let depth_format = texture.descriptor().format.is_depth_stencil();
        let format_ok = match kind {
            ViewKind::DepthStencil => depth_format,
            ViewKind::RenderTarget | ViewKind::UnorderedAccess => !depth_format,
            ViewKind::ShaderRead => true,
        };
        if !format_ok {
            return Err(GraphicsError::InvalidParameter(format!(
                "{:?} cannot back a {kind:?} view",
                texture.descriptor().format
            )));
        }
        self.record(BackendEvent::CreateView {
            texture: texture.id(),
            kind,
        });
        Ok(GpuTextureView {
            raw: self.next_id(),
            texture: texture.id(),
            kind,
        })
    }

    fn destroy_texture(&self, texture: GpuTexture) {
        log::trace!("DummyBackend: destroying texture {}", texture.debug_name());
        self.live_textures.lock().remove(&texture.id());
        self.record(BackendEvent::DestroyTexture(texture.id()));
    }

    fn create_command_buffer(&self, queue: QueueType) -> Result<GpuCommandBuffer, GraphicsError> {
        let cmd = GpuCommandBuffer {
            raw: self.next_id(),
            queue,
        };
        self.record(BackendEvent::CreateCommandBuffer(cmd));
        Ok(cmd)
    }

    fn begin_command_buffer(&self, cmd: GpuCommandBuffer) -> Result<(), GraphicsError> {
        self.record(BackendEvent::BeginCommandBuffer(cmd));
        Ok(())
    }

    fn end_command_buffer(&self, cmd: GpuCommandBuffer) -> Result<(), GraphicsError> {
        self.record(BackendEvent::EndCommandBuffer(cmd));
        Ok(())
    }

    fn texture_barriers(&self, cmd: GpuCommandBuffer, barriers: &[TextureBarrier]) {
        log::trace!(
            "DummyBackend: {} barrier(s) into command buffer {}",
            barriers.len(),
            cmd.raw
        );
        self.record(BackendEvent::Barriers {
            cmd,
            barriers: barriers.to_vec(),
        });
    }

    fn insert_debug_marker(&self, cmd: GpuCommandBuffer, label: &str) {
        self.record(BackendEvent::DebugMarker {
            cmd,
            label: label.to_string(),
        });
    }

    fn submit(
        &self,
        queue: QueueType,
        command_buffers: &[GpuCommandBuffer],
    ) -> Result<(), GraphicsError> {
        log::trace!(
            "DummyBackend: submitting {} command buffer(s) to the {} queue",
            command_buffers.len(),
            queue.name()
        );
        self.record(BackendEvent::Submit {
            queue,
            command_buffers: command_buffers.to_vec(),
        });
        Ok(())
    }

    fn signal_fence(
        &self,
        queue: QueueType,
        fence: FenceId,
        value: u64,
    ) -> Result<(), GraphicsError> {
        self.record(BackendEvent::Signal {
            queue,
            fence,
            value,
        });
        Ok(())
    }

    fn wait_fence(&self, queue: QueueType, fence: FenceId, value: u64) -> Result<(), GraphicsError> {
        self.record(BackendEvent::Wait {
            queue,
            fence,
            value,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TextureFormat, TextureUsage};

    fn descriptor() -> TextureDescriptor {
        TextureDescriptor::new_2d(
            128,
            128,
            TextureFormat::Rgba16Float,
            TextureUsage::RENDER_TARGET,
        )
    }

    #[test]
    fn test_dummy_backend_name() {
        assert_eq!(DummyBackend::new().name(), "Dummy");
    }

    #[test]
    fn test_texture_lifetime_tracking() {
        let backend = DummyBackend::new();
        let a = backend.create_texture(&descriptor()).unwrap();
        let b = backend.create_texture(&descriptor()).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(backend.live_texture_count(), 2);

        backend.destroy_texture(a);
        assert_eq!(backend.live_texture_count(), 1);
        assert_eq!(backend.created_texture_count(), 2);
    }

    #[test]
    fn test_forced_texture_failure() {
        let backend = DummyBackend::new();
        backend.set_fail_texture_creation(true);
        assert_eq!(
            backend.create_texture(&descriptor()),
            Err(GraphicsError::OutOfMemory)
        );
        backend.set_fail_texture_creation(false);
        assert!(backend.create_texture(&descriptor()).is_ok());
    }

    #[test]
    fn test_view_kind_must_match_format() {
        let backend = DummyBackend::new();
        let depth = backend
            .create_texture(&TextureDescriptor::new_2d(
                16,
                16,
                TextureFormat::Depth32Float,
                TextureUsage::DEPTH_STENCIL | TextureUsage::SHADER_READ | TextureUsage::RENDER_TARGET,
            ))
            .unwrap();
        assert!(backend.create_texture_view(&depth, ViewKind::DepthStencil).is_ok());
        assert!(backend.create_texture_view(&depth, ViewKind::ShaderRead).is_ok());
        assert!(matches!(
            backend.create_texture_view(&depth, ViewKind::RenderTarget),
            Err(GraphicsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_view_requires_usage() {
        let backend = DummyBackend::new();
        let texture = backend.create_texture(&descriptor()).unwrap();
        assert!(
            backend
                .create_texture_view(&texture, ViewKind::RenderTarget)
                .is_ok()
        );
        assert!(matches!(
            backend.create_texture_view(&texture, ViewKind::UnorderedAccess),
            Err(GraphicsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_event_log() {
        let backend = DummyBackend::new();
        let cmd = backend.create_command_buffer(QueueType::Compute).unwrap();
        backend.begin_command_buffer(cmd).unwrap();
        backend.insert_debug_marker(cmd, "blur");
        backend.end_command_buffer(cmd).unwrap();
        backend.submit(QueueType::Compute, &[cmd]).unwrap();

        assert_eq!(backend.markers_in(cmd), vec!["blur".to_string()]);
        let events = backend.take_events();
        assert_eq!(events.len(), 5);
        assert_eq!(
            events[4],
            BackendEvent::Submit {
                queue: QueueType::Compute,
                command_buffers: vec![cmd],
            }
        );
        assert!(backend.events().is_empty());
    }
}
