//! GPU backend abstraction layer.
//!
//! The frame graph never talks to a graphics API directly. Everything it
//! needs from the device goes through the [`GpuBackend`] trait:
//! - 2D texture and typed view creation/destruction
//! - Command buffer creation, begin/end and resource-state barriers
//! - Queue submission and queue-level fence signal/wait
//!
//! # Available Backends
//!
//! - `dummy`: No-op backend that records every call, used for testing and
//!   tooling.

pub mod dummy;

use crate::error::GraphicsError;
use crate::scheduler::FenceId;
use crate::types::{QueueType, TextureDescriptor, TextureUsage};

pub use dummy::{BackendEvent, DummyBackend};

/// Opaque identifier of a backend texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

/// Handle to a GPU texture resource.
///
/// Cloning the handle does not duplicate the GPU allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuTexture {
    id: TextureId,
    descriptor: TextureDescriptor,
}

impl GpuTexture {
    /// Wrap a backend texture id together with the descriptor it was created from.
    pub fn new(id: TextureId, descriptor: TextureDescriptor) -> Self {
        Self { id, descriptor }
    }

    /// Get the backend id.
    pub fn id(&self) -> TextureId {
        self.id
    }

    /// Get the descriptor the texture was created with.
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    /// Get the debug label, falling back to the id.
    pub fn debug_name(&self) -> String {
        match &self.descriptor.label {
            Some(label) => label.clone(),
            None => format!("texture#{}", self.id.0),
        }
    }
}

/// Kind of typed view over a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// Color attachment view.
    RenderTarget,
    /// Depth/stencil attachment view.
    DepthStencil,
    /// Storage image view.
    UnorderedAccess,
    /// Sampled image view.
    ShaderRead,
}

impl ViewKind {
    /// All view kinds, in the order they are created.
    pub const ALL: [ViewKind; 4] = [
        ViewKind::RenderTarget,
        ViewKind::DepthStencil,
        ViewKind::UnorderedAccess,
        ViewKind::ShaderRead,
    ];

    /// Usage flag a texture needs for this view to be created.
    pub fn required_usage(self) -> TextureUsage {
        match self {
            Self::RenderTarget => TextureUsage::RENDER_TARGET,
            Self::DepthStencil => TextureUsage::DEPTH_STENCIL,
            Self::UnorderedAccess => TextureUsage::UNORDERED_ACCESS,
            Self::ShaderRead => TextureUsage::SHADER_READ,
        }
    }
}

/// Handle to a typed texture view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuTextureView {
    /// Backend view id.
    pub raw: u64,
    /// Texture the view belongs to.
    pub texture: TextureId,
    /// Kind of view.
    pub kind: ViewKind,
}

/// The set of views created for a texture, one per declared usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureViews {
    pub render_target: Option<GpuTextureView>,
    pub depth_stencil: Option<GpuTextureView>,
    pub unordered_access: Option<GpuTextureView>,
    pub shader_read: Option<GpuTextureView>,
}

impl TextureViews {
    /// Create every view the texture's usage flags allow.
    pub fn create_for(
        backend: &dyn GpuBackend,
        texture: &GpuTexture,
    ) -> Result<Self, GraphicsError> {
        let mut views = Self::default();
        for kind in ViewKind::ALL {
            if texture.descriptor().usage.contains(kind.required_usage()) {
                views.set(backend.create_texture_view(texture, kind)?);
            }
        }
        Ok(views)
    }

    /// Get the view of the given kind, if it was created.
    pub fn get(&self, kind: ViewKind) -> Option<GpuTextureView> {
        match kind {
            ViewKind::RenderTarget => self.render_target,
            ViewKind::DepthStencil => self.depth_stencil,
            ViewKind::UnorderedAccess => self.unordered_access,
            ViewKind::ShaderRead => self.shader_read,
        }
    }

    /// Store a view in the slot matching its kind.
    pub fn set(&mut self, view: GpuTextureView) {
        match view.kind {
            ViewKind::RenderTarget => self.render_target = Some(view),
            ViewKind::DepthStencil => self.depth_stencil = Some(view),
            ViewKind::UnorderedAccess => self.unordered_access = Some(view),
            ViewKind::ShaderRead => self.shader_read = Some(view),
        }
    }
}

/// GPU-visible access state of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureState {
    /// Contents undefined (freshly created).
    #[default]
    Undefined,
    /// Generic state usable by any queue.
    Common,
    /// Color attachment write.
    RenderTarget,
    /// Depth/stencil attachment write.
    DepthWrite,
    /// Storage image read/write.
    UnorderedAccess,
    /// Sampled read.
    ShaderRead,
    /// Copy source.
    CopySrc,
    /// Copy destination.
    CopyDst,
    /// Ready for presentation.
    Present,
}

/// A single texture state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureBarrier {
    /// Texture being transitioned.
    pub texture: TextureId,
    /// State before the barrier.
    pub old_state: TextureState,
    /// State after the barrier.
    pub new_state: TextureState,
}

/// Handle to a backend command buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuCommandBuffer {
    /// Backend command buffer id.
    pub raw: u64,
    /// Queue the command buffer records for.
    pub queue: QueueType,
}

/// Trait for the graphics layer the frame graph drives.
///
/// Implementations must be thread safe: node callbacks record into their own
/// command buffers concurrently.
pub trait GpuBackend: Send + Sync + 'static {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Create a 2D texture.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<GpuTexture, GraphicsError>;

    /// Create a typed view over a texture.
    fn create_texture_view(
        &self,
        texture: &GpuTexture,
        kind: ViewKind,
    ) -> Result<GpuTextureView, GraphicsError>;

    /// Destroy a texture and all views created over it.
    fn destroy_texture(&self, texture: GpuTexture);

    /// Create a command buffer for the given queue.
    fn create_command_buffer(&self, queue: QueueType) -> Result<GpuCommandBuffer, GraphicsError>;

    /// Reset and begin recording a command buffer.
    fn begin_command_buffer(&self, cmd: GpuCommandBuffer) -> Result<(), GraphicsError>;

    /// Finish recording a command buffer.
    fn end_command_buffer(&self, cmd: GpuCommandBuffer) -> Result<(), GraphicsError>;

    /// Record a batch of texture state transitions.
    fn texture_barriers(&self, cmd: GpuCommandBuffer, barriers: &[TextureBarrier]);

    /// Record a debug marker.
    fn insert_debug_marker(&self, cmd: GpuCommandBuffer, label: &str);

    /// Submit a batch of command buffers to a queue in order.
    fn submit(&self, queue: QueueType, command_buffers: &[GpuCommandBuffer])
    -> Result<(), GraphicsError>;

    /// Make the queue signal a fence value once prior submissions complete.
    fn signal_fence(&self, queue: QueueType, fence: FenceId, value: u64)
    -> Result<(), GraphicsError>;

    /// Make the queue wait for a fence value before running later submissions.
    fn wait_fence(&self, queue: QueueType, fence: FenceId, value: u64) -> Result<(), GraphicsError>;
}
