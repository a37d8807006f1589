//! Access types nodes declare against resource handles.

use super::TaskKind;
use crate::backend::TextureState;
use crate::types::TextureUsage;

/// How a node uses a resource.
///
/// `RenderTarget` and `DepthTarget` are mutually exclusive on one handle
/// within a compiled graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessType {
    /// Written as a color attachment.
    RenderTarget,
    /// Written as a depth/stencil attachment.
    DepthTarget,
    /// Read and written as a storage image.
    UnorderedAccess,
    /// Sampled in a shader.
    ShaderRead,
}

impl AccessType {
    /// Check if this access writes the resource.
    pub fn is_write(self) -> bool {
        !matches!(self, Self::ShaderRead)
    }

    /// State the resource must be in for this access.
    pub fn target_state(self) -> TextureState {
        match self {
            Self::RenderTarget => TextureState::RenderTarget,
            Self::DepthTarget => TextureState::DepthWrite,
            Self::UnorderedAccess => TextureState::UnorderedAccess,
            Self::ShaderRead => TextureState::ShaderRead,
        }
    }

    /// Usage (and therefore view) the resource needs for this access.
    pub fn required_usage(self) -> TextureUsage {
        match self {
            Self::RenderTarget => TextureUsage::RENDER_TARGET,
            Self::DepthTarget => TextureUsage::DEPTH_STENCIL,
            Self::UnorderedAccess => TextureUsage::UNORDERED_ACCESS,
            Self::ShaderRead => TextureUsage::SHADER_READ,
        }
    }

    /// Check if a node of the given kind may record this access.
    ///
    /// The compute queue cannot issue render target or depth transitions.
    pub fn allowed_for(self, kind: TaskKind) -> bool {
        match kind {
            TaskKind::Graphics => true,
            TaskKind::Compute => matches!(self, Self::UnorderedAccess | Self::ShaderRead),
        }
    }
}
