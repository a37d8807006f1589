//! Texture formats, usage flags and descriptors.

use super::Extent2d;
use bitflags::bitflags;

/// Pixel format of a graph texture.
///
/// Pooled textures are only reused for an identical format; there is no
/// aliasing between compatible formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum TextureFormat {
    /// Single 8-bit normalized channel (masks, ambient occlusion).
    R8Unorm,
    /// Two 8-bit normalized channels.
    Rg8Unorm,
    /// Single half-float channel.
    R16Float,
    /// Two half-float channels (velocity buffers).
    Rg16Float,
    /// Single 32-bit float channel.
    R32Float,
    /// 8-bit RGBA.
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA, sRGB encoded.
    Rgba8UnormSrgb,
    /// 8-bit BGRA, the usual swap chain layout.
    Bgra8Unorm,
    /// 8-bit BGRA, sRGB encoded.
    Bgra8UnormSrgb,
    /// Packed 10-bit RGB with 2-bit alpha.
    Rgb10a2Unorm,
    /// Packed 11/11/10-bit float RGB.
    Rg11b10Float,
    /// Half-float RGBA (HDR color).
    Rgba16Float,
    /// Float RGBA.
    Rgba32Float,
    /// 24-bit depth with 8-bit stencil.
    Depth24PlusStencil8,
    /// 32-bit float depth.
    Depth32Float,
}

impl TextureFormat {
    /// Returns true for formats that can only back depth/stencil targets.
    pub fn is_depth_stencil(&self) -> bool {
        matches!(self, Self::Depth24PlusStencil8 | Self::Depth32Float)
    }

    /// Bytes one texel occupies.
    pub fn bytes_per_texel(&self) -> u32 {
        match self {
            Self::R8Unorm => 1,
            Self::Rg8Unorm | Self::R16Float => 2,
            Self::Rg16Float
            | Self::R32Float
            | Self::Rgba8Unorm
            | Self::Rgba8UnormSrgb
            | Self::Bgra8Unorm
            | Self::Bgra8UnormSrgb
            | Self::Rgb10a2Unorm
            | Self::Rg11b10Float
            | Self::Depth24PlusStencil8
            | Self::Depth32Float => 4,
            Self::Rgba16Float => 8,
            Self::Rgba32Float => 16,
        }
    }
}

bitflags! {
    /// Ways a texture may be bound.
    ///
    /// The backend creates one typed view per flag when the texture is
    /// created, so the usage set also decides which views exist.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextureUsage: u32 {
        /// Color attachment.
        const RENDER_TARGET = 1 << 0;
        /// Depth/stencil attachment.
        const DEPTH_STENCIL = 1 << 1;
        /// Storage image, read and written by shaders.
        const UNORDERED_ACCESS = 1 << 2;
        /// Sampled image.
        const SHADER_READ = 1 << 3;
    }
}

/// Everything the backend needs to create a 2D texture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    pub label: Option<String>,
    pub size: Extent2d,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    /// Describe a 2D texture.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            label: None,
            size: Extent2d::new(width, height),
            format,
            usage,
        }
    }

    /// Attach a debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Approximate memory footprint, ignoring backend padding.
    pub fn size_in_bytes(&self) -> u64 {
        u64::from(self.size.width)
            * u64::from(self.size.height)
            * u64::from(self.format.bytes_per_texel())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_formats() {
        assert!(TextureFormat::Depth32Float.is_depth_stencil());
        assert!(TextureFormat::Depth24PlusStencil8.is_depth_stencil());
        assert!(!TextureFormat::Rgba16Float.is_depth_stencil());
    }

    #[test]
    fn test_size_in_bytes() {
        let hdr = TextureDescriptor::new_2d(
            1920,
            1080,
            TextureFormat::Rgba16Float,
            TextureUsage::RENDER_TARGET,
        );
        assert_eq!(hdr.size_in_bytes(), 1920 * 1080 * 8);

        let mask = TextureDescriptor::new_2d(64, 64, TextureFormat::R8Unorm, TextureUsage::empty());
        assert_eq!(mask.size_in_bytes(), 4096);
    }

    #[test]
    fn test_descriptor_builder() {
        let desc = TextureDescriptor::new_2d(
            800,
            600,
            TextureFormat::Rgba16Float,
            TextureUsage::RENDER_TARGET | TextureUsage::SHADER_READ,
        )
        .with_label("hdr");
        assert_eq!(desc.size, Extent2d::new(800, 600));
        assert_eq!(desc.label.as_deref(), Some("hdr"));
        assert!(desc.usage.contains(TextureUsage::SHADER_READ));
        assert_eq!(TextureDescriptor::default().usage, TextureUsage::empty());
    }
}
