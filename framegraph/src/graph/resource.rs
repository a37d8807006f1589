//! Resource descriptions.

use crate::backend::GpuTexture;
use crate::types::{Extent2d, TextureFormat};

/// Size of a graph resource.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResourceSize {
    /// Fixed size in texels.
    Absolute(Extent2d),
    /// Size as a fraction (or multiple) of the graph's base resolution.
    Relative { width_scale: f32, height_scale: f32 },
}

/// Format and size of a graph resource.
///
/// Usage is not part of the description: the graph derives it from the
/// access types nodes record against the handle.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescription {
    /// Debug label, forwarded to the texture the pool creates.
    pub label: Option<String>,
    /// Texel format.
    pub format: TextureFormat,
    /// Size.
    pub size: ResourceSize,
}

impl ResourceDescription {
    /// Describe a resource with a fixed size.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            label: None,
            format,
            size: ResourceSize::Absolute(Extent2d::new(width, height)),
        }
    }

    /// Describe a resource sized relative to the base resolution.
    pub fn relative(width_scale: f32, height_scale: f32, format: TextureFormat) -> Self {
        Self {
            label: None,
            format,
            size: ResourceSize::Relative {
                width_scale,
                height_scale,
            },
        }
    }

    /// Describe a resource at the full base resolution.
    pub fn full_resolution(format: TextureFormat) -> Self {
        Self::relative(1.0, 1.0, format)
    }

    /// Describe an existing texture.
    pub fn from_texture(texture: &GpuTexture) -> Self {
        let descriptor = texture.descriptor();
        Self {
            label: descriptor.label.clone(),
            format: descriptor.format,
            size: ResourceSize::Absolute(descriptor.size),
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Returns true if the size depends on the base resolution.
    pub fn is_relative(&self) -> bool {
        matches!(self.size, ResourceSize::Relative { .. })
    }

    /// Compute the size in texels for a base resolution.
    ///
    /// Relative sizes are rounded to the nearest texel and never drop below 1.
    pub fn resolve_extent(&self, base: Extent2d) -> Extent2d {
        match self.size {
            ResourceSize::Absolute(extent) => extent,
            ResourceSize::Relative {
                width_scale,
                height_scale,
            } => Extent2d::new(
                scale_axis(base.width, width_scale),
                scale_axis(base.height, height_scale),
            ),
        }
    }
}

fn scale_axis(base: u32, scale: f32) -> u32 {
    let scaled = (f64::from(base) * f64::from(scale)).round();
    if scaled < 1.0 { 1 } else { scaled as u32 }
}
