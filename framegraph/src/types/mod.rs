//! Common types and descriptors for frame graph resources.
//!
//! This module contains format enums, usage flags, and descriptor structs
//! used throughout the frame graph.

mod common;
mod texture;

pub use common::{Extent2d, QueueType};
pub use texture::{TextureDescriptor, TextureFormat, TextureUsage};
