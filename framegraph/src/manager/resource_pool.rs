//! Pool of graph-owned GPU textures.
//!
//! Pooled textures live in an index-addressed arena owned by the manager.
//! A texture is handed to a new handle when its previous user finished
//! before the new handle's first access, and destroyed after it has stayed
//! unused for the configured number of frames.

use std::collections::HashSet;

use slotmap::SlotMap;

use crate::backend::{GpuBackend, GpuTexture, TextureState, TextureViews};
use crate::error::GraphicsError;
use crate::types::{Extent2d, TextureDescriptor, TextureFormat, TextureUsage};

slotmap::new_key_type! {
    /// Identifier of a pooled resource.
    pub struct PooledResourceId;
}

/// A pooled texture and its bookkeeping.
#[derive(Debug)]
pub struct PooledResource {
    texture: GpuTexture,
    views: TextureViews,
    last_access_stage: u64,
    state: TextureState,
    idle_frames: u32,
}

impl PooledResource {
    /// The texture.
    pub fn texture(&self) -> &GpuTexture {
        &self.texture
    }

    /// Views created for the texture's usage.
    pub fn views(&self) -> &TextureViews {
        &self.views
    }

    /// Stage of the last access by any graph.
    pub fn last_access_stage(&self) -> u64 {
        self.last_access_stage
    }

    /// State the texture was left in by the last compiled graph.
    pub fn state(&self) -> TextureState {
        self.state
    }

    /// Number of frames begun since the texture was last used.
    pub fn idle_frames(&self) -> u32 {
        self.idle_frames
    }

    fn matches(&self, request: &PoolRequest<'_>) -> bool {
        let desc = self.texture.descriptor();
        desc.format == request.format
            && desc.size.covers(request.extent)
            && desc.usage.contains(request.usage)
            && self.last_access_stage < request.first_access
    }
}

/// What a handle needs from the pool.
#[derive(Debug, Clone, Copy)]
pub struct PoolRequest<'a> {
    pub label: Option<&'a str>,
    pub format: TextureFormat,
    pub extent: Extent2d,
    pub usage: TextureUsage,
    /// Stage of the handle's first access; a match must be free before it.
    pub first_access: u64,
}

/// Arena of pooled textures.
#[derive(Debug, Default)]
pub struct ResourcePool {
    resources: SlotMap<PooledResourceId, PooledResource>,
}

impl ResourcePool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pooled textures.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if the pool holds no textures.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Get a pooled resource.
    pub fn get(&self, id: PooledResourceId) -> Option<&PooledResource> {
        self.resources.get(id)
    }

    /// Find the smallest free texture satisfying the request.
    ///
    /// Only an exact format match qualifies. Reserved entries are skipped.
    pub fn find(
        &self,
        request: &PoolRequest<'_>,
        reserved: &HashSet<PooledResourceId>,
    ) -> Option<PooledResourceId> {
        self.resources
            .iter()
            .filter(|(id, resource)| !reserved.contains(id) && resource.matches(request))
            .min_by_key(|(_, resource)| {
                let size = resource.texture.descriptor().size;
                u64::from(size.width) * u64::from(size.height)
            })
            .map(|(id, _)| id)
    }

    /// Find a matching texture or create a new one.
    ///
    /// Returns the id and whether it was an existing entry. The entry's idle
    /// counter is reset either way.
    pub fn get_or_create(
        &mut self,
        backend: &dyn GpuBackend,
        request: &PoolRequest<'_>,
        reserved: &HashSet<PooledResourceId>,
    ) -> Result<(PooledResourceId, bool), GraphicsError> {
        if let Some(id) = self.find(request, reserved) {
            if let Some(resource) = self.resources.get_mut(id) {
                resource.idle_frames = 0;
            }
            return Ok((id, true));
        }

        let mut descriptor = TextureDescriptor::new_2d(
            request.extent.width,
            request.extent.height,
            request.format,
            request.usage,
        );
        if let Some(label) = request.label {
            descriptor = descriptor.with_label(label);
        }

        let texture = backend.create_texture(&descriptor)?;
        let views = match TextureViews::create_for(backend, &texture) {
            Ok(views) => views,
            Err(err) => {
                backend.destroy_texture(texture);
                return Err(err);
            }
        };

        log::info!(
            "Pool: allocated {} ({}x{} {:?}, usage {:?}, {} KiB)",
            texture.debug_name(),
            request.extent.width,
            request.extent.height,
            request.format,
            request.usage,
            texture.descriptor().size_in_bytes() / 1024
        );

        let id = self.resources.insert(PooledResource {
            texture,
            views,
            last_access_stage: 0,
            state: TextureState::Undefined,
            idle_frames: 0,
        });
        Ok((id, false))
    }

    /// Advance the last-access watermark of an entry and mark it used.
    pub fn set_last_access(&mut self, id: PooledResourceId, stage: u64) {
        if let Some(resource) = self.resources.get_mut(id) {
            resource.last_access_stage = resource.last_access_stage.max(stage);
            resource.idle_frames = 0;
        }
    }

    /// Record the state the entry is left in.
    pub fn set_state(&mut self, id: PooledResourceId, state: TextureState) {
        if let Some(resource) = self.resources.get_mut(id) {
            resource.state = state;
        }
    }

    /// Age every entry by one frame and destroy entries idle for longer than
    /// `eviction_idle_frames`. Reserved entries are aged but never destroyed.
    ///
    /// Returns the number of destroyed textures.
    pub fn age(
        &mut self,
        backend: &dyn GpuBackend,
        eviction_idle_frames: u32,
        reserved: &HashSet<PooledResourceId>,
    ) -> usize {
        for resource in self.resources.values_mut() {
            resource.idle_frames = resource.idle_frames.saturating_add(1);
        }

        let expired: Vec<PooledResourceId> = self
            .resources
            .iter()
            .filter(|(id, resource)| {
                resource.idle_frames > eviction_idle_frames && !reserved.contains(id)
            })
            .map(|(id, _)| id)
            .collect();

        for id in &expired {
            if let Some(resource) = self.resources.remove(*id) {
                log::info!(
                    "Pool: evicting {} after {} idle frames",
                    resource.texture.debug_name(),
                    resource.idle_frames
                );
                backend.destroy_texture(resource.texture);
            }
        }
        expired.len()
    }

    /// Destroy every pooled texture.
    pub fn clear(&mut self, backend: &dyn GpuBackend) {
        for (_, resource) in self.resources.drain() {
            backend.destroy_texture(resource.texture);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    fn request(first_access: u64) -> PoolRequest<'static> {
        PoolRequest {
            label: Some("color"),
            format: TextureFormat::Rgba16Float,
            extent: Extent2d::new(1280, 720),
            usage: TextureUsage::RENDER_TARGET | TextureUsage::SHADER_READ,
            first_access,
        }
    }

    #[test]
    fn test_reuse_requires_finished_lifetime() {
        let backend = DummyBackend::new();
        let mut pool = ResourcePool::new();
        let none = HashSet::new();

        let (a, hit) = pool.get_or_create(&backend, &request(0), &none).unwrap();
        assert!(!hit);
        pool.set_last_access(a, 3);

        // Overlapping lifetime: 3 is not strictly before 3.
        let (b, hit) = pool.get_or_create(&backend, &request(3), &none).unwrap();
        assert!(!hit);
        assert_ne!(a, b);
        pool.set_last_access(b, 5);

        let (c, hit) = pool.get_or_create(&backend, &request(4), &none).unwrap();
        assert!(hit);
        assert_eq!(c, a);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_match_rules() {
        let backend = DummyBackend::new();
        let mut pool = ResourcePool::new();
        let none = HashSet::new();
        let (id, _) = pool.get_or_create(&backend, &request(0), &none).unwrap();

        let smaller = PoolRequest {
            extent: Extent2d::new(640, 360),
            usage: TextureUsage::SHADER_READ,
            ..request(1)
        };
        assert_eq!(pool.find(&smaller, &none), Some(id));

        let larger = PoolRequest {
            extent: Extent2d::new(1920, 1080),
            ..request(1)
        };
        assert_eq!(pool.find(&larger, &none), None);

        let other_format = PoolRequest {
            format: TextureFormat::Rgba32Float,
            ..request(1)
        };
        assert_eq!(pool.find(&other_format, &none), None);

        let more_usage = PoolRequest {
            usage: TextureUsage::UNORDERED_ACCESS,
            ..request(1)
        };
        assert_eq!(pool.find(&more_usage, &none), None);

        let reserved: HashSet<_> = [id].into_iter().collect();
        assert_eq!(pool.find(&request(1), &reserved), None);
    }

    #[test]
    fn test_smallest_match_wins() {
        let backend = DummyBackend::new();
        let mut pool = ResourcePool::new();
        let none = HashSet::new();
        let big = PoolRequest {
            extent: Extent2d::new(1920, 1080),
            ..request(0)
        };
        let (big_id, _) = pool.get_or_create(&backend, &big, &none).unwrap();
        pool.set_last_access(big_id, 0);
        let (small_id, _) = pool.get_or_create(&backend, &request(0), &none).unwrap();
        assert_ne!(big_id, small_id);

        assert_eq!(pool.find(&request(1), &none), Some(small_id));
    }

    #[test]
    fn test_eviction_after_idle_frames() {
        let backend = DummyBackend::new();
        let mut pool = ResourcePool::new();
        let none = HashSet::new();
        let (id, _) = pool.get_or_create(&backend, &request(0), &none).unwrap();

        for _ in 0..2 {
            assert_eq!(pool.age(&backend, 2, &none), 0);
        }
        assert_eq!(pool.get(id).map(|r| r.idle_frames()), Some(2));
        assert_eq!(pool.age(&backend, 2, &none), 1);
        assert!(pool.is_empty());
        assert_eq!(backend.live_texture_count(), 0);
    }

    #[test]
    fn test_reserved_entries_survive_eviction() {
        let backend = DummyBackend::new();
        let mut pool = ResourcePool::new();
        let none = HashSet::new();
        let (id, _) = pool.get_or_create(&backend, &request(0), &none).unwrap();
        let reserved: HashSet<_> = [id].into_iter().collect();

        for _ in 0..10 {
            assert_eq!(pool.age(&backend, 1, &reserved), 0);
        }
        assert_eq!(pool.len(), 1);

        pool.set_last_access(id, 1);
        assert_eq!(pool.get(id).map(|r| r.idle_frames()), Some(0));
    }

    #[test]
    fn test_views_match_usage() {
        let backend = DummyBackend::new();
        let mut pool = ResourcePool::new();
        let (id, _) = pool
            .get_or_create(&backend, &request(0), &HashSet::new())
            .unwrap();
        let resource = pool.get(id).unwrap();
        assert!(resource.views().render_target.is_some());
        assert!(resource.views().shader_read.is_some());
        assert!(resource.views().unordered_access.is_none());
        assert_eq!(resource.state(), TextureState::Undefined);
        assert_eq!(resource.texture().descriptor().label.as_deref(), Some("color"));
    }

    #[test]
    fn test_allocation_failure() {
        let backend = DummyBackend::new();
        backend.set_fail_texture_creation(true);
        let mut pool = ResourcePool::new();
        let result = pool.get_or_create(&backend, &request(0), &HashSet::new());
        assert_eq!(result, Err(GraphicsError::OutOfMemory));
        assert!(pool.is_empty());
    }
}
