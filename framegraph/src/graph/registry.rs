//! Per-graph table of resource handles.

use std::collections::{HashMap, HashSet};

use super::{ResourceDescription, ResourceHandle};
use crate::backend::{GpuTexture, TextureId, TextureState, TextureViews};
use crate::manager::PooledResourceId;

/// Where a handle's resource comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandleOrigin {
    /// Created in this graph; resolved from the pool at compile.
    Internal,
    /// Registered external resource, index into the external list.
    External(usize),
    /// Propagated by an earlier graph; already bound to a pooled resource.
    Propagated(PooledResourceId),
}

#[derive(Debug, Clone)]
pub(crate) struct HandleRecord {
    pub desc: ResourceDescription,
    pub origin: HandleOrigin,
}

/// A resource owned outside the graph.
#[derive(Debug, Clone)]
pub struct ExternalResource {
    pub handle: ResourceHandle,
    pub texture: GpuTexture,
    pub views: TextureViews,
    /// State the resource is in when the graph starts.
    pub current_state: TextureState,
    /// State the graph must leave the resource in.
    pub required_end_state: TextureState,
}

#[derive(Debug, Default)]
pub(crate) struct ResourceRegistry {
    records: HashMap<ResourceHandle, HandleRecord>,
    order: Vec<ResourceHandle>,
    externals: Vec<ExternalResource>,
    external_textures: HashSet<TextureId>,
    propagated: Vec<ResourceHandle>,
}

impl ResourceRegistry {
    pub fn insert(&mut self, handle: ResourceHandle, record: HandleRecord) {
        self.order.push(handle);
        self.records.insert(handle, record);
    }

    /// Returns false if the texture is already registered.
    pub fn insert_external(&mut self, external: ExternalResource) -> bool {
        if !self.external_textures.insert(external.texture.id()) {
            return false;
        }
        let handle = external.handle;
        let desc = ResourceDescription::from_texture(&external.texture);
        let index = self.externals.len();
        self.externals.push(external);
        self.insert(
            handle,
            HandleRecord {
                desc,
                origin: HandleOrigin::External(index),
            },
        );
        true
    }

    pub fn get(&self, handle: ResourceHandle) -> Option<&HandleRecord> {
        self.records.get(&handle)
    }

    pub fn contains(&self, handle: ResourceHandle) -> bool {
        self.records.contains_key(&handle)
    }

    /// Handles in creation order.
    pub fn handles(&self) -> &[ResourceHandle] {
        &self.order
    }

    pub fn externals(&self) -> &[ExternalResource] {
        &self.externals
    }

    pub fn external(&self, index: usize) -> &ExternalResource {
        &self.externals[index]
    }

    /// Flag a handle for propagation. Returns false if it already was.
    pub fn mark_propagated(&mut self, handle: ResourceHandle) -> bool {
        if self.propagated.contains(&handle) {
            return false;
        }
        self.propagated.push(handle);
        true
    }

    pub fn is_propagated(&self, handle: ResourceHandle) -> bool {
        self.propagated.contains(&handle)
    }

    pub fn propagated(&self) -> &[ResourceHandle] {
        &self.propagated
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }
}
