//! Resource handles.

use bitflags::bitflags;

bitflags! {
    /// Flags carried by a [`ResourceHandle`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct HandleFlags: u8 {
        /// The resource is owned outside the graph.
        const EXTERNAL = 1 << 0;
        /// The resource is a swap chain image. Always set together with `EXTERNAL`.
        const SWAPCHAIN = 1 << 1;
    }
}

/// Opaque reference to a graph resource.
///
/// Handles are resolved to concrete GPU resources only after compile. A
/// handle never owns a resource. Equality compares both the id and the flags.
///
/// [`ResourceHandle::INVALID`] is a legitimate "nothing there" value, for
/// example the history input of a temporal pass on the very first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle {
    id: u64,
    flags: HandleFlags,
}

impl ResourceHandle {
    /// The invalid handle.
    pub const INVALID: Self = Self {
        id: 0,
        flags: HandleFlags::empty(),
    };

    pub(crate) fn new(id: u64, flags: HandleFlags) -> Self {
        Self { id, flags }
    }

    /// Get the unique id.
    pub fn id(self) -> u64 {
        self.id
    }

    /// Get the flags.
    pub fn flags(self) -> HandleFlags {
        self.flags
    }

    /// Returns true unless this is [`ResourceHandle::INVALID`].
    pub fn is_valid(self) -> bool {
        self.id != 0
    }

    /// Returns true if the resource is owned outside the graph.
    pub fn is_external(self) -> bool {
        self.flags.contains(HandleFlags::EXTERNAL)
    }

    /// Returns true if the resource is a swap chain image.
    pub fn is_swapchain(self) -> bool {
        self.flags.contains(HandleFlags::SWAPCHAIN)
    }
}

impl Default for ResourceHandle {
    fn default() -> Self {
        Self::INVALID
    }
}
