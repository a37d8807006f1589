//! Common types shared across the frame graph.

/// 2D extent in texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2d {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
}

impl Extent2d {
    /// Create a new extent.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Check whether this extent is at least as large as `other` on both axes.
    pub fn covers(&self, other: Extent2d) -> bool {
        self.width >= other.width && self.height >= other.height
    }
}

/// GPU queue a command buffer is submitted to.
///
/// The graph uses two queues. Graphics work (and every general resource
/// state transition) goes to [`QueueType::Graphics`]; compute-only work goes
/// to [`QueueType::Compute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueType {
    /// Graphics queue (also accepts compute and barrier commands).
    Graphics,
    /// Async compute queue.
    Compute,
}

impl QueueType {
    /// Get a human readable queue name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Graphics => "graphics",
            Self::Compute => "compute",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_covers() {
        let big = Extent2d::new(1920, 1080);
        assert!(big.covers(Extent2d::new(1920, 1080)));
        assert!(big.covers(Extent2d::new(640, 480)));
        assert!(!big.covers(Extent2d::new(1921, 1080)));
        assert!(!Extent2d::new(640, 480).covers(big));
    }
}
