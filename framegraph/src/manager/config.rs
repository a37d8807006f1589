//! Graph manager configuration.

use crate::types::Extent2d;

/// Configuration of a [`GraphManager`](super::GraphManager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphManagerConfig {
    /// Frames a pooled texture may stay unused before it is destroyed.
    pub eviction_idle_frames: u32,
    /// Frames a command buffer stays reserved before it is recycled.
    pub frames_in_flight: u32,
    /// Default base resolution for relative resource sizes.
    pub base_resolution: Extent2d,
    /// Worker threads for parallel node recording. `None` records on the
    /// calling thread.
    pub worker_threads: Option<usize>,
}

impl Default for GraphManagerConfig {
    fn default() -> Self {
        Self {
            eviction_idle_frames: 3,
            frames_in_flight: 2,
            base_resolution: Extent2d::new(1920, 1080),
            worker_threads: None,
        }
    }
}

impl GraphManagerConfig {
    /// Set the idle-frame eviction threshold.
    pub fn with_eviction_idle_frames(mut self, frames: u32) -> Self {
        self.eviction_idle_frames = frames;
        self
    }

    /// Set the number of frames in flight.
    pub fn with_frames_in_flight(mut self, frames: u32) -> Self {
        self.frames_in_flight = frames;
        self
    }

    /// Set the default base resolution.
    pub fn with_base_resolution(mut self, width: u32, height: u32) -> Self {
        self.base_resolution = Extent2d::new(width, height);
        self
    }

    /// Record nodes in parallel on a pool of `threads` workers.
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GraphManagerConfig::default();
        assert_eq!(config.eviction_idle_frames, 3);
        assert_eq!(config.frames_in_flight, 2);
        assert_eq!(config.base_resolution, Extent2d::new(1920, 1080));
        assert_eq!(config.worker_threads, None);
    }

    #[test]
    fn test_builder_methods() {
        let config = GraphManagerConfig::default()
            .with_eviction_idle_frames(8)
            .with_frames_in_flight(3)
            .with_base_resolution(1280, 720)
            .with_worker_threads(4);
        assert_eq!(config.eviction_idle_frames, 8);
        assert_eq!(config.frames_in_flight, 3);
        assert_eq!(config.base_resolution, Extent2d::new(1280, 720));
        assert_eq!(config.worker_threads, Some(4));
    }
}
