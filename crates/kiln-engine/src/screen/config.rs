use crate::coords::Vec2i;

/// Screen configuration.
#[derive(Debug, Clone)]
pub struct ScreenConfig {
    /// Logical resolution of the screen buffer in pixels.
    pub resolution: Vec2i,

    /// Target logic updates per second.
    pub frame_rate: u32,

    /// Block on the render thread at the end of every `update`.
    ///
    /// Keeps the logic thread at most one frame ahead of the GPU.
    pub synchronize_each_frame: bool,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            resolution: Vec2i::new(640, 480),
            frame_rate: 60,
            synchronize_each_frame: true,
        }
    }
}
