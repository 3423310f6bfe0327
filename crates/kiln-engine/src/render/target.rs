use crate::agent::AgentId;
use crate::coords::Vec2i;

use super::gpu::ScreenBuffer;
use super::world::WorldBinding;

/// Render target a broadcast is drawing into.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TargetRef {
    /// The screen buffer owned by the render context.
    Screen,
    /// A [`TargetBuffer`] agent.
    Offscreen(AgentId),
}

/// World binding fills are projected with.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WorldRef {
    /// The active target's own projection.
    Target,
    /// A [`WorldBinding`] agent, usually a viewport's.
    Viewport(AgentId),
}

/// Off-screen colour target agent.
///
/// Carries its own world binding so a render into it never rewrites a
/// uniform the screen frame is still using.
pub struct TargetBuffer {
    size: Vec2i,
    buffer: Option<ScreenBuffer>,
    world: WorldBinding,
}

impl TargetBuffer {
    pub(crate) fn new(size: Vec2i, buffer: Option<ScreenBuffer>, world: WorldBinding) -> Self {
        Self { size, buffer, world }
    }

    #[inline]
    pub fn size(&self) -> Vec2i {
        self.size
    }

    /// `None` without a GPU.
    pub fn buffer(&self) -> Option<&ScreenBuffer> {
        self.buffer.as_ref()
    }

    pub fn world(&self) -> &WorldBinding {
        &self.world
    }

    pub(crate) fn world_mut(&mut self) -> &mut WorldBinding {
        &mut self.world
    }
}
