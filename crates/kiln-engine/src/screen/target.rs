use anyhow::Result;

use crate::agent::{AgentHandle, AgentId, AgentRef};
use crate::coords::Vec2i;
use crate::render::{Pixels, RenderContext, TargetBuffer, TargetRef};

use super::{RenderScreen, ScreenHandle};

/// Off-screen image viewports can render into with [`Viewport::render`].
///
/// The texture lives on the render thread; this handle only names it.
/// Dropping the handle disposes it.
///
/// [`Viewport::render`]: super::Viewport::render
pub struct RenderTarget {
    screen: ScreenHandle,
    agent: AgentHandle<TargetBuffer>,
    size: Vec2i,
}

impl RenderTarget {
    pub fn new(screen: &RenderScreen, size: Vec2i) -> Result<Self> {
        anyhow::ensure!(size.is_positive(), "render target has zero size ({size:?})");

        let handle = screen.handle().clone();
        let agent = AgentHandle::create(handle.runner(), move |cx: &mut RenderContext| {
            cx.create_target(size)
        });
        log::debug!("render target {:?} created at {}x{}", agent.id(), size.x, size.y);

        Ok(Self {
            screen: handle,
            agent,
            size,
        })
    }

    #[inline]
    pub fn size(&self) -> Vec2i {
        self.size
    }

    pub fn agent_id(&self) -> Option<AgentId> {
        self.agent.id()
    }

    pub(crate) fn agent_ref(&self) -> Option<AgentRef<TargetBuffer>> {
        self.agent.agent_ref()
    }

    /// Copies the target back. `None` without a GPU, after dispose, or if
    /// the render thread has stopped.
    pub fn read_pixels(&self) -> Option<Pixels> {
        let id = self.agent.id()?;
        self.screen
            .runner()
            .round_trip(move |cx| cx.read_pixels(TargetRef::Offscreen(id)))
            .flatten()
    }

    pub fn dispose(&mut self) {
        if self.agent.is_live() {
            self.agent.destroy(self.screen.runner(), |_, _| {});
        }
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        !self.agent.is_live()
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        self.dispose();
    }
}
