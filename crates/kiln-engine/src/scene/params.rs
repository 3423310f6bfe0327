use crate::coords::{Rect, Vec2i};
use crate::render::{RenderRunner, TargetRef, WorldRef};

/// Payload handed to every node handler during a broadcast.
///
/// A viewport passes a narrowed copy to its children; handlers must not
/// keep it past the call.
#[derive(Copy, Clone)]
pub struct RenderParams<'a> {
    /// Backend handle. All GPU work is posted through it.
    pub runner: &'a RenderRunner,
    pub target: TargetRef,
    pub target_size: Vec2i,
    /// Effective clip in target pixels. Empty means nothing may draw.
    pub clip: Rect,
    /// Frame of the enclosing viewport in target pixels; nested regions are
    /// positioned relative to its origin.
    pub region: Rect,
    /// Region origin minus scroll. Matches the offset of `world`, which
    /// applies it to fills on the render thread.
    pub origin: Vec2i,
    /// World children draw through.
    pub world: WorldRef,
}

impl<'a> RenderParams<'a> {
    /// Params for a root broadcast covering the whole target.
    pub fn root(runner: &'a RenderRunner, target: TargetRef, target_size: Vec2i) -> Self {
        let full = Rect::from_size(target_size);
        Self {
            runner,
            target,
            target_size,
            clip: full,
            region: full,
            origin: Vec2i::zero(),
            world: WorldRef::Target,
        }
    }
}
