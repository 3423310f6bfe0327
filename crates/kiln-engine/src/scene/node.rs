use generational_arena::Index;

/// Stable name of a drawable node inside a [`SceneGraph`](super::SceneGraph).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) Index);

impl NodeId {
    /// An id that never resolves to a node.
    pub fn dangling() -> Self {
        Self(dangling_index())
    }
}

/// Stable name of a controller (an ordered child sequence).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ControllerId(pub(crate) Index);

impl ControllerId {
    /// An id that never resolves to a controller.
    pub fn dangling() -> Self {
        Self(dangling_index())
    }
}

fn dangling_index() -> Index {
    Index::from_raw_parts(usize::MAX, u64::MAX)
}

/// The per-frame passes a controller broadcasts, in frame order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RenderStage {
    /// Recompute agent-visible state; CPU-side uploads get posted here.
    BeforeRender,
    /// Issue draw submission against the active target and clip.
    OnRendering,
    /// Lightweight pass with no render-thread dependency.
    Notification,
}

impl RenderStage {
    pub const ALL: [RenderStage; 3] = [
        RenderStage::BeforeRender,
        RenderStage::OnRendering,
        RenderStage::Notification,
    ];

    /// Stages during which a render target and scissor state are active.
    #[inline]
    pub fn carries_render(self) -> bool {
        matches!(self, RenderStage::OnRendering)
    }
}

/// Which stages reach a node.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum NodeVisibility {
    #[default]
    Visible,
    Hidden,
    /// Skips the render stages but still receives [`RenderStage::Notification`].
    NotificationOnly,
}

impl NodeVisibility {
    #[inline]
    pub fn receives(self, stage: RenderStage) -> bool {
        match self {
            NodeVisibility::Visible => true,
            NodeVisibility::Hidden => false,
            NodeVisibility::NotificationOnly => stage == RenderStage::Notification,
        }
    }
}

impl From<bool> for NodeVisibility {
    fn from(visible: bool) -> Self {
        if visible { NodeVisibility::Visible } else { NodeVisibility::Hidden }
    }
}

/// Closed set of drawable types hosting a node.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DrawableKind {
    Viewport,
    Sprite,
    Plane,
    Window,
    Tilemap,
    Custom(u32),
}

/// Capability tag carried by every node.
///
/// Neighbouring nodes read each other's tag to decide whether their draws
/// can be merged: same kind and same non-zero `batch` means compatible.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeTag {
    pub kind: DrawableKind,
    pub batch: u64,
}

impl NodeTag {
    #[inline]
    pub const fn new(kind: DrawableKind) -> Self {
        Self { kind, batch: 0 }
    }

    #[inline]
    pub fn batches_with(self, other: NodeTag) -> bool {
        self.batch != 0 && self.kind == other.kind && self.batch == other.batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_only_skips_render_stages() {
        let v = NodeVisibility::NotificationOnly;
        assert!(!v.receives(RenderStage::BeforeRender));
        assert!(!v.receives(RenderStage::OnRendering));
        assert!(v.receives(RenderStage::Notification));
    }

    #[test]
    fn unbatched_tags_never_batch() {
        let a = NodeTag::new(DrawableKind::Sprite);
        assert!(!a.batches_with(a));

        let b = NodeTag { batch: 9, ..a };
        assert!(b.batches_with(b));
        assert!(!b.batches_with(NodeTag { kind: DrawableKind::Plane, batch: 9 }));
    }
}
