use crate::coords::Rect;

/// Render-side clip stack.
///
/// The bottom entry is the full screen and is never popped. Every pushed
/// entry is the intersection of the requested rect with the entry below it,
/// so the top is always the effective clip.
#[derive(Debug, Clone)]
pub struct ScissorStack {
    stack: Vec<Rect>,
}

impl ScissorStack {
    pub fn new(screen: Rect) -> Self {
        Self { stack: vec![screen] }
    }

    /// Drops every pushed entry and replaces the bottom.
    pub fn reset(&mut self, screen: Rect) {
        self.stack.clear();
        self.stack.push(screen);
    }

    /// Pushes `rect` narrowed by the current clip and returns the result.
    pub fn push(&mut self, rect: Rect) -> Rect {
        let effective = rect.clip_to(self.current());
        self.stack.push(effective);
        effective
    }

    /// Restores the clip that was active before the matching push.
    pub fn pop(&mut self) -> Rect {
        if self.stack.len() > 1 {
            self.stack.pop();
        } else {
            debug_assert!(false, "scissor pop without matching push");
            log::warn!("scissor pop without matching push");
        }
        self.current()
    }

    #[inline]
    pub fn current(&self) -> Rect {
        self.stack.last().copied().unwrap_or_else(Rect::empty)
    }

    /// Number of pushed entries above the screen.
    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len().saturating_sub(1)
    }
}
