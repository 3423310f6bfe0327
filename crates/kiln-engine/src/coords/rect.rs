use super::Vec2i;

/// Axis-aligned rectangle in screen pixels (top-left origin).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub origin: Vec2i,
    pub size: Vec2i,
}

impl Rect {
    #[inline]
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self {
            origin: Vec2i::new(x, y),
            size: Vec2i::new(w, h),
        }
    }

    #[inline]
    pub const fn from_origin_size(origin: Vec2i, size: Vec2i) -> Self {
        Self { origin, size }
    }

    /// Rectangle anchored at the origin covering `size`.
    #[inline]
    pub const fn from_size(size: Vec2i) -> Self {
        Self {
            origin: Vec2i::zero(),
            size,
        }
    }

    /// Zero-area rectangle. Renderers skip any work clipped to it.
    #[inline]
    pub const fn empty() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Bottom-right corner (exclusive), saturated at the `i32` range.
    #[inline]
    pub fn max(self) -> Vec2i {
        self.origin + self.size
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.x <= 0 || self.size.y <= 0
    }

    /// Same size, origin shifted by `delta`.
    #[inline]
    pub fn translated(self, delta: Vec2i) -> Self {
        Self::from_origin_size(self.origin + delta, self.size)
    }

    /// Half-open containment: [min, max).
    #[inline]
    pub fn contains(self, p: Vec2i) -> bool {
        let max = self.max();
        p.x >= self.origin.x && p.y >= self.origin.y && p.x < max.x && p.y < max.y
    }

    /// True when `other` lies entirely inside `self`.
    #[inline]
    pub fn contains_rect(self, other: Rect) -> bool {
        let (a, b) = (self.max(), other.max());
        other.origin.x >= self.origin.x
            && other.origin.y >= self.origin.y
            && b.x <= a.x
            && b.y <= a.y
    }

    #[inline]
    pub fn intersect(self, other: Rect) -> Option<Rect> {
        let x0 = self.origin.x.max(other.origin.x);
        let y0 = self.origin.y.max(other.origin.y);
        let x1 = self.max().x.min(other.max().x);
        let y1 = self.max().y.min(other.max().y);

        let w = x1.saturating_sub(x0);
        let h = y1.saturating_sub(y0);

        if w <= 0 || h <= 0 {
            None
        } else {
            Some(Rect::new(x0, y0, w, h))
        }
    }

    /// Intersection collapsed to [`Rect::empty`] when the two do not overlap.
    #[inline]
    pub fn clip_to(self, bounds: Rect) -> Rect {
        self.intersect(bounds).unwrap_or(Rect::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: i32, y: i32, w: i32, h: i32) -> Rect { Rect::new(x, y, w, h) }

    // ── contains ──────────────────────────────────────────────────────────

    #[test]
    fn contains_top_left_inclusive() {
        assert!(r(0, 0, 10, 10).contains(Vec2i::new(0, 0)));
    }

    #[test]
    fn contains_bottom_right_exclusive() {
        assert!(!r(0, 0, 10, 10).contains(Vec2i::new(10, 10)));
    }

    #[test]
    fn contains_rect_nested() {
        assert!(r(0, 0, 100, 100).contains_rect(r(10, 10, 50, 50)));
        assert!(r(0, 0, 100, 100).contains_rect(r(0, 0, 100, 100)));
        assert!(!r(0, 0, 100, 100).contains_rect(r(60, 60, 50, 50)));
    }

    // ── intersect ─────────────────────────────────────────────────────────

    #[test]
    fn intersect_overlapping() {
        let i = r(0, 0, 10, 10).intersect(r(5, 5, 10, 10)).unwrap();
        assert_eq!(i, r(5, 5, 5, 5));
    }

    #[test]
    fn intersect_contained_is_inner() {
        let inner = r(10, 10, 20, 20);
        assert_eq!(r(0, 0, 100, 100).intersect(inner), Some(inner));
    }

    #[test]
    fn intersect_touching_edge_returns_none() {
        assert!(r(0, 0, 10, 10).intersect(r(10, 0, 10, 10)).is_none());
    }

    #[test]
    fn clip_to_disjoint_is_empty() {
        let clipped = r(150, 150, 50, 50).clip_to(r(0, 0, 100, 100));
        assert!(clipped.is_empty());
        assert_eq!(clipped, Rect::empty());
    }

    // ── helpers ───────────────────────────────────────────────────────────

    #[test]
    fn translated_keeps_size() {
        assert_eq!(r(1, 2, 3, 4).translated(Vec2i::new(10, -2)), r(11, 0, 3, 4));
    }

    #[test]
    fn extreme_rects_saturate_instead_of_overflowing() {
        let far = r(i32::MAX - 5, 0, 10, 10);
        assert_eq!(far.max(), Vec2i::new(i32::MAX, 10));
        assert_eq!(far.translated(Vec2i::new(100, 0)).origin.x, i32::MAX);
        assert!(far.clip_to(r(0, 0, 640, 480)).is_empty());
        assert_eq!(
            r(i32::MIN, 0, 10, 10).intersect(r(i32::MIN, 0, i32::MAX, 5)),
            Some(r(i32::MIN, 0, 10, 5))
        );
    }

    #[test]
    fn is_empty_zero_or_negative_size() {
        assert!(r(0, 0, 0, 5).is_empty());
        assert!(r(0, 0, 5, -1).is_empty());
        assert!(!r(0, 0, 1, 1).is_empty());
    }
}
