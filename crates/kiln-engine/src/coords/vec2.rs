use core::ops::{Add, Neg, Sub};

/// 2D integer vector in screen pixels.
///
/// Arithmetic saturates at the `i32` range.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Vec2i {
    pub x: i32,
    pub y: i32,
}

impl Vec2i {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0, y: 0 }
    }

    /// True when both components are strictly positive (usable as a size).
    #[inline]
    pub fn is_positive(self) -> bool {
        self.x > 0 && self.y > 0
    }
}

impl Add for Vec2i {
    type Output = Vec2i;
    #[inline]
    fn add(self, rhs: Vec2i) -> Vec2i {
        Vec2i::new(self.x.saturating_add(rhs.x), self.y.saturating_add(rhs.y))
    }
}

impl Sub for Vec2i {
    type Output = Vec2i;
    #[inline]
    fn sub(self, rhs: Vec2i) -> Vec2i {
        Vec2i::new(self.x.saturating_sub(rhs.x), self.y.saturating_sub(rhs.y))
    }
}

impl Neg for Vec2i {
    type Output = Vec2i;
    #[inline]
    fn neg(self) -> Vec2i {
        Vec2i::new(self.x.saturating_neg(), self.y.saturating_neg())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_saturates() {
        let big = Vec2i::new(i32::MAX - 1, i32::MIN + 1);
        assert_eq!(big + Vec2i::new(10, -10), Vec2i::new(i32::MAX, i32::MIN));
        assert_eq!(big - Vec2i::new(-10, 10), Vec2i::new(i32::MAX, i32::MIN));
        assert_eq!(-Vec2i::new(i32::MIN, 3), Vec2i::new(i32::MAX, -3));
    }
}
