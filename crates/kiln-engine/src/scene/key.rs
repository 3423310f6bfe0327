use core::cmp::Ordering;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};

static CREATION_STAMP: AtomicI64 = AtomicI64::new(0);

fn next_stamp() -> i64 {
    CREATION_STAMP.fetch_add(1, AtomicOrdering::Relaxed) + 1
}

/// Paint-order key for drawable nodes.
///
/// Ordering rules:
/// 1) `weight[0]` ascending (typically `z`)
/// 2) `weight[1]` ascending (typically `y` for sprites)
/// 3) `weight[2]` ascending
///
/// Constructors that take fewer than three weights fill the remaining slot(s)
/// with the process-wide creation stamp, so drawables with equal `z` paint in
/// creation order. The stamp itself never takes part in comparison; nodes
/// whose three weights are all equal keep their controller insertion order.
#[derive(Debug, Copy, Clone)]
pub struct SortKey {
    pub weight: [i64; 3],
    stamp: i64,
}

impl SortKey {
    /// `[0, 0, stamp]`
    pub fn new() -> Self {
        let stamp = next_stamp();
        Self { weight: [0, 0, stamp], stamp }
    }

    /// `[z, 0, stamp]`
    pub fn with_z(z: i64) -> Self {
        let stamp = next_stamp();
        Self { weight: [z, 0, stamp], stamp }
    }

    /// `[z, y, stamp]`
    pub fn with_z_y(z: i64, y: i64) -> Self {
        let stamp = next_stamp();
        Self { weight: [z, y, stamp], stamp }
    }

    /// All three weights explicit.
    pub fn from_weights(weight: [i64; 3]) -> Self {
        Self { weight, stamp: next_stamp() }
    }

    /// Creation stamp; monotonic across the process.
    #[inline]
    pub fn stamp(&self) -> i64 {
        self.stamp
    }

    /// Overwrites the leading `weights.len()` weights (1 to 3).
    pub fn set_weights(&mut self, weights: &[i64]) {
        debug_assert!(
            (1..=3).contains(&weights.len()),
            "sort key takes 1 to 3 weights, got {}",
            weights.len()
        );
        for (slot, w) in self.weight.iter_mut().zip(weights) {
            *slot = *w;
        }
    }
}

impl Default for SortKey {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.weight == other.weight
    }
}

impl Eq for SortKey {}

impl Ord for SortKey {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight.cmp(&other.weight)
    }
}

impl PartialOrd for SortKey {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_compare_lexicographically() {
        let a = SortKey::from_weights([0, 5, 9]);
        let b = SortKey::from_weights([1, 0, 0]);
        let c = SortKey::from_weights([1, 0, 1]);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn same_z_orders_by_creation() {
        let first = SortKey::with_z(3);
        let second = SortKey::with_z(3);
        assert!(first < second);
        assert!(second.stamp() > first.stamp());
    }

    #[test]
    fn stamp_does_not_break_explicit_ties() {
        let a = SortKey::from_weights([2, 2, 2]);
        let b = SortKey::from_weights([2, 2, 2]);
        assert_ne!(a.stamp(), b.stamp());
        assert_eq!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn set_weights_keeps_trailing_stamp() {
        let mut key = SortKey::with_z(0);
        let stamp = key.weight[2];
        key.set_weights(&[7, 1]);
        assert_eq!(key.weight, [7, 1, stamp]);
    }
}
