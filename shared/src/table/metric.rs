use super::bound::{Bound, Range};

/// Distance between fragment bounds, used to order tasks
pub trait Metric {
    /// Range of squared distances between any point of `a` and any point of `b`
    fn range_distance_sq(&self, a: &Bound, b: &Bound) -> Range;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EuclideanMetric;

impl Metric for EuclideanMetric {
    fn range_distance_sq(&self, a: &Bound, b: &Bound) -> Range {
        let mut lo = 0.0;
        let mut hi = 0.0;
        for d in 0..a.dimension().min(b.dimension()) {
            let gap = (a.lo()[d] - b.hi()[d]).max(b.lo()[d] - a.hi()[d]).max(0.0);
            let span = (a.hi()[d] - b.lo()[d]).abs().max((b.hi()[d] - a.lo()[d]).abs());
            lo += gap * gap;
            hi += span * span;
        }
        Range::new(lo, hi)
    }
}
