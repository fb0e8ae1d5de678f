use serde::{Deserialize, Serialize};

/// Projection axis for overlap and gap measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Axis-aligned rectangle. Inside this crate coordinates are page-relative
/// (`[0,1]` on both axes, origin top-left) unless a function says otherwise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Zero or negative extent on either axis. NaN coordinates count as degenerate.
    pub fn is_degenerate(&self) -> bool {
        !(self.x1 > self.x0 && self.y1 > self.y0)
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) * 0.5, (self.y0 + self.y1) * 0.5)
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn iou(&self, other: &Self) -> f32 {
        if self.is_degenerate() || other.is_degenerate() {
            return 0.0;
        }
        let inter_area = self.axis_overlap(other, Axis::X) * self.axis_overlap(other, Axis::Y);
        if inter_area <= 0.0 {
            return 0.0;
        }
        let union = self.area() + other.area() - inter_area;
        if union <= 0.0 {
            0.0
        } else {
            inter_area / union
        }
    }

    /// `other` lies entirely inside `self` (edges may touch).
    pub fn contains(&self, other: &Self) -> bool {
        self.x0 <= other.x0 && self.y0 <= other.y0 && self.x1 >= other.x1 && self.y1 >= other.y1
    }

    /// Length of the overlap between the projections of both boxes on `axis`.
    pub fn axis_overlap(&self, other: &Self, axis: Axis) -> f32 {
        let (a0, a1, b0, b1) = self.span_pair(other, axis);
        (a1.min(b1) - a0.max(b0)).max(0.0)
    }

    /// Distance between the projections on `axis`; 0 when they touch or overlap.
    pub fn axis_gap(&self, other: &Self, axis: Axis) -> f32 {
        let (a0, a1, b0, b1) = self.span_pair(other, axis);
        (b0 - a1).max(a0 - b1).max(0.0)
    }

    /// Intersection with strictly positive area.
    pub fn intersects(&self, other: &Self) -> bool {
        self.axis_overlap(other, Axis::X) > 0.0 && self.axis_overlap(other, Axis::Y) > 0.0
    }

    pub fn clamp_unit(&self) -> Self {
        Self {
            x0: self.x0.clamp(0.0, 1.0),
            y0: self.y0.clamp(0.0, 1.0),
            x1: self.x1.clamp(0.0, 1.0),
            y1: self.y1.clamp(0.0, 1.0),
        }
    }

    pub fn center_distance(&self, other: &Self) -> f32 {
        let (cx1, cy1) = self.center();
        let (cx2, cy2) = other.center();
        ((cx1 - cx2).powi(2) + (cy1 - cy2).powi(2)).sqrt()
    }

    fn span_pair(&self, other: &Self, axis: Axis) -> (f32, f32, f32, f32) {
        match axis {
            Axis::X => (self.x0, self.x1, other.x0, other.x1),
            Axis::Y => (self.y0, self.y1, other.y0, other.y1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn computes_iou() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(5.0, 5.0, 15.0, 15.0);
        let iou = a.iou(&b);
        assert_eq!(iou, 25.0 / 175.0);
    }

    #[test]
    fn iou_is_reflexive_and_symmetric() {
        let a = BBox::new(0.1, 0.2, 0.4, 0.5);
        let b = BBox::new(0.3, 0.25, 0.6, 0.45);
        assert_eq!(a.iou(&a), 1.0);
        assert_eq!(a.iou(&b), b.iou(&a));
    }

    #[test]
    fn iou_is_zero_for_disjoint_or_degenerate_boxes() {
        let a = BBox::new(0.0, 0.0, 0.2, 0.2);
        let b = BBox::new(0.5, 0.5, 0.7, 0.7);
        let touching = BBox::new(0.2, 0.0, 0.4, 0.2);
        let flat = BBox::new(0.0, 0.1, 0.2, 0.1);
        assert_eq!(a.iou(&b), 0.0);
        assert_eq!(a.iou(&touching), 0.0);
        assert_eq!(a.iou(&flat), 0.0);
        assert_eq!(flat.iou(&flat), 0.0);
    }

    #[test]
    fn containment_is_reflexive_and_antisymmetric() {
        let outer = BBox::new(0.1, 0.1, 0.9, 0.9);
        let inner = BBox::new(0.2, 0.3, 0.5, 0.6);
        assert!(outer.contains(&outer));
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));

        let twin = BBox::new(0.1, 0.1, 0.9, 0.9);
        assert!(outer.contains(&twin) && twin.contains(&outer));
        assert_eq!(outer, twin);
    }

    #[test]
    fn measures_axis_overlap_and_gap() {
        let a = BBox::new(0.1, 0.10, 0.5, 0.15);
        let b = BBox::new(0.3, 0.16, 0.7, 0.20);
        assert!((a.axis_overlap(&b, Axis::X) - 0.2).abs() < 1e-6);
        assert_eq!(a.axis_overlap(&b, Axis::Y), 0.0);
        assert!((a.axis_gap(&b, Axis::Y) - 0.01).abs() < 1e-6);
        assert!((b.axis_gap(&a, Axis::Y) - 0.01).abs() < 1e-6);
        assert_eq!(a.axis_gap(&b, Axis::X), 0.0);
    }

    #[test]
    fn union_covers_both_inputs() {
        let a = BBox::new(0.1, 0.2, 0.3, 0.4);
        let b = BBox::new(0.05, 0.25, 0.35, 0.45);
        let u = a.union(&b);
        assert_eq!(u, BBox::new(0.05, 0.2, 0.35, 0.45));
        assert!(u.contains(&a) && u.contains(&b));
    }

    #[test]
    fn clamps_into_unit_square() {
        let b = BBox::new(-0.1, 0.5, 1.2, 0.9).clamp_unit();
        assert_eq!(b, BBox::new(0.0, 0.5, 1.0, 0.9));
    }
}
