//! Computational geometry for projector footprints.
//!
//! Segment intersection, containment, clockwise corner ordering, pairwise
//! overlap construction and overlap counting. Pure functions over `DVec2`
//! points in shared surface space (y up).

mod footprint;
mod overlap;

use glam::DVec2;
use std::cmp::Ordering;

pub use footprint::Footprint;
pub use overlap::{BlendTag, OverlapPolygon, OverlapVertex};

/// Default tolerance for parallel segments and barycentric bounds.
pub const DEFAULT_TOLERANCE: f64 = 1e-8;

/// Geometry operations parameterized by a numeric tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryKernel {
    /// Cross-product magnitude below which segments count as parallel. Also
    /// the slack on intersection parameters, barycentric coordinates and the
    /// distance under which two overlap vertices are merged.
    pub tolerance: f64,
}

impl Default for GeometryKernel {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl GeometryKernel {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Intersection point of segments `a0-a1` and `b0-b1`.
    ///
    /// Parallel (or collinear) segments never intersect.
    pub fn segment_intersect(&self, a0: DVec2, a1: DVec2, b0: DVec2, b1: DVec2) -> Option<DVec2> {
        let (t, u) = segment_intersection_params(a0, a1, b0, b1, self.tolerance)?;
        let tol = self.tolerance;
        let in_range = |s: f64| s >= -tol && s <= 1.0 + tol;
        if in_range(t) && in_range(u) {
            Some(a0 + (a1 - a0) * t.clamp(0.0, 1.0))
        } else {
            None
        }
    }

    /// Inclusive containment test for a convex polygon of either winding.
    ///
    /// The point must lie on the inner side of every edge, within `tolerance`
    /// of the edge line. Degenerate (zero-area) polygons contain nothing.
    pub fn point_in_polygon(&self, point: DVec2, polygon: &[DVec2]) -> bool {
        let n = polygon.len();
        if n < 3 {
            return false;
        }
        let area = signed_area(polygon);
        if area.abs() < self.tolerance {
            return false;
        }
        let winding = area.signum();
        (0..n).all(|i| {
            let a = polygon[i];
            let edge = polygon[(i + 1) % n] - a;
            let length = edge.length();
            if length < self.tolerance {
                return true;
            }
            winding * edge.perp_dot(point - a) / length >= -self.tolerance
        })
    }

    /// How many footprints contain `point`.
    pub fn count_covering(&self, point: DVec2, footprints: &[Footprint]) -> usize {
        footprints
            .iter()
            .filter(|f| self.point_in_polygon(point, f.points()))
            .count()
    }
}

/// Raw intersection parameters `(t, u)` along `a0-a1` and `b0-b1` of the two
/// supporting lines, or `None` when they are parallel.
pub(crate) fn segment_intersection_params(
    a0: DVec2,
    a1: DVec2,
    b0: DVec2,
    b1: DVec2,
    tolerance: f64,
) -> Option<(f64, f64)> {
    let r = a1 - a0;
    let s = b1 - b0;
    let denom = r.perp_dot(s);
    if denom.abs() < tolerance {
        return None;
    }
    let q = b0 - a0;
    Some((q.perp_dot(s) / denom, q.perp_dot(r) / denom))
}

/// Shoelace area: positive for counter-clockwise winding (y up).
pub fn signed_area(polygon: &[DVec2]) -> f64 {
    let n = polygon.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| polygon[i].perp_dot(polygon[(i + 1) % n]))
        .sum();
    twice * 0.5
}

/// Order points clockwise around their centroid, starting at 12 o'clock.
///
/// Points at the same angle are ordered nearest first.
pub fn sort_corners_clockwise(points: &mut [DVec2]) {
    sort_clockwise_by(points, |p| *p);
}

/// [`sort_corners_clockwise`] for any item carrying a position.
pub fn sort_clockwise_by<T>(items: &mut [T], position: impl Fn(&T) -> DVec2) {
    if items.len() < 2 {
        return;
    }
    let centroid = items.iter().map(&position).sum::<DVec2>() / items.len() as f64;
    items.sort_by(|a, b| clockwise_order(centroid, position(a), position(b)));
}

/// Monotone clockwise pseudo-angle in [0, 4), 0 pointing along +y.
fn clockwise_key(d: DVec2) -> f64 {
    let sum = d.x.abs() + d.y.abs();
    if sum == 0.0 {
        return 0.0;
    }
    // Counter-clockwise diamond angle from +x, one unit per quadrant.
    let ccw = if d.y >= 0.0 {
        if d.x >= 0.0 {
            d.y / sum
        } else {
            1.0 - d.x / sum
        }
    } else if d.x < 0.0 {
        2.0 - d.y / sum
    } else {
        3.0 + d.x / sum
    };
    match (1.0 - ccw).rem_euclid(4.0) {
        k if k >= 4.0 => 0.0,
        k => k,
    }
}

fn clockwise_order(centroid: DVec2, a: DVec2, b: DVec2) -> Ordering {
    let da = a - centroid;
    let db = b - centroid;
    clockwise_key(da)
        .total_cmp(&clockwise_key(db))
        .then_with(|| da.length_squared().total_cmp(&db.length_squared()))
}
