//! Projector footprint polygons.

use glam::DVec2;

use super::{segment_intersection_params, signed_area};
use crate::error::{BlendError, Result};

/// Where one projector's image lands on the shared surface.
///
/// Always convex and wound counter-clockwise (y up), with any number of
/// corners from three up.
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    points: Vec<DVec2>,
}

impl Footprint {
    /// Validate and normalize a footprint polygon.
    ///
    /// Zero-area footprints are accepted; they simply never overlap anything.
    pub fn new(points: Vec<DVec2>) -> Result<Self> {
        if points.len() < 3 {
            return Err(BlendError::InvalidFootprint(format!(
                "needs at least 3 corners, got {}",
                points.len()
            )));
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err(BlendError::InvalidFootprint(
                "corner coordinates must be finite".to_string(),
            ));
        }

        check_convex(&points)?;

        let mut points = points;
        if signed_area(&points) < 0.0 {
            points.reverse();
        }

        Ok(Self { points })
    }

    /// Build a footprint from `[x, y]` corner pairs.
    pub fn from_corners(corners: &[[f64; 2]]) -> Result<Self> {
        Self::new(corners.iter().map(|&[x, y]| DVec2::new(x, y)).collect())
    }

    /// Corners in counter-clockwise order.
    pub fn points(&self) -> &[DVec2] {
        &self.points
    }

    /// Closed edge list, last corner back to the first.
    pub fn edges(&self) -> impl Iterator<Item = (DVec2, DVec2)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    pub fn area(&self) -> f64 {
        signed_area(&self.points).abs()
    }

    /// Axis-aligned bounding box as (min, max).
    pub fn bounds(&self) -> (DVec2, DVec2) {
        self.points.iter().fold(
            (DVec2::splat(f64::INFINITY), DVec2::splat(f64::NEG_INFINITY)),
            |(min, max), &p| (min.min(p), max.max(p)),
        )
    }
}

/// Reject polygons that turn both ways or cross themselves.
fn check_convex(points: &[DVec2]) -> Result<()> {
    let n = points.len();
    let scale = points
        .iter()
        .fold(0.0f64, |acc, p| acc.max(p.x.abs()).max(p.y.abs()))
        .max(1.0);
    let eps = 1e-12 * scale * scale;

    let mut sign = 0.0f64;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let c = points[(i + 2) % n];
        let turn = (b - a).perp_dot(c - b);
        if turn.abs() <= eps {
            continue;
        }
        if sign == 0.0 {
            sign = turn.signum();
        } else if turn.signum() != sign {
            return Err(BlendError::InvalidFootprint(format!(
                "polygon is not convex at corner {}",
                (i + 1) % n
            )));
        }
    }

    // A star polygon turns consistently but crosses itself.
    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (a0, a1) = (points[i], points[(i + 1) % n]);
            let (b0, b1) = (points[j], points[(j + 1) % n]);
            if let Some((t, u)) = segment_intersection_params(a0, a1, b0, b1, eps) {
                let interior = |s: f64| s > 1e-9 && s < 1.0 - 1e-9;
                if interior(t) && interior(u) {
                    return Err(BlendError::InvalidFootprint(format!(
                        "edges {} and {} cross",
                        i, j
                    )));
                }
            }
        }
    }

    Ok(())
}
