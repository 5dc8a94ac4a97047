//! Intersection polygon of two footprints.

use glam::DVec2;

use super::{signed_area, sort_clockwise_by, Footprint, GeometryKernel};

/// Provisional blend tag carried by each overlap vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendTag {
    /// Crossing of an edge of A with an edge of B. Its weight is resolved
    /// later from the overlap count at the vertex.
    BoundaryIntersection,
    /// A corner of B lying inside A.
    ContainedInA,
    /// A corner of A lying inside B.
    ContainedInB,
}

/// One vertex of an [`OverlapPolygon`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapVertex {
    pub position: DVec2,
    pub tag: BlendTag,
}

/// Region covered by both footprints of a pair, vertices in clockwise order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlapPolygon {
    pub vertices: Vec<OverlapVertex>,
}

impl OverlapPolygon {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn points(&self) -> Vec<DVec2> {
        self.vertices.iter().map(|v| v.position).collect()
    }

    pub fn area(&self) -> f64 {
        signed_area(&self.points()).abs()
    }
}

impl GeometryKernel {
    /// Build the overlap polygon of `a` and `b`.
    ///
    /// Corners of one footprint lying inside the other come first, so when a
    /// corner coincides with an edge crossing the containment tag is kept.
    /// Returns an empty polygon when the footprints are disjoint, only touch,
    /// or overlap with zero area.
    pub fn compute_overlap(&self, a: &Footprint, b: &Footprint) -> OverlapPolygon {
        let mut vertices: Vec<OverlapVertex> = Vec::new();

        let mut push = |position: DVec2, tag: BlendTag| {
            if vertices
                .iter()
                .all(|v| (v.position - position).length() > self.tolerance)
            {
                vertices.push(OverlapVertex { position, tag });
            }
        };

        for &corner in b.points() {
            if self.point_in_polygon(corner, a.points()) {
                push(corner, BlendTag::ContainedInA);
            }
        }
        for &corner in a.points() {
            if self.point_in_polygon(corner, b.points()) {
                push(corner, BlendTag::ContainedInB);
            }
        }
        for (a0, a1) in a.edges() {
            for (b0, b1) in b.edges() {
                if let Some(hit) = self.segment_intersect(a0, a1, b0, b1) {
                    push(hit, BlendTag::BoundaryIntersection);
                }
            }
        }

        if vertices.len() < 3 {
            return OverlapPolygon::default();
        }

        sort_clockwise_by(&mut vertices, |v| v.position);
        let overlap = OverlapPolygon { vertices };
        if overlap.area() <= self.tolerance {
            return OverlapPolygon::default();
        }
        overlap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Footprint {
        Footprint::from_corners(&[[x, y], [x + size, y], [x + size, y + size], [x, y + size]])
            .unwrap()
    }

    #[test]
    fn test_disjoint_squares() {
        let kernel = GeometryKernel::default();
        let a = square(0.0, 0.0, 1.0);
        let b = square(3.0, 3.0, 1.0);
        assert!(kernel.compute_overlap(&a, &b).is_empty());
    }

    #[test]
    fn test_squares_overlapping_at_centers() {
        let kernel = GeometryKernel::default();
        let a = square(0.0, 0.0, 1.0);
        let b = square(0.5, 0.5, 1.0);
        let overlap = kernel.compute_overlap(&a, &b);

        assert_eq!(overlap.len(), 4);
        assert!((overlap.area() - 0.25).abs() < 1e-12);
        assert!(signed_area(&overlap.points()) < 0.0);

        let tags: Vec<BlendTag> = overlap.vertices.iter().map(|v| v.tag).collect();
        assert_eq!(
            tags.iter().filter(|t| **t == BlendTag::ContainedInA).count(),
            1
        );
        assert_eq!(
            tags.iter().filter(|t| **t == BlendTag::ContainedInB).count(),
            1
        );
        assert_eq!(
            tags.iter()
                .filter(|t| **t == BlendTag::BoundaryIntersection)
                .count(),
            2
        );
    }

    #[test]
    fn test_half_overlap_keeps_containment_tags() {
        let kernel = GeometryKernel::default();
        let a = Footprint::from_corners(&[[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]])
            .unwrap();
        let b = Footprint::from_corners(&[[0.0, -1.0], [2.0, -1.0], [2.0, 1.0], [0.0, 1.0]])
            .unwrap();
        let overlap = kernel.compute_overlap(&a, &b);

        assert_eq!(overlap.len(), 4);
        assert!((overlap.area() - 2.0).abs() < 1e-12);
        for vertex in &overlap.vertices {
            let expected = if vertex.position.x < 0.5 {
                BlendTag::ContainedInA
            } else {
                BlendTag::ContainedInB
            };
            assert_eq!(vertex.tag, expected);
        }
    }

    #[test]
    fn test_touching_squares_do_not_overlap() {
        let kernel = GeometryKernel::default();
        let a = square(0.0, 0.0, 1.0);
        let b = square(1.0, 0.0, 1.0);
        assert!(kernel.compute_overlap(&a, &b).is_empty());
    }

    #[test]
    fn test_nested_footprint() {
        let kernel = GeometryKernel::default();
        let outer = square(0.0, 0.0, 4.0);
        let inner = square(1.0, 1.0, 1.0);
        let overlap = kernel.compute_overlap(&outer, &inner);
        assert_eq!(overlap.len(), 4);
        assert!(overlap
            .vertices
            .iter()
            .all(|v| v.tag == BlendTag::ContainedInA));
    }

    #[test]
    fn test_square_nested_in_pentagon() {
        let kernel = GeometryKernel::default();
        let pentagon = Footprint::new(
            (0..5)
                .map(|i| {
                    let angle = std::f64::consts::TAU * i as f64 / 5.0;
                    DVec2::new(angle.cos(), angle.sin()) * 0.8
                })
                .collect(),
        )
        .unwrap();
        let inner = square(-0.1, -0.1, 0.2);
        let overlap = kernel.compute_overlap(&pentagon, &inner);

        assert_eq!(overlap.len(), 4);
        assert!((overlap.area() - 0.04).abs() < 1e-12);
        assert!(overlap
            .vertices
            .iter()
            .all(|v| v.tag == BlendTag::ContainedInA));
    }

    #[test]
    fn test_hexagons_side_by_side() {
        let kernel = GeometryKernel::default();
        let hexagon = |cx: f64| {
            Footprint::new(
                (0..6)
                    .map(|i| {
                        let angle = std::f64::consts::TAU * i as f64 / 6.0;
                        DVec2::new(cx + angle.cos(), angle.sin())
                    })
                    .collect(),
            )
            .unwrap()
        };
        let overlap = kernel.compute_overlap(&hexagon(0.0), &hexagon(1.0));

        // Rhombus between the two centres: corners (0.5, ±0.866), (0, 0), (1, 0).
        assert_eq!(overlap.len(), 4);
        let expected = 3f64.sqrt() / 2.0;
        assert!((overlap.area() - expected).abs() < 1e-9);
    }
}
