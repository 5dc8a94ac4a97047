//! Pairwise overlap detection between projector footprints.
//!
//! Finds every pair of footprints that overlap and resolves the per-vertex
//! blend weights used by the transition (cross-fade) variant.

use crate::geometry::{BlendTag, Footprint, GeometryKernel, OverlapPolygon};

/// Overlap between two projectors, with weights resolved for projector `a`.
#[derive(Debug, Clone)]
pub struct OverlapPair {
    /// First projector index.
    pub a: usize,
    /// Second projector index.
    pub b: usize,
    /// Shared region.
    pub polygon: OverlapPolygon,
    /// Weight of projector `a` at each polygon vertex.
    pub alphas: Vec<f32>,
}

impl OverlapPair {
    /// Per-vertex weights for one side of the pair.
    ///
    /// Corner weights swap between the two sides; seam weights are shared.
    pub fn alphas_for(&self, projector: usize) -> Option<Vec<f32>> {
        if projector == self.a {
            Some(self.alphas.clone())
        } else if projector == self.b {
            Some(
                self.polygon
                    .vertices
                    .iter()
                    .zip(&self.alphas)
                    .map(|(vertex, &alpha)| match vertex.tag {
                        BlendTag::BoundaryIntersection => alpha,
                        BlendTag::ContainedInA | BlendTag::ContainedInB => 1.0 - alpha,
                    })
                    .collect(),
            )
        } else {
            None
        }
    }

    pub fn involves(&self, projector: usize) -> bool {
        self.a == projector || self.b == projector
    }
}

/// Overlap detector over a footprint set.
pub struct OverlapDetector {
    kernel: GeometryKernel,
}

impl OverlapDetector {
    pub fn new(kernel: GeometryKernel) -> Self {
        Self { kernel }
    }

    /// Detect overlaps between all footprint pairs.
    pub fn detect(&self, footprints: &[Footprint]) -> Vec<OverlapPair> {
        let mut pairs = Vec::new();

        for i in 0..footprints.len() {
            for j in (i + 1)..footprints.len() {
                let polygon = self.kernel.compute_overlap(&footprints[i], &footprints[j]);
                if polygon.is_empty() {
                    log::debug!("No overlap between projector {} and {}", i, j);
                    continue;
                }

                log::debug!(
                    "Projectors {} and {} overlap over {:.4} surface units",
                    i,
                    j,
                    polygon.area()
                );

                let alphas = self.resolve_vertex_alphas(&polygon, footprints);
                pairs.push(OverlapPair {
                    a: i,
                    b: j,
                    polygon,
                    alphas,
                });
            }
        }

        pairs
    }

    /// Final weight of each overlap vertex, relative to footprint A.
    ///
    /// A corner of B inside A is where B's image starts, so A stays at full
    /// weight there; a corner of A inside B is where A ends. Seam crossings
    /// sit at 0.5 unless more than two projectors cover them, in which case
    /// they take `(1/count)^(1/count)` to stay in line with the stencil mask.
    pub fn resolve_vertex_alphas(&self, overlap: &OverlapPolygon, footprints: &[Footprint]) -> Vec<f32> {
        overlap
            .vertices
            .iter()
            .map(|vertex| match vertex.tag {
                BlendTag::ContainedInA => 1.0,
                BlendTag::ContainedInB => 0.0,
                BlendTag::BoundaryIntersection => {
                    let count = self.kernel.count_covering(vertex.position, footprints);
                    if count > 2 {
                        let inv = 1.0 / count as f64;
                        inv.powf(inv) as f32
                    } else {
                        0.5
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Footprint {
        Footprint::from_corners(&[[x0, y0], [x1, y0], [x1, y1], [x0, y1]]).unwrap()
    }

    #[test]
    fn test_detect_pairs() {
        let detector = OverlapDetector::new(GeometryKernel::default());
        let footprints = vec![
            rect(-1.0, -1.0, 0.2, 1.0),
            rect(-0.2, -1.0, 1.0, 1.0),
            rect(5.0, 5.0, 6.0, 6.0),
        ];
        let pairs = detector.detect(&footprints);

        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].a, pairs[0].b), (0, 1));
        assert!(pairs[0].involves(1));
        assert!(!pairs[0].involves(2));
    }

    #[test]
    fn test_side_by_side_alphas() {
        let detector = OverlapDetector::new(GeometryKernel::default());
        let footprints = vec![rect(-1.0, -1.0, 1.0, 1.0), rect(0.0, -1.0, 2.0, 1.0)];
        let pair = &detector.detect(&footprints)[0];

        for (vertex, alpha) in pair.polygon.vertices.iter().zip(&pair.alphas) {
            let expected = if vertex.position.x < 0.5 { 1.0 } else { 0.0 };
            assert_eq!(*alpha, expected);
        }

        let b_alphas = pair.alphas_for(1).unwrap();
        for (a, b) in pair.alphas.iter().zip(&b_alphas) {
            assert_eq!(a + b, 1.0);
        }
        assert!(pair.alphas_for(7).is_none());
    }

    #[test]
    fn test_seam_alpha_default() {
        let detector = OverlapDetector::new(GeometryKernel::default());
        let footprints = vec![rect(0.0, 0.0, 1.0, 1.0), rect(0.5, 0.5, 1.5, 1.5)];
        let pair = &detector.detect(&footprints)[0];

        for (vertex, alpha) in pair.polygon.vertices.iter().zip(&pair.alphas) {
            if vertex.tag == BlendTag::BoundaryIntersection {
                assert_eq!(*alpha, 0.5);
            }
        }
    }

    #[test]
    fn test_seam_alpha_with_three_projectors() {
        let detector = OverlapDetector::new(GeometryKernel::default());
        let footprints = vec![
            rect(0.0, 0.0, 1.0, 1.0),
            rect(0.5, 0.5, 1.5, 1.5),
            rect(0.0, 0.0, 2.0, 2.0),
        ];
        let polygon = GeometryKernel::default().compute_overlap(&footprints[0], &footprints[1]);
        let alphas = detector.resolve_vertex_alphas(&polygon, &footprints);

        let third = (1.0f64 / 3.0).powf(1.0 / 3.0) as f32;
        for (vertex, alpha) in polygon.vertices.iter().zip(&alphas) {
            if vertex.tag == BlendTag::BoundaryIntersection {
                assert!((alpha - third).abs() < 1e-6);
            }
        }
    }
}
