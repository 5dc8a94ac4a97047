//! Blend mask generation for multi-projector setups.
//!
//! Footprints are rasterized into an overlap counter (stencil pass), each
//! count is mapped to a gamma-compensated weight, and the resulting mask is
//! optionally blurred. A transition variant cross-fades linearly across each
//! pairwise overlap instead.

mod blur;
mod overlap;
mod raster;
mod renderer;
mod stencil;

use glam::DVec2;

use crate::config::SurfaceBounds;
use crate::error::{BlendError, Result};

pub use blur::box_blur;
pub use overlap::{OverlapDetector, OverlapPair};
pub use raster::{fill_polygon, shade_polygon};
pub use renderer::{
    render_overlap_mask, render_transition_mask, BlendRenderer, MaskContext, MaskOutput,
    MaskState, ProjectorSlot,
};
pub use stencil::StencilBuffer;

/// Blend mask over the shared surface.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendMask {
    /// Width of the mask texture.
    pub width: u32,
    /// Height of the mask texture.
    pub height: u32,
    /// Blend values 0.0-1.0 (row-major storage, row 0 at the top).
    pub data: Vec<f32>,
    /// Surface rectangle the mask covers.
    pub surface: SurfaceBounds,
}

impl BlendMask {
    /// Create a new blend mask filled with 1.0 (no blending).
    pub fn new(width: u32, height: u32, surface: SurfaceBounds) -> Self {
        Self::filled(width, height, surface, 1.0)
    }

    pub fn filled(width: u32, height: u32, surface: SurfaceBounds, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
            surface,
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x < self.width && y < self.height {
            Some(self.data[self.index(x, y)])
        } else {
            None
        }
    }

    pub fn set(&mut self, x: u32, y: u32, value: f32) {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            self.data[idx] = value;
        }
    }

    /// Nearest-pixel lookup at a surface point. `None` outside the surface.
    pub fn sample(&self, point: DVec2) -> Option<f32> {
        let r = self.surface.to_raster(point, self.width, self.height);
        if r.x < 0.0 || r.y < 0.0 {
            return None;
        }
        let x = (r.x.floor() as u32).min(self.width.saturating_sub(1));
        let y = (r.y.floor() as u32).min(self.height.saturating_sub(1));
        if r.x > self.width as f64 || r.y > self.height as f64 {
            return None;
        }
        self.get(x, y)
    }

    /// Raw bytes for upload as an `R32Float` texture.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Four-channel expansion (weight in RGB, alpha 1) for RGBA targets.
    pub fn to_rgba(&self) -> Vec<[f32; 4]> {
        self.data.iter().map(|&w| [w, w, w, 1.0]).collect()
    }

    pub fn min_max(&self) -> (f32, f32) {
        self.data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }
}

/// Driven value that makes `count` overlapping projectors emit the light of one.
///
/// Projector output is `value^gamma`, so the per-projector value is
/// `(1/count)^(1/gamma)` rather than `1/count`.
pub fn overlap_weight(count: u32, gamma: f64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    (1.0 / count as f64).powf(1.0 / gamma)
}

/// Precomputed [`overlap_weight`] for counts `1..=max_overlap`.
#[derive(Debug, Clone, PartialEq)]
pub struct GammaWeights {
    gamma: f64,
    weights: Vec<f32>,
}

impl GammaWeights {
    pub fn new(gamma: f64, max_overlap: usize) -> Self {
        let weights = (1..=max_overlap as u32)
            .map(|count| overlap_weight(count, gamma) as f32)
            .collect();
        Self { gamma, weights }
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn max_overlap(&self) -> usize {
        self.weights.len()
    }

    /// Weight for an overlap count. Uncovered pixels get 0.
    pub fn weight(&self, count: u32) -> Result<f32> {
        if count == 0 {
            return Ok(0.0);
        }
        self.weights
            .get(count as usize - 1)
            .copied()
            .ok_or(BlendError::OverlapLimitExceeded {
                count,
                max: self.weights.len(),
            })
    }
}
