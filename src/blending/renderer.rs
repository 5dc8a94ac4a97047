//! Per-projector blend mask rendering.
//!
//! Each projector owns a slot that moves through
//! `Uninitialized -> ContextReady -> MaskComputed`. Finished masks are handed
//! out as `Arc` snapshots: preparing a slot again drops the renderer's copy
//! but leaves any consumer's copy untouched.

use std::sync::Arc;

use crate::color::ColorLookupTable;
use crate::config::{BlendConfig, BlendMode};
use crate::error::{BlendError, Result};
use crate::geometry::{Footprint, GeometryKernel};

use super::blur::box_blur;
use super::overlap::{OverlapDetector, OverlapPair};
use super::raster::{fill_polygon, shade_polygon};
use super::stencil::StencilBuffer;
use super::{BlendMask, GammaWeights};

/// Inputs a slot needs before it can render.
#[derive(Debug, Clone)]
pub struct MaskContext {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Every projector footprint on the surface.
    pub footprints: Arc<[Footprint]>,
    /// Color table bound next to the mask for the composite stage.
    pub lookup: Option<Arc<ColorLookupTable>>,
}

/// Products of a completed render.
#[derive(Debug, Clone)]
pub struct MaskOutput {
    /// Gamma-stepped overlap mask.
    pub mask: Arc<BlendMask>,
    /// Cross-fade mask, only in [`BlendMode::Transition`].
    pub transition: Option<Arc<BlendMask>>,
    /// Highest overlap count seen by the stencil pass.
    pub max_count: u32,
}

/// Lifecycle of one projector's mask.
#[derive(Debug, Clone, Default)]
pub enum MaskState {
    #[default]
    Uninitialized,
    ContextReady(MaskContext),
    MaskComputed {
        context: MaskContext,
        output: MaskOutput,
    },
}

impl MaskState {
    pub fn name(&self) -> &'static str {
        match self {
            MaskState::Uninitialized => "uninitialized",
            MaskState::ContextReady(_) => "context ready",
            MaskState::MaskComputed { .. } => "mask computed",
        }
    }

    pub fn context(&self) -> Option<&MaskContext> {
        match self {
            MaskState::Uninitialized => None,
            MaskState::ContextReady(context) => Some(context),
            MaskState::MaskComputed { context, .. } => Some(context),
        }
    }

    pub fn output(&self) -> Option<&MaskOutput> {
        match self {
            MaskState::MaskComputed { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Runtime state for a projector.
#[derive(Debug, Clone, Default)]
pub struct ProjectorSlot {
    pub state: MaskState,
}

/// Renders blend masks for a set of projectors.
pub struct BlendRenderer {
    config: BlendConfig,
    kernel: GeometryKernel,
    weights: GammaWeights,
    slots: Vec<ProjectorSlot>,
}

impl BlendRenderer {
    pub fn new(config: BlendConfig, projector_count: usize) -> Self {
        let weights = GammaWeights::new(config.gamma, config.max_overlap);
        Self {
            config,
            kernel: GeometryKernel::default(),
            weights,
            slots: vec![ProjectorSlot::default(); projector_count],
        }
    }

    pub fn with_kernel(mut self, kernel: GeometryKernel) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn config(&self) -> &BlendConfig {
        &self.config
    }

    pub fn projector_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[ProjectorSlot] {
        &self.slots
    }

    fn slot(&self, index: usize) -> Result<&ProjectorSlot> {
        self.slots.get(index).ok_or(BlendError::ProjectorIndex {
            index,
            count: self.slots.len(),
        })
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut ProjectorSlot> {
        let count = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or(BlendError::ProjectorIndex { index, count })
    }

    pub fn state(&self, index: usize) -> Result<&MaskState> {
        Ok(&self.slot(index)?.state)
    }

    /// Enter `ContextReady`, discarding any previously computed mask.
    pub fn prepare(
        &mut self,
        index: usize,
        width: u32,
        height: u32,
        footprints: impl Into<Arc<[Footprint]>>,
        lookup: Option<Arc<ColorLookupTable>>,
    ) -> Result<()> {
        let footprints = footprints.into();
        let slot = self.slot_mut(index)?;
        if matches!(slot.state, MaskState::MaskComputed { .. }) {
            log::info!("Projector {} recalibrated, previous mask released", index);
        }
        log::debug!(
            "Projector {} context ready: {}x{}, {} footprint(s)",
            index,
            width,
            height,
            footprints.len()
        );
        slot.state = MaskState::ContextReady(MaskContext {
            width,
            height,
            footprints,
            lookup,
        });
        Ok(())
    }

    /// Render the mask for a prepared projector and enter `MaskComputed`.
    pub fn compute(&mut self, index: usize) -> Result<Arc<BlendMask>> {
        let context = match self.slot(index)?.state.context() {
            Some(context) => context.clone(),
            None => {
                return Err(BlendError::InvalidState {
                    index,
                    expected: "context ready",
                    found: MaskState::Uninitialized.name(),
                })
            }
        };

        let stencil = StencilBuffer::from_footprints(
            context.width,
            context.height,
            &self.config.surface,
            &context.footprints,
        );
        let max_count = stencil.max_count();
        let mask = Arc::new(weight_pass(
            &self.config,
            &self.weights,
            &stencil,
            context.footprints.is_empty(),
        )?);

        let transition = if self.config.mode == BlendMode::Transition {
            if index < context.footprints.len() {
                let pairs = OverlapDetector::new(self.kernel).detect(&context.footprints);
                Some(Arc::new(render_transition_mask(
                    &self.config,
                    context.width,
                    context.height,
                    &context.footprints,
                    index,
                    &pairs,
                )))
            } else {
                log::warn!(
                    "Projector {} has no footprint in the set, skipping transition mask",
                    index
                );
                None
            }
        } else {
            None
        };

        log::info!(
            "Blend mask computed for projector {}: {}x{}, max overlap {}",
            index,
            context.width,
            context.height,
            max_count
        );

        let output = MaskOutput {
            mask: Arc::clone(&mask),
            transition,
            max_count,
        };
        self.slot_mut(index)?.state = MaskState::MaskComputed { context, output };
        Ok(mask)
    }

    /// Computed mask, if the projector is in `MaskComputed`.
    pub fn mask(&self, index: usize) -> Option<Arc<BlendMask>> {
        let output = self.slots.get(index)?.state.output()?;
        Some(Arc::clone(&output.mask))
    }

    pub fn transition_mask(&self, index: usize) -> Option<Arc<BlendMask>> {
        let output = self.slots.get(index)?.state.output()?;
        output.transition.clone()
    }

    pub fn lookup_table(&self, index: usize) -> Option<Arc<ColorLookupTable>> {
        self.slots.get(index)?.state.context()?.lookup.clone()
    }

    /// Drop everything held for a projector.
    pub fn reset(&mut self, index: usize) -> Result<()> {
        self.slot_mut(index)?.state = MaskState::Uninitialized;
        Ok(())
    }
}

/// Stencil pass, weight pass and optional blur over a footprint set.
///
/// An empty footprint set yields a mask of 1 (no correction).
pub fn render_overlap_mask(
    config: &BlendConfig,
    weights: &GammaWeights,
    width: u32,
    height: u32,
    footprints: &[Footprint],
) -> Result<BlendMask> {
    let stencil = StencilBuffer::from_footprints(width, height, &config.surface, footprints);
    weight_pass(config, weights, &stencil, footprints.is_empty())
}

fn weight_pass(
    config: &BlendConfig,
    weights: &GammaWeights,
    stencil: &StencilBuffer,
    no_footprints: bool,
) -> Result<BlendMask> {
    let (width, height) = (stencil.width(), stencil.height());
    if no_footprints {
        return Ok(BlendMask::new(width, height, config.surface));
    }

    let max_count = stencil.max_count();
    if max_count as usize > weights.max_overlap() {
        return Err(BlendError::OverlapLimitExceeded {
            count: max_count,
            max: weights.max_overlap(),
        });
    }

    let data = stencil
        .counts()
        .iter()
        .map(|&count| weights.weight(count))
        .collect::<Result<Vec<f32>>>()?;
    let mut mask = BlendMask {
        width,
        height,
        data,
        surface: config.surface,
    };

    if config.blur_enabled() {
        box_blur(&mut mask, config.blur_radius, config.blur_passes);
    }
    Ok(mask)
}

/// Cross-fade mask for one projector.
///
/// 1 inside the projector's footprint and 0 outside; every overlap the
/// projector takes part in multiplies in its interpolated vertex weights.
pub fn render_transition_mask(
    config: &BlendConfig,
    width: u32,
    height: u32,
    footprints: &[Footprint],
    projector: usize,
    pairs: &[OverlapPair],
) -> BlendMask {
    let mut mask = BlendMask::filled(width, height, config.surface, 0.0);
    let Some(own) = footprints.get(projector) else {
        return mask;
    };

    let data = &mut mask.data;
    fill_polygon(width, height, &config.surface, own.points(), |x, y| {
        data[y as usize * width as usize + x as usize] = 1.0;
    });

    for pair in pairs.iter().filter(|p| p.involves(projector)) {
        let Some(alphas) = pair.alphas_for(projector) else {
            continue;
        };
        let vertices: Vec<_> = pair
            .polygon
            .vertices
            .iter()
            .map(|v| v.position)
            .zip(alphas)
            .collect();
        shade_polygon(width, height, &config.surface, &vertices, |x, y, alpha| {
            data[y as usize * width as usize + x as usize] *= alpha.clamp(0.0, 1.0);
        });
    }

    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;

    fn side_by_side() -> Vec<Footprint> {
        vec![
            Footprint::from_corners(&[[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]])
                .unwrap(),
            Footprint::from_corners(&[[0.0, -1.0], [2.0, -1.0], [2.0, 1.0], [0.0, 1.0]]).unwrap(),
        ]
    }

    #[test]
    fn test_state_transitions() {
        let mut renderer = BlendRenderer::new(BlendConfig::default(), 2);
        assert_eq!(renderer.state(0).unwrap().name(), "uninitialized");
        assert!(matches!(
            renderer.compute(0),
            Err(BlendError::InvalidState { index: 0, .. })
        ));

        renderer.prepare(0, 20, 10, side_by_side(), None).unwrap();
        assert_eq!(renderer.state(0).unwrap().name(), "context ready");
        assert!(renderer.mask(0).is_none());

        renderer.compute(0).unwrap();
        assert_eq!(renderer.state(0).unwrap().name(), "mask computed");
        assert!(renderer.mask(0).is_some());
        assert_eq!(renderer.state(0).unwrap().output().unwrap().max_count, 2);

        renderer.reset(0).unwrap();
        assert!(renderer.mask(0).is_none());
    }

    #[test]
    fn test_bad_index() {
        let mut renderer = BlendRenderer::new(BlendConfig::default(), 1);
        assert!(matches!(
            renderer.prepare(3, 4, 4, side_by_side(), None),
            Err(BlendError::ProjectorIndex { index: 3, count: 1 })
        ));
    }

    #[test]
    fn test_recalibration_keeps_old_snapshot() {
        let mut renderer = BlendRenderer::new(BlendConfig::default(), 1);
        renderer.prepare(0, 20, 10, side_by_side(), None).unwrap();
        let first = renderer.compute(0).unwrap();

        renderer
            .prepare(0, 20, 10, Vec::<Footprint>::new(), None)
            .unwrap();
        assert!(renderer.mask(0).is_none());
        let second = renderer.compute(0).unwrap();

        assert!(first.data.iter().any(|&v| v < 1.0));
        assert!(second.data.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_overlap_weights() {
        let config = BlendConfig::default();
        let weights = GammaWeights::new(config.gamma, config.max_overlap);
        let mask = render_overlap_mask(&config, &weights, 20, 10, &side_by_side()).unwrap();

        let expected = 0.5f64.powf(1.0 / 2.2) as f32;
        assert!((mask.sample(DVec2::new(0.5, 0.0)).unwrap() - expected).abs() < 1e-6);
        assert_eq!(mask.sample(DVec2::new(-0.5, 0.0)), Some(1.0));
    }

    #[test]
    fn test_uncovered_pixels_are_zero() {
        let config = BlendConfig::default();
        let weights = GammaWeights::new(config.gamma, config.max_overlap);
        let small = vec![Footprint::from_corners(&[
            [-0.5, -0.5],
            [0.5, -0.5],
            [0.5, 0.5],
            [-0.5, 0.5],
        ])
        .unwrap()];
        let mask = render_overlap_mask(&config, &weights, 16, 16, &small).unwrap();
        assert_eq!(mask.sample(DVec2::new(-0.9, 0.9)), Some(0.0));
        assert_eq!(mask.sample(DVec2::new(0.0, 0.0)), Some(1.0));
    }

    #[test]
    fn test_overlap_limit_reported() {
        let config = BlendConfig {
            max_overlap: 1,
            ..Default::default()
        };
        let weights = GammaWeights::new(config.gamma, config.max_overlap);
        let result = render_overlap_mask(&config, &weights, 20, 10, &side_by_side());
        assert!(matches!(
            result,
            Err(BlendError::OverlapLimitExceeded { count: 2, max: 1 })
        ));
    }

    #[test]
    fn test_blur_softens_band_edge() {
        let config = BlendConfig {
            blur_radius: 2,
            blur_passes: 2,
            ..Default::default()
        };
        let weights = GammaWeights::new(config.gamma, config.max_overlap);
        let mask = render_overlap_mask(&config, &weights, 40, 4, &side_by_side()).unwrap();

        let step = 0.5f64.powf(1.0 / 2.2) as f32;
        let edge = mask.get(20, 1).unwrap();
        assert!(edge > step && edge < 1.0);
    }

    #[test]
    fn test_transition_cross_fade() {
        let config = BlendConfig {
            mode: BlendMode::Transition,
            blur_radius: 4,
            ..Default::default()
        };
        let mut renderer = BlendRenderer::new(config, 2);
        for index in 0..2 {
            renderer.prepare(index, 40, 4, side_by_side(), None).unwrap();
            renderer.compute(index).unwrap();
        }
        let a = renderer.transition_mask(0).unwrap();
        let b = renderer.transition_mask(1).unwrap();

        // The stepped mask is not blurred in transition mode.
        let stepped = renderer.mask(0).unwrap();
        assert_eq!(stepped.get(20, 1), Some(0.5f64.powf(1.0 / 2.2) as f32));

        for x in 0..40 {
            let sum = a.get(x, 1).unwrap() + b.get(x, 1).unwrap();
            assert!((sum - 1.0).abs() < 1e-5, "x={} sum={}", x, sum);
        }
        assert!((a.sample(DVec2::new(0.5, 0.0)).unwrap() - 0.475).abs() < 1e-4);
        assert_eq!(a.sample(DVec2::new(-0.5, 0.0)), Some(1.0));
        assert_eq!(b.sample(DVec2::new(-0.5, 0.0)), Some(0.0));
    }

    #[test]
    fn test_lookup_bound_with_context() {
        let mut renderer = BlendRenderer::new(BlendConfig::default(), 1);
        assert!(renderer.lookup_table(0).is_none());
        let table = Arc::new(ColorLookupTable::uniform(2, 128.0));
        renderer
            .prepare(0, 4, 4, side_by_side(), Some(Arc::clone(&table)))
            .unwrap();
        assert!(renderer.lookup_table(0).is_some());
    }
}
