//! Per-pixel overlap counter.

use crate::config::SurfaceBounds;
use crate::geometry::Footprint;

use super::raster::fill_polygon;

/// Counts, per pixel, how many footprints were rasterized over it.
#[derive(Debug, Clone)]
pub struct StencilBuffer {
    width: u32,
    height: u32,
    counts: Vec<u32>,
}

impl StencilBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            counts: vec![0; width as usize * height as usize],
        }
    }

    /// Stencil pass over a whole footprint set.
    pub fn from_footprints(
        width: u32,
        height: u32,
        surface: &SurfaceBounds,
        footprints: &[Footprint],
    ) -> Self {
        let mut stencil = Self::new(width, height);
        for footprint in footprints {
            stencil.increment(surface, footprint);
        }
        stencil
    }

    /// Increment the counter under every pixel the footprint covers.
    pub fn increment(&mut self, surface: &SurfaceBounds, footprint: &Footprint) {
        let width = self.width;
        let counts = &mut self.counts;
        fill_polygon(width, self.height, surface, footprint.points(), |x, y| {
            counts[y as usize * width as usize + x as usize] += 1;
        });
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn count(&self, x: u32, y: u32) -> u32 {
        self.counts[y as usize * self.width as usize + x as usize]
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn max_count(&self) -> u32 {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}
