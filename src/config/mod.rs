//! Configuration and serialization module.
//!
//! Everything that used to be process-wide calibration state lives in these
//! structs and is handed to the renderer and the color module explicitly.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Number of driving values per channel in a color lookup table.
pub const VALUE_COUNT: usize = 256;

/// Project configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "ProjmapBlendProject")]
pub struct ProjectConfig {
    /// Project name.
    #[serde(rename = "name")]
    pub name: String,
    /// Blend mask settings.
    #[serde(rename = "blend", default)]
    pub blend: BlendConfig,
    /// Color calibration settings.
    #[serde(rename = "calibration", default)]
    pub calibration: CalibrationConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "New Project".to_string(),
            blend: BlendConfig::default(),
            calibration: CalibrationConfig::default(),
        }
    }
}

/// How overlap regions are blended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BlendMode {
    /// Discrete gamma-compensated bands per overlap count, optionally blurred.
    #[default]
    Stepped,
    /// Linear cross-fade across each pairwise overlap. Disables the blur.
    Transition,
}

/// Rectangle of the shared surface covered by the mask.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceBounds {
    #[serde(rename = "minX")]
    pub min_x: f64,
    #[serde(rename = "minY")]
    pub min_y: f64,
    #[serde(rename = "maxX")]
    pub max_x: f64,
    #[serde(rename = "maxY")]
    pub max_y: f64,
}

impl Default for SurfaceBounds {
    fn default() -> Self {
        Self {
            min_x: -1.0,
            min_y: -1.0,
            max_x: 1.0,
            max_y: 1.0,
        }
    }
}

impl SurfaceBounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Surface position of the centre of pixel (x, y) in a `width`x`height`
    /// raster. Row 0 is the top edge (max y).
    pub fn pixel_center(&self, x: u32, y: u32, width: u32, height: u32) -> DVec2 {
        DVec2::new(
            self.min_x + (x as f64 + 0.5) * self.width() / width as f64,
            self.max_y - (y as f64 + 0.5) * self.height() / height as f64,
        )
    }

    /// Continuous raster coordinates of a surface point.
    pub fn to_raster(&self, point: DVec2, width: u32, height: u32) -> DVec2 {
        DVec2::new(
            (point.x - self.min_x) / self.width() * width as f64,
            (self.max_y - point.y) / self.height() * height as f64,
        )
    }
}

/// Blend mask rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    /// Display gamma used to compensate overlap weights.
    #[serde(rename = "gamma")]
    pub gamma: f64,
    /// Largest overlap count with a precomputed weight.
    #[serde(rename = "maxOverlap")]
    pub max_overlap: usize,
    /// Box blur radius in pixels (0 disables the blur).
    #[serde(rename = "blurRadius")]
    pub blur_radius: u32,
    /// Number of horizontal+vertical blur iterations.
    #[serde(rename = "blurPasses")]
    pub blur_passes: u32,
    /// Blend mode.
    #[serde(rename = "mode")]
    pub mode: BlendMode,
    /// Surface area mapped onto the mask.
    #[serde(rename = "surface")]
    pub surface: SurfaceBounds,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            gamma: 2.2,
            max_overlap: 12,
            blur_radius: 0,
            blur_passes: 1,
            mode: BlendMode::Stepped,
            surface: SurfaceBounds::default(),
        }
    }
}

impl BlendConfig {
    /// Whether the separable blur runs after the weight pass.
    pub fn blur_enabled(&self) -> bool {
        self.mode == BlendMode::Stepped && self.blur_radius > 0 && self.blur_passes > 0
    }
}

/// Color calibration grid settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Grid cells per side of a projector image.
    #[serde(rename = "cellCount")]
    pub cell_count: usize,
    /// Number of the first projector in calibration document field names.
    #[serde(rename = "startNode")]
    pub start_node: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            cell_count: 8,
            start_node: 0,
        }
    }
}

impl CalibrationConfig {
    pub fn new(cell_count: usize) -> Self {
        Self {
            cell_count,
            ..Default::default()
        }
    }

    /// Number of cells in one channel grid.
    pub fn cells(&self) -> usize {
        self.cell_count * self.cell_count
    }
}
