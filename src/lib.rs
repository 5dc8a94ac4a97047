//! Projection Blend Library
//!
//! Blend masks and color correction for several projectors lighting one
//! continuous surface:
//! - Footprint overlap geometry
//! - Gamma-compensated overlap masks (stencil count, weight, blur)
//! - Per-cell color lookup tables from sparse measurements

pub mod blending;
pub mod calibration;
pub mod color;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;

// Re-export commonly used types
pub use blending::{BlendMask, BlendRenderer, MaskState};
pub use calibration::{ProjectorCalibration, StorageDocument};
pub use color::{calibrate, compute_channel_bounds, ColorCalibSample, ColorLookupTable};
pub use config::{BlendConfig, BlendMode, CalibrationConfig, ProjectConfig, SurfaceBounds};
pub use error::{BlendError, Result};
pub use geometry::{Footprint, GeometryKernel};
