//! Calibration data I/O.
//!
//! Reads per-projector geometry and color measurements from named-field
//! calibration documents, and stores the derived products (alpha masks,
//! lookup tables) between runs.

mod cache;
mod mask_file;
mod storage;

use std::ops::Range;

use glam::DVec2;

use crate::color::{CellGrid, ColorCalibSample};
use crate::config::CalibrationConfig;
use crate::error::{BlendError, Result};
use crate::geometry::{sort_corners_clockwise, Footprint};

pub use cache::{decode_lookup_table, encode_lookup_table, load_lookup_table, save_lookup_table};
pub use mask_file::{decode_alpha_mask, encode_alpha_mask, read_alpha_mask, write_alpha_mask};
pub use storage::{Matrix, StorageDocument, StorageValue};

/// Channel index of the black reference in color documents; 1..=3 are R, G, B.
pub const LOW_CHANNEL: usize = 0;

/// Geometric calibration of one projector.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectorCalibration {
    /// Projector number as used in field names.
    pub node: usize,
    /// Footprint corners in surface space.
    pub corners: [DVec2; 4],
    /// Texture coordinates matching each corner.
    pub tex_coords: [DVec2; 4],
    /// Viewport bounding box (min, max).
    pub viewport: (DVec2, DVec2),
    /// Resolution scaling factor.
    pub scale: f64,
}

fn four_points(matrix: &Matrix) -> [DVec2; 4] {
    std::array::from_fn(|i| DVec2::new(matrix.get(i, 0), matrix.get(i, 1)))
}

fn point_rows(points: &[DVec2]) -> Vec<f64> {
    points.iter().flat_map(|p| [p.x, p.y]).collect()
}

impl ProjectorCalibration {
    /// Read the fields of projector `node`.
    pub fn from_document(doc: &StorageDocument, node: usize) -> Result<Self> {
        let corners = four_points(doc.matrix(&format!("Corners_{}", node), 4, 2)?);
        let tex_coords = four_points(doc.matrix(&format!("TexCoords_{}", node), 4, 2)?);
        let viewport = doc.matrix(&format!("Viewport_{}", node), 2, 2)?;
        let scale = doc.scalar(&format!("Scale_{}", node))?;

        Ok(Self {
            node,
            corners,
            tex_coords,
            viewport: (
                DVec2::new(viewport.get(0, 0), viewport.get(0, 1)),
                DVec2::new(viewport.get(1, 0), viewport.get(1, 1)),
            ),
            scale,
        })
    }

    /// Store this projector's fields in `doc`.
    pub fn write_to(&self, doc: &mut StorageDocument) {
        let node = self.node;
        doc.insert_matrix(
            format!("Corners_{}", node),
            Matrix::new(4, 2, point_rows(&self.corners)),
        );
        doc.insert_matrix(
            format!("TexCoords_{}", node),
            Matrix::new(4, 2, point_rows(&self.tex_coords)),
        );
        doc.insert_matrix(
            format!("Viewport_{}", node),
            Matrix::new(2, 2, point_rows(&[self.viewport.0, self.viewport.1])),
        );
        doc.insert_scalar(format!("Scale_{}", node), self.scale);
    }

    /// Footprint polygon. Corners may be stored in any order.
    pub fn footprint(&self) -> Result<Footprint> {
        let mut corners = self.corners;
        sort_corners_clockwise(&mut corners);
        Footprint::new(corners.to_vec()).map_err(|e| {
            log::warn!("Projector {} has an unusable footprint: {}", self.node, e);
            e
        })
    }

    /// Viewport width and height.
    pub fn viewport_size(&self) -> DVec2 {
        self.viewport.1 - self.viewport.0
    }
}

/// Number of projectors described by `doc`.
///
/// Uses `ProjectorCount` when present, otherwise counts consecutive
/// `Corners_<n>` fields from the start node.
pub fn projector_count(doc: &StorageDocument, config: &CalibrationConfig) -> Result<usize> {
    if doc.contains("ProjectorCount") {
        let count = doc.scalar("ProjectorCount")?;
        if count < 0.0 || count.fract() != 0.0 {
            return Err(BlendError::MalformedField {
                field: "ProjectorCount".to_string(),
                reason: format!("{} is not a projector count", count),
            });
        }
        return Ok(count as usize);
    }
    Ok((config.start_node..)
        .take_while(|node| doc.contains(&format!("Corners_{}", node)))
        .count())
}

/// Node numbers of `count` projectors from the start node.
fn node_range(config: &CalibrationConfig, count: usize) -> Result<Range<usize>> {
    let end = config
        .start_node
        .checked_add(count)
        .ok_or_else(|| BlendError::MalformedField {
            field: "ProjectorCount".to_string(),
            reason: format!(
                "{} projectors from node {} overflow the node range",
                count, config.start_node
            ),
        })?;
    Ok(config.start_node..end)
}

/// Geometric calibration of every projector in `doc`.
pub fn load_projector_calibrations(
    doc: &StorageDocument,
    config: &CalibrationConfig,
) -> Result<Vec<ProjectorCalibration>> {
    let count = projector_count(doc, config)?;
    let calibrations = node_range(config, count)?
        .map(|node| ProjectorCalibration::from_document(doc, node))
        .collect::<Result<Vec<_>>>()?;
    log::info!("Loaded geometric calibration for {} projectors", count);
    Ok(calibrations)
}

/// Footprints of a calibration set, in projector order.
pub fn footprints(calibrations: &[ProjectorCalibration]) -> Result<Vec<Footprint>> {
    calibrations.iter().map(ProjectorCalibration::footprint).collect()
}

/// Cell grid from an N x 3 matrix of `(x, y, value)` rows.
///
/// Rows with a negative value mark cells without a measurement and are
/// skipped.
fn grid_from_triples(field: &str, matrix: &Matrix, cell_count: usize) -> Result<CellGrid> {
    let malformed = |reason: String| BlendError::MalformedField {
        field: field.to_string(),
        reason,
    };
    let as_cell = |v: f64| -> Result<usize> {
        if v < 0.0 || v.fract() != 0.0 || v >= cell_count as f64 {
            return Err(malformed(format!(
                "cell coordinate {} outside a {}x{} grid",
                v, cell_count, cell_count
            )));
        }
        Ok(v as usize)
    };

    let mut grid = CellGrid::new(cell_count);
    for row in matrix.row_iter() {
        let (x, y, value) = (as_cell(row[0])?, as_cell(row[1])?, row[2]);
        if value < 0.0 {
            continue;
        }
        if value > 255.0 {
            return Err(malformed(format!("measurement {} above 255", value)));
        }
        grid.set(x, y, Some(value.round() as u8));
    }
    Ok(grid)
}

/// Color measurements of projector `node`.
pub fn color_sample_from_document(
    doc: &StorageDocument,
    node: usize,
    cell_count: usize,
) -> Result<ColorCalibSample> {
    let grid = |channel: usize| -> Result<CellGrid> {
        let field = format!("ColorCalibData_{}_{}", node, channel);
        grid_from_triples(&field, doc.matrix_with_cols(&field, 3)?, cell_count)
    };

    let low = grid(LOW_CHANNEL)?;
    let channels = [grid(1)?, grid(2)?, grid(3)?];
    log::debug!(
        "Projector {}: {} reference cells, {:?} channel cells measured",
        node,
        low.valid_count(),
        channels.iter().map(CellGrid::valid_count).collect::<Vec<_>>()
    );
    ColorCalibSample::new(node, low, channels)
}

/// Color measurements of `count` projectors from the start node.
pub fn load_color_samples(
    doc: &StorageDocument,
    config: &CalibrationConfig,
    count: usize,
) -> Result<Vec<ColorCalibSample>> {
    node_range(config, count)?
        .map(|node| color_sample_from_document(doc, node, config.cell_count))
        .collect()
}
