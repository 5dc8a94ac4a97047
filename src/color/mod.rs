//! Per-projector photometric calibration.
//!
//! Sparse per-cell measurements of a black reference and the three primaries
//! become a dense lookup table mapping (cell, driving value) to the output
//! value that makes every cell follow one shared transfer function.

mod lut;

use serde::{Deserialize, Serialize};

use crate::error::{BlendError, Result};

pub use lut::{
    build_lookup_table, calibrate, compute_medians, fill_missing_entries, median,
    ColorLookupTable, PartialLookupTable,
};

/// Number of color channels in a lookup table.
pub const CHANNELS: usize = 3;

/// CELL_COUNT x CELL_COUNT grid of measured medians. `None` marks a cell
/// without a valid measurement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellGrid {
    cell_count: usize,
    cells: Vec<Option<u8>>,
}

impl CellGrid {
    /// Grid with no valid cells.
    pub fn new(cell_count: usize) -> Self {
        Self {
            cell_count,
            cells: vec![None; cell_count * cell_count],
        }
    }

    /// Grid with every cell set to `value`.
    pub fn uniform(cell_count: usize, value: u8) -> Self {
        Self {
            cell_count,
            cells: vec![Some(value); cell_count * cell_count],
        }
    }

    /// Build a grid from `(x, y, value)` triples; cells not listed stay empty.
    pub fn from_triples(cell_count: usize, triples: &[(usize, usize, u8)]) -> Result<Self> {
        let mut grid = Self::new(cell_count);
        for &(x, y, value) in triples {
            if x >= cell_count || y >= cell_count {
                return Err(BlendError::MalformedField {
                    field: "cell grid".to_string(),
                    reason: format!("cell ({}, {}) outside {}x{} grid", x, y, cell_count, cell_count),
                });
            }
            grid.set(x, y, Some(value));
        }
        Ok(grid)
    }

    pub fn cell_count(&self) -> usize {
        self.cell_count
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x < self.cell_count && y < self.cell_count {
            self.cells[y * self.cell_count + x]
        } else {
            None
        }
    }

    pub fn set(&mut self, x: usize, y: usize, value: Option<u8>) {
        if x < self.cell_count && y < self.cell_count {
            self.cells[y * self.cell_count + x] = value;
        }
    }

    /// Measured values, skipping empty cells.
    pub fn valid(&self) -> impl Iterator<Item = u8> + '_ {
        self.cells.iter().flatten().copied()
    }

    pub fn valid_count(&self) -> usize {
        self.valid().count()
    }
}

/// One measurement run of one projector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorCalibSample {
    /// Projector index.
    pub projector: usize,
    /// Black reference medians.
    pub low: CellGrid,
    /// Full-drive medians per channel (R, G, B).
    pub channels: [CellGrid; CHANNELS],
}

impl ColorCalibSample {
    pub fn new(projector: usize, low: CellGrid, channels: [CellGrid; CHANNELS]) -> Result<Self> {
        let cell_count = low.cell_count();
        if let Some(bad) = channels.iter().find(|g| g.cell_count() != cell_count) {
            return Err(BlendError::MalformedField {
                field: format!("ColorCalibData_{}", projector),
                reason: format!(
                    "channel grid is {} cells wide, reference grid is {}",
                    bad.cell_count(),
                    cell_count
                ),
            });
        }
        Ok(Self {
            projector,
            low,
            channels,
        })
    }

    pub fn cell_count(&self) -> usize {
        self.low.cell_count()
    }
}

/// Shared linear transfer function per channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelBounds {
    /// Brightest black level over all cells and projectors.
    pub low: f32,
    /// Dimmest full-drive level per channel over all cells and projectors.
    pub high: [f32; CHANNELS],
}

impl ChannelBounds {
    /// Expected physical output of `channel` when driven with `value`.
    pub fn transfer(&self, channel: usize, value: f32) -> f32 {
        (self.high[channel] - self.low) / 255.0 * value + self.low
    }
}

/// Range every projector and cell can reach.
///
/// Falls back to 0 for the low bound and 255 for a high bound when no cell
/// has a valid measurement.
pub fn compute_channel_bounds(samples: &[ColorCalibSample]) -> ChannelBounds {
    let low = samples
        .iter()
        .flat_map(|s| s.low.valid())
        .max()
        .map_or(0.0, f32::from);

    let mut high = [255.0; CHANNELS];
    for (channel, bound) in high.iter_mut().enumerate() {
        if let Some(min) = samples.iter().flat_map(|s| s.channels[channel].valid()).min() {
            *bound = f32::from(min);
        }
    }

    log::debug!("Channel bounds: low {} high {:?}", low, high);
    ChannelBounds { low, high }
}
