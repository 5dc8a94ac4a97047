//! Lookup-table construction, gap filling, and texture layout.

use serde::{Deserialize, Serialize};

use crate::config::VALUE_COUNT;

use super::{ChannelBounds, ColorCalibSample, CHANNELS};

/// Flat index of `[channel][cell-x][cell-y][value]`.
fn entry_index(cell_count: usize, channel: usize, x: usize, y: usize, value: usize) -> usize {
    ((channel * cell_count + x) * cell_count + y) * VALUE_COUNT + value
}

fn entry_count(cell_count: usize) -> usize {
    CHANNELS * cell_count * cell_count * VALUE_COUNT
}

/// Lookup table straight out of the measurements. `None` marks an entry that
/// could not be computed from its own cell.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialLookupTable {
    cell_count: usize,
    entries: Vec<Option<f32>>,
}

impl PartialLookupTable {
    pub fn new(cell_count: usize) -> Self {
        Self {
            cell_count,
            entries: vec![None; entry_count(cell_count)],
        }
    }

    pub fn cell_count(&self) -> usize {
        self.cell_count
    }

    pub fn get(&self, channel: usize, x: usize, y: usize, value: usize) -> Option<f32> {
        self.entries[entry_index(self.cell_count, channel, x, y, value)]
    }

    pub fn set(&mut self, channel: usize, x: usize, y: usize, value: usize, entry: Option<f32>) {
        let index = entry_index(self.cell_count, channel, x, y, value);
        self.entries[index] = entry;
    }

    pub fn missing_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_none()).count()
    }

    /// Neighbour reads that fall outside the grid count as missing.
    fn get_signed(&self, channel: usize, x: isize, y: isize, value: usize) -> Option<f32> {
        let n = self.cell_count as isize;
        if x < 0 || y < 0 || x >= n || y >= n {
            return None;
        }
        self.get(channel, x as usize, y as usize, value)
    }
}

/// Dense per-projector lookup table. Every entry is a corrected output value
/// in [0, 255].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorLookupTable {
    cell_count: usize,
    values: Vec<f32>,
}

impl ColorLookupTable {
    /// Table with every entry set to `value`.
    pub fn uniform(cell_count: usize, value: f32) -> Self {
        Self {
            cell_count,
            values: vec![value.clamp(0.0, 255.0); entry_count(cell_count)],
        }
    }

    /// Identity correction: every cell outputs the value it is driven with.
    pub fn identity(cell_count: usize) -> Self {
        let mut values = Vec::with_capacity(entry_count(cell_count));
        for _ in 0..CHANNELS * cell_count * cell_count {
            values.extend((0..VALUE_COUNT).map(|v| v as f32));
        }
        Self { cell_count, values }
    }

    pub fn cell_count(&self) -> usize {
        self.cell_count
    }

    /// Corrected output for `channel` at cell `(x, y)` driven with `value`.
    pub fn lookup(&self, channel: usize, x: usize, y: usize, value: u8) -> f32 {
        self.values[entry_index(self.cell_count, channel, x, y, value as usize)]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Entry count matches the cell count.
    pub fn is_consistent(&self) -> bool {
        self.values.len() == entry_count(self.cell_count)
    }

    /// Reorder into `[value][cell-y reversed][cell-x][channel]`, normalized to
    /// [0, 1], ready for upload as a 3D texture of `cell_count` x
    /// `cell_count` x 256 RGB texels.
    pub fn to_texture_layout(&self) -> Vec<f32> {
        let n = self.cell_count;
        let mut out = Vec::with_capacity(self.values.len());
        for v in 0..VALUE_COUNT {
            for y in (0..n).rev() {
                for x in 0..n {
                    for c in 0..CHANNELS {
                        out.push(self.values[entry_index(n, c, x, y, v)] / 255.0);
                    }
                }
            }
        }
        out
    }

    /// Texture layout as raw bytes.
    pub fn texture_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.to_texture_layout()).to_vec()
    }
}

/// Invert each cell's measured response so it follows the shared transfer
/// function.
///
/// An entry stays missing when the cell lacks either measurement or when its
/// measured range is empty or inverted.
pub fn build_lookup_table(sample: &ColorCalibSample, bounds: &ChannelBounds) -> PartialLookupTable {
    let n = sample.cell_count();
    let mut table = PartialLookupTable::new(n);

    for (c, grid) in sample.channels.iter().enumerate() {
        for x in 0..n {
            for y in 0..n {
                let (Some(cell_low), Some(cell_high)) = (sample.low.get(x, y), grid.get(x, y)) else {
                    continue;
                };
                let cell_low = f32::from(cell_low);
                let cell_high = f32::from(cell_high);
                if cell_high <= cell_low {
                    continue;
                }

                for v in 0..VALUE_COUNT {
                    let target = bounds.transfer(c, v as f32);
                    let out = (target - cell_low) * 255.0 / (cell_high - cell_low);
                    table.set(c, x, y, v, Some(out.clamp(0.0, 255.0)));
                }
            }
        }
    }

    log::debug!(
        "Projector {}: {} of {} lookup entries need filling",
        sample.projector,
        table.missing_count(),
        entry_count(n)
    );
    table
}

/// Conventional median: the middle element for odd counts, the mean of the
/// two central elements for even counts. Sorts `values` in place.
pub fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Per driving value, the cross-cell median of each channel over cells where
/// all three channels are present.
pub fn compute_medians(table: &PartialLookupTable) -> Vec<Option<[f32; CHANNELS]>> {
    let n = table.cell_count;
    let mut columns: [Vec<f32>; CHANNELS] = Default::default();

    (0..VALUE_COUNT)
        .map(|v| {
            for column in columns.iter_mut() {
                column.clear();
            }
            for x in 0..n {
                for y in 0..n {
                    if let (Some(r), Some(g), Some(b)) = (
                        table.get(0, x, y, v),
                        table.get(1, x, y, v),
                        table.get(2, x, y, v),
                    ) {
                        columns[0].push(r);
                        columns[1].push(g);
                        columns[2].push(b);
                    }
                }
            }

            let [r, g, b] = &mut columns;
            Some([median(r)?, median(g)?, median(b)?])
        })
        .collect()
}

/// Replace every missing entry with an estimate from nearby cells.
///
/// Searches rings of growing radius over the eight compass directions for
/// measured entries at the same driving value, averages the first non-empty
/// ring, and averages that with the cross-cell median. Falls back to the
/// median alone, then to 0. Neighbours are read from the measured table only,
/// so the result does not depend on fill order.
pub fn fill_missing_entries(table: &PartialLookupTable) -> ColorLookupTable {
    const DIRECTIONS: [(isize, isize); 8] = [
        (-1, 0),
        (1, 0),
        (0, -1),
        (0, 1),
        (-1, -1),
        (1, -1),
        (-1, 1),
        (1, 1),
    ];

    let n = table.cell_count;
    let medians = compute_medians(table);
    let mut values = Vec::with_capacity(table.entries.len());

    for c in 0..CHANNELS {
        for x in 0..n {
            for y in 0..n {
                for v in 0..VALUE_COUNT {
                    if let Some(value) = table.get(c, x, y, v) {
                        values.push(value);
                        continue;
                    }

                    let neighbours = (1..n).find_map(|radius| {
                        let r = radius as isize;
                        let found: Vec<f32> = DIRECTIONS
                            .iter()
                            .filter_map(|&(dx, dy)| {
                                table.get_signed(c, x as isize + dx * r, y as isize + dy * r, v)
                            })
                            .collect();
                        if found.is_empty() {
                            None
                        } else {
                            Some(found.iter().sum::<f32>() / found.len() as f32)
                        }
                    });
                    let median = medians[v].map(|m| m[c]);

                    let filled = match (neighbours, median) {
                        (Some(near), Some(median)) => (near + median) / 2.0,
                        (Some(near), None) => near,
                        (None, Some(median)) => median,
                        (None, None) => 0.0,
                    };
                    values.push(filled);
                }
            }
        }
    }

    ColorLookupTable {
        cell_count: n,
        values,
    }
}

/// Build and fill the lookup table for one projector.
pub fn calibrate(sample: &ColorCalibSample, bounds: &ChannelBounds) -> ColorLookupTable {
    let partial = build_lookup_table(sample, bounds);
    let table = fill_missing_entries(&partial);
    log::info!(
        "Projector {}: color lookup table built ({}x{} cells)",
        sample.projector,
        table.cell_count,
        table.cell_count
    );
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{compute_channel_bounds, CellGrid};

    fn sample(low: CellGrid, high: CellGrid) -> ColorCalibSample {
        ColorCalibSample::new(0, low, [high.clone(), high.clone(), high]).unwrap()
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&mut [30.0, 10.0, 20.0]), Some(20.0));
        assert_eq!(median(&mut [20.0, 10.0]), Some(15.0));
        assert_eq!(median(&mut [40.0, 10.0, 30.0, 20.0]), Some(25.0));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn test_build_formula() {
        let s = sample(CellGrid::uniform(2, 20), CellGrid::uniform(2, 220));
        let bounds = ChannelBounds {
            low: 10.0,
            high: [230.0; 3],
        };
        let table = build_lookup_table(&s, &bounds);

        // F(0) = 10, below the cell's own black level.
        assert_eq!(table.get(0, 0, 0, 0), Some(0.0));
        // F(255) = 230, above the cell's own full level.
        assert_eq!(table.get(1, 1, 1, 255), Some(255.0));

        let target = bounds.transfer(2, 100.0);
        let expected = (target - 20.0) * 255.0 / 200.0;
        let got = table.get(2, 1, 0, 100).unwrap();
        assert!((got - expected).abs() < 1e-4);
        assert_eq!(table.missing_count(), 0);
    }

    #[test]
    fn test_build_marks_missing_cells() {
        let mut low = CellGrid::uniform(2, 20);
        low.set(0, 1, None);
        let mut high = CellGrid::uniform(2, 200);
        high.set(1, 0, Some(20));
        let s = sample(low, high);
        let table = build_lookup_table(&s, &compute_channel_bounds(std::slice::from_ref(&s)));

        for c in 0..3 {
            assert!(table.get(c, 0, 1, 50).is_none());
            assert!(table.get(c, 1, 0, 50).is_none());
            assert!(table.get(c, 0, 0, 50).is_some());
        }
    }

    #[test]
    fn test_self_consistent_sample_is_identity() {
        let s = sample(CellGrid::uniform(3, 16), CellGrid::uniform(3, 235));
        let bounds = compute_channel_bounds(std::slice::from_ref(&s));
        let table = calibrate(&s, &bounds);

        for v in [0u8, 64, 128, 255] {
            assert!((table.lookup(0, 1, 2, v) - f32::from(v)).abs() < 1e-3);
        }
    }

    #[test]
    fn test_compute_medians_needs_all_channels() {
        let mut table = PartialLookupTable::new(2);
        for (x, value) in [(0, 10.0), (1, 30.0)] {
            for c in 0..3 {
                table.set(c, x, 0, 7, Some(value + c as f32));
            }
        }
        // Cell (0, 1) only has two channels and is ignored.
        table.set(0, 0, 1, 7, Some(100.0));
        table.set(1, 0, 1, 7, Some(100.0));

        let medians = compute_medians(&table);
        assert_eq!(medians[7], Some([20.0, 21.0, 22.0]));
        assert_eq!(medians[8], None);
    }

    #[test]
    fn test_fill_single_neighbour() {
        // Only cell (1, 0) is measured; (0, 1) sees it on the diagonal.
        let mut table = PartialLookupTable::new(2);
        for c in 0..3 {
            for v in 0..VALUE_COUNT {
                table.set(c, 1, 0, v, Some(v as f32 / 2.0));
            }
        }
        let filled = fill_missing_entries(&table);

        for v in [0u8, 17, 200] {
            assert_eq!(filled.lookup(0, 0, 1, v), f32::from(v) / 2.0);
            assert_eq!(filled.lookup(2, 1, 1, v), f32::from(v) / 2.0);
        }
    }

    #[test]
    fn test_fill_one_invalid_cell() {
        let mut low = CellGrid::uniform(3, 10);
        low.set(1, 1, None);
        let s = sample(low, CellGrid::uniform(3, 210));
        let bounds = ChannelBounds {
            low: 10.0,
            high: [210.0; 3],
        };
        let partial = build_lookup_table(&s, &bounds);
        assert!(partial.get(0, 1, 1, 90).is_none());

        let table = fill_missing_entries(&partial);
        for c in 0..3 {
            let neighbour = partial.get(c, 0, 1, 90).unwrap();
            assert!((table.lookup(c, 1, 1, 90) - neighbour).abs() < 1e-4);
        }
    }

    #[test]
    fn test_fill_blends_neighbours_with_median() {
        let mut table = PartialLookupTable::new(3);
        for c in 0..3 {
            table.set(c, 0, 0, 0, Some(10.0));
            table.set(c, 2, 2, 0, Some(50.0));
            table.set(c, 2, 0, 0, Some(90.0));
        }
        let filled = fill_missing_entries(&table);

        // Neighbours of (1, 1) at radius 1: 10, 50, 90 -> 50; median 50.
        assert_eq!(filled.lookup(0, 1, 1, 0), 50.0);
        // (0, 2): radius 1 is empty, radius 2 finds all three: mean 50.
        assert_eq!(filled.lookup(1, 0, 2, 0), 50.0);
        // (1, 0): radius 1 finds 10 and 90 -> 50.
        assert_eq!(filled.lookup(2, 1, 0, 0), 50.0);
        // No data anywhere for this value.
        assert_eq!(filled.lookup(0, 1, 1, 1), 0.0);
    }

    #[test]
    fn test_texture_layout_order() {
        let mut table = ColorLookupTable::uniform(2, 0.0);
        let n = 2;
        for c in 0..3 {
            for x in 0..n {
                for y in 0..n {
                    for v in 0..VALUE_COUNT {
                        let index = entry_index(n, c, x, y, v);
                        table.values[index] = (c + 10 * x + 100 * y) as f32;
                    }
                }
            }
        }
        let layout = table.to_texture_layout();
        assert_eq!(layout.len(), 3 * n * n * VALUE_COUNT);

        let texel = |v: usize, row: usize, x: usize, c: usize| layout[((v * n + row) * n + x) * 3 + c];
        // First row of the texture is the last cell row.
        assert_eq!(texel(0, 0, 0, 0), 100.0 / 255.0);
        assert_eq!(texel(0, 0, 1, 2), 112.0 / 255.0);
        assert_eq!(texel(5, 1, 1, 1), 11.0 / 255.0);
        assert_eq!(table.texture_bytes().len(), layout.len() * 4);
    }

    #[test]
    fn test_identity_table() {
        let table = ColorLookupTable::identity(2);
        assert!(table.is_consistent());
        assert_eq!(table.lookup(1, 1, 0, 77), 77.0);
    }
}
