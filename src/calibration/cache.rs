//! On-disk cache for built color lookup tables.
//!
//! Tables are bincode-encoded and LZ4 compressed with the uncompressed size
//! prepended.

use std::path::Path;

use crate::color::ColorLookupTable;
use crate::error::{BlendError, Result};

/// Encode a table for the cache.
pub fn encode_lookup_table(table: &ColorLookupTable) -> Result<Vec<u8>> {
    let raw = bincode::serialize(table).map_err(|e| BlendError::CacheDecode(e.to_string()))?;
    Ok(lz4_flex::compress_prepend_size(&raw))
}

/// Decode a cached table and check it was built for `cell_count` cells.
pub fn decode_lookup_table(bytes: &[u8], cell_count: usize) -> Result<ColorLookupTable> {
    let raw = lz4_flex::decompress_size_prepended(bytes)
        .map_err(|e| BlendError::CacheDecode(e.to_string()))?;
    let table: ColorLookupTable =
        bincode::deserialize(&raw).map_err(|e| BlendError::CacheDecode(e.to_string()))?;

    if table.cell_count() != cell_count {
        return Err(BlendError::CacheMismatch(format!(
            "table has {} cells per side, configuration has {}",
            table.cell_count(),
            cell_count
        )));
    }
    if !table.is_consistent() {
        return Err(BlendError::CacheMismatch(format!(
            "{} entries for {} cells per side",
            table.values().len(),
            cell_count
        )));
    }
    Ok(table)
}

/// Write a table to the cache file.
pub fn save_lookup_table(path: &Path, table: &ColorLookupTable) -> Result<()> {
    let bytes = encode_lookup_table(table)?;
    std::fs::write(path, &bytes)?;
    log::info!(
        "Cached lookup table to {} ({} bytes)",
        path.display(),
        bytes.len()
    );
    Ok(())
}

/// Load a cached table. Returns `Ok(None)` when no cache file exists.
pub fn load_lookup_table(path: &Path, cell_count: usize) -> Result<Option<ColorLookupTable>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(path)?;
    let table = decode_lookup_table(&bytes, cell_count)?;
    log::debug!("Loaded cached lookup table from {}", path.display());
    Ok(Some(table))
}
