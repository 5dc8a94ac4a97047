//! Per-projector alpha mask files.
//!
//! Layout: `width: u32`, `height: u32` (little endian), then `width * height`
//! little-endian `f32` values, row-major. No compression or checksum.

use std::path::Path;

use crate::blending::BlendMask;
use crate::config::SurfaceBounds;
use crate::error::{BlendError, Result};

const HEADER_LEN: usize = 8;

/// Encode a mask into the alpha mask file layout.
pub fn encode_alpha_mask(mask: &BlendMask) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_LEN + mask.data.len() * 4);
    bytes.extend_from_slice(&mask.width.to_le_bytes());
    bytes.extend_from_slice(&mask.height.to_le_bytes());
    for value in &mask.data {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode an alpha mask, failing unless it has exactly the expected
/// resolution and payload size.
pub fn decode_alpha_mask(
    bytes: &[u8],
    width: u32,
    height: u32,
    surface: SurfaceBounds,
) -> Result<BlendMask> {
    if bytes.len() < HEADER_LEN {
        return Err(BlendError::MaskPayload {
            expected: HEADER_LEN,
            found: bytes.len(),
        });
    }

    let found_width = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let found_height = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if found_width != width || found_height != height {
        return Err(BlendError::MaskDimensions {
            width,
            height,
            found_width,
            found_height,
        });
    }

    let payload = &bytes[HEADER_LEN..];
    let expected = width as usize * height as usize * 4;
    if payload.len() != expected {
        return Err(BlendError::MaskPayload {
            expected,
            found: payload.len(),
        });
    }

    let data = payload
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Ok(BlendMask {
        width,
        height,
        data,
        surface,
    })
}

/// Write a mask to disk.
pub fn write_alpha_mask(path: &Path, mask: &BlendMask) -> Result<()> {
    std::fs::write(path, encode_alpha_mask(mask))?;
    log::debug!(
        "Wrote {}x{} alpha mask to {}",
        mask.width,
        mask.height,
        path.display()
    );
    Ok(())
}

/// Read a mask from disk for a projector running at `width` x `height`.
pub fn read_alpha_mask(
    path: &Path,
    width: u32,
    height: u32,
    surface: SurfaceBounds,
) -> Result<BlendMask> {
    let bytes = std::fs::read(path)?;
    decode_alpha_mask(&bytes, width, height, surface).map_err(|e| {
        log::warn!("Rejected alpha mask {}: {}", path.display(), e);
        e
    })
}
