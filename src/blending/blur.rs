//! Separable box blur used to soften the steps between overlap bands.

use super::BlendMask;

/// Blur `mask` in place: a horizontal then a vertical box pass of the given
/// radius, repeated `passes` times. Edges are clamped.
pub fn box_blur(mask: &mut BlendMask, radius: u32, passes: u32) {
    let width = mask.width as usize;
    let height = mask.height as usize;
    if radius == 0 || width == 0 || height == 0 {
        return;
    }
    let radius = radius as usize;

    let mut line = Vec::with_capacity(width.max(height));
    let mut out = vec![0.0f32; width.max(height)];

    for _ in 0..passes {
        for row in mask.data.chunks_exact_mut(width) {
            blur_line(row, &mut out[..width], radius);
            row.copy_from_slice(&out[..width]);
        }

        for x in 0..width {
            line.clear();
            line.extend((0..height).map(|y| mask.data[y * width + x]));
            blur_line(&line, &mut out[..height], radius);
            for (y, &value) in out[..height].iter().enumerate() {
                mask.data[y * width + x] = value;
            }
        }
    }
}

/// Sliding-window mean over `2 * radius + 1` samples.
fn blur_line(line: &[f32], out: &mut [f32], radius: usize) {
    let last = line.len() as isize - 1;
    let at = |i: isize| line[i.clamp(0, last) as usize] as f64;
    let r = radius as isize;
    let window = (2 * radius + 1) as f64;

    let mut sum: f64 = (-r..=r).map(at).sum();
    for (i, slot) in out.iter_mut().enumerate() {
        let i = i as isize;
        *slot = (sum / window) as f32;
        sum += at(i + r + 1) - at(i - r);
    }
}
