//! Scanline rasterization of surface-space polygons onto a pixel grid.
//!
//! Pixels are sampled at their centres. Spans include a pixel when its centre
//! lies at or right of the left crossing and strictly left of the right one,
//! and edges are top-inclusive, so two polygons sharing an edge never both
//! cover a pixel on it.

use glam::DVec2;

use crate::config::SurfaceBounds;

/// Call `visit(x, y)` for every pixel whose centre lies inside `polygon`.
///
/// Works for any simple polygon (even-odd spans); zero-area polygons cover
/// nothing.
pub fn fill_polygon(
    width: u32,
    height: u32,
    surface: &SurfaceBounds,
    polygon: &[DVec2],
    mut visit: impl FnMut(u32, u32),
) {
    if polygon.len() < 3 || width == 0 || height == 0 {
        return;
    }
    let raster: Vec<DVec2> = polygon
        .iter()
        .map(|&p| surface.to_raster(p, width, height))
        .collect();

    let (min_y, max_y) = raster
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.y), hi.max(p.y))
        });
    let first_row = ((min_y - 0.5).ceil().max(0.0)) as u32;
    let end_row = ((max_y - 0.5).ceil().max(0.0) as u32).min(height);

    let n = raster.len();
    let mut crossings: Vec<f64> = Vec::with_capacity(n);
    for y in first_row..end_row {
        let yc = y as f64 + 0.5;
        crossings.clear();
        for i in 0..n {
            let p0 = raster[i];
            let p1 = raster[(i + 1) % n];
            let spans = (p0.y <= yc && p1.y > yc) || (p1.y <= yc && p0.y > yc);
            if spans {
                crossings.push(p0.x + (yc - p0.y) * (p1.x - p0.x) / (p1.y - p0.y));
            }
        }
        crossings.sort_by(f64::total_cmp);

        for pair in crossings.chunks_exact(2) {
            let start = (pair[0] - 0.5).ceil().max(0.0) as u32;
            let end = ((pair[1] - 0.5).ceil().max(0.0) as u32).min(width);
            for x in start..end {
                visit(x, y);
            }
        }
    }
}

/// Call `visit(x, y, value)` for every pixel centre inside a convex polygon,
/// with `value` interpolated linearly from the per-vertex values over a
/// triangle fan rooted at the first vertex. Each pixel is visited once.
pub fn shade_polygon(
    width: u32,
    height: u32,
    surface: &SurfaceBounds,
    vertices: &[(DVec2, f32)],
    mut visit: impl FnMut(u32, u32, f32),
) {
    if vertices.len() < 3 || width == 0 || height == 0 {
        return;
    }
    let raster: Vec<(DVec2, f32)> = vertices
        .iter()
        .map(|&(p, v)| (surface.to_raster(p, width, height), v))
        .collect();

    let (min, max) = raster.iter().fold(
        (DVec2::splat(f64::INFINITY), DVec2::splat(f64::NEG_INFINITY)),
        |(lo, hi), (p, _)| (lo.min(*p), hi.max(*p)),
    );
    let x0 = ((min.x - 0.5).floor().max(0.0)) as u32;
    let y0 = ((min.y - 0.5).floor().max(0.0)) as u32;
    let x1 = ((max.x + 0.5).ceil().max(0.0) as u32).min(width);
    let y1 = ((max.y + 0.5).ceil().max(0.0) as u32).min(height);

    let (root, root_value) = raster[0];
    for y in y0..y1 {
        for x in x0..x1 {
            let p = DVec2::new(x as f64 + 0.5, y as f64 + 0.5);
            let hit = raster.windows(2).skip(1).find_map(|pair| {
                interpolate(p, (root, root_value), pair[0], pair[1])
            });
            if let Some(value) = hit {
                visit(x, y, value);
            }
        }
    }
}

/// Barycentric interpolation inside triangle `a b c`, inclusive of edges.
fn interpolate(p: DVec2, a: (DVec2, f32), b: (DVec2, f32), c: (DVec2, f32)) -> Option<f32> {
    let denom = (b.0 - a.0).perp_dot(c.0 - a.0);
    if denom.abs() < 1e-12 {
        return None;
    }
    let v = (p - a.0).perp_dot(c.0 - a.0) / denom;
    let w = (b.0 - a.0).perp_dot(p - a.0) / denom;
    let u = 1.0 - v - w;
    const EPS: f64 = -1e-9;
    if u >= EPS && v >= EPS && w >= EPS {
        Some((u * a.1 as f64 + v * b.1 as f64 + w * c.1 as f64) as f32)
    } else {
        None
    }
}
