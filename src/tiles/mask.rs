//! Per-tile polygon masking against the *original* (never simplified)
//! geometry (spec §3.3, §6.6).

use crate::geometry::AreaGeometry;
use crate::webmercator::cell_center;
use geo::{Contains, Point};

/// Tests whether the pixel center at `(lon, lat)` falls inside `geometry`.
/// Used to mask tile pixels outside the original area boundary so the
/// rendered pyramid never shows precomputed values past the polygon edge.
pub fn contains_point(geometry: &AreaGeometry, lon: f64, lat: f64) -> bool {
    let point = Point::new(lon, lat);
    match geometry {
        AreaGeometry::Polygon(p) => p.contains(&point),
        AreaGeometry::MultiPolygon(mp) => mp.contains(&point),
    }
}

/// Builds a `width * height` boolean mask (row-major, row 0 = north) for a
/// tile's bounding box, `true` where the pixel center falls inside `geometry`.
pub fn tile_mask(geometry: &AreaGeometry, bbox: [f64; 4], width: u32, height: u32) -> Vec<bool> {
    let mut mask = Vec::with_capacity((width as usize) * (height as usize));

    for row in 0..height {
        for col in 0..width {
            let (lon, lat) = cell_center(bbox, row, col, height, width);
            mask.push(contains_point(geometry, lon, lat));
        }
    }
    mask
}
