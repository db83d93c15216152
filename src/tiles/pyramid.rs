//! Tile pyramid generator (C4): cuts a computed RUSLE grid into a
//! Web-Mercator slippy-map pyramid of 256×256 PNG tiles.

use super::mask::tile_mask;
use super::palette::{color_for_value, legend};
use crate::engine::RusleResult;
use crate::geometry::AreaGeometry;
use crate::webmercator::{cell_center, TileIndex, TILE_SIZE};
use image::{Rgba, RgbaImage};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Looks up the nearest evaluated grid sample to `(lon, lat)`, for tile
/// pixel coloring. The grid is regular (spec §4.1), so nearest-neighbor is
/// a direct index computation rather than a spatial search.
fn nearest_sample_value(result: &RusleResult, lon: f64, lat: f64) -> f64 {
    let [min_x, min_y, max_x, max_y] = *result.bbox();
    let grid = *result.grid();
    let rows = grid.rows.max(1);
    let cols = grid.cols.max(1);

    let col = (((lon - min_x) / (max_x - min_x).max(f64::EPSILON)) * cols as f64)
        .floor()
        .clamp(0.0, cols as f64 - 1.0) as u32;
    let row = (((max_y - lat) / (max_y - min_y).max(f64::EPSILON)) * rows as f64)
        .floor()
        .clamp(0.0, rows as f64 - 1.0) as u32;

    let index = (row * cols + col) as usize;
    result.samples().get(index).map(|s| *s.soil_loss()).unwrap_or(f64::NAN)
}

/// Renders one tile's RGBA pixel buffer.
fn render_tile(result: &RusleResult, geometry: &AreaGeometry, tile: TileIndex) -> RgbaImage {
    let bbox = tile.lonlat_bbox();
    let mask = tile_mask(geometry, bbox, TILE_SIZE, TILE_SIZE);
    let mut image = RgbaImage::new(TILE_SIZE, TILE_SIZE);

    for row in 0..TILE_SIZE {
        for col in 0..TILE_SIZE {
            let inside = mask[(row * TILE_SIZE + col) as usize];
            let color = if inside {
                let (lon, lat) = cell_center(bbox, row, col, TILE_SIZE, TILE_SIZE);
                color_for_value(nearest_sample_value(result, lon, lat))
            } else {
                [0, 0, 0, 0]
            };
            image.put_pixel(col, row, Rgba(color));
        }
    }
    image
}

/// Tile pyramid metadata written alongside the PNG tiles.
#[derive(Debug, Serialize)]
pub struct PyramidMetadata {
    /// Minimum zoom level generated.
    pub min_zoom: u32,
    /// Maximum zoom level generated.
    pub max_zoom: u32,
    /// Geometry bounding box, `[min_x, min_y, max_x, max_y]`.
    pub bbox: [f64; 4],
    /// Severity legend: `(label, lower_bound, rgba)`.
    pub legend: Vec<(&'static str, f64, [u8; 4])>,
    /// Total tile count written.
    pub tile_count: usize,
    /// Tiling scheme used -- always `"xyz"` (the Google/slippy-map
    /// convention, row 0 at the north pole, not TMS).
    pub scheme: &'static str,
    /// The geometry hash used to mask tile pixels outside the original
    /// boundary (empty for canonical administrative areas, spec §4.4).
    pub geometry_hash: String,
}

/// Generates the full tile pyramid for `geometry`/`result` across
/// `[min_zoom, max_zoom]`, writing `{root}/{z}/{x}/{y}.png` and a sibling
/// `metadata.json`. `geometry_hash` is recorded in the metadata as the mask
/// this pyramid was cut against (spec §4.4 step 4).
#[tracing::instrument(skip(result, geometry))]
pub fn generate_pyramid(
    root: &Path,
    geometry: &AreaGeometry,
    result: &RusleResult,
    min_zoom: u32,
    max_zoom: u32,
    geometry_hash: &str,
) -> crate::Result<PyramidMetadata> {
    let bbox = geometry.bbox()?;
    let mut tile_count = 0usize;

    for z in min_zoom..=max_zoom {
        let tiles = TileIndex::cover(bbox, z);
        for tile in tiles {
            let image = render_tile(result, geometry, tile);
            let tile_dir = root.join(tile.z.to_string()).join(tile.x.to_string());
            std::fs::create_dir_all(&tile_dir)?;
            let tile_path = tile_dir.join(format!("{}.png", tile.y));
            write_png_atomically(&tile_path, &image)?;
            tile_count += 1;
        }
    }

    let metadata = PyramidMetadata {
        min_zoom,
        max_zoom,
        bbox,
        legend: legend(),
        tile_count,
        scheme: "xyz",
        geometry_hash: geometry_hash.to_string(),
    };

    let metadata_path = root.join("metadata.json");
    let metadata_json = serde_json::to_vec_pretty(&metadata)?;
    write_atomically(&metadata_path, &metadata_json)?;

    tracing::info!(tile_count, min_zoom, max_zoom, "generated tile pyramid");
    Ok(metadata)
}

fn write_png_atomically(path: &PathBuf, image: &RgbaImage) -> crate::Result<()> {
    let tmp_path = path.with_extension("png.tmp");
    image
        .save(&tmp_path)
        .map_err(|e| crate::error::RasterError::new(format!("encoding PNG tile: {e}")))?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn write_atomically(path: &Path, bytes: &[u8]) -> crate::Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, bytes)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
