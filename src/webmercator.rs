//! Web Mercator (EPSG:3857) projection math shared by the GeoTIFF exporter
//! and the tile pyramid generator.

/// Earth radius used by the spherical Web Mercator projection, meters.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Tile edge length in pixels (the universal slippy-map convention).
pub const TILE_SIZE: u32 = 256;

/// Projects `(lon, lat)` in degrees to Web Mercator `(x, y)` in meters.
pub fn lonlat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let x = lon.to_radians() * EARTH_RADIUS_M;
    let lat_clamped = lat.clamp(-85.051_128, 85.051_128);
    let y = EARTH_RADIUS_M * ((std::f64::consts::FRAC_PI_4 + lat_clamped.to_radians() / 2.0).tan()).ln();
    (x, y)
}

/// Inverse of [`lonlat_to_mercator`].
pub fn mercator_to_lonlat(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    (lon, lat)
}

/// Cell-center `(lon, lat)` of `(row, col)` in a `cols * rows` grid over
/// `bbox` (`[min_x, min_y, max_x, max_y]`, degrees), half-cell inset from
/// the bbox edges. Row 0 is the northernmost row -- shared by the RUSLE
/// sample grid (`engine::composite::grid_points`), the tile mask
/// (`tiles::mask::tile_mask`), and tile rendering
/// (`tiles::pyramid::render_tile`) so the three never drift apart on
/// orientation or inset convention.
pub fn cell_center(bbox: [f64; 4], row: u32, col: u32, rows: u32, cols: u32) -> (f64, f64) {
    let [min_x, min_y, max_x, max_y] = bbox;
    let lat = max_y - (max_y - min_y) * (row as f64 + 0.5) / rows.max(1) as f64;
    let lon = min_x + (max_x - min_x) * (col as f64 + 0.5) / cols.max(1) as f64;
    (lon, lat)
}

/// Full extent of the Web Mercator plane, meters.
fn world_extent() -> f64 {
    std::f64::consts::PI * EARTH_RADIUS_M
}

/// A slippy-map tile index: zoom level plus column/row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileIndex {
    /// Zoom level.
    pub z: u32,
    /// Tile column, `0` at the antimeridian going east.
    pub x: u32,
    /// Tile row, `0` at the north pole (XYZ/Google convention, not TMS).
    pub y: u32,
}

impl TileIndex {
    /// The tile's bounding box in `(lon, lat)` degrees, `[min_x, min_y, max_x, max_y]`.
    pub fn lonlat_bbox(&self) -> [f64; 4] {
        let n = 2f64.powi(self.z as i32);
        let world = world_extent();

        let min_merc_x = (self.x as f64 / n) * (2.0 * world) - world;
        let max_merc_x = ((self.x + 1) as f64 / n) * (2.0 * world) - world;
        // y increases southward in tile space, northward in Mercator meters
        let max_merc_y = world - (self.y as f64 / n) * (2.0 * world);
        let min_merc_y = world - ((self.y + 1) as f64 / n) * (2.0 * world);

        let (min_lon, min_lat) = mercator_to_lonlat(min_merc_x, min_merc_y);
        let (max_lon, max_lat) = mercator_to_lonlat(max_merc_x, max_merc_y);
        [min_lon, min_lat, max_lon, max_lat]
    }

    /// Converts a `(lon, lat)` point to the tile index containing it at zoom `z`.
    pub fn containing(lon: f64, lat: f64, z: u32) -> Self {
        let (merc_x, merc_y) = lonlat_to_mercator(lon, lat);
        let n = 2f64.powi(z as i32);
        let world = world_extent();

        let x = (((merc_x + world) / (2.0 * world)) * n).floor().clamp(0.0, n - 1.0) as u32;
        let y = ((((world - merc_y) / (2.0 * world))) * n).floor().clamp(0.0, n - 1.0) as u32;
        Self { z, x, y }
    }

    /// Enumerates every tile overlapping `bbox` (`[min_x, min_y, max_x, max_y]`, degrees) at zoom `z`.
    pub fn cover(bbox: [f64; 4], z: u32) -> Vec<TileIndex> {
        let [min_lon, min_lat, max_lon, max_lat] = bbox;
        // lat decreases as tile y increases, so the northwest corner gives min y.
        let top_left = TileIndex::containing(min_lon, max_lat, z);
        let bottom_right = TileIndex::containing(max_lon, min_lat, z);

        let mut tiles = Vec::new();
        for y in top_left.y..=bottom_right.y {
            for x in top_left.x..=bottom_right.x {
                tiles.push(TileIndex { z, x, y });
            }
        }
        tiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_mercator() {
        let (x, y) = lonlat_to_mercator(68.5, 38.2);
        let (lon, lat) = mercator_to_lonlat(x, y);
        assert!((lon - 68.5).abs() < 1e-6);
        assert!((lat - 38.2).abs() < 1e-6);
    }

    #[test]
    fn tile_zero_zero_at_zoom_zero_covers_whole_world() {
        let tile = TileIndex { z: 0, x: 0, y: 0 };
        let bbox = tile.lonlat_bbox();
        assert!(bbox[0] < -179.0);
        assert!(bbox[2] > 179.0);
    }

    #[test]
    fn containing_is_consistent_with_bbox() {
        let tile = TileIndex::containing(68.5, 38.2, 10);
        let bbox = tile.lonlat_bbox();
        assert!(bbox[0] <= 68.5 && 68.5 <= bbox[2]);
        assert!(bbox[1] <= 38.2 && 38.2 <= bbox[3]);
    }

    #[test]
    fn cell_center_row_zero_is_northernmost() {
        let bbox = [68.0, 38.0, 68.1, 38.1];
        let (_, north_lat) = cell_center(bbox, 0, 0, 4, 4);
        let (_, south_lat) = cell_center(bbox, 3, 0, 4, 4);
        assert!(north_lat > south_lat);
    }

    #[test]
    fn cover_includes_all_corner_tiles() {
        let bbox = [68.0, 38.0, 68.1, 38.1];
        let tiles = TileIndex::cover(bbox, 12);
        assert!(!tiles.is_empty());
        let nw = TileIndex::containing(68.0, 38.1, 12);
        let se = TileIndex::containing(68.1, 38.0, 12);
        assert!(tiles.contains(&nw));
        assert!(tiles.contains(&se));
    }
}
