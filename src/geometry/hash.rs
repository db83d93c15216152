//! Geometry hashing, the `geometry_hash` fingerprint component (spec §3.1, §4.9).

use super::types::AreaGeometry;
use geo_types::{Coord, Geometry as GeoGeometry};
use sha2::{Digest, Sha256};

/// Rounds every coordinate to 6 decimal places (~0.11m at the equator)
/// before hashing, so that insignificant floating-point noise in two
/// submissions of "the same" boundary still fingerprint identically.
fn round6(v: f64) -> f64 {
    (v * 1_000_000.0).round() / 1_000_000.0
}

fn rounded_coords(geometry: &GeoGeometry<f64>) -> Vec<Vec<Vec<(f64, f64)>>> {
    fn ring(coords: &[Coord<f64>]) -> Vec<(f64, f64)> {
        coords.iter().map(|c| (round6(c.x), round6(c.y))).collect()
    }

    match geometry {
        GeoGeometry::Polygon(p) => {
            let mut rings = vec![ring(&p.exterior().0)];
            rings.extend(p.interiors().iter().map(|r| ring(&r.0)));
            vec![rings]
        }
        GeoGeometry::MultiPolygon(mp) => mp
            .0
            .iter()
            .map(|p| {
                let mut rings = vec![ring(&p.exterior().0)];
                rings.extend(p.interiors().iter().map(|r| ring(&r.0)));
                rings
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Computes the `geometry_hash` fingerprint component for a custom area's
/// boundary (spec §3.1).
///
/// Canonical administrative boundaries (regions/districts looked up by id)
/// never carry a `geometry_hash` — callers should use
/// [`CANONICAL_GEOMETRY_HASH`] directly rather than calling this function
/// for those lookups.
#[tracing::instrument(skip(geometry))]
pub fn geometry_hash(geometry: &AreaGeometry) -> String {
    let rounded = rounded_coords(&geometry.as_geo());
    // serde_json::to_vec over a Vec<Vec<Vec<(f64,f64)>>> produces a
    // deterministic byte sequence: ring/part order is preserved (this is
    // an ordered sequence of rings, not an object), so no key-sorting
    // concern applies here the way it does for the override hash.
    let encoded = serde_json::to_vec(&rounded).expect("rounded coordinate tree always serializes");

    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    let digest = hasher.finalize();

    let mut out = String::with_capacity(digest.len() * 2);
    use std::fmt::Write;
    for byte in digest {
        write!(&mut out, "{:02x}", byte).expect("writing to a String never fails");
    }
    out
}

/// Sentinel used in place of a `geometry_hash` for canonical administrative
/// areas (region/district ids), whose boundary is implied by `area_id`
/// rather than submitted by the caller.
pub const CANONICAL_GEOMETRY_HASH: &str = "";

#[cfg(test)]
mod tests {
    use super::*;

    fn square(offset: f64) -> AreaGeometry {
        AreaGeometry::from_geojson(&geojson::Geometry::new(geojson::Value::Polygon(vec![vec![
            vec![68.0 + offset, 38.0],
            vec![68.1 + offset, 38.0],
            vec![68.1 + offset, 38.1],
            vec![68.0 + offset, 38.1],
            vec![68.0 + offset, 38.0],
        ]])))
        .unwrap()
    }

    #[test]
    fn identical_geometries_hash_identically() {
        assert_eq!(geometry_hash(&square(0.0)), geometry_hash(&square(0.0)));
    }

    #[test]
    fn different_geometries_hash_differently() {
        assert_ne!(geometry_hash(&square(0.0)), geometry_hash(&square(0.01)));
    }

    #[test]
    fn sub_rounding_noise_collapses_to_same_hash() {
        let a = AreaGeometry::from_geojson(&geojson::Geometry::new(geojson::Value::Polygon(vec![vec![
            vec![68.000000049, 38.0],
            vec![68.1, 38.0],
            vec![68.1, 38.1],
            vec![68.0, 38.1],
            vec![68.0, 38.0],
        ]])))
        .unwrap();
        let b = square(0.0);
        assert_eq!(geometry_hash(&a), geometry_hash(&b));
    }
}
