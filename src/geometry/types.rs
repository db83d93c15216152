//! GeoJSON-backed geometry types: the Original/Simplified distinction (spec §3.3).

use geo::BoundingRect;
use geo_types::{Geometry as GeoGeometry, MultiPolygon, Polygon};

/// A polygon or multipolygon area, the only two GeoJSON geometry types the
/// core accepts (spec §3.3).
#[derive(Debug, Clone, PartialEq)]
pub enum AreaGeometry {
    /// A single polygon, possibly with holes.
    Polygon(Polygon<f64>),
    /// Multiple disjoint (or nested) polygons.
    MultiPolygon(MultiPolygon<f64>),
}

impl AreaGeometry {
    /// Parses a GeoJSON geometry into an [`AreaGeometry`], rejecting any
    /// type other than `Polygon`/`MultiPolygon`.
    pub fn from_geojson(geometry: &geojson::Geometry) -> crate::Result<Self> {
        let geo_geom: GeoGeometry<f64> = (&geometry.value)
            .try_into()
            .map_err(|e: geojson::Error| crate::Error::invalid_geometry(e.to_string()))?;

        match geo_geom {
            GeoGeometry::Polygon(p) => {
                if p.exterior().0.is_empty() {
                    return Err(crate::Error::invalid_geometry("polygon has no exterior ring"));
                }
                Ok(Self::Polygon(p))
            }
            GeoGeometry::MultiPolygon(mp) => {
                if mp.0.is_empty() {
                    return Err(crate::Error::invalid_geometry("multipolygon has no parts"));
                }
                Ok(Self::MultiPolygon(mp))
            }
            other => Err(crate::Error::invalid_geometry(format!(
                "unsupported geometry type: {other:?} (expected Polygon or MultiPolygon)"
            ))),
        }
    }

    /// Total number of vertex tuples across every ring (spec §4.1 `coord_count`).
    pub fn coord_count(&self) -> usize {
        match self {
            Self::Polygon(p) => {
                p.exterior().0.len() + p.interiors().iter().map(|r| r.0.len()).sum::<usize>()
            }
            Self::MultiPolygon(mp) => mp
                .0
                .iter()
                .map(|p| p.exterior().0.len() + p.interiors().iter().map(|r| r.0.len()).sum::<usize>())
                .sum(),
        }
    }

    /// Bounding box `[min_x, min_y, max_x, max_y]` in the geometry's native
    /// (lon/lat) coordinates, used to drive tile enumeration (C4).
    pub fn bbox(&self) -> crate::Result<[f64; 4]> {
        let rect = match self {
            Self::Polygon(p) => p.bounding_rect(),
            Self::MultiPolygon(mp) => mp.bounding_rect(),
        }
        .ok_or_else(|| crate::Error::invalid_geometry("geometry has no bounding box"))?;
        Ok([rect.min().x, rect.min().y, rect.max().x, rect.max().y])
    }

    /// Borrows the underlying `geo_types::Geometry`.
    pub fn as_geo(&self) -> GeoGeometry<f64> {
        match self {
            Self::Polygon(p) => GeoGeometry::Polygon(p.clone()),
            Self::MultiPolygon(mp) => GeoGeometry::MultiPolygon(mp.clone()),
        }
    }
}

/// The exact, authoritative boundary: used for final clipping and per-tile
/// masking. Never simplified.
#[derive(Debug, Clone, PartialEq)]
pub struct OriginalGeometry(pub AreaGeometry);

/// A tolerance-simplified boundary, used only as an optimisation hint
/// inside raster computation (spec §3.3). Never used for masking.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplifiedGeometry(pub AreaGeometry);

impl OriginalGeometry {
    /// Produces a [`SimplifiedGeometry`] via tolerance-based Douglas-Peucker
    /// simplification at the given tolerance, in meters.
    pub fn simplify(&self, tolerance_m: f64) -> SimplifiedGeometry {
        use geo::Simplify;

        // geo::Simplify operates in the geometry's own coordinate units
        // (degrees here); 111_320 m/degree is the standard equatorial
        // approximation used throughout the corpus for this conversion.
        let epsilon_degrees = tolerance_m / 111_320.0;

        let simplified = match &self.0 {
            AreaGeometry::Polygon(p) => AreaGeometry::Polygon(p.simplify(&epsilon_degrees)),
            AreaGeometry::MultiPolygon(mp) => AreaGeometry::MultiPolygon(mp.simplify(&epsilon_degrees)),
        };
        SimplifiedGeometry(simplified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_geojson() -> geojson::Geometry {
        geojson::Geometry::new(geojson::Value::Polygon(vec![vec![
            vec![68.0, 38.0],
            vec![68.1, 38.0],
            vec![68.1, 38.1],
            vec![68.0, 38.1],
            vec![68.0, 38.0],
        ]]))
    }

    #[test]
    fn parses_polygon() {
        let geom = AreaGeometry::from_geojson(&square_geojson()).unwrap();
        assert_eq!(geom.coord_count(), 5);
    }

    #[test]
    fn rejects_point() {
        let point = geojson::Geometry::new(geojson::Value::Point(vec![68.0, 38.0]));
        assert!(AreaGeometry::from_geojson(&point).is_err());
    }

    #[test]
    fn bbox_matches_square() {
        let geom = AreaGeometry::from_geojson(&square_geojson()).unwrap();
        let bbox = geom.bbox().unwrap();
        assert_eq!(bbox, [68.0, 38.0, 68.1, 38.1]);
    }
}
