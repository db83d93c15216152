//! Geometry & Complexity Analyser (C1).

use super::types::AreaGeometry;
use crate::config::ComplexityDefaults;
use derive_getters::Getters;
use geo::GeodesicArea;

/// Sample/processing grid shape, rows × columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    /// Row count.
    pub rows: u32,
    /// Column count.
    pub cols: u32,
}

impl Grid {
    /// Total sample count for this grid (`rows * cols`).
    pub fn cell_count(&self) -> u32 {
        self.rows * self.cols
    }
}

/// Complexity class recommended for a geometry, driving C2/C3's sampling
/// strategy (spec §4.1 table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplexityClass {
    /// `area > large_area_km2` AND `coords > many_coords`.
    VeryHigh,
    /// `coords > many_coords`, area within bounds.
    High,
    /// `area > large_area_km2`, coords within bounds.
    Medium,
    /// Neither threshold exceeded.
    Low,
}

/// Recommended processing parameters for a given complexity class.
#[derive(Debug, Clone, Copy, PartialEq, Getters)]
pub struct ComplexityParams {
    /// Simplification tolerance, meters.
    simplify_m: f64,
    /// RUSLE factor evaluation scale, meters.
    rusle_scale_m: f64,
    /// Statistics sampling scale, meters.
    sample_scale_m: f64,
    /// Recommended sampling grid.
    grid: Grid,
    /// Maximum number of samples (`grid.cell_count()`, named separately per spec).
    max_samples: u32,
    /// Batch size for bulk point sampling.
    batch: u32,
    /// Thread pool size for batched sampling.
    workers: u32,
}

impl ComplexityClass {
    fn params(self) -> ComplexityParams {
        match self {
            ComplexityClass::VeryHigh => ComplexityParams {
                simplify_m: 2000.0,
                rusle_scale_m: 300.0,
                sample_scale_m: 300.0,
                grid: Grid { rows: 5, cols: 5 },
                max_samples: 25,
                batch: 50,
                workers: 8,
            },
            ComplexityClass::High => ComplexityParams {
                simplify_m: 1000.0,
                rusle_scale_m: 200.0,
                sample_scale_m: 200.0,
                grid: Grid { rows: 7, cols: 7 },
                max_samples: 49,
                batch: 50,
                workers: 8,
            },
            ComplexityClass::Medium => ComplexityParams {
                simplify_m: 1000.0,
                rusle_scale_m: 200.0,
                sample_scale_m: 200.0,
                grid: Grid { rows: 7, cols: 7 },
                max_samples: 50,
                batch: 50,
                workers: 8,
            },
            ComplexityClass::Low => ComplexityParams {
                simplify_m: 500.0,
                rusle_scale_m: 100.0,
                sample_scale_m: 100.0,
                grid: Grid { rows: 10, cols: 10 },
                max_samples: 100,
                batch: 50,
                workers: 8,
            },
        }
    }
}

/// Result of classifying a geometry (C1's public operation).
#[derive(Debug, Clone, Getters)]
pub struct GeometryAnalysis {
    /// Geodesic area, km².
    area_km2: f64,
    /// Total vertex-tuple count across all rings.
    coord_count: usize,
    /// Recommended complexity class.
    complexity: ComplexityClass,
    /// Recommended processing parameters (possibly grid-overridden by the caller).
    params: ComplexityParams,
}

/// Classifies a geometry and derives recommended processing parameters.
///
/// `caller_grid` is honoured only when present; per spec §4.1, "the caller
/// may override `grid` only when it is left at the default" — in this API
/// that just means: pass `None` to accept the recommendation, `Some(grid)`
/// to force one.
#[tracing::instrument(skip(geometry, thresholds))]
pub fn analyze(
    geometry: &AreaGeometry,
    caller_grid: Option<Grid>,
    thresholds: &ComplexityDefaults,
) -> crate::Result<GeometryAnalysis> {
    let area_m2 = match geometry {
        AreaGeometry::Polygon(p) => p.geodesic_area_unsigned(),
        AreaGeometry::MultiPolygon(mp) => mp.geodesic_area_unsigned(),
    };

    if !area_m2.is_finite() || area_m2 <= 0.0 {
        return Err(crate::Error::invalid_geometry(
            "geometry area could not be computed (degenerate or self-intersecting polygon)",
        ));
    }

    let area_km2 = area_m2 / 1_000_000.0;
    let coord_count = geometry.coord_count();
    if coord_count == 0 {
        return Err(crate::Error::invalid_geometry("geometry has no coordinates"));
    }

    let large_area = area_km2 > thresholds.large_area_km2;
    let many_coords = coord_count > thresholds.many_coords;

    let complexity = match (large_area, many_coords) {
        (true, true) => ComplexityClass::VeryHigh,
        (false, true) => ComplexityClass::High,
        (true, false) => ComplexityClass::Medium,
        (false, false) => ComplexityClass::Low,
    };

    let mut params = complexity.params();
    if let Some(grid) = caller_grid {
        tracing::debug!(rows = grid.rows, cols = grid.cols, "caller overrode sampling grid");
        params.grid = grid;
        params.max_samples = grid.cell_count();
    }

    tracing::debug!(area_km2, coord_count, ?complexity, "classified geometry");

    Ok(GeometryAnalysis {
        area_km2,
        coord_count,
        complexity,
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RusleDefaults;

    fn small_square() -> AreaGeometry {
        // ~1.2km x 1.2km near the equator-ish latitude used elsewhere in tests
        AreaGeometry::from_geojson(&geojson::Geometry::new(geojson::Value::Polygon(vec![vec![
            vec![68.0, 38.0],
            vec![68.01, 38.0],
            vec![68.01, 38.01],
            vec![68.0, 38.01],
            vec![68.0, 38.0],
        ]])))
        .unwrap()
    }

    #[test]
    fn small_simple_square_is_low_complexity() {
        let thresholds = RusleDefaults::default().complexity;
        let analysis = analyze(&small_square(), None, &thresholds).unwrap();
        assert!(matches!(analysis.complexity(), ComplexityClass::Low));
        assert_eq!(analysis.params().grid().cell_count(), 100);
    }

    #[test]
    fn caller_grid_override_replaces_recommendation() {
        let thresholds = RusleDefaults::default().complexity;
        let analysis = analyze(
            &small_square(),
            Some(Grid { rows: 3, cols: 3 }),
            &thresholds,
        )
        .unwrap();
        assert_eq!(*analysis.params().grid(), Grid { rows: 3, cols: 3 });
        assert_eq!(*analysis.params().max_samples(), 9);
    }

    #[test]
    fn many_coords_without_large_area_is_high() {
        let thresholds = ComplexityDefaults {
            large_area_km2: 1_000_000.0,
            many_coords: 3,
        };
        let analysis = analyze(&small_square(), None, &thresholds).unwrap();
        assert!(matches!(analysis.complexity(), ComplexityClass::High));
    }
}
