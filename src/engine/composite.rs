//! `A = R · K · LS · C · P`: the composite RUSLE orchestration (C2's entry point).

use super::c_factor::c_factor;
use super::k_factor::{k_factor, SoilInputs};
use super::ls_factor::ls_factor;
use super::p_factor::{p_factor, LandCoverClass};
use super::r_factor::r_factor;
use super::rainfall::{rainfall_trend, RainfallStats};
use super::stats::{factor_stats, severity_distribution_areas, soil_loss_stats, FactorStats, SeverityBand, SoilLossStats};
use crate::config::RusleDefaults;
use crate::geometry::{AreaGeometry, ComplexityParams, Grid};
use crate::raster::{RasterBand, RasterServiceClient};
use crate::webmercator::cell_center;
use derive_getters::Getters;
use futures::stream::{self, StreamExt};

/// One evaluated grid point: per-factor breakdown plus the composite soil
/// loss. `soil_loss` (and every factor) is `NaN` when the raster-compute
/// service had no data at this point.
#[derive(Debug, Clone, Copy, Getters)]
pub struct RusleSample {
    /// Longitude.
    lon: f64,
    /// Latitude.
    lat: f64,
    /// Rainfall erosivity factor.
    r: f64,
    /// Soil erodibility factor.
    k: f64,
    /// Topographic factor.
    ls: f64,
    /// Cover-management factor.
    c: f64,
    /// Support-practice factor.
    p: f64,
    /// Composite annual soil loss, t/ha/yr.
    soil_loss: f64,
}

/// Full result of evaluating the RUSLE composite over a geometry's sample
/// grid for one `start_year` (spec §4 `compute()`).
#[derive(Debug, Clone, Getters)]
pub struct RusleResult {
    /// Per-point evaluations, row-major over `grid`.
    samples: Vec<RusleSample>,
    /// The grid the samples were taken on.
    grid: Grid,
    /// The bounding box the grid covers.
    bbox: [f64; 4],
    /// Soil-loss summary statistics over valid samples.
    stats: SoilLossStats,
    /// Rainfall trend/variability statistics over the preceding decade.
    rainfall: RainfallStats,
    /// Per-factor summary statistics (spec §3.2 `rusle_factors`).
    factors: RusleFactorStats,
    /// Severity-band area/percentage breakdown (spec §3.2 `severity_distribution`).
    severity: Vec<SeverityBand>,
}

/// The `{r, k, ls, c, p}` bundle of per-factor statistics (spec §3.2).
#[derive(Debug, Clone, Getters)]
pub struct RusleFactorStats {
    r: FactorStats,
    k: FactorStats,
    ls: FactorStats,
    c: FactorStats,
    p: FactorStats,
}

const RAINFALL_TREND_WINDOW_YEARS: usize = 10;

const BANDS: [RasterBand; 8] = [
    RasterBand::AnnualRainfall,
    RasterBand::Ndvi,
    RasterBand::SoilSandPercent,
    RasterBand::SoilSiltPercent,
    RasterBand::SoilClayPercent,
    RasterBand::SoilOrganicMatterPercent,
    RasterBand::SlopeDegrees,
    RasterBand::FlowLengthMeters,
];
// LandCoverClass is sampled separately since it is decoded as an integer
// code rather than averaged like the continuous bands.
const LAND_COVER_BAND: RasterBand = RasterBand::LandCoverClass;

fn grid_points(bbox: [f64; 4], grid: Grid) -> Vec<(f64, f64)> {
    let rows = grid.rows.max(1);
    let cols = grid.cols.max(1);

    let mut points = Vec::with_capacity((rows * cols) as usize);
    for row in 0..rows {
        for col in 0..cols {
            points.push(cell_center(bbox, row, col, rows, cols));
        }
    }
    points
}

fn evaluate_sample(
    lon: f64,
    lat: f64,
    continuous: &[Option<f64>],
    land_cover_code: Option<f64>,
    defaults: &RusleDefaults,
) -> RusleSample {
    let (rainfall, ndvi, sand, silt, clay, organic_matter, slope, flow_length) = (
        continuous[0],
        continuous[1],
        continuous[2],
        continuous[3],
        continuous[4],
        continuous[5],
        continuous[6],
        continuous[7],
    );

    let all_present = [rainfall, ndvi, sand, silt, clay, organic_matter, slope, flow_length]
        .iter()
        .all(Option::is_some);

    if !all_present {
        return RusleSample {
            lon,
            lat,
            r: f64::NAN,
            k: f64::NAN,
            ls: f64::NAN,
            c: f64::NAN,
            p: f64::NAN,
            soil_loss: f64::NAN,
        };
    }

    let r = r_factor(rainfall.unwrap(), &defaults.r_factor);
    let k = k_factor(
        SoilInputs {
            sand_percent: sand.unwrap(),
            silt_percent: silt.unwrap(),
            clay_percent: clay.unwrap(),
            organic_matter_percent: organic_matter.unwrap(),
            // Neither structure nor permeability class is carried by the
            // raster-compute service as a distinct band; approximate with
            // mid-range codes when unavailable.
            structure_code: 2.0,
            permeability_code: 3.0,
        },
        &defaults.k_factor,
    );
    let ls = ls_factor(slope.unwrap(), flow_length.unwrap(), &defaults.ls_factor);
    let c = c_factor(ndvi.unwrap(), &defaults.c_factor);
    let land_cover = land_cover_code.and_then(|code| LandCoverClass::from_code(code as i32));
    let p = p_factor(land_cover, &defaults.p_factor);

    RusleSample {
        lon,
        lat,
        r,
        k,
        ls,
        c,
        p,
        soil_loss: r * k * ls * c * p,
    }
}

/// Evaluates the full RUSLE composite over a geometry's sample grid for
/// `start_year`, batching point sampling across `params.workers` concurrent
/// requests of `params.batch` points each.
#[tracing::instrument(skip(client, geometry, defaults, params))]
pub async fn compute(
    client: &dyn RasterServiceClient,
    geometry: &AreaGeometry,
    start_year: i32,
    defaults: &RusleDefaults,
    params: &ComplexityParams,
    area_km2: f64,
) -> crate::Result<RusleResult> {
    let bbox = geometry.bbox()?;
    let points = grid_points(bbox, *params.grid());

    let mut continuous_by_point: Vec<Vec<Option<f64>>> = vec![Vec::new(); points.len()];
    let mut land_cover_by_point: Vec<Option<f64>> = vec![None; points.len()];

    let chunks: Vec<(usize, &[(f64, f64)])> = points
        .chunks(*params.batch() as usize)
        .scan(0usize, |offset, chunk| {
            let start = *offset;
            *offset += chunk.len();
            Some((start, chunk))
        })
        .collect();

    let results: Vec<crate::Result<(usize, Vec<crate::raster::SampledPoint>, Vec<crate::raster::SampledPoint>)>> =
        stream::iter(chunks)
            .map(|(offset, chunk)| async move {
                let continuous = client
                    .sample_points(chunk, &BANDS, *params.sample_scale_m(), start_year)
                    .await?;
                let land_cover = client
                    .sample_points(chunk, &[LAND_COVER_BAND], *params.sample_scale_m(), start_year)
                    .await?;
                Ok((offset, continuous, land_cover))
            })
            .buffer_unordered(*params.workers() as usize)
            .collect()
            .await;

    for result in results {
        let (offset, continuous, land_cover) = result?;
        for (i, sample) in continuous.into_iter().enumerate() {
            continuous_by_point[offset + i] = sample.values;
        }
        for (i, sample) in land_cover.into_iter().enumerate() {
            land_cover_by_point[offset + i] = sample.values.first().copied().flatten();
        }
    }

    let samples: Vec<RusleSample> = points
        .iter()
        .enumerate()
        .map(|(i, &(lon, lat))| {
            evaluate_sample(lon, lat, &continuous_by_point[i], land_cover_by_point[i], defaults)
        })
        .collect();

    let soil_loss_values: Vec<f64> = samples.iter().map(|s| s.soil_loss).collect();
    let stats = soil_loss_stats(&soil_loss_values);
    let severity = severity_distribution_areas(&stats, area_km2);

    let factors = RusleFactorStats {
        r: factor_stats(
            &samples.iter().map(|s| s.r).collect::<Vec<_>>(),
            "MJ*mm/(ha*h*yr)",
            "rainfall erosivity",
        ),
        k: factor_stats(
            &samples.iter().map(|s| s.k).collect::<Vec<_>>(),
            "t*ha*h/(ha*MJ*mm)",
            "soil erodibility",
        ),
        ls: factor_stats(
            &samples.iter().map(|s| s.ls).collect::<Vec<_>>(),
            "dimensionless",
            "topographic (slope length/steepness)",
        ),
        c: factor_stats(
            &samples.iter().map(|s| s.c).collect::<Vec<_>>(),
            "dimensionless",
            "cover management",
        ),
        p: factor_stats(
            &samples.iter().map(|s| s.p).collect::<Vec<_>>(),
            "dimensionless",
            "support practice",
        ),
    };

    let rainfall = rainfall_trend(
        client,
        geometry,
        start_year,
        RAINFALL_TREND_WINDOW_YEARS,
        *params.sample_scale_m(),
    )
    .await?;

    Ok(RusleResult {
        samples,
        grid: *params.grid(),
        bbox,
        stats,
        rainfall,
        factors,
        severity,
    })
}

impl RusleResult {
    /// `rainfallSlope` (spec §3.2/P7): the rainfall trend expressed as a
    /// percentage of the mean annual rainfall (`trend / mean * 100`),
    /// `NaN` when the mean is zero.
    pub fn rainfall_slope_percent(&self) -> f64 {
        let mean = *self.rainfall.mean();
        if mean != 0.0 {
            *self.rainfall.trend_mm_per_year() / mean * 100.0
        } else {
            f64::NAN
        }
    }

    /// Renders the full statistics bundle spec §3.2 describes: aggregate
    /// soil-loss stats with their `meanErosionRate`-style aliases, the
    /// `rusle_factors` per-factor breakdown, rainfall statistics/slope/CV,
    /// and the severity-band area/percentage distribution.
    pub fn statistics_bundle(&self) -> serde_json::Value {
        fn factor_json(f: &FactorStats) -> serde_json::Value {
            serde_json::json!({
                "mean": f.mean(),
                "min": f.min(),
                "max": f.max(),
                "std_dev": f.std_dev(),
                "unit": f.unit(),
                "description": f.description(),
            })
        }

        let mean = *self.stats.mean();
        let std_dev = *self.stats.std_dev();
        let erosion_cv = if mean != 0.0 { std_dev / mean * 100.0 } else { f64::NAN };

        serde_json::json!({
            "mean": mean,
            "min": self.stats.min(),
            "max": self.stats.max(),
            "std_dev": std_dev,
            "meanErosionRate": mean,
            "minErosionRate": self.stats.min(),
            "maxErosionRate": self.stats.max(),
            "erosionCV": erosion_cv,
            "rusle_factors": {
                "r": factor_json(&self.factors.r),
                "k": factor_json(&self.factors.k),
                "ls": factor_json(&self.factors.ls),
                "c": factor_json(&self.factors.c),
                "p": factor_json(&self.factors.p),
            },
            "rainfallStatistics": {
                "mean_annual_rainfall_mm": self.rainfall.mean(),
                "trend_mm_per_year": self.rainfall.trend_mm_per_year(),
                "coefficient_of_variation_percent": *self.rainfall.cv() * 100.0,
            },
            "rainfallSlope": self.rainfall_slope_percent(),
            "rainfallCV": *self.rainfall.cv() * 100.0,
            "severity_distribution": self
                .severity
                .iter()
                .map(|b| serde_json::json!({
                    "class": b.class(),
                    "area": b.area_km2(),
                    "percentage": b.percentage(),
                }))
                .collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{analyze, AreaGeometry};
    use crate::raster::fake::FakeRasterServiceClient;
    use std::collections::HashMap;

    fn square() -> AreaGeometry {
        AreaGeometry::from_geojson(&geojson::Geometry::new(geojson::Value::Polygon(vec![vec![
            vec![68.0, 38.0],
            vec![68.1, 38.0],
            vec![68.1, 38.1],
            vec![68.0, 38.1],
            vec![68.0, 38.0],
        ]])))
        .unwrap()
    }

    #[tokio::test]
    async fn compute_produces_finite_soil_loss_for_uniform_inputs() {
        let mut values = HashMap::new();
        values.insert(RasterBand::AnnualRainfall, 800.0);
        values.insert(RasterBand::Ndvi, 0.3);
        values.insert(RasterBand::SoilSandPercent, 40.0);
        values.insert(RasterBand::SoilSiltPercent, 40.0);
        values.insert(RasterBand::SoilClayPercent, 20.0);
        values.insert(RasterBand::SoilOrganicMatterPercent, 2.0);
        values.insert(RasterBand::SlopeDegrees, 12.0);
        values.insert(RasterBand::FlowLengthMeters, 80.0);
        values.insert(RasterBand::LandCoverClass, 2.0);

        let client = FakeRasterServiceClient::new(values);
        let defaults = RusleDefaults::default();
        let geometry = square();
        let analysis = analyze(&geometry, None, &defaults.complexity).unwrap();

        let result = compute(
            &client,
            &geometry,
            2023,
            &defaults,
            analysis.params(),
            *analysis.area_km2(),
        )
        .await
        .unwrap();

        assert!(result.stats().mean().is_finite());
        assert!(result.stats().mean() > 0.0);
        assert_eq!(result.samples().len(), analysis.params().grid().cell_count() as usize);
        assert!(result.factors().r().mean().is_finite());
        let total_pct: f64 = result.severity().iter().map(|b| *b.percentage()).sum();
        assert!((total_pct - 100.0).abs() < 1e-3);

        let bundle = result.statistics_bundle();
        assert!(bundle["meanErosionRate"].is_number());
        assert!(bundle["rusle_factors"]["k"]["unit"].is_string());
        assert_eq!(bundle["severity_distribution"].as_array().unwrap().len(), 5);
    }

    /// P10 (tile orientation): row 0 of the evaluated sample grid must be
    /// the northernmost row, matching `tiles::pyramid::nearest_sample_value`'s
    /// index math and the GeoTIFF writer's north-up tie-point. Row-major
    /// index `i` for `(row, col)` is `row * cols + col`.
    #[test]
    fn grid_points_orders_row_zero_as_the_northernmost_row() {
        let bbox = [68.0, 38.0, 68.1, 38.1];
        let grid = Grid { rows: 4, cols: 3 };
        let points = grid_points(bbox, grid);

        let first_row_lat = points[0].1;
        let last_row_lat = points[points.len() - 1].1;
        assert!(
            first_row_lat > last_row_lat,
            "row 0 (lat={first_row_lat}) must be north of the last row (lat={last_row_lat})"
        );
        assert!(first_row_lat < bbox[3] && first_row_lat > bbox[1]);
    }
}
