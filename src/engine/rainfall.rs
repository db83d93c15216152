//! Multi-year rainfall statistics and trend (spec §4 `rainfallSlope`/`rainfallCV`).

use crate::geometry::AreaGeometry;
use crate::raster::{RasterBand, RasterServiceClient};
use derive_getters::Getters;
use futures::stream::{self, StreamExt};

/// Rainfall summary statistics across a window of years ending at `start_year`.
#[derive(Debug, Clone, Copy, Getters)]
pub struct RainfallStats {
    /// Mean of the per-year mean annual rainfall, mm/year.
    mean: f64,
    /// Coefficient of variation across years (`std_dev / mean`).
    cv: f64,
    /// Linear-regression slope of annual rainfall against year, mm/year².
    trend_mm_per_year: f64,
    /// Number of years the trend was fit over.
    years: usize,
}

/// Computes rolling rainfall statistics over `[start_year - window_years + 1, start_year]`.
///
/// One `reduce_region` call is issued per year, fanned out concurrently
/// (mirroring `composite::sample_raw_bands`'s `buffer_unordered` fan-out)
/// rather than awaited one year at a time; callers on a tight
/// computation-timeout budget should still keep `window_years` modest (the
/// default configuration elsewhere in this crate uses ten years).
#[tracing::instrument(skip(client, geometry))]
pub async fn rainfall_trend(
    client: &dyn RasterServiceClient,
    geometry: &AreaGeometry,
    start_year: i32,
    window_years: usize,
    scale_m: f64,
) -> crate::Result<RainfallStats> {
    let first_year = start_year - window_years as i32 + 1;

    let results: Vec<crate::Result<(f64, f64)>> = stream::iter(first_year..=start_year)
        .map(|year| async move {
            let result = client
                .reduce_region(geometry, RasterBand::AnnualRainfall, scale_m, year)
                .await?;
            Ok((year as f64, result.mean))
        })
        .buffer_unordered(window_years.max(1))
        .collect()
        .await;

    let mut yearly_means = Vec::with_capacity(window_years);
    for result in results {
        yearly_means.push(result?);
    }
    yearly_means.sort_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap());

    Ok(fit_trend(&yearly_means))
}

fn fit_trend(points: &[(f64, f64)]) -> RainfallStats {
    let n = points.len() as f64;
    if points.is_empty() {
        return RainfallStats {
            mean: 0.0,
            cv: f64::NAN,
            trend_mm_per_year: 0.0,
            years: 0,
        };
    }

    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov_xy = 0.0;
    let mut var_x = 0.0;
    for (x, y) in points {
        cov_xy += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
    }
    let slope = if var_x > 0.0 { cov_xy / var_x } else { 0.0 };

    let variance_y = points.iter().map(|(_, y)| (y - mean_y).powi(2)).sum::<f64>() / n;
    let std_dev_y = variance_y.sqrt();
    let cv = if mean_y != 0.0 { std_dev_y / mean_y } else { f64::NAN };

    RainfallStats {
        mean: mean_y,
        cv,
        trend_mm_per_year: slope,
        years: points.len(),
    }
}
