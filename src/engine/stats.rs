//! Summary statistics and severity-distribution bucketing over a computed
//! soil-loss grid.

use derive_getters::Getters;
use statrs::distribution::{ContinuousCDF, Normal};

/// Soil-loss summary statistics over a region's sample grid (spec §4
/// `meanErosionRate`/`erosionCV`).
#[derive(Debug, Clone, Copy, Getters)]
pub struct SoilLossStats {
    /// Mean annual soil loss, t/ha/yr, across valid (unmasked) samples.
    mean: f64,
    /// Minimum sample value.
    min: f64,
    /// Maximum sample value.
    max: f64,
    /// Sample standard deviation.
    std_dev: f64,
    /// Coefficient of variation (`std_dev / mean`), `NaN` when `mean == 0`.
    cv: f64,
    /// Number of valid (unmasked, finite) samples.
    valid_count: usize,
}

/// Computes [`SoilLossStats`] over a slice of per-point soil-loss values,
/// ignoring `NaN` (masked/out-of-data) entries.
pub fn soil_loss_stats(values: &[f64]) -> SoilLossStats {
    let valid: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if valid.is_empty() {
        return SoilLossStats {
            mean: 0.0,
            min: 0.0,
            max: 0.0,
            std_dev: 0.0,
            cv: f64::NAN,
            valid_count: 0,
        };
    }

    let n = valid.len() as f64;
    let mean = valid.iter().sum::<f64>() / n;
    let variance = valid.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    let min = valid.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = valid.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let cv = if mean != 0.0 { std_dev / mean } else { f64::NAN };

    SoilLossStats {
        mean,
        min,
        max,
        std_dev,
        cv,
        valid_count: valid.len(),
    }
}

/// Severity bucket boundaries, t/ha/yr (spec §6.6's palette bands).
pub const SEVERITY_BOUNDARIES: [f64; 5] = [0.0, 5.0, 15.0, 30.0, 50.0];

/// Severity band labels, in the same order as the gaps between
/// [`SEVERITY_BOUNDARIES`] (and a final unbounded "Excessive" band). Fixed
/// by spec §3.2/§6.6 -- these exact names are part of the wire contract.
pub const SEVERITY_LABELS: [&str; 5] = ["Very Low", "Low", "Moderate", "Severe", "Excessive"];

/// Per-factor summary statistics with the unit/description pair spec §3.2's
/// `rusle_factors` bundle carries alongside each `{mean, min, max, std_dev}`.
#[derive(Debug, Clone, Getters)]
pub struct FactorStats {
    mean: f64,
    min: f64,
    max: f64,
    std_dev: f64,
    unit: &'static str,
    description: &'static str,
}

/// Computes [`FactorStats`] for one RUSLE factor's values over the sample
/// grid, tagging the result with its physical unit and a short description
/// (spec §3.2 `rusle_factors.{r,k,ls,c,p}`).
pub fn factor_stats(values: &[f64], unit: &'static str, description: &'static str) -> FactorStats {
    let base = soil_loss_stats(values);
    FactorStats {
        mean: *base.mean(),
        min: *base.min(),
        max: *base.max(),
        std_dev: *base.std_dev(),
        unit,
        description,
    }
}

/// One severity band's share of the geometry's area (spec §3.2
/// `severity_distribution`): the class label, its area in km², and its
/// percentage of the geometry's total geodesic area.
#[derive(Debug, Clone, Copy, Getters)]
pub struct SeverityBand {
    class: &'static str,
    area_km2: f64,
    percentage: f64,
}

/// Converts [`severity_distribution`]'s per-band fractions into area/
/// percentage pairs against the geometry's total geodesic area.
pub fn severity_distribution_areas(stats: &SoilLossStats, area_km2: f64) -> Vec<SeverityBand> {
    severity_distribution(stats)
        .into_iter()
        .map(|(class, fraction)| SeverityBand {
            class,
            area_km2: fraction * area_km2,
            percentage: fraction * 100.0,
        })
        .collect()
}

/// Estimates the fraction of area falling into each severity band, by
/// treating the sample grid as approximately normal
/// (`Normal(mean, std_dev)`) and integrating between band boundaries via
/// the normal CDF. This is an analytic approximation rather than a per-
/// pixel histogram, deliberately cheap for large/very-complex geometries
/// where only a coarse grid was sampled.
pub fn severity_distribution(stats: &SoilLossStats) -> Vec<(&'static str, f64)> {
    if stats.valid_count == 0 || stats.std_dev <= 0.0 {
        // Degenerate: everything falls in the band containing `mean` — the
        // last boundary the mean is still at or above.
        let mut band_index = 0;
        for (i, &boundary) in SEVERITY_BOUNDARIES.iter().enumerate() {
            if stats.mean >= boundary {
                band_index = i;
            }
        }

        return SEVERITY_LABELS
            .iter()
            .enumerate()
            .map(|(i, &label)| (label, if i == band_index { 1.0 } else { 0.0 }))
            .collect();
    }

    let normal = Normal::new(stats.mean, stats.std_dev).expect("std_dev > 0 validated above");
    let mut boundaries: Vec<f64> = SEVERITY_BOUNDARIES.to_vec();
    boundaries.push(f64::INFINITY);

    let mut out = Vec::with_capacity(SEVERITY_LABELS.len());
    for (i, &label) in SEVERITY_LABELS.iter().enumerate() {
        let lo = boundaries[i];
        let hi = boundaries[i + 1];
        let cdf_hi = if hi.is_finite() { normal.cdf(hi) } else { 1.0 };
        let cdf_lo = normal.cdf(lo);
        out.push((label, (cdf_hi - cdf_lo).max(0.0)));
    }
    out
}
