//! The default RUSLE parameter tree (C9 `defaults()`).
//!
//! Bumped whenever the shape of this tree changes; the version string is
//! folded into every config hash so a defaults-version change invalidates
//! previously cached fingerprints even when no override differs.
pub const DEFAULTS_VERSION: &str = "rusle-defaults-2024.1";

/// The full, typed default parameter tree.
///
/// Every field here is addressable from an override dictionary by its
/// `serde` (snake_case) path, e.g. `{"k_factor": {"si_conversion": 0.1317}}`.
/// [`RusleDefaults::to_value`] is the canonical default tree used as the
/// base of every deep-merge.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RusleDefaults {
    /// Rainfall erosivity (R) factor tunables.
    pub r_factor: RFactorDefaults,
    /// Soil erodibility (K) factor tunables.
    pub k_factor: KFactorDefaults,
    /// Topographic (LS) factor tunables.
    pub ls_factor: LsFactorDefaults,
    /// Cover management (C) factor tunables.
    pub c_factor: CFactorDefaults,
    /// Support practice (P) factor tunables.
    pub p_factor: PFactorDefaults,
    /// Geometry-complexity classification thresholds (C1).
    pub complexity: ComplexityDefaults,
}

/// `R = coefficient · P^exponent` (default Wischmeier form: `0.0483 · P^1.61`).
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RFactorDefaults {
    /// Multiplicative coefficient.
    pub coefficient: f64,
    /// Exponent applied to annual precipitation.
    pub exponent: f64,
}

/// USDA nomograph coefficients for the K-factor (see `SPEC_FULL.md` §"Supplemental detail").
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct KFactorDefaults {
    /// Coefficient applied to the texture term `M^1.14`.
    pub m_coefficient: f64,
    /// Coefficient applied to the organic-matter term.
    pub om_coefficient: f64,
    /// Coefficient applied to the soil-structure term.
    pub structure_coefficient: f64,
    /// Coefficient applied to the permeability term.
    pub permeability_coefficient: f64,
    /// US-customary-to-SI conversion factor.
    pub si_conversion: f64,
    /// Clamp bounds `[min, max]` for the resulting K value.
    pub clamp: (f64, f64),
}

/// Slope-length/steepness (LS) factor tunables.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LsFactorDefaults {
    /// Slope angle, in degrees, at which the S-factor formula switches (standard RUSLE: 9.0).
    pub slope_break_degrees: f64,
    /// Exponent applied to the normalized slope-length term below the break.
    pub low_slope_exponent: f64,
    /// Exponent applied to the normalized slope-length term above the break.
    pub high_slope_exponent: f64,
}

/// Cover-management (C) factor tunables.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CFactorDefaults {
    /// Scaling coefficient in `C = exp(-coefficient · ndvi / (1 - ndvi))`.
    pub coefficient: f64,
    /// Clamp bounds `[min, max]` for the resulting C value.
    pub clamp: (f64, f64),
}

/// Support-practice (P) factor tunables: a configurable per-land-cover-class
/// lookup (spec §4.2 "mapped through a configurable lookup to [0, 1]"),
/// admin-overridable the same way as every other factor's defaults.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PFactorDefaults {
    /// P value for terraced or contour-farmed cropland.
    pub terraced_cropland: f64,
    /// P value for untreated cropland with no conservation practice.
    pub untreated_cropland: f64,
    /// P value for forest, shrubland, or otherwise naturally covered land.
    pub natural_cover: f64,
    /// P value for urban, built-up, or otherwise impervious land.
    pub built_up: f64,
    /// P value for bare or fallow land.
    pub bare: f64,
    /// P value for water or permanent snow/ice.
    pub water_or_ice: f64,
    /// Value used when a land-cover class has no explicit entry (an
    /// unrecognized raster code).
    pub fallback: f64,
}

/// Thresholds driving C1's complexity classification (spec §4.1 table).
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ComplexityDefaults {
    /// Area threshold, km², above which a geometry counts as "large".
    pub large_area_km2: f64,
    /// Coordinate-count threshold above which a geometry counts as "many vertices".
    pub many_coords: usize,
}

impl Default for RusleDefaults {
    fn default() -> Self {
        Self {
            r_factor: RFactorDefaults {
                coefficient: 0.0483,
                exponent: 1.61,
            },
            k_factor: KFactorDefaults {
                m_coefficient: 2.1e-4,
                om_coefficient: 1.0,
                structure_coefficient: 3.25,
                permeability_coefficient: 2.5,
                si_conversion: 0.1317,
                clamp: (0.01, 0.7),
            },
            ls_factor: LsFactorDefaults {
                slope_break_degrees: 9.0,
                low_slope_exponent: 3.0,
                high_slope_exponent: 5.0,
            },
            c_factor: CFactorDefaults {
                coefficient: 2.5,
                clamp: (0.001, 1.0),
            },
            p_factor: PFactorDefaults {
                terraced_cropland: 0.25,
                untreated_cropland: 1.0,
                natural_cover: 1.0,
                built_up: 1.0,
                bare: 1.0,
                water_or_ice: 0.0,
                fallback: 1.0,
            },
            complexity: ComplexityDefaults {
                large_area_km2: 1000.0,
                many_coords: 500,
            },
        }
    }
}

impl RusleDefaults {
    /// Renders the default tree as a generic JSON value, the base that
    /// override dictionaries are deep-merged onto.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("RusleDefaults always serializes")
    }
}
