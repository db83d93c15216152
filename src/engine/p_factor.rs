//! Support-practice (P) factor, a land-cover class lookup.

use crate::config::PFactorDefaults;

/// Land-cover classification codes, matching `RasterBand::LandCoverClass`'s
/// integer encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandCoverClass {
    /// Terraced or contour-farmed cropland.
    TerracedCropland,
    /// Untreated cropland with no conservation practice.
    UntreatedCropland,
    /// Forest, shrubland, or otherwise naturally covered land.
    NaturalCover,
    /// Urban, built-up, or otherwise impervious land.
    BuiltUp,
    /// Bare or fallow land.
    Bare,
    /// Water or permanent snow/ice.
    WaterOrIce,
}

impl LandCoverClass {
    /// Maps the raster-compute service's integer land-cover code onto a class.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::TerracedCropland),
            2 => Some(Self::UntreatedCropland),
            3 => Some(Self::NaturalCover),
            4 => Some(Self::BuiltUp),
            5 => Some(Self::Bare),
            6 => Some(Self::WaterOrIce),
            _ => None,
        }
    }
}

/// Looks up the P-factor for a land-cover class from the configurable
/// `defaults` table, falling back to `defaults.fallback` for unrecognized codes.
pub fn p_factor(class: Option<LandCoverClass>, defaults: &PFactorDefaults) -> f64 {
    match class {
        Some(LandCoverClass::TerracedCropland) => defaults.terraced_cropland,
        Some(LandCoverClass::UntreatedCropland) => defaults.untreated_cropland,
        Some(LandCoverClass::NaturalCover) => defaults.natural_cover,
        Some(LandCoverClass::BuiltUp) => defaults.built_up,
        Some(LandCoverClass::Bare) => defaults.bare,
        Some(LandCoverClass::WaterOrIce) => defaults.water_or_ice,
        None => defaults.fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> PFactorDefaults {
        crate::config::RusleDefaults::default().p_factor
    }

    #[test]
    fn terraced_cropland_reduces_erosion_relative_to_untreated() {
        let defaults = defaults();
        let terraced = p_factor(Some(LandCoverClass::TerracedCropland), &defaults);
        let untreated = p_factor(Some(LandCoverClass::UntreatedCropland), &defaults);
        assert!(terraced < untreated);
    }

    #[test]
    fn unknown_code_falls_back_to_default() {
        let defaults = PFactorDefaults { fallback: 0.8, ..defaults() };
        assert_eq!(p_factor(LandCoverClass::from_code(99), &defaults), 0.8);
    }

    #[test]
    fn water_has_zero_support_practice_factor() {
        let defaults = defaults();
        assert_eq!(p_factor(Some(LandCoverClass::WaterOrIce), &defaults), 0.0);
    }

    #[test]
    fn admin_override_changes_the_looked_up_value() {
        let overridden = PFactorDefaults {
            untreated_cropland: 0.5,
            ..defaults()
        };
        assert_eq!(p_factor(Some(LandCoverClass::UntreatedCropland), &overridden), 0.5);
    }
}
