//! Soil erodibility (K) factor, pinned to the Wischmeier-Smith (1978) USDA
//! nomograph form (see `SPEC_FULL.md`, "Supplemental detail pinned from
//! original_source/ absence").

use crate::config::KFactorDefaults;

/// Soil texture/structure inputs to the K-factor nomograph, sampled or
/// reduced from the raster-compute service's soil layers.
#[derive(Debug, Clone, Copy)]
pub struct SoilInputs {
    /// Percent sand, topsoil.
    pub sand_percent: f64,
    /// Percent silt, topsoil.
    pub silt_percent: f64,
    /// Percent clay, topsoil.
    pub clay_percent: f64,
    /// Percent organic matter, topsoil.
    pub organic_matter_percent: f64,
    /// USDA soil-structure code, 1 (very fine granular) to 4 (massive).
    pub structure_code: f64,
    /// USDA permeability class code, 1 (rapid) to 6 (very slow).
    pub permeability_code: f64,
}

/// `K = [m_coefficient · M^1.14 · (12 - OM) + structure_coefficient · (s - 2)
/// + permeability_coefficient · (p - 3)] / 100 · si_conversion`, clamped to
/// `defaults.clamp`.
///
/// `M = (silt% + sand%) · (100 - clay%)` is the standard nomograph texture
/// term (using sand% in place of "very fine sand%", which the raster-compute
/// service does not expose separately).
pub fn k_factor(inputs: SoilInputs, defaults: &KFactorDefaults) -> f64 {
    let m = (inputs.silt_percent + inputs.sand_percent) * (100.0 - inputs.clay_percent);
    let texture_term =
        defaults.m_coefficient * m.powf(1.14) * defaults.om_coefficient * (12.0 - inputs.organic_matter_percent);
    let structure_term = defaults.structure_coefficient * (inputs.structure_code - 2.0);
    let permeability_term = defaults.permeability_coefficient * (inputs.permeability_code - 3.0);

    let us_customary = (texture_term + structure_term + permeability_term) / 100.0;

    let k = us_customary * defaults.si_conversion;
    k.clamp(defaults.clamp.0, defaults.clamp.1)
}
