//! Cover-management (C) factor, derived from NDVI.

use crate::config::CFactorDefaults;

/// `C = exp(-coefficient · NDVI / (1 - NDVI))`, clamped to `defaults.clamp`.
///
/// This is the standard NDVI-to-C-factor exponential relationship (bare
/// soil at `NDVI <= 0` gives `C` near 1, dense canopy approaches the lower
/// clamp bound).
pub fn c_factor(ndvi: f64, defaults: &CFactorDefaults) -> f64 {
    let ndvi = ndvi.clamp(-0.999, 0.999);
    let c = if ndvi <= 0.0 {
        1.0
    } else {
        (-defaults.coefficient * ndvi / (1.0 - ndvi)).exp()
    };
    c.clamp(defaults.clamp.0, defaults.clamp.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> CFactorDefaults {
        CFactorDefaults {
            coefficient: 2.5,
            clamp: (0.001, 1.0),
        }
    }

    #[test]
    fn bare_soil_is_near_one() {
        let c = c_factor(0.0, &defaults());
        assert!((c - 1.0).abs() < 1e-9);
    }

    #[test]
    fn dense_vegetation_is_low() {
        let c = c_factor(0.9, &defaults());
        assert!(c < 0.1);
        assert!(c >= 0.001);
    }

    #[test]
    fn monotonically_decreasing_in_ndvi() {
        let low = c_factor(0.2, &defaults());
        let high = c_factor(0.6, &defaults());
        assert!(high < low);
    }
}
