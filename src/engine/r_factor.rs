//! Rainfall erosivity (R) factor.

use crate::config::RFactorDefaults;

/// `R = coefficient · P^exponent`, the Wischmeier approximation of annual
/// rainfall erosivity from annual precipitation `annual_rainfall_mm`.
pub fn r_factor(annual_rainfall_mm: f64, defaults: &RFactorDefaults) -> f64 {
    defaults.coefficient * annual_rainfall_mm.powf(defaults.exponent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_wischmeier_default_form() {
        let defaults = RFactorDefaults {
            coefficient: 0.0483,
            exponent: 1.61,
        };
        let r = r_factor(800.0, &defaults);
        assert!(r > 0.0);
        // monotonic in rainfall
        assert!(r_factor(900.0, &defaults) > r);
    }

    #[test]
    fn zero_rainfall_gives_zero_erosivity() {
        let defaults = RFactorDefaults {
            coefficient: 0.0483,
            exponent: 1.61,
        };
        assert_eq!(r_factor(0.0, &defaults), 0.0);
    }
}
