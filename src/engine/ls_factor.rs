//! Topographic (LS) factor: slope-length (L) times slope-steepness (S).

use crate::config::LsFactorDefaults;

/// `LS = L · S`, the standard RUSLE combination of the McCool slope-length
/// factor and the Wischmeier-Smith slope-steepness factor.
///
/// The slope-length exponent `m` and the piecewise steepness formula both
/// switch at `defaults.slope_break_degrees`; `low_slope_exponent` and
/// `high_slope_exponent` are the two `m` values (divided by 10, so the
/// pinned defaults `3.0`/`5.0` give the standard McCool values `0.3`/`0.5`).
pub fn ls_factor(slope_degrees: f64, flow_length_m: f64, defaults: &LsFactorDefaults) -> f64 {
    let slope_radians = slope_degrees.to_radians();
    let sine = slope_radians.sin();

    let m = if slope_degrees <= defaults.slope_break_degrees {
        defaults.low_slope_exponent / 10.0
    } else {
        defaults.high_slope_exponent / 10.0
    };

    let l = (flow_length_m.max(0.0) / 22.13).powf(m);

    let s = if slope_degrees <= defaults.slope_break_degrees {
        10.8 * sine + 0.03
    } else {
        16.8 * sine - 0.50
    };

    l * s.max(0.0)
}
