//! Stable severity color palette (spec §6.6).

use crate::engine::{SEVERITY_BOUNDARIES, SEVERITY_LABELS};

/// RGBA color for one severity band, in [`SEVERITY_LABELS`] order. Fixed by
/// spec §6.6's stable color table -- these values are part of the wire
/// contract with the front-end legend, not a design choice.
pub const PALETTE: [[u8; 4]; 5] = [
    [34, 139, 34, 255],  // Very Low -- green
    [255, 215, 0, 255],  // Low -- yellow
    [255, 140, 0, 255],  // Moderate -- orange
    [220, 20, 60, 255],  // Severe -- crimson
    [139, 0, 0, 255],    // Excessive -- dark red
];

/// Maps a single soil-loss value (t/ha/yr) to its severity band's color.
/// `NaN` (masked/no-data) maps to fully transparent.
pub fn color_for_value(value: f64) -> [u8; 4] {
    if !value.is_finite() {
        return [0, 0, 0, 0];
    }

    let mut band_index = 0;
    for (i, &boundary) in SEVERITY_BOUNDARIES.iter().enumerate() {
        if value >= boundary {
            band_index = i;
        }
    }
    PALETTE[band_index]
}

/// Looks up the color swatch for a named severity band, for legend rendering.
pub fn color_for_label(label: &str) -> Option<[u8; 4]> {
    SEVERITY_LABELS
        .iter()
        .position(|&l| l == label)
        .map(|i| PALETTE[i])
}

/// The legend entries the orchestrator exposes alongside a tile pyramid:
/// `(label, lower_bound, color)`.
pub fn legend() -> Vec<(&'static str, f64, [u8; 4])> {
    SEVERITY_LABELS
        .iter()
        .zip(SEVERITY_BOUNDARIES.iter())
        .zip(PALETTE.iter())
        .map(|((&label, &bound), &color)| (label, bound, color))
        .collect()
}
