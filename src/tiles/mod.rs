//! Tile Pyramid Generator (C4).

mod mask;
mod palette;
mod pyramid;

pub use mask::{contains_point, tile_mask};
pub use palette::{color_for_label, color_for_value, legend, PALETTE};
pub use pyramid::{generate_pyramid, PyramidMetadata};
