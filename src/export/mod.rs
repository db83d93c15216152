//! GeoTIFF exporter (C3).

mod geotiff;

pub use geotiff::write_geotiff;
