//! Single-band GeoTIFF writer (C3).
//!
//! Writes atomically: encode to a `.tmp` sibling, flush+fsync, then rename
//! over the final path, so a reader never observes a partially-written file.

use crate::error::RasterError;
use crate::webmercator::lonlat_to_mercator;
use std::io::Write;
use std::path::Path;
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

/// GeoKeyDirectoryTag (34735) contents declaring a projected CRS of
/// EPSG:3857 (Web Mercator), per the GeoTIFF key spec: header plus one
/// `ProjectedCSTypeGeoKey` entry pointing at the EPSG code.
const GEO_KEY_DIRECTORY_EPSG_3857: [u16; 8] = [
    1, 1, 0, 1, // KeyDirectoryVersion, KeyRevision, MinorRevision, NumberOfKeys
    3072, 0, 1, 3857, // ProjectedCSTypeGeoKey = 3857 (EPSG:3857)
];

/// Writes `pixels` (row-major, `width * height` `f32`s, `NaN` as nodata) as
/// a single-band float32 GeoTIFF covering `bbox` (geographic lon/lat
/// degrees) reprojected to Web Mercator (EPSG:3857, spec §4.3).
///
/// The raster is stored north-up: row 0 corresponds to `bbox[3]` (max
/// latitude), matching the orientation the tile cutter (C4) expects.
#[tracing::instrument(skip(pixels))]
pub fn write_geotiff(path: &Path, pixels: &[f32], width: u32, height: u32, bbox: [f64; 4]) -> crate::Result<()> {
    if pixels.len() != (width as usize) * (height as usize) {
        return Err(RasterError::new(format!(
            "pixel buffer length {} does not match {}x{}",
            pixels.len(),
            width,
            height
        ))
        .into());
    }

    let tmp_path = path.with_extension("tif.tmp");
    {
        let file = std::fs::File::create(&tmp_path)?;
        let mut encoder =
            TiffEncoder::new(file).map_err(|e| RasterError::new(format!("opening TIFF encoder: {e}")))?;

        let [min_lon, min_lat, max_lon, max_lat] = bbox;
        let (min_x, min_y) = lonlat_to_mercator(min_lon, min_lat);
        let (max_x, max_y) = lonlat_to_mercator(max_lon, max_lat);
        let pixel_size_x = (max_x - min_x) / width as f64;
        let pixel_size_y = (max_y - min_y) / height as f64;

        let mut image = encoder
            .new_image::<Gray32Float>(width, height)
            .map_err(|e| RasterError::new(format!("starting TIFF image: {e}")))?;

        // ModelPixelScaleTag: (scale_x, scale_y, scale_z), in Mercator meters.
        image
            .encoder()
            .write_tag(Tag::Unknown(33550), &[pixel_size_x, pixel_size_y, 0.0][..])
            .map_err(|e| RasterError::new(format!("writing pixel-scale tag: {e}")))?;

        // ModelTiepointTag: (raster_x, raster_y, raster_z, model_x, model_y, model_z)
        // anchors pixel (0,0) -- the north-west corner -- to (min_x, max_y).
        image
            .encoder()
            .write_tag(Tag::Unknown(33922), &[0.0, 0.0, 0.0, min_x, max_y, 0.0][..])
            .map_err(|e| RasterError::new(format!("writing tie-point tag: {e}")))?;

        // GeoKeyDirectoryTag: declares the raster's CRS as EPSG:3857 so
        // downstream GIS tools don't have to guess.
        image
            .encoder()
            .write_tag(Tag::Unknown(34735), &GEO_KEY_DIRECTORY_EPSG_3857[..])
            .map_err(|e| RasterError::new(format!("writing GeoKeyDirectory tag: {e}")))?;

        image
            .write_data(pixels)
            .map_err(|e| RasterError::new(format!("writing TIFF pixel data: {e}")))?;
    }

    let mut file = std::fs::OpenOptions::new().write(true).open(&tmp_path)?;
    file.flush()?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&tmp_path, path)?;
    tracing::info!(path = %path.display(), width, height, "wrote GeoTIFF");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_pixel_buffer() {
        let dir = std::env::temp_dir().join(format!("rusle-geotiff-test-{}", std::process::id()));
        let err = write_geotiff(&dir.with_extension("tif"), &[1.0, 2.0], 2, 2, [0.0, 0.0, 1.0, 1.0]);
        assert!(err.is_err());
    }

    #[test]
    fn writes_and_overwrites_atomically() {
        let dir = std::env::temp_dir().join(format!("rusle-geotiff-test-ok-{}", std::process::id()));
        std::fs::create_dir_all(dir.parent().unwrap_or(&dir)).ok();
        let path = dir.with_extension("tif");

        let pixels = vec![1.0f32; 4];
        write_geotiff(&path, &pixels, 2, 2, [68.0, 38.0, 68.1, 38.1]).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tif.tmp").exists());

        // overwrite succeeds
        write_geotiff(&path, &pixels, 2, 2, [68.0, 38.0, 68.1, 38.1]).unwrap();
        std::fs::remove_file(&path).ok();
    }
}
