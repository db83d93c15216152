//! Wire types for the remote raster-compute service client.

use serde::{Deserialize, Serialize};

/// A named input layer the raster-compute service can serve, addressed the
/// way the service itself names its datasets/bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterBand {
    /// Annual precipitation, mm/year (R-factor input).
    AnnualRainfall,
    /// Normalized Difference Vegetation Index (C-factor input).
    Ndvi,
    /// Percent clay content, topsoil (K-factor input).
    SoilClayPercent,
    /// Percent sand content, topsoil (K-factor input).
    SoilSandPercent,
    /// Percent silt content, topsoil (K-factor input).
    SoilSiltPercent,
    /// Percent organic matter, topsoil (K-factor input).
    SoilOrganicMatterPercent,
    /// Terrain slope, degrees (LS-factor input).
    SlopeDegrees,
    /// Upslope contributing flow length, meters (LS-factor input).
    FlowLengthMeters,
    /// Land-cover classification code (P-factor input).
    LandCoverClass,
}

impl RasterBand {
    /// The dataset-side band identifier sent on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::AnnualRainfall => "annual_rainfall",
            Self::Ndvi => "ndvi",
            Self::SoilClayPercent => "soil_clay_percent",
            Self::SoilSandPercent => "soil_sand_percent",
            Self::SoilSiltPercent => "soil_silt_percent",
            Self::SoilOrganicMatterPercent => "soil_organic_matter_percent",
            Self::SlopeDegrees => "slope_degrees",
            Self::FlowLengthMeters => "flow_length_meters",
            Self::LandCoverClass => "land_cover_class",
        }
    }
}

/// A region-reduction request: "give me the mean/min/max/stddev of `band`
/// over `geometry_geojson` at `scale_m`, for `year`".
#[derive(Debug, Clone, Serialize)]
pub struct ReduceRegionRequest {
    /// GeoJSON geometry (Polygon or MultiPolygon) to reduce over.
    pub geometry_geojson: serde_json::Value,
    /// Band to reduce.
    pub band: RasterBand,
    /// Nominal pixel scale, meters.
    pub scale_m: f64,
    /// Year the underlying composite should be drawn from.
    pub year: i32,
}

/// Reducer statistics for one band over one region (spec §4 rainfall/erosion stats).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReduceResult {
    /// Sample mean.
    pub mean: f64,
    /// Sample minimum.
    pub min: f64,
    /// Sample maximum.
    pub max: f64,
    /// Sample (population) standard deviation.
    pub std_dev: f64,
    /// Number of valid (non-masked) pixels contributing to the reduction.
    pub count: u64,
}

/// A bulk multipoint sampling request, used by the complexity-aware grid
/// sampler (C1/C2) instead of one request per point.
#[derive(Debug, Clone, Serialize)]
pub struct SampleBatchRequest {
    /// `(lon, lat)` points to sample.
    pub points: Vec<(f64, f64)>,
    /// Bands to sample at each point.
    pub bands: Vec<RasterBand>,
    /// Nominal pixel scale, meters.
    pub scale_m: f64,
    /// Year the underlying composite should be drawn from.
    pub year: i32,
}

/// One sampled point: `None` for a band means the point fell outside the
/// dataset's valid-data mask.
#[derive(Debug, Clone, Deserialize)]
pub struct SampledPoint {
    /// Sampled value per requested band, in request order.
    pub values: Vec<Option<f64>>,
}

/// A raw raster-clip export request (C3's input), returned as an
/// in-memory single-band array ready for GeoTIFF encoding.
#[derive(Debug, Clone, Serialize)]
pub struct ClipRasterRequest {
    /// GeoJSON geometry (Polygon or MultiPolygon) to clip to.
    pub geometry_geojson: serde_json::Value,
    /// Band to export.
    pub band: RasterBand,
    /// Nominal pixel scale, meters.
    pub scale_m: f64,
    /// Year the underlying composite should be drawn from.
    pub year: i32,
}

/// A clipped single-band raster: row-major `f64` pixels plus enough
/// georeferencing to place them (C3 GeoTIFF writer, C4 tile cutter).
#[derive(Debug, Clone)]
pub struct ClippedRaster {
    /// Row-major pixel values, `width * height` long. `f64::NAN` marks nodata.
    pub pixels: Vec<f64>,
    /// Raster width, pixels.
    pub width: u32,
    /// Raster height, pixels.
    pub height: u32,
    /// Geographic bounding box `[min_x, min_y, max_x, max_y]` the raster covers.
    pub bbox: [f64; 4],
}

impl ClippedRaster {
    /// Pixel width/height, in the geometry's native (degree) units.
    pub fn pixel_size(&self) -> (f64, f64) {
        let [min_x, min_y, max_x, max_y] = self.bbox;
        (
            (max_x - min_x) / self.width as f64,
            (max_y - min_y) / self.height as f64,
        )
    }
}
