//! Raster-compute service client: the core's only network dependency.

mod auth;
mod client;
mod types;

pub use client::{HttpRasterServiceClient, RasterServiceClient};
pub use types::{
    ClipRasterRequest, ClippedRaster, RasterBand, ReduceRegionRequest, ReduceResult,
    SampleBatchRequest, SampledPoint,
};

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    //! An in-memory [`RasterServiceClient`] for tests: every band returns a
    //! fixed value everywhere, so engine tests can assert exact arithmetic
    //! instead of tolerances against live data.
    use super::*;
    use crate::geometry::AreaGeometry;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// A deterministic stand-in raster-compute service.
    pub struct FakeRasterServiceClient {
        values: HashMap<RasterBand, f64>,
        calls: Mutex<u32>,
    }

    impl FakeRasterServiceClient {
        /// Builds a fake client returning `values[band]` (or `0.0` if
        /// unset) for every region/point/clip request.
        pub fn new(values: HashMap<RasterBand, f64>) -> Self {
            Self {
                values,
                calls: Mutex::new(0),
            }
        }

        /// Number of requests served so far, for assertions about batching.
        pub fn call_count(&self) -> u32 {
            *self.calls.lock().unwrap()
        }

        fn value(&self, band: RasterBand) -> f64 {
            self.values.get(&band).copied().unwrap_or(0.0)
        }
    }

    #[async_trait]
    impl RasterServiceClient for FakeRasterServiceClient {
        async fn reduce_region(
            &self,
            _geometry: &AreaGeometry,
            band: RasterBand,
            _scale_m: f64,
            _year: i32,
        ) -> crate::Result<ReduceResult> {
            *self.calls.lock().unwrap() += 1;
            let v = self.value(band);
            Ok(ReduceResult {
                mean: v,
                min: v,
                max: v,
                std_dev: 0.0,
                count: 1,
            })
        }

        async fn sample_points(
            &self,
            points: &[(f64, f64)],
            bands: &[RasterBand],
            _scale_m: f64,
            _year: i32,
        ) -> crate::Result<Vec<SampledPoint>> {
            *self.calls.lock().unwrap() += 1;
            Ok(points
                .iter()
                .map(|_| SampledPoint {
                    values: bands.iter().map(|b| Some(self.value(*b))).collect(),
                })
                .collect())
        }

        async fn clip_raster(
            &self,
            geometry: &AreaGeometry,
            band: RasterBand,
            _scale_m: f64,
            _year: i32,
        ) -> crate::Result<ClippedRaster> {
            *self.calls.lock().unwrap() += 1;
            let bbox = geometry.bbox()?;
            let v = self.value(band);
            Ok(ClippedRaster {
                pixels: vec![v; 4],
                width: 2,
                height: 2,
                bbox,
            })
        }
    }
}
