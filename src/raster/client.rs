//! Raster-compute service client (C2's remote dependency).
//!
//! The RUSLE factor engine never talks to the raster-compute service
//! directly; it depends on the [`RasterServiceClient`] trait, so tests can
//! substitute a fake that returns fixed statistics instead of making
//! network calls.

use super::auth::{bearer_header_value, ServiceAccountKey, TokenCache};
use super::types::{
    ClipRasterRequest, ClippedRaster, RasterBand, ReduceRegionRequest, ReduceResult,
    SampleBatchRequest, SampledPoint,
};
use crate::geometry::AreaGeometry;
use async_trait::async_trait;
use std::time::Duration;

/// Abstraction over the remote raster-compute service.
#[async_trait]
pub trait RasterServiceClient: Send + Sync {
    /// Reduces a single band over a region to summary statistics.
    async fn reduce_region(
        &self,
        geometry: &AreaGeometry,
        band: RasterBand,
        scale_m: f64,
        year: i32,
    ) -> crate::Result<ReduceResult>;

    /// Samples multiple bands at a batch of points in one round trip.
    async fn sample_points(
        &self,
        points: &[(f64, f64)],
        bands: &[RasterBand],
        scale_m: f64,
        year: i32,
    ) -> crate::Result<Vec<SampledPoint>>;

    /// Clips a single band to a region and returns it as an in-memory
    /// pixel array (C3's GeoTIFF/tile input).
    async fn clip_raster(
        &self,
        geometry: &AreaGeometry,
        band: RasterBand,
        scale_m: f64,
        year: i32,
    ) -> crate::Result<ClippedRaster>;
}

/// HTTP-backed [`RasterServiceClient`].
pub struct HttpRasterServiceClient {
    http: reqwest::Client,
    base_url: url::Url,
    tokens: TokenCache,
    timeout_secs: u64,
}

impl HttpRasterServiceClient {
    /// Builds a client from the environment configuration's service-account
    /// key path, the way the teacher's geoprocessing client is constructed
    /// from `EnvConfig`.
    pub fn from_env(base_url: &str) -> crate::Result<Self> {
        let env = crate::config::EnvConfig::global();
        let key_path = env.raster_service_account_key_path.as_deref().ok_or_else(|| {
            crate::Error::invalid_input("RUSLE_RASTER_SERVICE_ACCOUNT_KEY is not configured")
        })?;
        let key = ServiceAccountKey::from_file(key_path)?;
        let tokens = TokenCache::new(&key)?;

        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(env.computation_timeout_secs))
                .build()?,
            base_url: url::Url::parse(base_url)?,
            tokens,
            timeout_secs: env.computation_timeout_secs,
        })
    }

    async fn post_json<Req: serde::Serialize, Resp: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
    ) -> crate::Result<Resp> {
        let token = self.tokens.token().await?;
        let url = self.base_url.join(path)?;

        tracing::debug!(%url, "calling raster-compute service");

        let response = self
            .http
            .post(url)
            .header(reqwest::header::AUTHORIZATION, bearer_header_value(&token))
            .json(body)
            .send()
            .await
            .map_err(|e| self.timeout_or_http(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(crate::Error::from(crate::error::ErrorKind::Api {
                code: status.as_u16() as i32,
                message: text,
            }));
        }

        response.json::<Resp>().await.map_err(|e| self.timeout_or_http(e))
    }
}

#[async_trait]
impl RasterServiceClient for HttpRasterServiceClient {
    #[tracing::instrument(skip(self, geometry))]
    async fn reduce_region(
        &self,
        geometry: &AreaGeometry,
        band: RasterBand,
        scale_m: f64,
        year: i32,
    ) -> crate::Result<ReduceResult> {
        let geometry_geojson = geometry_to_geojson_value(geometry)?;
        let request = ReduceRegionRequest {
            geometry_geojson,
            band,
            scale_m,
            year,
        };
        self.post_json("v1/reduceRegion", &request).await
    }

    #[tracing::instrument(skip(self, points))]
    async fn sample_points(
        &self,
        points: &[(f64, f64)],
        bands: &[RasterBand],
        scale_m: f64,
        year: i32,
    ) -> crate::Result<Vec<SampledPoint>> {
        let request = SampleBatchRequest {
            points: points.to_vec(),
            bands: bands.to_vec(),
            scale_m,
            year,
        };
        self.post_json("v1/sampleBatch", &request).await
    }

    #[tracing::instrument(skip(self, geometry))]
    async fn clip_raster(
        &self,
        geometry: &AreaGeometry,
        band: RasterBand,
        scale_m: f64,
        year: i32,
    ) -> crate::Result<ClippedRaster> {
        let geometry_geojson = geometry_to_geojson_value(geometry)?;
        let request = ClipRasterRequest {
            geometry_geojson,
            band,
            scale_m,
            year,
        };

        #[derive(serde::Deserialize)]
        struct WireRaster {
            pixels: Vec<f64>,
            width: u32,
            height: u32,
            bbox: [f64; 4],
        }

        let wire: WireRaster = self.post_json("v1/clipRaster", &request).await?;
        Ok(ClippedRaster {
            pixels: wire.pixels,
            width: wire.width,
            height: wire.height,
            bbox: wire.bbox,
        })
    }
}

impl HttpRasterServiceClient {
    /// Surfaces a timed-out request/response as `ComputationTimeout` (spec
    /// §4.2/§4.5/§7) instead of letting it fall through to the generic
    /// `HttpError` bridge, which would hide that the call ran out the clock.
    fn timeout_or_http(&self, error: reqwest::Error) -> crate::Error {
        if error.is_timeout() {
            crate::Error::computation_timeout(self.timeout_secs)
        } else {
            crate::Error::from(error)
        }
    }
}

fn geometry_to_geojson_value(geometry: &AreaGeometry) -> crate::Result<serde_json::Value> {
    let geo = geometry.as_geo();
    let value = geojson::Value::from(&geo);
    let geojson_geom = geojson::Geometry::new(value);
    serde_json::to_value(&geojson_geom).map_err(crate::Error::from)
}
