//! Shared fixtures for integration tests: a fixed administrative-boundary
//! lookup, test geometries, and a fully-populated fake raster-compute
//! client, mirroring the fixture module the teacher keeps for its own
//! integration suite.

use async_trait::async_trait;
use rusle_core::geometry::AreaGeometry;
use rusle_core::raster::fake::FakeRasterServiceClient;
use rusle_core::raster::RasterBand;
use rusle_core::registry::AreaType;
use std::collections::HashMap;

/// A small square polygon near the Fergana-valley test coordinates used
/// throughout the unit test suites.
pub fn square() -> AreaGeometry {
    AreaGeometry::from_geojson(&geojson::Geometry::new(geojson::Value::Polygon(vec![vec![
        vec![68.0, 38.0],
        vec![68.1, 38.0],
        vec![68.1, 38.1],
        vec![68.0, 38.1],
        vec![68.0, 38.0],
    ]])))
    .unwrap()
}

/// A second, disjoint square, for tests that need two distinct areas.
pub fn other_square() -> AreaGeometry {
    AreaGeometry::from_geojson(&geojson::Geometry::new(geojson::Value::Polygon(vec![vec![
        vec![70.0, 40.0],
        vec![70.1, 40.0],
        vec![70.1, 40.1],
        vec![70.0, 40.1],
        vec![70.0, 40.0],
    ]])))
    .unwrap()
}

/// A fully populated band map giving every RUSLE factor a realistic,
/// non-degenerate input so `compute()` always succeeds end to end.
pub fn full_band_values() -> HashMap<RasterBand, f64> {
    let mut values = HashMap::new();
    values.insert(RasterBand::AnnualRainfall, 800.0);
    values.insert(RasterBand::Ndvi, 0.3);
    values.insert(RasterBand::SoilSandPercent, 40.0);
    values.insert(RasterBand::SoilSiltPercent, 40.0);
    values.insert(RasterBand::SoilClayPercent, 20.0);
    values.insert(RasterBand::SoilOrganicMatterPercent, 2.0);
    values.insert(RasterBand::SlopeDegrees, 12.0);
    values.insert(RasterBand::FlowLengthMeters, 80.0);
    values.insert(RasterBand::LandCoverClass, 2.0);
    values
}

/// Builds a fake raster-compute client over [`full_band_values`].
pub fn fake_raster_client() -> FakeRasterServiceClient {
    FakeRasterServiceClient::new(full_band_values())
}

/// An [`rusle_core::orchestrator::AdministrativeBoundaryLookup`] (and, where
/// needed, [`rusle_core::scheduler::AreaCatalog`]) that always resolves to
/// the same fixed geometry, regardless of the requested area id.
pub struct FixedBoundary(pub AreaGeometry);

#[async_trait]
impl rusle_core::orchestrator::AdministrativeBoundaryLookup for FixedBoundary {
    async fn boundary(&self, _area_type: AreaType, _area_id: &str) -> rusle_core::Result<AreaGeometry> {
        Ok(self.0.clone())
    }
}

/// A small named-area catalog for scheduler integration tests: every entry
/// resolves to [`square`] or [`other_square`] depending on its id.
pub struct TwoRegionCatalog;

#[async_trait]
impl rusle_core::scheduler::AreaCatalog for TwoRegionCatalog {
    async fn list_areas(&self) -> rusle_core::Result<Vec<(AreaType, String)>> {
        Ok(vec![
            (AreaType::Region, "RR-01".to_string()),
            (AreaType::Region, "RR-02".to_string()),
        ])
    }
}

#[async_trait]
impl rusle_core::orchestrator::AdministrativeBoundaryLookup for TwoRegionCatalog {
    async fn boundary(&self, _area_type: AreaType, area_id: &str) -> rusle_core::Result<AreaGeometry> {
        match area_id {
            "RR-01" => Ok(square()),
            "RR-02" => Ok(other_square()),
            other => Err(rusle_core::Error::invalid_input(format!("unknown area id: {other}"))),
        }
    }
}

/// A unique temp-directory storage root for a test, cleaned up by the
/// caller (tests run concurrently, so each needs its own root).
pub fn temp_storage_root(label: &str) -> std::path::PathBuf {
    use std::sync::atomic::{AtomicUsize, Ordering};
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("rusle-it-{label}-{}-{n}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
