//! The precomputed-map fingerprint (spec §3.1): the tuple that uniquely
//! identifies a precomputed map and therefore, at most, one in-flight task.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// The area an `area_id` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaType {
    /// A top-level administrative region.
    Region,
    /// A district within a region.
    District,
    /// A caller-submitted custom boundary.
    Custom,
}

/// The fingerprint key for a precomputed map: `(area_type, area_id,
/// start_year, user_id, config_hash, geometry_hash)`.
///
/// Two requests with identical fingerprints always resolve to the same
/// [`crate::registry::PrecomputedMap`] record (spec invariant P1).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Getters)]
pub struct Fingerprint {
    /// The kind of area being requested.
    area_type: AreaType,
    /// The area's identifier (region/district code, or a caller-chosen id for custom areas).
    area_id: String,
    /// The period's start year (see [`Fingerprint::period_label`]).
    start_year: i32,
    /// `None` for canonical administrative areas; `Some(id)` for a custom
    /// area scoped to the submitting user.
    user_id: Option<String>,
    /// The admin override configuration's hash (`"default"` sentinel when none apply).
    config_hash: String,
    /// The custom boundary's geometry hash (empty string for canonical areas).
    geometry_hash: String,
}

impl AreaType {
    /// The lowercase wire/path representation used in tile URLs and storage keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            AreaType::Region => "region",
            AreaType::District => "district",
            AreaType::Custom => "custom",
        }
    }
}

impl Fingerprint {
    /// Builds a fingerprint for a canonical administrative area (region or district).
    pub fn for_administrative_area(
        area_type: AreaType,
        area_id: impl Into<String>,
        start_year: i32,
        config_hash: impl Into<String>,
    ) -> Self {
        debug_assert!(matches!(area_type, AreaType::Region | AreaType::District));
        Self {
            area_type,
            area_id: area_id.into(),
            start_year,
            user_id: None,
            config_hash: config_hash.into(),
            geometry_hash: crate::geometry::CANONICAL_GEOMETRY_HASH.to_string(),
        }
    }

    /// Builds a fingerprint for a caller-submitted custom area.
    pub fn for_custom_area(
        area_id: impl Into<String>,
        start_year: i32,
        user_id: impl Into<String>,
        config_hash: impl Into<String>,
        geometry_hash: impl Into<String>,
    ) -> Self {
        Self {
            area_type: AreaType::Custom,
            area_id: area_id.into(),
            start_year,
            user_id: Some(user_id.into()),
            config_hash: config_hash.into(),
            geometry_hash: geometry_hash.into(),
        }
    }

    /// The human-readable period label derived from `start_year` (spec §4.9 "P6"):
    /// a single calendar year, formatted as its decimal representation.
    pub fn period_label(&self) -> String {
        self.start_year.to_string()
    }

    /// The deterministic, filesystem-safe storage key this fingerprint's
    /// artifacts (GeoTIFF, tile pyramid) are written under, relative to
    /// `EnvConfig::storage_root` (spec §3.1/§6.3).
    ///
    /// `{area_type}_{area_id}` for canonical administrative areas (the id is
    /// stable and user-free); `{area_type}_{geometry_hash[:24]}` for custom
    /// or geometry-overridden records, since two different uploads can
    /// otherwise share an `area_id`.
    pub fn tile_storage_key(&self) -> String {
        let area_type = self.area_type.as_str();

        match self.area_type {
            AreaType::Custom => {
                let truncated: String = self.geometry_hash.chars().take(24).collect();
                format!("{area_type}_{truncated}")
            }
            AreaType::Region | AreaType::District => format!("{area_type}_{}", self.area_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn administrative_fingerprint_has_no_user_and_canonical_geometry_hash() {
        let fp = Fingerprint::for_administrative_area(AreaType::Region, "RR-01", 2023, "default");
        assert_eq!(fp.user_id(), &None);
        assert_eq!(fp.geometry_hash(), "");
    }

    #[test]
    fn custom_fingerprint_carries_user_and_geometry_hash() {
        let fp = Fingerprint::for_custom_area("farm-plot-7", 2023, "user-1", "default", "abc123");
        assert_eq!(fp.user_id(), &Some("user-1".to_string()));
        assert_eq!(fp.geometry_hash(), "abc123");
    }

    #[test]
    fn tile_storage_key_is_area_type_and_area_id_for_administrative_areas() {
        let fp = Fingerprint::for_administrative_area(AreaType::Region, "RR-01", 2023, "default");
        assert_eq!(fp.tile_storage_key(), "region_RR-01");
    }

    #[test]
    fn tile_storage_key_is_area_type_and_truncated_geometry_hash_for_custom_areas() {
        let hash = "a".repeat(40);
        let fp = Fingerprint::for_custom_area("plot-7", 2023, "user-1", "default", hash);
        assert_eq!(fp.tile_storage_key(), format!("custom_{}", "a".repeat(24)));
    }

    #[test]
    fn tile_storage_key_ignores_short_geometry_hash_truncation_edge_case() {
        let fp = Fingerprint::for_custom_area("plot-7", 2023, "user-1", "default", "abc123");
        assert_eq!(fp.tile_storage_key(), "custom_abc123");
    }

    #[test]
    fn period_label_is_the_start_year() {
        let fp = Fingerprint::for_administrative_area(AreaType::District, "D-7", 2019, "default");
        assert_eq!(fp.period_label(), "2019");
    }

    #[test]
    fn equal_tuples_are_equal_fingerprints() {
        let a = Fingerprint::for_custom_area("x", 2020, "u", "default", "h");
        let b = Fingerprint::for_custom_area("x", 2020, "u", "default", "h");
        assert_eq!(a, b);
    }
}
