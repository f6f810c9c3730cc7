//! Per-object visibility decisions
//!
//! All geometry here lives in the scene frame (Y up, Earth-fixed, origin at
//! the body centre unless the view says otherwise). The classifier is a pure
//! function of its inputs.

use std::collections::BTreeMap;

use glam::DVec3;
use nalgebra::Vector3;
use satkit::{lpephem, Instant};
use serde::{Deserialize, Serialize};

use crate::frames::{earth_fixed_to_scene, geodetic_to_cartesian, gmst, inertial_to_earth_fixed};

/// Category tag used for ground stations in the filter map
pub const GROUND_STATIONS: &str = "GroundStations";

/// Categories enabled in a fresh filter
pub const DEFAULT_CATEGORIES: [&str; 7] = [
    "Starlink",
    "GPS",
    "ISS",
    "Hubble",
    "Weather",
    "EarthObservation",
    GROUND_STATIONS,
];

/// Per-category enable map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryFilter {
    #[serde(default)]
    categories: BTreeMap<String, bool>,
    /// Answer for categories missing from the map
    #[serde(default = "default_unknown_enabled")]
    unknown_enabled: bool,
}

fn default_unknown_enabled() -> bool {
    true
}

impl Default for CategoryFilter {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES
                .iter()
                .map(|c| (c.to_string(), true))
                .collect(),
            unknown_enabled: true,
        }
    }
}

impl CategoryFilter {
    pub fn is_enabled(&self, category: &str) -> bool {
        self.categories
            .get(category)
            .copied()
            .unwrap_or(self.unknown_enabled)
    }

    pub fn set(&mut self, category: impl Into<String>, enabled: bool) {
        self.categories.insert(category.into(), enabled);
    }

    pub fn toggle(&mut self, category: &str) {
        let enabled = self.is_enabled(category);
        self.set(category, !enabled);
    }

    pub fn set_unknown_enabled(&mut self, enabled: bool) {
        self.unknown_enabled = enabled;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.categories.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Viewer and light geometry for one tick, in scene coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewGeometry {
    pub camera: DVec3,
    pub body_center: DVec3,
    /// Direction toward the sun; need not be normalized
    pub sun_direction: DVec3,
}

/// Derived booleans behind a visibility decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VisibilityFlags {
    pub type_enabled: bool,
    /// On the far side of the body from the camera
    pub occluded: bool,
    /// On the unlit hemisphere
    pub night_side: bool,
}

impl VisibilityFlags {
    pub fn visible(&self, occlusion_enabled: bool, night_mask_enabled: bool) -> bool {
        self.type_enabled
            && !(occlusion_enabled && self.occluded)
            && !(night_mask_enabled && self.night_side)
    }
}

/// Compute the flags for an object at `position`
///
/// A non-finite position is reported as occluded and on the night side, so
/// it can never pass the geometric checks.
pub fn classify_flags(
    category: &str,
    position: DVec3,
    view: &ViewGeometry,
    filter: &CategoryFilter,
) -> VisibilityFlags {
    let type_enabled = filter.is_enabled(category);
    if !position.is_finite() {
        return VisibilityFlags {
            type_enabled,
            occluded: true,
            night_side: true,
        };
    }

    let radial = position - view.body_center;
    VisibilityFlags {
        type_enabled,
        occluded: radial.dot(view.camera - view.body_center) < 0.0,
        night_side: radial.dot(view.sun_direction) < 0.0,
    }
}

/// Whether an object should be shown
///
/// The category must be enabled. With occlusion on, the object must not be
/// behind the body as seen from the camera. With the night mask on, it must
/// be on the sunlit hemisphere. A dot product of exactly zero passes both.
pub fn classify(
    category: &str,
    position: DVec3,
    view: &ViewGeometry,
    filter: &CategoryFilter,
    occlusion_enabled: bool,
    night_mask_enabled: bool,
) -> bool {
    classify_flags(category, position, view, filter).visible(occlusion_enabled, night_mask_enabled)
}

/// Unit vector toward the sun in scene axes at `at`
pub fn sun_direction_scene(at: &Instant) -> DVec3 {
    let sun = lpephem::sun::pos_gcrf(at);
    let inertial = Vector3::new(sun[0], sun[1], sun[2]);
    let ecef = inertial_to_earth_fixed(&inertial, gmst(at));
    earth_fixed_to_scene(&ecef, 1.0).normalize_or_zero()
}

/// Points on the day/night boundary circle of a sphere of `radius`
///
/// Returns `num_points + 1` points so the loop closes, or nothing when the
/// sun direction is degenerate.
pub fn terminator_points(sun_direction: DVec3, radius: f64, num_points: usize) -> Vec<DVec3> {
    let sun = sun_direction.normalize_or_zero();
    if sun == DVec3::ZERO || num_points == 0 {
        return Vec::new();
    }
    let (u, v) = sun.any_orthonormal_pair();
    (0..=num_points)
        .map(|i| {
            let theta = std::f64::consts::TAU * i as f64 / num_points as f64;
            (u * theta.cos() + v * theta.sin()) * radius
        })
        .collect()
}

/// A fixed ground station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundStation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl GroundStation {
    /// Scene position on a sphere of `radius` (scene units)
    pub fn scene_position(&self, radius: f64) -> DVec3 {
        geodetic_to_cartesian(self.latitude, self.longitude, 0.0, radius)
    }
}

/// Whether a station marker should be shown
///
/// Stations are hidden unless strictly on the camera-facing hemisphere.
pub fn station_visible(position: DVec3, view: &ViewGeometry, filter: &CategoryFilter) -> bool {
    filter.is_enabled(GROUND_STATIONS)
        && position.is_finite()
        && (position - view.body_center).dot(view.camera - view.body_center) > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn view() -> ViewGeometry {
        ViewGeometry {
            camera: DVec3::new(0.0, 0.0, 3.0),
            body_center: DVec3::ZERO,
            sun_direction: DVec3::X,
        }
    }

    #[test]
    fn test_antipodal_object_hidden() {
        let filter = CategoryFilter::default();
        let behind = DVec3::new(0.0, 0.0, -0.7);
        assert!(!classify("GPS", behind, &view(), &filter, true, false));
        // Without occlusion the same object shows
        assert!(classify("GPS", behind, &view(), &filter, false, false));
    }

    #[test]
    fn test_near_side_object_visible() {
        let filter = CategoryFilter::default();
        let front = DVec3::new(0.1, 0.0, 0.7);
        assert!(classify("GPS", front, &view(), &filter, true, true));
    }

    #[test]
    fn test_night_mask() {
        let filter = CategoryFilter::default();
        let dark = DVec3::new(-0.7, 0.0, 0.1);
        let flags = classify_flags("ISS", dark, &view(), &filter);
        assert!(flags.night_side);
        assert!(!flags.occluded);
        assert!(!flags.visible(true, true));
        assert!(flags.visible(true, false));
    }

    #[test]
    fn test_limb_counts_as_visible() {
        let filter = CategoryFilter::default();
        let limb = DVec3::new(0.0, 0.7, 0.0);
        let v = ViewGeometry {
            sun_direction: DVec3::Z,
            ..view()
        };
        assert!(classify("ISS", limb, &v, &filter, true, true));
    }

    #[test]
    fn test_type_filter_applies_first() {
        let mut filter = CategoryFilter::default();
        filter.set("Starlink", false);
        let front = DVec3::new(0.1, 0.0, 0.7);
        assert!(!classify("Starlink", front, &view(), &filter, false, false));

        filter.toggle("Starlink");
        assert!(classify("Starlink", front, &view(), &filter, false, false));
    }

    #[test]
    fn test_unknown_category() {
        let mut filter = CategoryFilter::default();
        assert!(filter.is_enabled("Debris"));
        filter.set_unknown_enabled(false);
        assert!(!filter.is_enabled("Debris"));
        assert!(filter.is_enabled("GPS"));
    }

    #[test]
    fn test_non_finite_position_hidden() {
        let filter = CategoryFilter::default();
        let bad = DVec3::new(f64::NAN, 0.0, 0.0);
        assert!(!classify("GPS", bad, &view(), &filter, true, false));
    }

    #[test]
    fn test_station_visibility_is_strict() {
        let filter = CategoryFilter::default();
        assert!(station_visible(DVec3::new(0.0, 0.0, 0.6), &view(), &filter));
        assert!(!station_visible(DVec3::new(0.6, 0.0, 0.0), &view(), &filter));

        let mut off = filter.clone();
        off.set(GROUND_STATIONS, false);
        assert!(!station_visible(DVec3::new(0.0, 0.0, 0.6), &view(), &off));
    }

    #[test]
    fn test_terminator_perpendicular_to_sun() {
        let sun = DVec3::new(1.0, 0.5, -0.2);
        let points = terminator_points(sun, 0.6371, 64);
        assert_eq!(points.len(), 65);
        for p in &points {
            assert_abs_diff_eq!(p.length(), 0.6371, epsilon = 1e-12);
            assert_abs_diff_eq!(p.dot(sun.normalize()), 0.0, epsilon = 1e-12);
        }
        assert!(terminator_points(DVec3::ZERO, 1.0, 64).is_empty());
    }

    #[test]
    fn test_sun_direction_is_unit_and_near_ecliptic() {
        // June solstice: sun well north of the equator
        let at = Instant::from_datetime(2025, 6, 21, 12, 0, 0.0).unwrap();
        let sun = sun_direction_scene(&at);
        assert_abs_diff_eq!(sun.length(), 1.0, epsilon = 1e-9);
        let declination = sun.y.asin().to_degrees();
        assert!((declination - 23.4).abs() < 0.5, "declination {}", declination);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn prop_classify_is_deterministic(
            x in -2.0f64..2.0, y in -2.0f64..2.0, z in -2.0f64..2.0,
            occlusion in any::<bool>(), night in any::<bool>(),
        ) {
            let filter = CategoryFilter::default();
            let p = DVec3::new(x, y, z);
            let first = classify("GPS", p, &view(), &filter, occlusion, night);
            let second = classify("GPS", p, &view(), &filter, occlusion, night);
            prop_assert_eq!(first, second);
        }
    }
}
