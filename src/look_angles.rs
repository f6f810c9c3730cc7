//! Observer-relative azimuth, elevation and range

use nalgebra::Vector3;
use satkit::Instant;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::frames::{geodetic_to_earth_fixed, gmst, inertial_to_earth_fixed};
use crate::propagation::{OrbitalElementSet, Propagator};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ObserverError {
    #[error("latitude {0} outside [-90, 90]")]
    Latitude(f64),
    #[error("longitude {0} outside [-180, 180]")]
    Longitude(f64),
}

/// Ground observer at sea level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverLocation {
    latitude_deg: f64,
    longitude_deg: f64,
    /// Earth-fixed position (km)
    ecef: Vector3<f64>,
}

impl ObserverLocation {
    pub fn new(latitude_deg: f64, longitude_deg: f64) -> Result<Self, ObserverError> {
        if !latitude_deg.is_finite() || !(-90.0..=90.0).contains(&latitude_deg) {
            return Err(ObserverError::Latitude(latitude_deg));
        }
        if !longitude_deg.is_finite() || !(-180.0..=180.0).contains(&longitude_deg) {
            return Err(ObserverError::Longitude(longitude_deg));
        }
        Ok(Self {
            latitude_deg,
            longitude_deg,
            ecef: geodetic_to_earth_fixed(latitude_deg, longitude_deg, 0.0),
        })
    }

    pub fn latitude_deg(&self) -> f64 {
        self.latitude_deg
    }

    pub fn longitude_deg(&self) -> f64 {
        self.longitude_deg
    }

    /// Earth-fixed position in km
    pub fn earth_fixed(&self) -> Vector3<f64> {
        self.ecef
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LookAngles {
    /// Degrees clockwise from north, [0, 360)
    pub azimuth_deg: f64,
    /// Degrees above the local horizon; negative when below it
    pub elevation_deg: f64,
    pub range_km: f64,
}

impl LookAngles {
    pub fn is_above_horizon(&self) -> bool {
        self.elevation_deg > 0.0
    }
}

/// Look angles to an Earth-fixed target
///
/// Rotates the observer-to-target vector into the topocentric
/// south-east-zenith frame. `None` when the vector is degenerate or any
/// component is non-finite.
pub fn look_angles_from_earth_fixed(
    observer: &ObserverLocation,
    target_ecef: &Vector3<f64>,
) -> Option<LookAngles> {
    let range = target_ecef - observer.earth_fixed();
    let range_km = range.norm();
    if !range_km.is_finite() || range_km == 0.0 {
        return None;
    }

    let (sin_lat, cos_lat) = observer.latitude_deg.to_radians().sin_cos();
    let (sin_lon, cos_lon) = observer.longitude_deg.to_radians().sin_cos();

    let south = sin_lat * cos_lon * range.x + sin_lat * sin_lon * range.y - cos_lat * range.z;
    let east = -sin_lon * range.x + cos_lon * range.y;
    let zenith = cos_lat * cos_lon * range.x + cos_lat * sin_lon * range.y + sin_lat * range.z;

    let elevation = (zenith / range_km).clamp(-1.0, 1.0).asin();
    let azimuth = (-east).atan2(south) + std::f64::consts::PI;

    let angles = LookAngles {
        azimuth_deg: azimuth.to_degrees().rem_euclid(360.0),
        elevation_deg: elevation.to_degrees(),
        range_km,
    };
    angles.azimuth_deg.is_finite().then_some(angles)
}

/// Look angles to an inertial target given the sidereal angle of the instant
pub fn look_angles_from_inertial(
    observer: &ObserverLocation,
    target: &Vector3<f64>,
    gmst: f64,
) -> Option<LookAngles> {
    look_angles_from_earth_fixed(observer, &inertial_to_earth_fixed(target, gmst))
}

/// Propagate `elements` to `at` and compute look angles from `observer`
///
/// `None` when no observer is set or propagation fails. Both are ordinary
/// "cannot answer right now" states; a target below the horizon still yields
/// angles with negative elevation.
pub fn look_angles<P: Propagator + ?Sized>(
    propagator: &P,
    elements: &OrbitalElementSet,
    observer: Option<&ObserverLocation>,
    at: &Instant,
) -> Option<LookAngles> {
    let observer = observer?;
    let state = match propagator.propagate(elements, at) {
        Ok(state) => state,
        Err(e) => {
            log::trace!("No look angles for {}: {}", elements.catalog_number, e);
            return None;
        }
    };
    look_angles_from_inertial(observer, &state.position, gmst(at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::earth_fixed_to_geodetic;
    use crate::propagation::KeplerPropagator;
    use crate::test_utils::fixtures;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_observer_validation() {
        assert!(ObserverLocation::new(45.0, 120.0).is_ok());
        assert!(ObserverLocation::new(-90.0, 180.0).is_ok());
        assert_eq!(ObserverLocation::new(91.0, 0.0), Err(ObserverError::Latitude(91.0)));
        assert_eq!(ObserverLocation::new(0.0, -181.0), Err(ObserverError::Longitude(-181.0)));
        assert!(ObserverLocation::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_target_overhead() {
        let observer = ObserverLocation::new(40.0, -105.0).unwrap();
        let target = geodetic_to_earth_fixed(40.0, -105.0, 500.0);

        let angles = look_angles_from_earth_fixed(&observer, &target).unwrap();
        assert_abs_diff_eq!(angles.elevation_deg, 90.0, epsilon = 1e-6);
        assert_abs_diff_eq!(angles.range_km, 500.0, epsilon = 1e-6);
    }

    #[test]
    fn test_target_below_horizon() {
        let observer = ObserverLocation::new(0.0, 0.0).unwrap();
        let target = geodetic_to_earth_fixed(0.0, 180.0, 400.0);

        let angles = look_angles_from_earth_fixed(&observer, &target).unwrap();
        assert!(angles.elevation_deg < 0.0);
        assert!(!angles.is_above_horizon());
    }

    #[test]
    fn test_azimuth_cardinal_directions() {
        let observer = ObserverLocation::new(0.0, 0.0).unwrap();

        let north = look_angles_from_earth_fixed(&observer, &geodetic_to_earth_fixed(5.0, 0.0, 400.0)).unwrap();
        assert!(north.azimuth_deg < 1.0 || north.azimuth_deg > 359.0, "north {}", north.azimuth_deg);

        let east = look_angles_from_earth_fixed(&observer, &geodetic_to_earth_fixed(0.0, 5.0, 400.0)).unwrap();
        assert_abs_diff_eq!(east.azimuth_deg, 90.0, epsilon = 1e-6);
    }

    #[test]
    fn test_observer_beneath_propagated_target() {
        let elements = fixtures::leo_inclined();
        let propagator = KeplerPropagator::new();
        let at = elements.epoch;

        let state = propagator.propagate(&elements, &at).unwrap();
        let ecef = inertial_to_earth_fixed(&state.position, gmst(&at));
        let below = earth_fixed_to_geodetic(&ecef).unwrap();
        let observer = ObserverLocation::new(below.latitude_deg, below.longitude_deg).unwrap();

        let angles = look_angles(&propagator, &elements, Some(&observer), &at).unwrap();
        assert!(angles.elevation_deg > 89.9, "elevation {}", angles.elevation_deg);
    }

    #[test]
    fn test_no_observer_is_none() {
        let elements = fixtures::leo_inclined();
        assert!(look_angles(&KeplerPropagator::new(), &elements, None, &elements.epoch).is_none());
    }
}
