//! Coordinate frame conversions
//!
//! Three frames are in play:
//!
//! - **Inertial** (TEME, Z toward the pole): propagator output, kilometres.
//! - **Earth-fixed** (ECEF, Z toward the pole): inertial rotated by Greenwich
//!   mean sidereal time. Geodetic coordinates use the WGS-84 ellipsoid.
//! - **Scene** (Y up, right-handed): what the presentation layer draws. The
//!   primary body is a sphere centred on the origin; ECEF X maps to scene X,
//!   ECEF Z to scene Y and ECEF Y to scene -Z.

use glam::DVec3;
use nalgebra::Vector3;
use satkit::Instant;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const WGS84_A_KM: f64 = 6378.137;
const WGS84_B_KM: f64 = 6356.752_314_2;
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const J2000_JD: f64 = 2_451_545.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("non-finite {stage} in frame conversion")]
    NonFinite { stage: &'static str },
}

/// Latitude/longitude in degrees, altitude in kilometres above the ellipsoid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geodetic {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
}

impl Geodetic {
    pub fn is_finite(&self) -> bool {
        self.latitude_deg.is_finite() && self.longitude_deg.is_finite() && self.altitude_km.is_finite()
    }
}

fn wgs84_e2() -> f64 {
    let f = (WGS84_A_KM - WGS84_B_KM) / WGS84_A_KM;
    2.0 * f - f * f
}

/// Julian date (UTC) of an instant
pub fn julian_date(at: &Instant) -> f64 {
    at.as_unixtime() / 86_400.0 + UNIX_EPOCH_JD
}

/// Greenwich mean sidereal time (IAU-82), radians in [0, 2π)
pub fn gmst(at: &Instant) -> f64 {
    let t = (julian_date(at) - J2000_JD) / 36_525.0;
    let seconds = -6.2e-6 * t * t * t
        + 0.093_104 * t * t
        + (876_600.0 * 3600.0 + 8_640_184.812_866) * t
        + 67_310.548_41;
    // 240 seconds of sidereal time per degree
    (seconds / 240.0).to_radians().rem_euclid(std::f64::consts::TAU)
}

/// Normalize a longitude to (-180, 180]
pub fn normalize_longitude(longitude_deg: f64) -> f64 {
    let wrapped = (longitude_deg + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

/// Rotate an inertial vector into the Earth-fixed frame
pub fn inertial_to_earth_fixed(position: &Vector3<f64>, gmst: f64) -> Vector3<f64> {
    let (sin_g, cos_g) = gmst.sin_cos();
    Vector3::new(
        position.x * cos_g + position.y * sin_g,
        -position.x * sin_g + position.y * cos_g,
        position.z,
    )
}

/// Rotate an Earth-fixed vector into the inertial frame
pub fn earth_fixed_to_inertial(position: &Vector3<f64>, gmst: f64) -> Vector3<f64> {
    inertial_to_earth_fixed(position, -gmst)
}

/// Earth-fixed Cartesian (km) to geodetic, iterating on the WGS-84 ellipsoid
pub fn earth_fixed_to_geodetic(ecef: &Vector3<f64>) -> Result<Geodetic, TransformError> {
    if !ecef.iter().all(|c| c.is_finite()) {
        return Err(TransformError::NonFinite { stage: "input" });
    }

    let e2 = wgs84_e2();
    let r = (ecef.x * ecef.x + ecef.y * ecef.y).sqrt();
    let longitude = ecef.y.atan2(ecef.x);

    let mut latitude = ecef.z.atan2(r);
    let mut c = 1.0;
    for _ in 0..20 {
        let sin_lat = latitude.sin();
        c = 1.0 / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let next = (ecef.z + WGS84_A_KM * c * e2 * sin_lat).atan2(r);
        let converged = (next - latitude).abs() < 1e-12;
        latitude = next;
        if converged {
            break;
        }
    }

    // Near the poles the cos(lat) form loses precision
    let altitude_km = if latitude.abs() < 80f64.to_radians() {
        r / latitude.cos() - WGS84_A_KM * c
    } else {
        ecef.z / latitude.sin() - WGS84_A_KM * c * (1.0 - e2)
    };

    let geodetic = Geodetic {
        latitude_deg: latitude.to_degrees(),
        longitude_deg: normalize_longitude(longitude.to_degrees()),
        altitude_km,
    };
    if !geodetic.is_finite() {
        return Err(TransformError::NonFinite { stage: "geodetic" });
    }
    Ok(geodetic)
}

/// Inertial position to geodetic coordinates with a precomputed GMST
pub fn inertial_to_geodetic_with_gmst(
    position: &Vector3<f64>,
    gmst: f64,
) -> Result<Geodetic, TransformError> {
    if !position.iter().all(|c| c.is_finite()) || !gmst.is_finite() {
        return Err(TransformError::NonFinite { stage: "input" });
    }
    earth_fixed_to_geodetic(&inertial_to_earth_fixed(position, gmst))
}

/// Inertial position at `at` to geodetic coordinates
pub fn inertial_to_geodetic(position: &Vector3<f64>, at: &Instant) -> Result<Geodetic, TransformError> {
    inertial_to_geodetic_with_gmst(position, gmst(at))
}

/// Geodetic coordinates to Earth-fixed Cartesian (km) on the WGS-84 ellipsoid
pub fn geodetic_to_earth_fixed(latitude_deg: f64, longitude_deg: f64, altitude_km: f64) -> Vector3<f64> {
    let e2 = wgs84_e2();
    let (sin_lat, cos_lat) = latitude_deg.to_radians().sin_cos();
    let (sin_lon, cos_lon) = longitude_deg.to_radians().sin_cos();
    let n = WGS84_A_KM / (1.0 - e2 * sin_lat * sin_lat).sqrt();

    Vector3::new(
        (n + altitude_km) * cos_lat * cos_lon,
        (n + altitude_km) * cos_lat * sin_lon,
        (n * (1.0 - e2) + altitude_km) * sin_lat,
    )
}

/// Geodetic coordinates to scene Cartesian on a sphere of `radius`
///
/// `altitude` and `radius` share units (scene units for drawing). This is a
/// spherical approximation; it is total and never fails for finite input.
pub fn geodetic_to_cartesian(latitude_deg: f64, longitude_deg: f64, altitude: f64, radius: f64) -> DVec3 {
    let distance = radius + altitude;
    let (sin_lat, cos_lat) = latitude_deg.to_radians().sin_cos();
    let (sin_lon, cos_lon) = longitude_deg.to_radians().sin_cos();
    DVec3::new(
        distance * cos_lat * cos_lon,
        distance * sin_lat,
        -distance * cos_lat * sin_lon,
    )
}

/// Inverse of [`geodetic_to_cartesian`] for direction: scene point to (lat, lon) in degrees
///
/// Used to turn a picked surface point into coordinates. Returns `None` for
/// the origin or non-finite input.
pub fn cartesian_to_lat_lon(point: DVec3) -> Option<(f64, f64)> {
    if !point.is_finite() || point.length_squared() == 0.0 {
        return None;
    }
    let horizontal = (point.x * point.x + point.z * point.z).sqrt();
    let latitude = point.y.atan2(horizontal).to_degrees();
    let longitude = if horizontal == 0.0 {
        0.0
    } else {
        normalize_longitude((-point.z).atan2(point.x).to_degrees())
    };
    Some((latitude, longitude))
}

/// Earth-fixed vector to scene axes, scaled
pub fn earth_fixed_to_scene(ecef: &Vector3<f64>, scale: f64) -> DVec3 {
    DVec3::new(ecef.x, ecef.z, -ecef.y) * scale
}
