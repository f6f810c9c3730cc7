//! Inertial orbital state produced by a propagator
//!
//! Positions are kilometres and velocities kilometres per second in the
//! Earth-centred inertial frame of the propagation model (TEME for SGP4).

use nalgebra::Vector3;
use satkit::Instant;

/// Earth's gravitational parameter (GM) in km³/s²
pub const MU_EARTH_KM3_S2: f64 = 398_600.4418;

/// Mean Earth radius in kilometres (spherical body used for display and decay checks)
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Earth's rotation rate in rad/s
pub const OMEGA_EARTH: f64 = 7.292_115_0e-5;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Position/velocity pair at an epoch
#[derive(Debug, Clone, Copy)]
pub struct OrbitalState {
    /// Position in the inertial frame (km)
    pub position: Vector3<f64>,

    /// Velocity in the inertial frame (km/s)
    pub velocity: Vector3<f64>,

    /// Epoch (time) of this state
    pub epoch: Instant,
}

impl OrbitalState {
    pub fn new(position: Vector3<f64>, velocity: Vector3<f64>, epoch: Instant) -> Self {
        Self {
            position,
            velocity,
            epoch,
        }
    }

    /// Build from SGP4-style metre and m/s vectors
    pub fn from_meters(pos_m: Vector3<f64>, vel_m_s: Vector3<f64>, epoch: Instant) -> Self {
        Self {
            position: pos_m / 1000.0,
            velocity: vel_m_s / 1000.0,
            epoch,
        }
    }

    /// True when every position and velocity component is finite
    pub fn is_finite(&self) -> bool {
        self.position.iter().chain(self.velocity.iter()).all(|c| c.is_finite())
    }

    /// Distance from Earth centre (km)
    pub fn radius_km(&self) -> f64 {
        self.position.norm()
    }

    /// Altitude above the mean-radius sphere (km)
    pub fn altitude_km(&self) -> f64 {
        self.radius_km() - EARTH_RADIUS_KM
    }

    /// Scalar speed (km/s)
    pub fn speed_km_s(&self) -> f64 {
        self.velocity.norm()
    }

    /// Specific orbital energy (vis-viva) in km²/s²
    pub fn specific_energy(&self) -> f64 {
        0.5 * self.velocity.norm_squared() - MU_EARTH_KM3_S2 / self.radius_km()
    }

    /// Semi-major axis in km (negative for hyperbolic)
    pub fn semi_major_axis_km(&self) -> f64 {
        -MU_EARTH_KM3_S2 / (2.0 * self.specific_energy())
    }

    /// Orbital period in seconds (only valid for elliptical orbits)
    pub fn period(&self) -> Option<f64> {
        let a = self.semi_major_axis_km();
        if a > 0.0 {
            Some(std::f64::consts::TAU * (a.powi(3) / MU_EARTH_KM3_S2).sqrt())
        } else {
            None
        }
    }
}
