//! Two-body analytic propagator
//!
//! Solves Kepler's equation with Newton's method and rotates the perifocal
//! state into the inertial frame. Optionally applies the secular J2 drift of
//! the node, perigee and mean anomaly. Useful as a deterministic backend for
//! tests and as a fallback when SGP4 is not wanted.

use nalgebra::Vector3;
use satkit::Instant;

use super::elements::OrbitalElementSet;
use super::propagator::{validate_state, PropagationError, Propagator};
use super::state::{OrbitalState, MU_EARTH_KM3_S2};

const J2: f64 = 1.082_626_68e-3;
const EQUATORIAL_RADIUS_KM: f64 = 6378.137;
const MAX_ITERATIONS: usize = 50;
const TOLERANCE: f64 = 1e-12;

#[derive(Debug, Default, Clone, Copy)]
pub struct KeplerPropagator {
    j2_secular: bool,
}

impl KeplerPropagator {
    /// Pure two-body motion
    pub fn new() -> Self {
        Self { j2_secular: false }
    }

    /// Two-body motion plus secular J2 rates
    pub fn with_j2() -> Self {
        Self { j2_secular: true }
    }
}

/// Solve M = E - e·sin(E) for the eccentric anomaly
pub fn solve_eccentric_anomaly(mean_anomaly: f64, eccentricity: f64) -> Result<f64, PropagationError> {
    let m = mean_anomaly.rem_euclid(std::f64::consts::TAU);
    let mut e_anomaly = if eccentricity < 0.8 { m } else { std::f64::consts::PI };

    for _ in 0..MAX_ITERATIONS {
        let f = e_anomaly - eccentricity * e_anomaly.sin() - m;
        let f_prime = 1.0 - eccentricity * e_anomaly.cos();
        let delta = f / f_prime;
        e_anomaly -= delta;

        if !e_anomaly.is_finite() {
            break;
        }
        if delta.abs() < TOLERANCE {
            return Ok(e_anomaly);
        }
    }

    Err(PropagationError::NoConvergence { eccentricity })
}

impl Propagator for KeplerPropagator {
    fn propagate(
        &self,
        elements: &OrbitalElementSet,
        at: &Instant,
    ) -> Result<OrbitalState, PropagationError> {
        let dt = (*at - elements.epoch).as_seconds();
        let e = elements.eccentricity;
        let a = elements.semi_major_axis_km();
        let n = elements.mean_motion_rad_s();

        let mut raan = elements.raan_deg.to_radians();
        let mut arg_perigee = elements.arg_perigee_deg.to_radians();
        let mut mean_anomaly = elements.mean_anomaly_deg.to_radians() + n * dt;
        let inc = elements.inclination_deg.to_radians();

        if self.j2_secular {
            let p = a * (1.0 - e * e);
            let factor = 1.5 * n * J2 * (EQUATORIAL_RADIUS_KM / p).powi(2);
            let sin2_i = inc.sin().powi(2);
            raan += -factor * inc.cos() * dt;
            arg_perigee += factor * (2.0 - 2.5 * sin2_i) * dt;
            mean_anomaly += factor * (1.0 - e * e).sqrt() * (1.0 - 1.5 * sin2_i) * dt;
        }

        let e_anomaly = solve_eccentric_anomaly(mean_anomaly, e)?;
        let (sin_e, cos_e) = e_anomaly.sin_cos();
        let root = (1.0 - e * e).sqrt();
        let r = a * (1.0 - e * cos_e);

        // Perifocal position and velocity
        let x_p = a * (cos_e - e);
        let y_p = a * root * sin_e;
        let v_scale = (MU_EARTH_KM3_S2 * a).sqrt() / r;
        let vx_p = -v_scale * sin_e;
        let vy_p = v_scale * root * cos_e;

        let (sin_o, cos_o) = raan.sin_cos();
        let (sin_w, cos_w) = arg_perigee.sin_cos();
        let (sin_i, cos_i) = inc.sin_cos();

        let p_hat = Vector3::new(
            cos_o * cos_w - sin_o * sin_w * cos_i,
            sin_o * cos_w + cos_o * sin_w * cos_i,
            sin_w * sin_i,
        );
        let q_hat = Vector3::new(
            -cos_o * sin_w - sin_o * cos_w * cos_i,
            -sin_o * sin_w + cos_o * cos_w * cos_i,
            cos_w * sin_i,
        );

        validate_state(OrbitalState::new(
            p_hat * x_p + q_hat * y_p,
            p_hat * vx_p + q_hat * vy_p,
            *at,
        ))
    }

    fn name(&self) -> &'static str {
        if self.j2_secular {
            "Two-body + J2"
        } else {
            "Two-body"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures;
    use approx::assert_relative_eq;
    use satkit::Duration;

    #[test]
    fn test_circular_radius_constant() {
        let elements = fixtures::leo_equatorial();
        let propagator = KeplerPropagator::new();
        let a = elements.semi_major_axis_km();

        for step in 0..20 {
            let at = elements.epoch + Duration::from_seconds(step as f64 * 613.0);
            let state = propagator.propagate(&elements, &at).unwrap();
            assert_relative_eq!(state.radius_km(), a, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_returns_after_one_period() {
        let elements = fixtures::leo_inclined();
        let propagator = KeplerPropagator::new();

        let start = propagator.propagate(&elements, &elements.epoch).unwrap();
        let later = elements.epoch + Duration::from_seconds(elements.period_seconds());
        let end = propagator.propagate(&elements, &later).unwrap();

        let error = (end.position - start.position).norm() / start.radius_km();
        assert!(error < 1e-6, "position error too large: {}", error);
    }

    #[test]
    fn test_angular_momentum_along_orbit_normal() {
        let elements = fixtures::leo_inclined();
        let state = KeplerPropagator::new()
            .propagate(&elements, &elements.epoch)
            .unwrap();

        let h = state.position.cross(&state.velocity).normalize();
        assert_relative_eq!(h.dot(&elements.orbit_normal()), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_j2_regresses_prograde_node() {
        let elements = fixtures::leo_inclined();
        let day = elements.epoch + Duration::from_seconds(86_400.0);

        let plain = KeplerPropagator::new().propagate(&elements, &day).unwrap();
        let perturbed = KeplerPropagator::with_j2().propagate(&elements, &day).unwrap();

        // Node line = z × h; a prograde orbit's node drifts westward
        let node = |s: &OrbitalState| {
            let h = s.position.cross(&s.velocity);
            h.y.atan2(h.x)
        };
        let drift = (node(&perturbed) - node(&plain)).to_degrees();
        assert!(drift < -3.0 && drift > -7.0, "unexpected node drift {}", drift);
    }

    #[test]
    fn test_kepler_solver_high_eccentricity() {
        let e_anomaly = solve_eccentric_anomaly(0.3, 0.95).unwrap();
        assert_relative_eq!(e_anomaly - 0.95 * e_anomaly.sin(), 0.3, epsilon = 1e-10);
    }
}
