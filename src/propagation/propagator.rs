//! Propagation contract and the SGP4 backend (via satkit)

use nalgebra::Vector3;
use satkit::sgp4::{sgp4, SGP4Error};
use satkit::Instant;
use thiserror::Error;

use super::elements::OrbitalElementSet;
use super::state::{OrbitalState, EARTH_RADIUS_KM};

/// Radius below which a propagated object is considered decayed (km)
const DECAY_RADIUS_KM: f64 = EARTH_RADIUS_KM * 0.98;

/// Propagation failure for a single element set at a single time
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropagationError {
    #[error("propagation model failed: {message}")]
    Model { message: String },

    #[error("propagation produced non-finite state")]
    NonFinite,

    #[error("object decayed (radius {radius_km:.1} km)")]
    Decayed { radius_km: f64 },

    #[error("Kepler equation did not converge (e = {eccentricity})")]
    NoConvergence { eccentricity: f64 },
}

/// Capability contract for anything that can turn an element set and an
/// absolute time into an inertial state.
///
/// Implementations must never return partially-finite output: a state is
/// either fully finite or an error.
pub trait Propagator: Send + Sync {
    fn propagate(
        &self,
        elements: &OrbitalElementSet,
        at: &Instant,
    ) -> Result<OrbitalState, PropagationError>;

    /// Backend name for diagnostics
    fn name(&self) -> &'static str;
}

impl<P: Propagator + ?Sized> Propagator for Box<P> {
    fn propagate(
        &self,
        elements: &OrbitalElementSet,
        at: &Instant,
    ) -> Result<OrbitalState, PropagationError> {
        (**self).propagate(elements, at)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Reject non-finite or sub-surface states
pub fn validate_state(state: OrbitalState) -> Result<OrbitalState, PropagationError> {
    if !state.is_finite() {
        return Err(PropagationError::NonFinite);
    }
    let radius_km = state.radius_km();
    if radius_km < DECAY_RADIUS_KM {
        return Err(PropagationError::Decayed { radius_km });
    }
    Ok(state)
}

/// SGP4/SDP4 analytic propagation using satkit
#[derive(Debug, Default, Clone, Copy)]
pub struct Sgp4Propagator;

impl Sgp4Propagator {
    pub fn new() -> Self {
        Self
    }
}

impl Propagator for Sgp4Propagator {
    fn propagate(
        &self,
        elements: &OrbitalElementSet,
        at: &Instant,
    ) -> Result<OrbitalState, PropagationError> {
        // satkit caches model initialisation inside the TLE, so work on a copy
        let mut tle = elements.tle().clone();
        let result = sgp4(&mut tle, &[*at]).map_err(|e| PropagationError::Model {
            message: format!("{:?}", e),
        })?;

        // per-time failures come back as error codes with zeroed output
        if let Some(code) = result.errcode.first().filter(|c| **c != SGP4Error::SGP4Success) {
            return Err(PropagationError::Model {
                message: code.to_string(),
            });
        }

        // pos and vel are in the TEME frame, in metres and m/s
        let pos = result.pos.column(0);
        let vel = result.vel.column(0);
        let state = OrbitalState::from_meters(
            Vector3::new(pos[0], pos[1], pos[2]),
            Vector3::new(vel[0], vel[1], vel[2]),
            *at,
        );

        validate_state(state)
    }

    fn name(&self) -> &'static str {
        "SGP4"
    }
}
