//! Predicted orbit trace generation

use nalgebra::Vector3;
use satkit::{Duration, Instant};

use super::elements::OrbitalElementSet;
use super::propagator::Propagator;

/// Sample one full orbital period centred on `center_time`
///
/// Returns inertial positions (km) in time order. Samples the propagator
/// rejects are skipped, so the trace may be shorter than `num_points + 1`.
pub fn predict_orbit_track<P: Propagator + ?Sized>(
    propagator: &P,
    elements: &OrbitalElementSet,
    center_time: &Instant,
    num_points: u32,
) -> Vec<Vector3<f64>> {
    let num_points = num_points.max(2);
    let mut positions = Vec::with_capacity(num_points as usize + 1);

    let period_seconds = elements.period_seconds();
    let start_time = *center_time - Duration::from_seconds(period_seconds / 2.0);
    let step = period_seconds / num_points as f64;

    let mut skipped = 0usize;
    for i in 0..=num_points {
        let prop_time = start_time + Duration::from_seconds(step * i as f64);
        match propagator.propagate(elements, &prop_time) {
            Ok(state) => positions.push(state.position),
            Err(_) => skipped += 1,
        }
    }

    if skipped > 0 {
        log::debug!(
            "Orbit track for {} skipped {} of {} samples",
            elements.catalog_number,
            skipped,
            num_points + 1
        );
    }

    positions
}
