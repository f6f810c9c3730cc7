//! Bounded per-object track buffers
//!
//! Each tracked object keeps two FIFO buffers: inertial path points for the
//! orbit trace and surface-projected points for the ground trace. The ground
//! trace starts a fresh segment whenever consecutive longitudes jump across
//! the antimeridian.

use std::collections::VecDeque;

use glam::DVec3;
use nalgebra::Vector3;
use thiserror::Error;

use crate::frames::normalize_longitude;

pub const DEFAULT_MAX_TRACK_POINTS: usize = 5000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackError {
    #[error("rejected non-finite {buffer} point")]
    NonFinite { buffer: &'static str },
    #[error("rejected non-finite longitude {0}")]
    Longitude(f64),
}

/// Point types a track buffer can hold
pub trait TrackPoint: Copy {
    fn is_finite(&self) -> bool;
}

impl TrackPoint for Vector3<f64> {
    fn is_finite(&self) -> bool {
        self.iter().all(|c| c.is_finite())
    }
}

impl TrackPoint for DVec3 {
    fn is_finite(&self) -> bool {
        DVec3::is_finite(*self)
    }
}

/// Append-only ring of at most `capacity` points, oldest evicted first
#[derive(Debug, Clone)]
pub struct BoundedTrack<T> {
    points: VecDeque<T>,
    capacity: usize,
}

impl<T: TrackPoint> BoundedTrack<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Push a point, evicting the oldest when over capacity
    ///
    /// Returns `false` without touching the buffer when the point is not finite.
    pub fn push(&mut self, point: T) -> bool {
        if !point.is_finite() {
            return false;
        }
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
        true
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<&T> {
        self.points.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.points.iter()
    }
}

/// True when the wrapped longitude step between samples exceeds 180°
///
/// Both inputs are normalized first, so any representation of the same
/// longitude compares equal.
pub fn detect_discontinuity(prev_longitude_deg: f64, curr_longitude_deg: f64) -> bool {
    let prev = normalize_longitude(prev_longitude_deg);
    let curr = normalize_longitude(curr_longitude_deg);
    (curr - prev).abs() > 180.0
}

/// Path and ground trace history for one object
#[derive(Debug, Clone)]
pub struct TrackHistory {
    path: BoundedTrack<Vector3<f64>>,
    ground: BoundedTrack<DVec3>,
    last_longitude_deg: Option<f64>,
}

impl Default for TrackHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TRACK_POINTS)
    }
}

impl TrackHistory {
    pub fn new(max_points: usize) -> Self {
        Self {
            path: BoundedTrack::new(max_points),
            ground: BoundedTrack::new(max_points),
            last_longitude_deg: None,
        }
    }

    /// Record an inertial position (km) for the orbit trace
    pub fn append_path(&mut self, position: Vector3<f64>) -> Result<(), TrackError> {
        if self.path.push(position) {
            Ok(())
        } else {
            Err(TrackError::NonFinite { buffer: "path" })
        }
    }

    /// Record a surface point for the ground trace
    ///
    /// If the longitude jumped across the antimeridian since the previous
    /// ground sample the trace is cleared first, so the buffer holds just the
    /// new point afterwards. Returns whether a discontinuity was detected.
    pub fn append_ground(&mut self, point: DVec3, longitude_deg: f64) -> Result<bool, TrackError> {
        if !longitude_deg.is_finite() {
            return Err(TrackError::Longitude(longitude_deg));
        }
        if !TrackPoint::is_finite(&point) {
            return Err(TrackError::NonFinite { buffer: "ground" });
        }

        let discontinuity = self
            .last_longitude_deg
            .is_some_and(|prev| detect_discontinuity(prev, longitude_deg));
        if discontinuity {
            self.ground.clear();
        }

        self.ground.push(point);
        self.last_longitude_deg = Some(normalize_longitude(longitude_deg));
        Ok(discontinuity)
    }

    /// Drop the ground trace and forget the last longitude
    pub fn clear_ground(&mut self) {
        self.ground.clear();
        self.last_longitude_deg = None;
    }

    pub fn clear(&mut self) {
        self.path.clear();
        self.clear_ground();
    }

    pub fn path(&self) -> &BoundedTrack<Vector3<f64>> {
        &self.path
    }

    pub fn ground(&self) -> &BoundedTrack<DVec3> {
        &self.ground
    }

    pub fn last_longitude_deg(&self) -> Option<f64> {
        self.last_longitude_deg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_discontinuity_detection() {
        assert!(detect_discontinuity(179.0, -179.0));
        assert!(detect_discontinuity(-179.0, 179.0));
        assert!(!detect_discontinuity(10.0, 15.0));
        assert!(!detect_discontinuity(180.0, -180.0));
        assert!(!detect_discontinuity(539.0, 179.0));
    }

    #[test]
    fn test_fifo_eviction() {
        let mut track = BoundedTrack::<Vector3<f64>>::new(3);
        for i in 0..5 {
            assert!(track.push(Vector3::new(i as f64, 0.0, 0.0)));
        }
        let xs: Vec<f64> = track.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut history = TrackHistory::new(10);
        history.append_path(Vector3::new(1.0, 2.0, 3.0)).unwrap();

        let err = history.append_path(Vector3::new(f64::NAN, 0.0, 0.0)).unwrap_err();
        assert_eq!(err, TrackError::NonFinite { buffer: "path" });
        assert_eq!(history.path().len(), 1);

        let err = history
            .append_ground(DVec3::new(0.0, f64::INFINITY, 0.0), 10.0)
            .unwrap_err();
        assert_eq!(err, TrackError::NonFinite { buffer: "ground" });
        assert!(history.ground().is_empty());
        assert!(history.last_longitude_deg().is_none());
    }

    #[test]
    fn test_ground_cleared_on_antimeridian() {
        let mut history = TrackHistory::new(100);
        for lon in [170.0, 174.0, 178.0] {
            assert!(!history.append_ground(DVec3::X, lon).unwrap());
        }
        assert_eq!(history.ground().len(), 3);

        assert!(history.append_ground(DVec3::Y, -178.0).unwrap());
        assert_eq!(history.ground().len(), 1);
        assert_eq!(history.ground().last(), Some(&DVec3::Y));

        assert!(!history.append_ground(DVec3::Z, -174.0).unwrap());
        assert_eq!(history.ground().len(), 2);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut track = BoundedTrack::<DVec3>::new(0);
        track.push(DVec3::X);
        track.push(DVec3::Y);
        assert_eq!(track.len(), 1);
        assert_eq!(track.capacity(), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_history_never_exceeds_bound(
            max in 1usize..50,
            longitudes in prop::collection::vec(-180.0f64..180.0, 0..200),
        ) {
            let mut history = TrackHistory::new(max);
            for (i, lon) in longitudes.iter().enumerate() {
                history.append_path(Vector3::new(i as f64, 0.0, 0.0)).unwrap();
                let jumped = history.append_ground(DVec3::new(i as f64, 0.0, 0.0), *lon).unwrap();
                prop_assert!(history.path().len() <= max);
                prop_assert!(history.ground().len() <= max);
                if jumped {
                    prop_assert!(history.ground().len() <= 1);
                }
            }
        }
    }
}
