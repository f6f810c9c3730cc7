//! Engine configuration

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::track::DEFAULT_MAX_TRACK_POINTS;

/// Tunables for the tracking engine and its clock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// FIFO bound for both path and ground-track buffers
    pub max_track_points: usize,
    /// Spherical body radius used for scene projection (km)
    pub body_radius_km: f64,
    /// Scene units per km
    pub scene_scale: f64,
    /// Ground-track lift above the surface, scene units
    pub ground_track_lift: f64,
    /// Record a ground track for the selected object only
    pub ground_track_selected_only: bool,
    pub min_rate: u32,
    pub max_rate: u32,
    pub initial_rate: u32,
    pub rate_presets: Vec<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_track_points: DEFAULT_MAX_TRACK_POINTS,
            body_radius_km: 6371.0,
            scene_scale: 0.0001,
            ground_track_lift: 0.001,
            ground_track_selected_only: false,
            min_rate: 1,
            max_rate: 3600,
            initial_rate: 60,
            rate_presets: vec![1, 10, 60, 600, 3600],
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading engine config from {:?}", path);

        let file = File::open(path).with_context(|| format!("Failed to open config file: {:?}", path))?;
        let config: EngineConfig = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config JSON: {:?}", path))?;

        Ok(config.validate())
    }

    /// Body radius in scene units
    pub fn body_radius_scene(&self) -> f64 {
        self.body_radius_km * self.scene_scale
    }

    /// Repair inconsistent values, logging each fix
    pub fn validate(mut self) -> Self {
        let defaults = Self::default();

        if self.max_track_points == 0 {
            log::warn!("max_track_points must be at least 1; using 1");
            self.max_track_points = 1;
        }
        if !(self.body_radius_km.is_finite() && self.body_radius_km > 0.0) {
            log::warn!(
                "Invalid body_radius_km {}; using {}",
                self.body_radius_km,
                defaults.body_radius_km
            );
            self.body_radius_km = defaults.body_radius_km;
        }
        if !(self.scene_scale.is_finite() && self.scene_scale > 0.0) {
            log::warn!("Invalid scene_scale {}; using {}", self.scene_scale, defaults.scene_scale);
            self.scene_scale = defaults.scene_scale;
        }
        if !self.ground_track_lift.is_finite() {
            log::warn!("Invalid ground_track_lift; using {}", defaults.ground_track_lift);
            self.ground_track_lift = defaults.ground_track_lift;
        }
        if self.min_rate == 0 {
            log::warn!("min_rate must be positive; using 1");
            self.min_rate = 1;
        }
        if self.min_rate > self.max_rate {
            log::warn!("min_rate {} > max_rate {}; swapping", self.min_rate, self.max_rate);
            std::mem::swap(&mut self.min_rate, &mut self.max_rate);
        }
        let clamped = self.initial_rate.clamp(self.min_rate, self.max_rate);
        if clamped != self.initial_rate {
            log::warn!("initial_rate {} out of bounds; using {}", self.initial_rate, clamped);
            self.initial_rate = clamped;
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{ "max_track_points": 100 }"#).unwrap();
        assert_eq!(config.max_track_points, 100);
        assert_eq!(config.initial_rate, 60);
        assert_eq!(config.rate_presets, vec![1, 10, 60, 600, 3600]);
    }

    #[test]
    fn test_validate_repairs() {
        let config = EngineConfig {
            max_track_points: 0,
            min_rate: 500,
            max_rate: 10,
            initial_rate: 1,
            scene_scale: -1.0,
            ..Default::default()
        }
        .validate();

        assert_eq!(config.max_track_points, 1);
        assert_eq!((config.min_rate, config.max_rate), (10, 500));
        assert_eq!(config.initial_rate, 10);
        assert_eq!(config.scene_scale, 0.0001);
    }

    #[test]
    fn test_default_is_valid() {
        assert_eq!(EngineConfig::default().validate(), EngineConfig::default());
    }

    #[test]
    fn test_body_radius_scene() {
        let r = EngineConfig::default().body_radius_scene();
        assert!((r - 0.6371).abs() < 1e-12);
    }
}
