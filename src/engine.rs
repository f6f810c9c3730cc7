//! Per-tick orchestration of propagation, frames, history and visibility
//!
//! The engine owns an arena of [`TrackedObject`]s and a [`SimulationClock`].
//! Each call to [`TrackingEngine::tick`] advances the clock, snapshots every
//! cross-cutting input into a [`TickContext`] and then runs each object
//! through propagate → geodetic → look angles → history → visibility. An
//! object that fails any stage is hidden for that tick and the loop moves on.
//!
//! Catalog membership changes submitted through a [`CatalogHandle`] are only
//! applied at the start of a tick, never mid-iteration.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glam::DVec3;
use nalgebra::Vector3;
use parking_lot::Mutex;
use satkit::Instant;
use thiserror::Error;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::clock::SimulationClock;
use crate::config::EngineConfig;
use crate::frames::{geodetic_to_cartesian, gmst, inertial_to_geodetic_with_gmst, Geodetic, TransformError};
use crate::look_angles::{look_angles_from_inertial, LookAngles, ObserverLocation};
use crate::propagation::{predict_orbit_track, OrbitalElementSet, PropagationError, Propagator};
use crate::track::{TrackError, TrackHistory};
use crate::visibility::{
    classify_flags, station_visible, sun_direction_scene, CategoryFilter, GroundStation,
    ViewGeometry, VisibilityFlags,
};

/// Engine-assigned identity of a tracked object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct ObjectId(pub u64);

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why an object has no sample this tick
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineFailure {
    #[error("propagation failed: {0}")]
    Propagation(#[from] PropagationError),
    #[error("frame transform failed: {0}")]
    Transform(#[from] TransformError),
    #[error("track point rejected: {0}")]
    Track(#[from] TrackError),
    #[error("non-finite scene position")]
    NonFiniteScene,
}

/// Everything computed for one object at one instant
#[derive(Debug, Clone)]
pub struct StateSample {
    pub time: Instant,
    /// Inertial position, km
    pub position: Vector3<f64>,
    /// Inertial velocity, km/s
    pub velocity: Vector3<f64>,
    pub geodetic: Geodetic,
    pub speed_km_s: f64,
    /// Earth-fixed scene position (Y up)
    pub scene_position: DVec3,
    /// Present only for the selected object when an observer is set
    pub look_angles: Option<LookAngles>,
}

/// One catalog entry as the engine tracks it
#[derive(Debug, Clone)]
pub struct TrackedObject {
    id: ObjectId,
    elements: OrbitalElementSet,
    /// Free-form metadata passed through for display
    details: serde_json::Value,
    history: TrackHistory,
    latest: Option<Result<StateSample, EngineFailure>>,
    flags: VisibilityFlags,
    visible: bool,
    consecutive_failures: u32,
}

impl TrackedObject {
    fn new(id: ObjectId, elements: OrbitalElementSet, details: serde_json::Value, max_points: usize) -> Self {
        Self {
            id,
            elements,
            details,
            history: TrackHistory::new(max_points),
            latest: None,
            flags: VisibilityFlags::default(),
            visible: false,
            consecutive_failures: 0,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn elements(&self) -> &OrbitalElementSet {
        &self.elements
    }

    pub fn name(&self) -> &str {
        &self.elements.name
    }

    pub fn category(&self) -> &str {
        &self.elements.category
    }

    pub fn details(&self) -> &serde_json::Value {
        &self.details
    }

    pub fn history(&self) -> &TrackHistory {
        &self.history
    }

    /// Latest sample, or `None` if the last tick failed or none has run
    pub fn sample(&self) -> Option<&StateSample> {
        self.latest.as_ref().and_then(|r| r.as_ref().ok())
    }

    pub fn latest(&self) -> Option<&Result<StateSample, EngineFailure>> {
        self.latest.as_ref()
    }

    pub fn flags(&self) -> VisibilityFlags {
        self.flags
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

/// Host-supplied inputs for one tick
#[derive(Debug, Clone)]
pub struct TickInputs<'a> {
    pub wall_delta_ms: f64,
    pub rate: u32,
    pub paused: bool,
    pub observer: Option<ObserverLocation>,
    pub selected: Option<ObjectId>,
    pub filter: &'a CategoryFilter,
    pub occlusion_enabled: bool,
    pub night_mask_enabled: bool,
    /// Camera position in scene units
    pub camera: DVec3,
    /// Sun direction in scene axes; computed from the ephemeris when absent
    pub sun_direction: Option<DVec3>,
}

impl<'a> TickInputs<'a> {
    pub fn new(wall_delta_ms: f64, rate: u32, filter: &'a CategoryFilter) -> Self {
        Self {
            wall_delta_ms,
            rate,
            paused: false,
            observer: None,
            selected: None,
            filter,
            occlusion_enabled: false,
            night_mask_enabled: false,
            camera: DVec3::new(0.0, 0.0, 3.0),
            sun_direction: None,
        }
    }

    pub fn with_observer(mut self, observer: Option<ObserverLocation>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_selected(mut self, selected: Option<ObjectId>) -> Self {
        self.selected = selected;
        self
    }

    pub fn with_camera(mut self, camera: DVec3) -> Self {
        self.camera = camera;
        self
    }

    pub fn with_sun_direction(mut self, sun_direction: DVec3) -> Self {
        self.sun_direction = Some(sun_direction);
        self
    }

    pub fn with_masks(mut self, occlusion_enabled: bool, night_mask_enabled: bool) -> Self {
        self.occlusion_enabled = occlusion_enabled;
        self.night_mask_enabled = night_mask_enabled;
        self
    }

    pub fn paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }
}

/// Values every object in a tick reads; fixed before the per-object loop
#[derive(Debug, Clone)]
pub struct TickContext<'a> {
    pub time: Instant,
    pub gmst: f64,
    pub observer: Option<ObserverLocation>,
    pub selected: Option<ObjectId>,
    pub filter: &'a CategoryFilter,
    pub view: ViewGeometry,
    pub occlusion_enabled: bool,
    pub night_mask_enabled: bool,
    pub scene_scale: f64,
    pub body_radius_scene: f64,
    pub ground_track_lift: f64,
    pub ground_track_selected_only: bool,
}

#[derive(Debug, Clone)]
pub struct ObjectReport {
    pub id: ObjectId,
    pub catalog_number: u32,
    pub outcome: Result<StateSample, EngineFailure>,
    pub visible: bool,
    /// Ground track restarted this tick after an antimeridian jump
    pub ground_track_reset: bool,
}

#[derive(Debug, Clone)]
pub struct StationReport {
    pub name: String,
    pub scene_position: DVec3,
    pub visible: bool,
}

/// Everything a host needs to draw one frame
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub time: Instant,
    pub gmst: f64,
    pub sun_direction: DVec3,
    pub objects: Vec<ObjectReport>,
    pub stations: Vec<StationReport>,
    pub selected: Option<ObjectId>,
    pub selected_look_angles: Option<LookAngles>,
}

impl TickOutput {
    pub fn visible_count(&self) -> usize {
        self.objects.iter().filter(|o| o.visible).count()
    }

    pub fn failure_count(&self) -> usize {
        self.objects.iter().filter(|o| o.outcome.is_err()).count()
    }

    pub fn report(&self, id: ObjectId) -> Option<&ObjectReport> {
        self.objects.iter().find(|o| o.id == id)
    }
}

/// A pending catalog membership change
#[derive(Debug, Clone)]
pub enum CatalogChange {
    Add {
        id: ObjectId,
        elements: OrbitalElementSet,
        details: serde_json::Value,
    },
    Remove(ObjectId),
}

/// Thread-safe queue of catalog changes, drained at tick start
#[derive(Debug, Clone)]
pub struct CatalogHandle {
    pending: Arc<Mutex<Vec<CatalogChange>>>,
    next_id: Arc<AtomicU64>,
}

impl CatalogHandle {
    fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    fn allocate(&self) -> ObjectId {
        ObjectId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Queue an object for addition; the id is valid immediately
    pub fn add(&self, elements: OrbitalElementSet, details: serde_json::Value) -> ObjectId {
        let id = self.allocate();
        self.pending.lock().push(CatalogChange::Add { id, elements, details });
        id
    }

    pub fn remove(&self, id: ObjectId) {
        self.pending.lock().push(CatalogChange::Remove(id));
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    fn drain(&self) -> Vec<CatalogChange> {
        std::mem::take(&mut *self.pending.lock())
    }
}

pub struct TrackingEngine {
    propagator: Box<dyn Propagator>,
    config: EngineConfig,
    clock: SimulationClock,
    objects: Vec<TrackedObject>,
    index: HashMap<ObjectId, usize>,
    stations: Vec<GroundStation>,
    catalog: CatalogHandle,
}

impl TrackingEngine {
    pub fn new(propagator: Box<dyn Propagator>, config: EngineConfig, start: Instant) -> Self {
        let config = config.validate();
        let clock = SimulationClock::new(start, &config);
        log::info!(
            "Tracking engine using {} propagator, {} track points, rate {}",
            propagator.name(),
            config.max_track_points,
            clock.rate()
        );
        Self {
            propagator,
            config,
            clock,
            objects: Vec::new(),
            index: HashMap::new(),
            stations: Vec::new(),
            catalog: CatalogHandle::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut SimulationClock {
        &mut self.clock
    }

    pub fn propagator(&self) -> &dyn Propagator {
        self.propagator.as_ref()
    }

    pub fn objects(&self) -> &[TrackedObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&TrackedObject> {
        self.index.get(&id).map(|&i| &self.objects[i])
    }

    pub fn find_by_catalog_number(&self, catalog_number: u32) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|o| o.elements.catalog_number == catalog_number)
            .map(|o| o.id)
    }

    /// Handle for queueing membership changes from other threads
    pub fn catalog_handle(&self) -> CatalogHandle {
        self.catalog.clone()
    }

    /// Add an object immediately; only call between ticks
    pub fn add_object(&mut self, elements: OrbitalElementSet, details: serde_json::Value) -> ObjectId {
        let id = self.catalog.allocate();
        self.insert(id, elements, details);
        id
    }

    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        let Some(index) = self.index.remove(&id) else {
            return false;
        };
        self.objects.remove(index);
        for (i, object) in self.objects.iter().enumerate().skip(index) {
            self.index.insert(object.id, i);
        }
        true
    }

    pub fn set_ground_stations(&mut self, stations: Vec<GroundStation>) {
        self.stations = stations;
    }

    pub fn ground_stations(&self) -> &[GroundStation] {
        &self.stations
    }

    /// Predicted inertial orbit trace (km) for one object around the current time
    pub fn predicted_orbit(&self, id: ObjectId, num_points: u32) -> Option<Vec<Vector3<f64>>> {
        let object = self.get(id)?;
        let now = self.clock.time();
        Some(predict_orbit_track(self.propagator.as_ref(), &object.elements, &now, num_points))
    }

    fn insert(&mut self, id: ObjectId, elements: OrbitalElementSet, details: serde_json::Value) {
        if self.index.contains_key(&id) {
            log::warn!("Object {} already tracked; ignoring duplicate add", id);
            return;
        }
        log::debug!("Tracking {} ({}) as {}", elements.name, elements.catalog_number, id);
        self.index.insert(id, self.objects.len());
        self.objects
            .push(TrackedObject::new(id, elements, details, self.config.max_track_points));
    }

    fn apply_catalog_changes(&mut self) {
        let changes = self.catalog.drain();
        if changes.is_empty() {
            return;
        }
        let (mut added, mut removed) = (0usize, 0usize);
        for change in changes {
            match change {
                CatalogChange::Add { id, elements, details } => {
                    self.insert(id, elements, details);
                    added += 1;
                }
                CatalogChange::Remove(id) => {
                    if self.remove_object(id) {
                        removed += 1;
                    }
                }
            }
        }
        log::info!(
            "Applied catalog changes: {} added, {} removed, {} tracked",
            added,
            removed,
            self.objects.len()
        );
    }

    /// Advance the clock and recompute every object
    pub fn tick(&mut self, inputs: &TickInputs<'_>) -> TickOutput {
        self.apply_catalog_changes();

        self.clock.set_paused(inputs.paused);
        self.clock.set_rate(inputs.rate);
        let time = self.clock.advance(inputs.wall_delta_ms);

        let sun_direction = inputs
            .sun_direction
            .filter(|d| d.is_finite() && d.length_squared() > 0.0)
            .unwrap_or_else(|| sun_direction_scene(&time));

        let ctx = TickContext {
            time,
            gmst: gmst(&time),
            observer: inputs.observer,
            selected: inputs.selected,
            filter: inputs.filter,
            view: ViewGeometry {
                camera: inputs.camera,
                body_center: DVec3::ZERO,
                sun_direction,
            },
            occlusion_enabled: inputs.occlusion_enabled,
            night_mask_enabled: inputs.night_mask_enabled,
            scene_scale: self.config.scene_scale,
            body_radius_scene: self.config.body_radius_scene(),
            ground_track_lift: self.config.ground_track_lift,
            ground_track_selected_only: self.config.ground_track_selected_only,
        };

        let propagator = self.propagator.as_ref();

        #[cfg(feature = "parallel")]
        let objects: Vec<ObjectReport> = self
            .objects
            .par_iter_mut()
            .map(|object| step_object(object, &ctx, propagator))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let objects: Vec<ObjectReport> = self
            .objects
            .iter_mut()
            .map(|object| step_object(object, &ctx, propagator))
            .collect();

        let stations = self
            .stations
            .iter()
            .map(|station| {
                let scene_position = station.scene_position(ctx.body_radius_scene);
                StationReport {
                    name: station.name.clone(),
                    scene_position,
                    visible: station_visible(scene_position, &ctx.view, ctx.filter),
                }
            })
            .collect();

        let selected_look_angles = ctx.selected.and_then(|id| {
            objects
                .iter()
                .find(|r| r.id == id)
                .and_then(|r| r.outcome.as_ref().ok())
                .and_then(|s| s.look_angles)
        });

        TickOutput {
            time,
            gmst: ctx.gmst,
            sun_direction,
            objects,
            stations,
            selected: ctx.selected,
            selected_look_angles,
        }
    }
}

/// Run one object through the pipeline, recording the outcome on the object
pub fn step_object(
    object: &mut TrackedObject,
    ctx: &TickContext<'_>,
    propagator: &dyn Propagator,
) -> ObjectReport {
    let selected = ctx.selected == Some(object.id);
    let result = compute_sample(object, ctx, propagator, selected);

    let (outcome, ground_track_reset) = match result {
        Ok((sample, reset)) => {
            if object.consecutive_failures > 0 {
                log::info!(
                    "{} ({}) recovered after {} failed ticks",
                    object.elements.name,
                    object.elements.catalog_number,
                    object.consecutive_failures
                );
            }
            object.consecutive_failures = 0;
            object.flags = classify_flags(
                &object.elements.category,
                sample.scene_position,
                &ctx.view,
                ctx.filter,
            );
            object.visible = object.flags.visible(ctx.occlusion_enabled, ctx.night_mask_enabled);
            (Ok(sample), reset)
        }
        Err(failure) => {
            if object.consecutive_failures == 0 {
                log::warn!(
                    "{} ({}) failed: {}",
                    object.elements.name,
                    object.elements.catalog_number,
                    failure
                );
            } else {
                log::debug!(
                    "{} ({}) still failing: {}",
                    object.elements.name,
                    object.elements.catalog_number,
                    failure
                );
            }
            object.consecutive_failures = object.consecutive_failures.saturating_add(1);
            object.flags = VisibilityFlags::default();
            object.visible = false;
            (Err(failure), false)
        }
    };

    object.latest = Some(outcome.clone());
    ObjectReport {
        id: object.id,
        catalog_number: object.elements.catalog_number,
        outcome,
        visible: object.visible,
        ground_track_reset,
    }
}

fn compute_sample(
    object: &mut TrackedObject,
    ctx: &TickContext<'_>,
    propagator: &dyn Propagator,
    selected: bool,
) -> Result<(StateSample, bool), EngineFailure> {
    let state = propagator.propagate(&object.elements, &ctx.time)?;
    let geodetic = inertial_to_geodetic_with_gmst(&state.position, ctx.gmst)?;

    let scene_position = geodetic_to_cartesian(
        geodetic.latitude_deg,
        geodetic.longitude_deg,
        geodetic.altitude_km * ctx.scene_scale,
        ctx.body_radius_scene,
    );
    if !scene_position.is_finite() {
        return Err(EngineFailure::NonFiniteScene);
    }

    let look_angles = match (selected, ctx.observer.as_ref()) {
        (true, Some(observer)) => look_angles_from_inertial(observer, &state.position, ctx.gmst),
        _ => None,
    };

    let history = &mut object.history;
    if let Err(e) = history.append_path(state.position) {
        log::debug!("{} path point rejected: {}", object.elements.catalog_number, e);
        return Err(e.into());
    }

    let mut ground_track_reset = false;
    if ctx.ground_track_selected_only && !selected {
        history.clear_ground();
    } else {
        let ground_point = geodetic_to_cartesian(
            geodetic.latitude_deg,
            geodetic.longitude_deg,
            ctx.ground_track_lift,
            ctx.body_radius_scene,
        );
        match history.append_ground(ground_point, geodetic.longitude_deg) {
            Ok(reset) => ground_track_reset = reset,
            Err(e) => {
                log::debug!("{} ground point rejected: {}", object.elements.catalog_number, e);
                return Err(e.into());
            }
        }
    }

    let sample = StateSample {
        time: ctx.time,
        position: state.position,
        velocity: state.velocity,
        geodetic,
        speed_km_s: state.speed_km_s(),
        scene_position,
        look_angles,
    };
    Ok((sample, ground_track_reset))
}
