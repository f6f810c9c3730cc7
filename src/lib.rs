//! Skywatch - orbital tracking engine
//!
//! Turns element sets into time-stepped positions, ground tracks and
//! observer look angles, and decides which objects a viewer should see.
//! Rendering and input belong to the host; the engine is driven one
//! [`engine::TrackingEngine::tick`] per frame.

pub mod analysis;
pub mod clock;
pub mod config;
pub mod data;
pub mod engine;
pub mod frames;
pub mod look_angles;
pub mod propagation;
pub mod track;
pub mod visibility;

#[cfg(test)]
mod test_utils;

pub use clock::{ClockState, SimulationClock};
pub use config::EngineConfig;
pub use engine::{
    CatalogHandle, EngineFailure, ObjectId, StateSample, TickInputs, TickOutput, TrackedObject,
    TrackingEngine,
};
pub use look_angles::{LookAngles, ObserverLocation};
pub use propagation::{KeplerPropagator, OrbitalElementSet, Propagator, Sgp4Propagator};
pub use visibility::{CategoryFilter, ViewGeometry};
