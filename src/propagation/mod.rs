//! Orbital propagation module
//!
//! Element sets are parsed once into an immutable [`OrbitalElementSet`] and
//! turned into inertial states by anything implementing [`Propagator`].
//!
//! ## SGP4 Propagation
//!
//! [`Sgp4Propagator`] uses SGP4/SDP4 via satkit and is the backend for real
//! catalogs.
//!
//! ## Two-Body Propagation
//!
//! [`KeplerPropagator`] is an analytic two-body model (optionally with secular
//! J2 drift). It is deterministic and cheap, which makes it the natural stand-in
//! when testing code that sits on top of propagation.
//!
//! # Example
//!
//! ```ignore
//! use skywatch::propagation::*;
//!
//! let elements = OrbitalElementSet::parse("ISS (ZARYA)", "ISS", line1, line2)?;
//! let state = Sgp4Propagator::new().propagate(&elements, &elements.epoch)?;
//! println!("altitude {:.1} km", state.altitude_km());
//! ```

mod elements;
mod kepler;
mod orbit_track;
mod propagator;
mod state;

pub use elements::*;
pub use kepler::*;
pub use orbit_track::*;
pub use propagator::*;
pub use state::*;
