//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use satkit::Instant;
use skywatch::frames::{earth_fixed_to_geodetic, gmst, inertial_to_earth_fixed, normalize_longitude};
use skywatch::{ObserverLocation, OrbitalElementSet, Propagator};

/// Circular, 0.5° inclined, two revolutions per day; epoch 2025-07-13 12:00 UTC
pub const EQUATORIAL_MEO: (&str, &str) = (
    "1 90001U 25001A   25194.50000000  .00000000  00000-0  00000-0 0  9994",
    "2 90001   0.5000   0.0000 0000001   0.0000   0.0000  2.00000000    00",
);

/// ISS-like low orbit at 51.6°
pub const LEO_INCLINED: (&str, &str) = (
    "1 90002U 25002A   25194.50000000  .00000000  00000-0  00000-0 0  9996",
    "2 90002  51.6416 119.2942 0005700 248.0673 111.9327 15.49887750    04",
);

pub fn parse(name: &str, category: &str, lines: (&str, &str)) -> OrbitalElementSet {
    OrbitalElementSet::parse(name, category, lines.0, lines.1).expect("fixture parses")
}

pub fn equatorial_meo() -> OrbitalElementSet {
    parse("EQ-MEO", "GPS", EQUATORIAL_MEO)
}

pub fn leo_inclined() -> OrbitalElementSet {
    parse("LEO-51", "ISS", LEO_INCLINED)
}

/// Observer on the far side of the Earth from the object's sub-point at `at`
pub fn antipodal_observer<P: Propagator + ?Sized>(
    propagator: &P,
    elements: &OrbitalElementSet,
    at: &Instant,
) -> ObserverLocation {
    let state = propagator.propagate(elements, at).expect("fixture propagates");
    let ecef = inertial_to_earth_fixed(&state.position, gmst(at));
    let below = earth_fixed_to_geodetic(&ecef).expect("finite sub-point");
    ObserverLocation::new(
        -below.latitude_deg,
        normalize_longitude(below.longitude_deg + 180.0),
    )
    .expect("valid observer")
}

pub fn catalog_path() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("data/catalog.json")
}
