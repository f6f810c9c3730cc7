//! Test utilities shared by the unit tests.
//!
//! Provides element-set fixtures with valid checksums and small helpers for
//! building lines by hand.

/// Fixtures for element sets. All share the epoch 2025-07-13 12:00 UTC.
pub mod fixtures {
    use crate::propagation::{checksum, OrbitalElementSet};

    /// Circular, 0.5° inclined, two revolutions per day
    pub const EQUATORIAL_MEO: (&str, &str) = (
        "1 90001U 25001A   25194.50000000  .00000000  00000-0  00000-0 0  9994",
        "2 90001   0.5000   0.0000 0000001   0.0000   0.0000  2.00000000    00",
    );

    /// ISS-like low orbit at 51.6°
    pub const LEO_INCLINED: (&str, &str) = (
        "1 90002U 25002A   25194.50000000  .00000000  00000-0  00000-0 0  9996",
        "2 90002  51.6416 119.2942 0005700 248.0673 111.9327 15.49887750    04",
    );

    /// Circular low orbit, nearly equatorial
    pub const LEO_EQUATORIAL: (&str, &str) = (
        "1 90003U 25003A   25194.50000000  .00000000  00000-0  00000-0 0  9998",
        "2 90003   0.1000   0.0000 0000001   0.0000   0.0000 15.20000000    04",
    );

    /// Very low orbit with an absurd drag term; SGP4 diverges within days
    pub const HIGH_DRAG: (&str, &str) = (
        "1 90004U 25004A   25194.50000000  .00000000  00000-0  99999-0 0  9995",
        "2 90004  51.6416 119.2942 0005700 248.0673 111.9327 16.40000000    03",
    );

    pub fn equatorial_meo() -> OrbitalElementSet {
        OrbitalElementSet::parse("EQ-MEO", "GPS", EQUATORIAL_MEO.0, EQUATORIAL_MEO.1)
            .expect("fixture parses")
    }

    pub fn leo_inclined() -> OrbitalElementSet {
        OrbitalElementSet::parse("LEO-51", "ISS", LEO_INCLINED.0, LEO_INCLINED.1)
            .expect("fixture parses")
    }

    pub fn leo_equatorial() -> OrbitalElementSet {
        OrbitalElementSet::parse("LEO-EQ", "Starlink", LEO_EQUATORIAL.0, LEO_EQUATORIAL.1)
            .expect("fixture parses")
    }

    pub fn high_drag() -> OrbitalElementSet {
        OrbitalElementSet::parse("DRAGGY", "Unknown", HIGH_DRAG.0, HIGH_DRAG.1)
            .expect("fixture parses")
    }

    /// Append the checksum digit to a 68-column line
    pub fn with_checksum(line: &str) -> String {
        assert_eq!(line.len(), 68, "line must have 68 columns before checksum");
        format!("{}{}", line, checksum(line))
    }
}
