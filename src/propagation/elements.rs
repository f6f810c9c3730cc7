//! Two-line element set parsing and validation
//!
//! Element sets are parsed column-by-column from the fixed-width two-line
//! format. Both lines must carry a correct modulo-10 checksum, agree on the
//! catalog number, and describe a physically valid orbit before a
//! propagator-ready record is produced.

use std::f64::consts::PI;

use nalgebra::Vector3;
use satkit::{Duration, Instant};
use thiserror::Error;

use super::state::{EARTH_RADIUS_KM, MU_EARTH_KM3_S2, SECONDS_PER_DAY};

const LINE_LENGTH: usize = 69;

/// Reasons an element set is rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("line {line} has length {found}, expected {LINE_LENGTH}")]
    Length { line: u8, found: usize },

    #[error("line {line} must start with '{line}'")]
    LineNumber { line: u8 },

    #[error("line {line} contains non-ASCII characters")]
    NonAscii { line: u8 },

    #[error("line {line} checksum mismatch: expected {expected}, found {found}")]
    Checksum { line: u8, expected: u32, found: char },

    #[error("line {line} field `{field}` is malformed: {value:?}")]
    Field {
        line: u8,
        field: &'static str,
        value: String,
    },

    #[error("catalog numbers differ between lines ({line1} vs {line2})")]
    CatalogMismatch { line1: u32, line2: u32 },

    #[error("{field} = {value} is outside the valid range {range}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        range: &'static str,
    },

    #[error("propagation model rejected the element set: {0}")]
    Model(String),
}

/// Immutable, validated orbital element set
///
/// Angles are stored in degrees, mean motion in revolutions per day, exactly
/// as they appear in the element lines. The derived SGP4 record is built once
/// here so propagation never re-parses text.
#[derive(Clone)]
pub struct OrbitalElementSet {
    pub name: String,
    pub category: String,
    pub catalog_number: u32,
    pub classification: char,
    pub international_designator: String,
    pub epoch: Instant,
    /// First derivative of mean motion / 2 (rev/day²)
    pub mean_motion_dot: f64,
    /// Second derivative of mean motion / 6 (rev/day³)
    pub mean_motion_ddot: f64,
    pub bstar: f64,
    pub element_number: u32,
    pub inclination_deg: f64,
    pub raan_deg: f64,
    pub eccentricity: f64,
    pub arg_perigee_deg: f64,
    pub mean_anomaly_deg: f64,
    pub mean_motion_rev_day: f64,
    pub revolution_number: u32,
    line1: String,
    line2: String,
    tle: satkit::TLE,
}

impl OrbitalElementSet {
    /// Parse and validate a named element set
    pub fn parse(
        name: &str,
        category: &str,
        line1: &str,
        line2: &str,
    ) -> Result<Self, ParseError> {
        let line1 = line1.trim_end();
        let line2 = line2.trim_end();
        check_line(line1, 1)?;
        check_line(line2, 2)?;

        let catalog_number = parse_u32(line1, 1, 2..7, "catalog number")?;
        let catalog_number_2 = parse_u32(line2, 2, 2..7, "catalog number")?;
        if catalog_number != catalog_number_2 {
            return Err(ParseError::CatalogMismatch {
                line1: catalog_number,
                line2: catalog_number_2,
            });
        }

        let classification = line1[7..8].chars().next().unwrap_or('U');
        let international_designator = line1[9..17].trim().to_string();
        let epoch_year = parse_u32(line1, 1, 18..20, "epoch year")?;
        let epoch_day = parse_f64(line1, 1, 20..32, "epoch day")?;
        let mean_motion_dot = parse_f64(line1, 1, 33..43, "mean motion derivative")?;
        let mean_motion_ddot = parse_implied_decimal(line1, 1, 44..52, "mean motion second derivative")?;
        let bstar = parse_implied_decimal(line1, 1, 53..61, "bstar")?;
        let element_number = parse_u32(line1, 1, 64..68, "element number")?;

        let inclination_deg = parse_f64(line2, 2, 8..16, "inclination")?;
        let raan_deg = parse_f64(line2, 2, 17..25, "right ascension of node")?;
        let eccentricity = parse_eccentricity(line2)?;
        let arg_perigee_deg = parse_f64(line2, 2, 34..42, "argument of perigee")?;
        let mean_anomaly_deg = parse_f64(line2, 2, 43..51, "mean anomaly")?;
        let mean_motion_rev_day = parse_f64(line2, 2, 52..63, "mean motion")?;
        let revolution_number = parse_u32(line2, 2, 63..68, "revolution number")?;

        check_range("inclination", inclination_deg, 0.0..=180.0, "[0, 180] deg")?;
        if !(0.0..1.0).contains(&eccentricity) {
            return Err(ParseError::OutOfRange {
                field: "eccentricity",
                value: eccentricity,
                range: "[0, 1)",
            });
        }
        check_range("right ascension of node", raan_deg, 0.0..=360.0, "[0, 360] deg")?;
        check_range("argument of perigee", arg_perigee_deg, 0.0..=360.0, "[0, 360] deg")?;
        check_range("mean anomaly", mean_anomaly_deg, 0.0..=360.0, "[0, 360] deg")?;
        if !(mean_motion_rev_day > 0.0 && mean_motion_rev_day.is_finite()) {
            return Err(ParseError::OutOfRange {
                field: "mean motion",
                value: mean_motion_rev_day,
                range: "(0, inf) rev/day",
            });
        }
        check_range("epoch day", epoch_day, 1.0..=367.0, "[1, 367)")?;

        let epoch = epoch_instant(epoch_year, epoch_day).ok_or_else(|| ParseError::Field {
            line: 1,
            field: "epoch",
            value: line1[18..32].to_string(),
        })?;

        let tle = satkit::TLE::load_2line(line1, line2)
            .map_err(|e| ParseError::Model(e.to_string()))?;

        Ok(Self {
            name: name.trim().to_string(),
            category: category.to_string(),
            catalog_number,
            classification,
            international_designator,
            epoch,
            mean_motion_dot,
            mean_motion_ddot,
            bstar,
            element_number,
            inclination_deg,
            raan_deg,
            eccentricity,
            arg_perigee_deg,
            mean_anomaly_deg,
            mean_motion_rev_day,
            revolution_number,
            line1: line1.to_string(),
            line2: line2.to_string(),
            tle,
        })
    }

    /// The original element lines
    pub fn lines(&self) -> (&str, &str) {
        (&self.line1, &self.line2)
    }

    /// SGP4 record derived at parse time
    pub(crate) fn tle(&self) -> &satkit::TLE {
        &self.tle
    }

    /// Mean motion in radians per second
    pub fn mean_motion_rad_s(&self) -> f64 {
        self.mean_motion_rev_day * 2.0 * PI / SECONDS_PER_DAY
    }

    /// Semi-major axis from Kepler's third law (km)
    pub fn semi_major_axis_km(&self) -> f64 {
        let n = self.mean_motion_rad_s();
        (MU_EARTH_KM3_S2 / (n * n)).cbrt()
    }

    /// Orbital period in seconds
    pub fn period_seconds(&self) -> f64 {
        SECONDS_PER_DAY / self.mean_motion_rev_day
    }

    /// Perigee and apogee altitude above the mean-radius sphere (km)
    pub fn perigee_apogee_km(&self) -> (f64, f64) {
        let a = self.semi_major_axis_km();
        (
            a * (1.0 - self.eccentricity) - EARTH_RADIUS_KM,
            a * (1.0 + self.eccentricity) - EARTH_RADIUS_KM,
        )
    }

    /// Unit normal of the orbital plane in the inertial frame
    ///
    /// Obtained by rotating +Z by the inclination about the node line.
    pub fn orbit_normal(&self) -> Vector3<f64> {
        let i = self.inclination_deg.to_radians();
        let raan = self.raan_deg.to_radians();
        Vector3::new(i.sin() * raan.sin(), -i.sin() * raan.cos(), i.cos())
    }

    /// Age of the element set at `at`, in days (negative before epoch)
    pub fn age_days(&self, at: &Instant) -> f64 {
        (*at - self.epoch).as_seconds() / SECONDS_PER_DAY
    }
}

impl std::fmt::Debug for OrbitalElementSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrbitalElementSet")
            .field("name", &self.name)
            .field("catalog_number", &self.catalog_number)
            .field("epoch", &self.epoch)
            .field("inclination_deg", &self.inclination_deg)
            .field("raan_deg", &self.raan_deg)
            .field("eccentricity", &self.eccentricity)
            .field("mean_motion_rev_day", &self.mean_motion_rev_day)
            .finish_non_exhaustive()
    }
}

/// Modulo-10 checksum over the first 68 columns: digits count their value,
/// minus signs count one.
pub fn checksum(line: &str) -> u32 {
    line.chars()
        .take(LINE_LENGTH - 1)
        .map(|c| match c {
            '0'..='9' => c as u32 - '0' as u32,
            '-' => 1,
            _ => 0,
        })
        .sum::<u32>()
        % 10
}

fn check_line(line: &str, number: u8) -> Result<(), ParseError> {
    if !line.is_ascii() {
        return Err(ParseError::NonAscii { line: number });
    }
    if line.len() != LINE_LENGTH {
        return Err(ParseError::Length {
            line: number,
            found: line.len(),
        });
    }
    if !line.starts_with(char::from(b'0' + number)) {
        return Err(ParseError::LineNumber { line: number });
    }

    let found = line[68..].chars().next().unwrap_or(' ');
    let expected = checksum(line);
    if found.to_digit(10) != Some(expected) {
        return Err(ParseError::Checksum {
            line: number,
            expected,
            found,
        });
    }
    Ok(())
}

fn field_error(line: &str, number: u8, range: std::ops::Range<usize>, field: &'static str) -> ParseError {
    ParseError::Field {
        line: number,
        field,
        value: line[range].to_string(),
    }
}

fn parse_u32(
    line: &str,
    number: u8,
    range: std::ops::Range<usize>,
    field: &'static str,
) -> Result<u32, ParseError> {
    let text = line[range.clone()].trim();
    if text.is_empty() {
        return Ok(0);
    }
    text.parse::<u32>()
        .map_err(|_| field_error(line, number, range, field))
}

fn parse_f64(
    line: &str,
    number: u8,
    range: std::ops::Range<usize>,
    field: &'static str,
) -> Result<f64, ParseError> {
    let text = line[range.clone()].trim();
    let value = text
        .parse::<f64>()
        .map_err(|_| field_error(line, number, range.clone(), field))?;
    if !value.is_finite() {
        return Err(field_error(line, number, range, field));
    }
    Ok(value)
}

/// Fields like ` 12345-3` mean `0.12345e-3`
fn parse_implied_decimal(
    line: &str,
    number: u8,
    range: std::ops::Range<usize>,
    field: &'static str,
) -> Result<f64, ParseError> {
    let text = line[range.clone()].trim();
    if text.is_empty() {
        return Ok(0.0);
    }

    let (sign, body) = match text.as_bytes()[0] {
        b'-' => (-1.0, &text[1..]),
        b'+' => (1.0, &text[1..]),
        _ => (1.0, text),
    };
    if body.len() < 2 {
        return Err(field_error(line, number, range, field));
    }

    let (mantissa, exponent) = body.split_at(body.len() - 2);
    let mantissa: f64 = format!("0.{}", mantissa.trim())
        .parse()
        .map_err(|_| field_error(line, number, range.clone(), field))?;
    let exponent: i32 = exponent
        .trim()
        .parse()
        .map_err(|_| field_error(line, number, range, field))?;

    Ok(sign * mantissa * 10f64.powi(exponent))
}

fn parse_eccentricity(line: &str) -> Result<f64, ParseError> {
    let text = &line[26..33];
    if !text.chars().all(|c| c.is_ascii_digit()) {
        return Err(field_error(line, 2, 26..33, "eccentricity"));
    }
    format!("0.{}", text)
        .parse()
        .map_err(|_| field_error(line, 2, 26..33, "eccentricity"))
}

fn check_range(
    field: &'static str,
    value: f64,
    valid: std::ops::RangeInclusive<f64>,
    range: &'static str,
) -> Result<(), ParseError> {
    if valid.contains(&value) {
        Ok(())
    } else {
        Err(ParseError::OutOfRange {
            field,
            value,
            range,
        })
    }
}

/// Two-digit years below 57 belong to the 2000s
fn epoch_instant(two_digit_year: u32, day_of_year: f64) -> Option<Instant> {
    let year = if two_digit_year < 57 {
        2000 + two_digit_year
    } else {
        1900 + two_digit_year
    };
    let start = Instant::from_datetime(year as i32, 1, 1, 0, 0, 0.0).ok()?;
    Some(start + Duration::from_seconds((day_of_year - 1.0) * SECONDS_PER_DAY))
}
