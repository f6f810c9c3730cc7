//! Catalog file schema and parsed catalog

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::propagation::{OrbitalElementSet, ParseError};
use crate::visibility::GroundStation;

/// Root structure of a catalog JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub generated_at: Option<String>,
    pub objects: Vec<CatalogEntry>,
    #[serde(default)]
    pub ground_stations: Vec<GroundStation>,
}

/// One element set as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub category: String,
    pub line1: String,
    pub line2: String,
    /// Operator, launch date and the like; never interpreted
    #[serde(default)]
    pub details: serde_json::Value,
}

impl CatalogEntry {
    pub fn parse(&self) -> Result<OrbitalElementSet, ParseError> {
        OrbitalElementSet::parse(&self.name, &self.category, &self.line1, &self.line2)
    }
}

/// A parsed, propagator-ready catalog object
#[derive(Debug, Clone)]
pub struct CatalogObject {
    pub elements: OrbitalElementSet,
    pub details: serde_json::Value,
}

/// Catalog after parsing; entries that failed are kept aside with their error
#[derive(Debug, Default)]
pub struct Catalog {
    pub generated_at: Option<String>,
    pub objects: Vec<CatalogObject>,
    pub ground_stations: Vec<GroundStation>,
    pub rejected: Vec<(String, ParseError)>,
}

impl Catalog {
    /// Parse every entry, keeping the ones that validate
    pub fn from_file(file: CatalogFile) -> Self {
        let mut catalog = Catalog {
            generated_at: file.generated_at,
            ground_stations: Vec::with_capacity(file.ground_stations.len()),
            ..Default::default()
        };

        for entry in file.objects {
            match entry.parse() {
                Ok(elements) => catalog.objects.push(CatalogObject {
                    elements,
                    details: entry.details,
                }),
                Err(e) => {
                    log::warn!("Skipping catalog entry {:?}: {}", entry.name, e);
                    catalog.rejected.push((entry.name, e));
                }
            }
        }

        for station in file.ground_stations {
            let valid = station.latitude.is_finite()
                && station.longitude.is_finite()
                && (-90.0..=90.0).contains(&station.latitude)
                && (-180.0..=180.0).contains(&station.longitude);
            if valid {
                catalog.ground_stations.push(station);
            } else {
                log::warn!(
                    "Skipping ground station {:?} at ({}, {})",
                    station.name,
                    station.latitude,
                    station.longitude
                );
            }
        }

        catalog
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Object counts per category tag
    pub fn category_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for object in &self.objects {
            *counts.entry(object.elements.category.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures;

    fn entry(name: &str, lines: (&str, &str)) -> CatalogEntry {
        CatalogEntry {
            name: name.to_string(),
            category: "GPS".to_string(),
            line1: lines.0.to_string(),
            line2: lines.1.to_string(),
            details: serde_json::json!({ "operator": "USSF" }),
        }
    }

    #[test]
    fn test_invalid_entries_are_skipped() {
        let mut broken = entry("BROKEN", fixtures::EQUATORIAL_MEO);
        broken.line1.replace_range(68..69, "0");

        let file = CatalogFile {
            generated_at: None,
            objects: vec![entry("GOOD", fixtures::EQUATORIAL_MEO), broken],
            ground_stations: vec![
                GroundStation {
                    name: "Kourou".to_string(),
                    latitude: 5.2,
                    longitude: -52.8,
                },
                GroundStation {
                    name: "Nowhere".to_string(),
                    latitude: 95.0,
                    longitude: 0.0,
                },
            ],
        };

        let catalog = Catalog::from_file(file);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.rejected.len(), 1);
        assert_eq!(catalog.rejected[0].0, "BROKEN");
        assert_eq!(catalog.objects[0].details["operator"], "USSF");
        assert_eq!(catalog.ground_stations.len(), 1);
        assert_eq!(catalog.category_counts().get("GPS"), Some(&1));
    }

    #[test]
    fn test_details_default_to_null() {
        let json = format!(
            r#"{{ "objects": [{{ "name": "X", "category": "GPS", "line1": "{}", "line2": "{}" }}] }}"#,
            fixtures::EQUATORIAL_MEO.0,
            fixtures::EQUATORIAL_MEO.1
        );
        let file: CatalogFile = serde_json::from_str(&json).unwrap();
        assert!(file.objects[0].details.is_null());
        assert!(file.ground_stations.is_empty());
    }
}
