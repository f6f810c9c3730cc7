//! Headless batch runs over a catalog

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::clock::{format_rate, format_time, instant_from_utc};
use crate::config::EngineConfig;
use crate::data::{load_catalog, SearchIndex};
use crate::engine::{ObjectId, TickInputs, TrackingEngine};
use crate::look_angles::{look_angles_from_inertial, ObserverLocation};
use crate::propagation::{KeplerPropagator, Propagator, Sgp4Propagator};
use crate::visibility::CategoryFilter;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagatorChoice {
    Sgp4,
    Kepler,
    KeplerJ2,
}

impl PropagatorChoice {
    fn build(self) -> Box<dyn Propagator> {
        match self {
            Self::Sgp4 => Box::new(Sgp4Propagator::new()),
            Self::Kepler => Box::new(KeplerPropagator::new()),
            Self::KeplerJ2 => Box::new(KeplerPropagator::with_j2()),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Catalog JSON file (optionally .gz)
    #[arg(long, default_value = "data/catalog.json")]
    pub catalog: PathBuf,
    /// Engine config JSON file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Observer latitude in degrees
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,
    /// Observer longitude in degrees
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,
    /// Select an object by name or catalog number
    #[arg(long)]
    pub select: Option<String>,
    /// Start time (RFC 3339); defaults to now
    #[arg(long)]
    pub start: Option<DateTime<Utc>>,
    /// Number of ticks to run
    #[arg(long, default_value_t = 24)]
    pub ticks: u32,
    /// Wall-clock milliseconds per tick
    #[arg(long, default_value_t = 1000.0)]
    pub tick_ms: f64,
    /// Rate multiplier (simulated seconds per wall second)
    #[arg(long, default_value_t = 3600)]
    pub rate: u32,
    #[arg(long, value_enum, default_value_t = PropagatorChoice::Sgp4)]
    pub propagator: PropagatorChoice,
    /// Hide objects behind the Earth as seen from the camera
    #[arg(long)]
    pub occlusion: bool,
    /// Hide objects on the night side
    #[arg(long)]
    pub night_mask: bool,
    /// Output JSON report path
    #[arg(long, default_value = "out/simulation_report.json")]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Catalog JSON file (optionally .gz)
    #[arg(long, default_value = "data/catalog.json")]
    pub catalog: PathBuf,
    /// Name or catalog number to search for
    #[arg(long)]
    pub query: Option<String>,
    /// Maximum number of results
    #[arg(long, default_value_t = 25)]
    pub limit: usize,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PassKind {
    Rise,
    Set,
}

/// Elevation sign change between consecutive ticks
#[derive(Debug, Serialize, Clone)]
pub struct PassEvent {
    pub catalog_number: u32,
    pub name: String,
    pub kind: PassKind,
    pub tick: u32,
    pub time_utc: String,
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
}

#[derive(Debug, Serialize)]
struct TickSummary {
    tick: u32,
    time_utc: String,
    visible: usize,
    failures: usize,
    visible_stations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected_elevation_deg: Option<f64>,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    generated_at: String,
    propagator: String,
    start_time_utc: String,
    end_time_utc: String,
    ticks: u32,
    tick_ms: f64,
    rate: u32,
    total_objects: usize,
    rejected_objects: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    observer: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected: Option<String>,
    summaries: Vec<TickSummary>,
    events: Vec<PassEvent>,
}

/// Tracks elevation sign per object and emits rise/set events
#[derive(Debug, Default)]
pub struct PassDetector {
    above: HashMap<ObjectId, bool>,
    events: Vec<PassEvent>,
}

impl PassDetector {
    pub fn observe(
        &mut self,
        id: ObjectId,
        catalog_number: u32,
        name: &str,
        tick: u32,
        time_utc: &str,
        elevation_deg: f64,
        azimuth_deg: f64,
    ) {
        let above = elevation_deg > 0.0;
        if let Some(&was_above) = self.above.get(&id) {
            if was_above != above {
                self.events.push(PassEvent {
                    catalog_number,
                    name: name.to_string(),
                    kind: if above { PassKind::Rise } else { PassKind::Set },
                    tick,
                    time_utc: time_utc.to_string(),
                    elevation_deg,
                    azimuth_deg,
                });
            }
        }
        self.above.insert(id, above);
    }

    pub fn events(&self) -> &[PassEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<PassEvent> {
        self.events
    }
}

pub fn run_simulation(args: SimulateArgs) -> Result<()> {
    if !(args.tick_ms.is_finite() && args.tick_ms >= 0.0) {
        return Err(anyhow!("tick-ms must be a non-negative number"));
    }

    let config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };

    let observer = match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => {
            Some(ObserverLocation::new(lat, lon).context("Invalid observer location")?)
        }
        _ => None,
    };

    let catalog = load_catalog(&args.catalog)?;
    if catalog.is_empty() {
        return Err(anyhow!("catalog {:?} has no valid objects", args.catalog));
    }

    let start_utc = args.start.unwrap_or_else(Utc::now);
    let start = instant_from_utc(&start_utc)
        .ok_or_else(|| anyhow!("start time {} is not representable", start_utc))?;

    let mut search = SearchIndex::build(&catalog);
    let selected_index = match &args.select {
        Some(query) => Some(
            search
                .search(query, 1)
                .first()
                .copied()
                .ok_or_else(|| anyhow!("no catalog object matches {:?}", query))?,
        ),
        None => None,
    };

    let mut engine = TrackingEngine::new(args.propagator.build(), config, start);
    let mut selected = None;
    for (index, object) in catalog.objects.iter().enumerate() {
        let id = engine.add_object(object.elements.clone(), object.details.clone());
        if selected_index == Some(index) {
            selected = Some(id);
        }
    }
    engine.set_ground_stations(catalog.ground_stations.clone());

    let selected_name = selected
        .and_then(|id| engine.get(id))
        .map(|o| o.name().to_string());
    if let Some(name) = &selected_name {
        log::info!("Selected {}", name);
    }

    log::info!(
        "Simulating {} objects for {} ticks of {} ms at {} from {}",
        engine.len(),
        args.ticks,
        args.tick_ms,
        format_rate(args.rate),
        format_time(&start)
    );

    let filter = CategoryFilter::default();
    let progress = ProgressBar::new(args.ticks as u64);
    progress.set_style(
        ProgressStyle::with_template("{elapsed_precise} {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );

    let mut passes = PassDetector::default();
    let mut summaries = Vec::with_capacity(args.ticks as usize);

    for tick in 1..=args.ticks {
        let inputs = TickInputs::new(args.tick_ms, args.rate, &filter)
            .with_observer(observer)
            .with_selected(selected)
            .with_masks(args.occlusion, args.night_mask);
        let output = engine.tick(&inputs);
        let time_utc = format_time(&output.time);

        if let Some(observer) = &observer {
            for report in &output.objects {
                let Ok(sample) = &report.outcome else {
                    continue;
                };
                let Some(angles) = look_angles_from_inertial(observer, &sample.position, output.gmst)
                else {
                    continue;
                };
                let name = engine.get(report.id).map(|o| o.name()).unwrap_or_default();
                passes.observe(
                    report.id,
                    report.catalog_number,
                    name,
                    tick,
                    &time_utc,
                    angles.elevation_deg,
                    angles.azimuth_deg,
                );
            }
        }

        let summary = TickSummary {
            tick,
            time_utc,
            visible: output.visible_count(),
            failures: output.failure_count(),
            visible_stations: output.stations.iter().filter(|s| s.visible).count(),
            selected_elevation_deg: output.selected_look_angles.map(|a| a.elevation_deg),
        };
        log::info!(
            "Tick {} at {}: {} visible, {} failed",
            summary.tick,
            summary.time_utc,
            summary.visible,
            summary.failures
        );
        progress.set_message(summary.time_utc.clone());
        progress.inc(1);
        summaries.push(summary);
    }

    progress.finish_and_clear();

    let events = passes.into_events();
    log::info!("Detected {} rise/set events", events.len());

    let report = SimulationReport {
        generated_at: Utc::now().to_rfc3339(),
        propagator: engine.propagator().name().to_string(),
        start_time_utc: format_time(&start),
        end_time_utc: engine.clock().format_time(),
        ticks: args.ticks,
        tick_ms: args.tick_ms,
        rate: engine.clock().rate(),
        total_objects: engine.len(),
        rejected_objects: catalog.rejected.len(),
        observer: observer.map(|o| [o.latitude_deg(), o.longitude_deg()]),
        selected: selected_name,
        summaries,
        events,
    };

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(&args.output)
        .with_context(|| format!("Failed to create report file: {:?}", args.output))?;
    serde_json::to_writer_pretty(file, &report)?;

    log::info!("Wrote simulation report to {:?}", args.output);
    Ok(())
}

pub fn run_inspect(args: InspectArgs) -> Result<()> {
    let catalog = load_catalog(&args.catalog)?;
    let mut search = SearchIndex::build(&catalog);
    let results = search.search(args.query.as_deref().unwrap_or(""), args.limit);

    if results.is_empty() {
        println!("No matches");
        return Ok(());
    }

    println!(
        "{:<28} {:>7} {:<17} {:>9} {:>9} {:>9} {:>7}",
        "NAME", "NUMBER", "CATEGORY", "PERIOD", "PERIGEE", "APOGEE", "INCL"
    );
    for index in results {
        let elements = &catalog.objects[index].elements;
        let (perigee, apogee) = elements.perigee_apogee_km();
        println!(
            "{:<28} {:>7} {:<17} {:>7.1}m {:>7.0}km {:>7.0}km {:>6.2}°",
            elements.name,
            elements.catalog_number,
            elements.category,
            elements.period_seconds() / 60.0,
            perigee,
            apogee,
            elements.inclination_deg
        );
    }

    for (category, count) in catalog.category_counts() {
        log::info!("{}: {} objects", category, count);
    }
    Ok(())
}
