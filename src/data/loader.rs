//! Catalog loading from plain or gzipped JSON files

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;

use super::{Catalog, CatalogFile};

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// Read a catalog file without parsing the element sets
pub fn load_catalog_file(path: impl AsRef<Path>) -> Result<CatalogFile> {
    let path = path.as_ref();
    log::info!("Loading catalog from {:?}", path);

    let file = File::open(path).with_context(|| format!("Failed to open catalog file: {:?}", path))?;
    let reader = BufReader::new(file);

    let reader: Box<dyn Read> = if is_gzip(path) {
        Box::new(GzDecoder::new(reader))
    } else {
        Box::new(reader)
    };

    let file: CatalogFile = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse catalog JSON: {:?}", path))?;
    Ok(file)
}

/// Load and parse a catalog; bad entries are logged and skipped
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Catalog> {
    let file = load_catalog_file(path)?;
    let total = file.objects.len();
    let catalog = Catalog::from_file(file);

    log::info!(
        "Loaded {} of {} catalog objects ({} rejected), {} ground stations{}",
        catalog.len(),
        total,
        catalog.rejected.len(),
        catalog.ground_stations.len(),
        catalog
            .generated_at
            .as_deref()
            .map(|t| format!(" (generated at {})", t))
            .unwrap_or_default()
    );

    Ok(catalog)
}
