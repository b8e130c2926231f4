//! The overlay service over both tabular sources.

use std::path::{Path, PathBuf};
use std::time::Instant;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use seatrait_core::{defaults, AphiaId, LookupPaths};

use crate::enriched::{self, SpeciesTraits};
use crate::phytoplankton::{self, BvolColumns, PhytoplanktonTraits};
use crate::sheet::Sheet;

/// Outcome of loading one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    NotLoaded,
    Loaded,
    /// File absent; the source stays empty for the life of the overlay.
    Missing,
    /// File present but unreadable or without a key column; also treated
    /// as empty.
    Failed,
}

/// The two overlay sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlaySource {
    Phytoplankton,
    EnrichedSpecies,
}

struct LoadedSource {
    sheet: Sheet,
    status: LoadStatus,
}

impl LoadedSource {
    fn load(path: &Path, key_columns: &[&str], label: &str) -> Self {
        if !path.exists() {
            warn!(
                subsystem = "lookup",
                component = "overlay",
                op = "load",
                source = label,
                path = %path.display(),
                "Trait source file not found, treating as empty"
            );
            return Self {
                sheet: Sheet::empty(),
                status: LoadStatus::Missing,
            };
        }

        let start = Instant::now();
        match Sheet::from_path(path, key_columns) {
            Ok(sheet) => {
                info!(
                    subsystem = "lookup",
                    component = "overlay",
                    op = "load",
                    source = label,
                    result_count = sheet.len(),
                    unique_aphia_ids = sheet.unique_keys(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Trait source loaded"
                );
                Self {
                    sheet,
                    status: LoadStatus::Loaded,
                }
            }
            Err(e) => {
                error!(
                    subsystem = "lookup",
                    component = "overlay",
                    op = "load",
                    source = label,
                    path = %path.display(),
                    error = %e,
                    "Failed to read trait source, treating as empty"
                );
                Self {
                    sheet: Sheet::empty(),
                    status: LoadStatus::Failed,
                }
            }
        }
    }
}

struct MorphologicalSource {
    loaded: LoadedSource,
    columns: BvolColumns,
}

/// Both sources merged for one species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllTraits {
    pub aphia_id: AphiaId,
    pub phytoplankton_traits: Option<PhytoplanktonTraits>,
    pub species_traits: Option<SpeciesTraits>,
    /// Labels of the sources that contributed, morphological first.
    pub data_sources: Vec<String>,
}

/// A species name match, tagged with the source it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub aphia_id: AphiaId,
    pub species: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    pub source: String,
}

/// Row and key counts of one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStatistics {
    pub total_records: usize,
    pub unique_aphia_ids: usize,
    pub file_loaded: bool,
    pub status: LoadStatus,
    pub file_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayStatistics {
    pub phytoplankton: SourceStatistics,
    pub enriched_species: SourceStatistics,
}

/// Read-only trait overlay backed by two spreadsheet exports.
///
/// Nothing is read at construction. Each source is loaded on its first use
/// and kept for the life of the value; a missing file is not retried.
pub struct TraitLookup {
    paths: LookupPaths,
    bvol: OnceCell<MorphologicalSource>,
    enriched: OnceCell<LoadedSource>,
}

impl TraitLookup {
    pub fn new(paths: LookupPaths) -> Self {
        Self {
            paths,
            bvol: OnceCell::new(),
            enriched: OnceCell::new(),
        }
    }

    pub fn paths(&self) -> &LookupPaths {
        &self.paths
    }

    fn bvol(&self) -> &MorphologicalSource {
        self.bvol.get_or_init(|| {
            let loaded = LoadedSource::load(
                &self.paths.bvol_path,
                phytoplankton::KEY_COLUMNS,
                defaults::BVOL_SOURCE,
            );
            let columns = BvolColumns::resolve(&loaded.sheet);
            MorphologicalSource { loaded, columns }
        })
    }

    fn enriched(&self) -> &LoadedSource {
        self.enriched.get_or_init(|| {
            LoadedSource::load(
                &self.paths.species_enriched_path,
                enriched::KEY_COLUMNS,
                defaults::SPECIES_ENRICHED_SOURCE,
            )
        })
    }

    /// Load status of a source without forcing it to load.
    pub fn load_status(&self, source: OverlaySource) -> LoadStatus {
        let status = match source {
            OverlaySource::Phytoplankton => self.bvol.get().map(|s| s.loaded.status),
            OverlaySource::EnrichedSpecies => self.enriched.get().map(|s| s.status),
        };
        status.unwrap_or(LoadStatus::NotLoaded)
    }

    /// Morphological traits of a species: a flat record for one size class,
    /// a size-class list for several, `None` when the species is absent.
    pub fn phytoplankton_traits(&self, aphia_id: AphiaId) -> Option<PhytoplanktonTraits> {
        let source = self.bvol();
        let records = source
            .loaded
            .sheet
            .rows_for(aphia_id)
            .iter()
            .map(|row| source.columns.extract(aphia_id, row))
            .collect();
        PhytoplanktonTraits::from_records(aphia_id, records)
    }

    /// Ecological traits of a species from its first enriched row.
    pub fn species_traits(&self, aphia_id: AphiaId) -> Option<SpeciesTraits> {
        let source = self.enriched();
        let rows = source.sheet.rows_for(aphia_id);
        let row = rows.first()?;
        Some(SpeciesTraits::extract(&source.sheet, aphia_id, row))
    }

    /// Both sources for one species.
    pub fn all_traits(&self, aphia_id: AphiaId) -> AllTraits {
        let phytoplankton_traits = self.phytoplankton_traits(aphia_id);
        let species_traits = self.species_traits(aphia_id);

        let mut data_sources = Vec::new();
        if phytoplankton_traits.is_some() {
            data_sources.push(defaults::BVOL_SOURCE.to_string());
        }
        if species_traits.is_some() {
            data_sources.push(defaults::SPECIES_ENRICHED_SOURCE.to_string());
        }
        if data_sources.is_empty() {
            info!(
                subsystem = "lookup",
                component = "overlay",
                op = "all_traits",
                aphia_id,
                "No trait data found"
            );
        }

        AllTraits {
            aphia_id,
            phytoplankton_traits,
            species_traits,
            data_sources,
        }
    }

    /// Case-insensitive substring search over species names in both sources.
    ///
    /// Morphological hits come first, each source in file order. Rows
    /// without a key are skipped.
    pub fn search_by_species_name(&self, name: &str) -> Vec<SearchHit> {
        let needle = name.to_lowercase();
        let mut hits = Vec::new();

        let bvol = &self.bvol().loaded.sheet;
        if let Some(species) = bvol.column("Species") {
            let genus = bvol.column("Genus");
            for row in bvol.rows() {
                let (Some(aphia_id), Some(value)) = (row.key(), row.cell(Some(species))) else {
                    continue;
                };
                if value.to_lowercase().contains(&needle) {
                    hits.push(SearchHit {
                        aphia_id,
                        species: value.to_string(),
                        genus: row.owned(genus),
                        common_name: None,
                        source: defaults::BVOL_SOURCE.to_string(),
                    });
                }
            }
        }

        let enriched = &self.enriched().sheet;
        if let Some(taxonomy) = enriched.column("taxonomyName") {
            let common = enriched.column("synonymCommonName");
            for row in enriched.rows() {
                let (Some(aphia_id), Some(value)) = (row.key(), row.cell(Some(taxonomy))) else {
                    continue;
                };
                if value.to_lowercase().contains(&needle) {
                    hits.push(SearchHit {
                        aphia_id,
                        species: value.to_string(),
                        genus: None,
                        common_name: row.owned(common),
                        source: defaults::SPECIES_ENRICHED_SOURCE.to_string(),
                    });
                }
            }
        }

        debug!(
            subsystem = "lookup",
            component = "overlay",
            op = "search",
            result_count = hits.len(),
            "Species name search complete"
        );
        hits
    }

    /// Counts and load status of both sources. Loads any source not yet read.
    pub fn statistics(&self) -> OverlayStatistics {
        let stats = |source: &LoadedSource, path: &Path| SourceStatistics {
            total_records: source.sheet.len(),
            unique_aphia_ids: source.sheet.unique_keys(),
            file_loaded: source.status == LoadStatus::Loaded,
            status: source.status,
            file_path: path.to_path_buf(),
        };
        OverlayStatistics {
            phytoplankton: stats(&self.bvol().loaded, self.paths.bvol_path.as_path()),
            enriched_species: stats(
                self.enriched(),
                self.paths.species_enriched_path.as_path(),
            ),
        }
    }
}

impl Default for TraitLookup {
    fn default() -> Self {
        Self::new(LookupPaths::default())
    }
}
