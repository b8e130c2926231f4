//! Morphological source: phytoplankton biovolume rows.
//!
//! A species may carry several rows, one per size class. Measurement
//! headers end in a micrometre unit whose code point varies between
//! exports, so those columns are matched after reducing headers to ASCII.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use seatrait_core::{defaults, AphiaId};

use crate::sheet::{normalize_header, Sheet, SheetRow};

/// Candidate names of the key column.
pub const KEY_COLUMNS: &[&str] = &["AphiaID", "aphiaID", "AphiaId"];

/// Measurement columns: output key and the header stem preceding the unit.
const MEASUREMENTS: &[(&str, &str)] = &[
    ("Length_l1um", "Length(l1)"),
    ("Length_l2um", "Length(l2)"),
    ("Width_wum", "Width(w)"),
    ("Height_hum", "Height(h)"),
    ("Diameter_d1um", "Diameter(d1)"),
    ("Diameter_d2um", "Diameter(d2)"),
    ("Filament_length_of_cell_um", "Filament_length_of_cell("),
];

/// Plain columns copied verbatim: output field and header.
const TEXT_FIELDS: &[&str] = &[
    "Species",
    "Genus",
    "Division",
    "Class",
    "Order",
    "Author",
    "Trophy",
    "Geometric_shape",
    "FORMULA",
    "SizeClassNo",
    "SizeRange",
];

/// HELCOM and OSPAR reporting areas a species is recorded in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeographicAreas {
    pub helcom: Option<String>,
    pub ospar: Option<String>,
}

/// One row of the morphological source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhytoplanktonRecord {
    pub aphia_id: AphiaId,
    pub species: Option<String>,
    pub genus: Option<String>,
    pub division: Option<String>,
    pub class: Option<String>,
    pub order: Option<String>,
    pub author: Option<String>,
    pub trophic_type: Option<String>,
    pub geometric_shape: Option<String>,
    pub formula: Option<String>,
    pub size_class_no: Option<String>,
    pub size_range: Option<String>,
    /// Linear dimensions in micrometres, keyed by ASCII column label.
    pub measurements_um: BTreeMap<String, f64>,
    pub calculated_volume_um3: Option<f64>,
    pub calculated_carbon_pg: Option<f64>,
    pub cells_per_counting_unit: Option<f64>,
    pub geographic_areas: GeographicAreas,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Every size-class row of a species with more than one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeClassSet {
    pub aphia_id: AphiaId,
    pub source: String,
    pub multiple_size_classes: bool,
    pub size_classes: Vec<PhytoplanktonRecord>,
}

/// A single-row species, flattened with its source tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleSizeClass {
    #[serde(flatten)]
    pub record: PhytoplanktonRecord,
    pub source: String,
    pub multiple_size_classes: bool,
}

/// Morphological traits of one species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PhytoplanktonTraits {
    Single(SingleSizeClass),
    Multiple(SizeClassSet),
}

impl PhytoplanktonTraits {
    /// Build from every row recorded for a species; `None` for no rows.
    pub fn from_records(aphia_id: AphiaId, mut records: Vec<PhytoplanktonRecord>) -> Option<Self> {
        match records.len() {
            0 => None,
            1 => records.pop().map(|record| {
                Self::Single(SingleSizeClass {
                    record,
                    source: defaults::BVOL_SOURCE.to_string(),
                    multiple_size_classes: false,
                })
            }),
            _ => Some(Self::Multiple(SizeClassSet {
                aphia_id,
                source: defaults::BVOL_SOURCE.to_string(),
                multiple_size_classes: true,
                size_classes: records,
            })),
        }
    }

    pub fn multiple_size_classes(&self) -> bool {
        matches!(self, Self::Multiple(_))
    }

    /// Records in file order; a single-row species yields one.
    pub fn size_classes(&self) -> Vec<&PhytoplanktonRecord> {
        match self {
            Self::Single(single) => vec![&single.record],
            Self::Multiple(set) => set.size_classes.iter().collect(),
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Self::Single(single) => &single.source,
            Self::Multiple(set) => &set.source,
        }
    }
}

/// Column positions of the morphological source, resolved once per load.
#[derive(Debug, Clone, Default)]
pub struct BvolColumns {
    text: BTreeMap<&'static str, Option<usize>>,
    measurements: Vec<(&'static str, Option<usize>)>,
    volume: Option<usize>,
    carbon: Option<usize>,
    cells: Option<usize>,
    helcom: Option<usize>,
    ospar: Option<usize>,
    comment: Option<usize>,
}

impl BvolColumns {
    pub fn resolve(sheet: &Sheet) -> Self {
        let text = TEXT_FIELDS
            .iter()
            .map(|&name| (name, sheet.column(name)))
            .collect();

        let measurements = MEASUREMENTS
            .iter()
            .map(|&(label, stem)| {
                let stem = normalize_header(stem);
                let column = sheet.find_column(|h| {
                    let h = normalize_header(h);
                    h.starts_with(&stem) && !h.contains("formula")
                });
                (label, column)
            })
            .collect();

        let volume = sheet.find_column(|h| {
            let h = h.to_lowercase();
            h.contains("volume") && h.contains("counting_unit") && !h.contains("formula")
        });
        let carbon = sheet.find_column(|h| {
            h.contains("Carbon_pg/counting_unit") && !h.to_lowercase().contains("formula")
        });

        let columns = Self {
            text,
            measurements,
            volume,
            carbon,
            cells: sheet.column("No_of_cells/counting_unit"),
            helcom: sheet.column("HELCOM area"),
            ospar: sheet.column("OSPAR area"),
            comment: sheet.column("Comment"),
        };
        columns.log_unmapped();
        columns
    }

    fn log_unmapped(&self) {
        let unmapped: Vec<&str> = self
            .text
            .iter()
            .filter(|(_, c)| c.is_none())
            .map(|(name, _)| *name)
            .chain(
                self.measurements
                    .iter()
                    .filter(|(_, c)| c.is_none())
                    .map(|(label, _)| *label),
            )
            .collect();
        if !unmapped.is_empty() {
            debug!(
                subsystem = "lookup",
                component = "phytoplankton",
                op = "resolve_columns",
                unmapped = ?unmapped,
                "Columns not present in source"
            );
        }
    }

    fn text(&self, row: &SheetRow<'_>, name: &str) -> Option<String> {
        row.owned(self.text.get(name).copied().flatten())
    }

    /// Extract one record from a row.
    pub fn extract(&self, aphia_id: AphiaId, row: &SheetRow<'_>) -> PhytoplanktonRecord {
        let measurements_um = self
            .measurements
            .iter()
            .filter_map(|&(label, column)| row.number(column).map(|v| (label.to_string(), v)))
            .collect();

        PhytoplanktonRecord {
            aphia_id,
            species: self.text(row, "Species"),
            genus: self.text(row, "Genus"),
            division: self.text(row, "Division"),
            class: self.text(row, "Class"),
            order: self.text(row, "Order"),
            author: self.text(row, "Author"),
            trophic_type: self.text(row, "Trophy"),
            geometric_shape: self.text(row, "Geometric_shape"),
            formula: self.text(row, "FORMULA"),
            size_class_no: self.text(row, "SizeClassNo"),
            size_range: self.text(row, "SizeRange"),
            measurements_um,
            calculated_volume_um3: row.number(self.volume),
            calculated_carbon_pg: row.number(self.carbon),
            cells_per_counting_unit: row.number(self.cells),
            geographic_areas: GeographicAreas {
                helcom: row.owned(self.helcom),
                ospar: row.owned(self.ospar),
            },
            comment: row.owned(self.comment),
        }
    }
}
