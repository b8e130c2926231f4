//! Ecological source: one enriched row per species.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use seatrait_core::{defaults, AphiaId};

use crate::sheet::{Sheet, SheetRow};

/// Candidate names of the key column.
pub const KEY_COLUMNS: &[&str] = &["aphiaID", "AphiaID"];

const MORPHOLOGY: &[(&str, &str)] = &[
    ("male_size_range", "biology_male_size_range"),
    ("male_size_at_maturity", "biology_male_size_at_maturity"),
    ("female_size_range", "biology_female_size_range"),
    ("female_size_at_maturity", "biology_female_size_at_maturity"),
    ("growth_form", "biology_growth_form"),
    ("body_flexibility", "biology_body_flexibility"),
];

const ECOLOGY: &[(&str, &str)] = &[
    ("typical_abundance", "biology_typical_abundance"),
    ("growth_rate", "biology_growth_rate"),
    ("mobility", "biology_mobility"),
    ("sociability", "biology_sociability"),
    ("environmental_position", "biology_environmental_position"),
    ("dependency", "biology_dependency"),
    ("supports", "biology_supports"),
];

const TROPHIC: &[(&str, &str)] = &[
    ("feeding_method", "biology_characteristic_feeding_method"),
    ("diet_food_source", "biology_dietfood_source"),
    ("typically_feeds_on", "biology_typically_feeds_on"),
];

/// Ecological traits of one species. Sub-maps hold only non-null fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesTraits {
    pub aphia_id: AphiaId,
    pub source: String,
    pub species_id: Option<String>,
    pub taxonomy_name: Option<String>,
    pub common_name: Option<String>,
    pub taxonomy_authority: Option<String>,
    pub url: Option<String>,
    pub morphology: BTreeMap<String, String>,
    pub ecology: BTreeMap<String, String>,
    pub trophic: BTreeMap<String, String>,
    pub is_harmful: Option<String>,
}

fn group(sheet: &Sheet, row: &SheetRow<'_>, fields: &[(&str, &str)]) -> BTreeMap<String, String> {
    fields
        .iter()
        .filter_map(|&(key, header)| row.owned(sheet.column(header)).map(|v| (key.to_string(), v)))
        .collect()
}

impl SpeciesTraits {
    /// Extract from the first row recorded for a species.
    pub fn extract(sheet: &Sheet, aphia_id: AphiaId, row: &SheetRow<'_>) -> Self {
        let text = |header: &str| row.owned(sheet.column(header));
        Self {
            aphia_id,
            source: defaults::SPECIES_ENRICHED_SOURCE.to_string(),
            species_id: text("speciesID"),
            taxonomy_name: text("taxonomyName"),
            common_name: text("synonymCommonName"),
            taxonomy_authority: text("taxonomyAuthority"),
            url: text("url"),
            morphology: group(sheet, row, MORPHOLOGY),
            ecology: group(sheet, row, ECOLOGY),
            trophic: group(sheet, row, TROPHIC),
            is_harmful: text("biology_is_the_species_harmful"),
        }
    }
}
