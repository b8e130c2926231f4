//! Batch enrichment of occurrence rows with trait highlights.
//!
//! Every distinct AphiaID in a set of occurrences is resolved with a single
//! batch query, then each row gains five fields:
//!
//! | Field | Value |
//! |-------|-------|
//! | `has_trait_data` | species has at least one stored trait value |
//! | `trait_count` | number of trait rows for the species |
//! | `trophic_type` | categorical `trophic_type` value |
//! | `biovolume_um3` | numeric `biovolume` value |
//! | `carbon_pg` | numeric `carbon_content` value |
//!
//! When a species has several size classes, the last row of each trait
//! supplies the highlight.

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use seatrait_core::{AphiaId, TraitQueryRepository, TraitRecord};

/// One occurrence row, as returned by an upstream occurrence search.
pub type Occurrence = Map<String, Value>;

pub const HAS_TRAIT_DATA: &str = "has_trait_data";
pub const TRAIT_COUNT: &str = "trait_count";
pub const TROPHIC_TYPE: &str = "trophic_type";
pub const BIOVOLUME_UM3: &str = "biovolume_um3";
pub const CARBON_PG: &str = "carbon_pg";

/// Trait fields attached to one occurrence row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraitHighlights {
    pub has_trait_data: bool,
    pub trait_count: usize,
    pub trophic_type: Option<String>,
    pub biovolume_um3: Option<f64>,
    pub carbon_pg: Option<f64>,
}

impl TraitHighlights {
    pub fn from_records(records: &[TraitRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let mut highlights = Self {
            has_trait_data: true,
            trait_count: records.len(),
            ..Default::default()
        };
        for record in records {
            match record.trait_name.as_str() {
                "trophic_type" => highlights.trophic_type = record.value_categorical.clone(),
                "biovolume" => highlights.biovolume_um3 = record.value_numeric,
                "carbon_content" => highlights.carbon_pg = record.value_numeric,
                _ => {}
            }
        }
        highlights
    }

    fn apply(&self, row: &mut Occurrence) {
        row.insert(HAS_TRAIT_DATA.to_string(), Value::Bool(self.has_trait_data));
        row.insert(TRAIT_COUNT.to_string(), Value::from(self.trait_count));
        row.insert(
            TROPHIC_TYPE.to_string(),
            self.trophic_type.clone().map_or(Value::Null, Value::String),
        );
        row.insert(BIOVOLUME_UM3.to_string(), number_or_null(self.biovolume_um3));
        row.insert(CARBON_PG.to_string(), number_or_null(self.carbon_pg));
    }
}

fn number_or_null(value: Option<f64>) -> Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

/// First field, in the first row that has one, whose name contains `aphia`
/// (case-insensitive).
pub fn find_aphia_column(rows: &[Occurrence]) -> Option<String> {
    rows.iter().find_map(|row| {
        row.keys()
            .find(|k| k.to_lowercase().contains("aphia"))
            .cloned()
    })
}

/// Read an AphiaID from a JSON cell: an integer, an integral float, or a
/// string holding either. Null and invalid cells yield `None`.
pub fn parse_aphia_id(value: &Value) -> Option<AphiaId> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as AphiaId)
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<AphiaId>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as AphiaId)
            })
        }
        _ => None,
    }
}

/// Attach trait highlights to every occurrence row.
///
/// Rows are returned in their original order. Input without an AphiaID
/// field is returned unchanged. A failed batch query is logged and every
/// row is marked as having no trait data.
pub async fn enrich_occurrences<Q>(queries: &Q, mut occurrences: Vec<Occurrence>) -> Vec<Occurrence>
where
    Q: TraitQueryRepository + ?Sized,
{
    if occurrences.is_empty() {
        return occurrences;
    }

    let Some(column) = find_aphia_column(&occurrences) else {
        warn!(
            subsystem = "enrich",
            component = "occurrences",
            op = "enrich",
            rows = occurrences.len(),
            "No AphiaID column found in occurrence data"
        );
        return occurrences;
    };

    let mut keys = BTreeSet::new();
    for row in &occurrences {
        match row.get(&column) {
            None | Some(Value::Null) => {}
            Some(value) => match parse_aphia_id(value) {
                Some(id) => {
                    keys.insert(id);
                }
                None => warn!(
                    subsystem = "enrich",
                    component = "occurrences",
                    op = "enrich",
                    value = %value,
                    "Invalid AphiaID value"
                ),
            },
        }
    }
    let keys: Vec<AphiaId> = keys.into_iter().collect();

    let batch: HashMap<AphiaId, Vec<TraitRecord>> = if keys.is_empty() {
        info!(
            subsystem = "enrich",
            component = "occurrences",
            op = "enrich",
            "No valid AphiaIDs found for trait enrichment"
        );
        HashMap::new()
    } else {
        let start = Instant::now();
        info!(
            subsystem = "enrich",
            component = "occurrences",
            op = "enrich",
            key_count = keys.len(),
            "Fetching traits in batch"
        );
        match queries.traits_for_species_batch(&keys, None).await {
            Ok(batch) => {
                info!(
                    subsystem = "enrich",
                    component = "occurrences",
                    op = "enrich",
                    key_count = keys.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Batch trait query complete"
                );
                batch
            }
            Err(e) => {
                error!(
                    subsystem = "enrich",
                    component = "occurrences",
                    op = "enrich",
                    error = %e,
                    "Batch trait query failed, continuing without traits"
                );
                HashMap::new()
            }
        }
    };

    let highlights: HashMap<AphiaId, TraitHighlights> = batch
        .iter()
        .map(|(id, records)| (*id, TraitHighlights::from_records(records)))
        .collect();
    let empty = TraitHighlights::default();

    for row in &mut occurrences {
        let key = row.get(&column).and_then(parse_aphia_id);
        key.and_then(|id| highlights.get(&id))
            .unwrap_or(&empty)
            .apply(row);
    }

    info!(
        subsystem = "enrich",
        component = "occurrences",
        op = "enrich",
        rows = occurrences.len(),
        "Enriched occurrences with trait data"
    );
    occurrences
}
