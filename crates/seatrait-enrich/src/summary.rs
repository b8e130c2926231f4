//! Per-species trait summaries and the report helpers built on them.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use seatrait_core::{
    defaults, AphiaId, CacheConfig, CacheInfo, Result, Species, SpeciesTraitMatch,
    TraitPredicate, TraitQueryRepository, TraitRecord, TraitStatistics, TraitValue, TtlCache,
    ValueType,
};

/// One trait value as shown in a summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitEntry {
    pub name: String,
    pub value: Option<TraitValue>,
    pub unit: Option<String>,
    pub data_type: ValueType,
    pub size_class: Option<i64>,
    pub size_range: Option<String>,
}

impl From<&TraitRecord> for TraitEntry {
    fn from(record: &TraitRecord) -> Self {
        Self {
            name: record.trait_name.clone(),
            value: record.value(),
            unit: record.unit.clone(),
            data_type: record.data_type,
            size_class: record.size_class_no,
            size_range: record.size_range.clone(),
        }
    }
}

/// A species with its trait values grouped by category name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesTraitSummary {
    pub species_info: Species,
    /// Traits without a category are listed under `other`.
    pub traits_by_category: BTreeMap<String, Vec<TraitEntry>>,
    pub total_traits: usize,
}

impl SpeciesTraitSummary {
    pub fn new(species_info: Species, records: &[TraitRecord]) -> Self {
        let mut traits_by_category: BTreeMap<String, Vec<TraitEntry>> = BTreeMap::new();
        for record in records {
            let category = record
                .category_name
                .clone()
                .unwrap_or_else(|| defaults::UNCATEGORIZED.to_string());
            traits_by_category
                .entry(category)
                .or_default()
                .push(TraitEntry::from(record));
        }
        Self {
            species_info,
            traits_by_category,
            total_traits: records.len(),
        }
    }
}

/// Summary cache key for a species.
pub fn summary_key(aphia_id: AphiaId) -> String {
    format!("traits:full:{}", aphia_id)
}

/// Render a value for display.
///
/// Numeric values get two decimals and the unit, booleans read `Yes`/`No`,
/// and a missing value reads `N/A`.
pub fn format_trait_value(
    value: Option<&TraitValue>,
    unit: Option<&str>,
    data_type: ValueType,
) -> String {
    let Some(value) = value else {
        return "N/A".to_string();
    };

    match (data_type, value) {
        (ValueType::Numeric, TraitValue::Numeric(v)) => match unit {
            Some(unit) if !unit.is_empty() => format!("{:.2} {}", v, unit),
            _ => format!("{:.2}", v),
        },
        (ValueType::Boolean, TraitValue::Boolean(true)) => "Yes".to_string(),
        (ValueType::Boolean, TraitValue::Boolean(false)) => "No".to_string(),
        _ => value.to_string(),
    }
}

fn format_entry(entry: &TraitEntry) -> String {
    format_trait_value(entry.value.as_ref(), entry.unit.as_deref(), entry.data_type)
}

/// Multi-line text report of a summary.
///
/// Categories and trait names are sorted. A trait with several size
/// classes lists one indented line per size class.
pub fn trait_summary_text(summary: Option<&SpeciesTraitSummary>) -> String {
    let Some(summary) = summary else {
        return "No trait data available".to_string();
    };

    let species = &summary.species_info;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Species: {}",
        species.scientific_name.as_deref().unwrap_or("Unknown")
    );
    let _ = writeln!(
        out,
        "Data source: {}",
        species.data_source.as_deref().unwrap_or("Unknown")
    );
    let _ = writeln!(out, "Total traits: {}", summary.total_traits);

    for (category, entries) in &summary.traits_by_category {
        let _ = write!(out, "\n{}:", category.to_uppercase());

        let mut by_name: BTreeMap<&str, Vec<&TraitEntry>> = BTreeMap::new();
        for entry in entries {
            by_name.entry(entry.name.as_str()).or_default().push(entry);
        }

        for (name, group) in by_name {
            if let [entry] = group.as_slice() {
                let _ = write!(out, "\n  {}: {}", name, format_entry(entry));
                continue;
            }
            let _ = write!(out, "\n  {}:", name);
            for entry in group {
                let size_info = match (entry.size_class, entry.size_range.as_deref()) {
                    (Some(no), Some(range)) => format!(" (size class {}: {})", no, range),
                    (Some(no), None) => format!(" (size class {})", no),
                    _ => String::new(),
                };
                let _ = write!(out, "\n    {}{}", format_entry(entry), size_info);
            }
        }
        out.push('\n');
    }

    out
}

/// Report helpers over a trait query repository, with summaries cached in
/// the long-TTL trait cache.
pub struct TraitSummaries<Q: ?Sized> {
    queries: Arc<Q>,
    cache: TtlCache<SpeciesTraitSummary>,
}

impl<Q> TraitSummaries<Q>
where
    Q: TraitQueryRepository + ?Sized,
{
    pub fn new(queries: Arc<Q>, config: &CacheConfig) -> Self {
        Self {
            queries,
            cache: TtlCache::new("trait_cache", config.trait_ttl),
        }
    }

    pub fn queries(&self) -> &Arc<Q> {
        &self.queries
    }

    /// Traits of a species grouped by category.
    ///
    /// `None` when the species is unknown or storage fails; the failure is
    /// logged. Only found species are cached.
    pub async fn species_trait_summary(&self, aphia_id: AphiaId) -> Option<SpeciesTraitSummary> {
        let key = summary_key(aphia_id);
        if let Some(summary) = self.cache.get(&key).await {
            return Some(summary);
        }

        match self.fetch_summary(aphia_id).await {
            Ok(Some(summary)) => {
                self.cache.set(key, summary.clone()).await;
                Some(summary)
            }
            Ok(None) => {
                debug!(
                    subsystem = "enrich",
                    component = "summary",
                    op = "species_trait_summary",
                    aphia_id,
                    "Species not found"
                );
                None
            }
            Err(e) => {
                error!(
                    subsystem = "enrich",
                    component = "summary",
                    op = "species_trait_summary",
                    aphia_id,
                    error = %e,
                    "Failed to fetch traits"
                );
                None
            }
        }
    }

    async fn fetch_summary(&self, aphia_id: AphiaId) -> Result<Option<SpeciesTraitSummary>> {
        let Some(species) = self.queries.species_by_aphia_id(aphia_id).await? else {
            return Ok(None);
        };
        let records = self.queries.traits_for_species(aphia_id, None).await?;
        Ok(Some(SpeciesTraitSummary::new(species, &records)))
    }

    /// Species whose numeric value for a trait lies in `[min, max]`, at most
    /// `limit` of them. Failures are logged and yield an empty list.
    pub async fn species_by_trait_range(
        &self,
        trait_name: &str,
        min: Option<f64>,
        max: Option<f64>,
        limit: usize,
    ) -> Vec<SpeciesTraitMatch> {
        let predicate = TraitPredicate {
            trait_name: trait_name.to_string(),
            min_value: min,
            max_value: max,
            categorical_value: None,
        };
        match self.queries.species_by_trait(&predicate).await {
            Ok(mut matches) => {
                matches.truncate(limit);
                matches
            }
            Err(e) => {
                error!(
                    subsystem = "enrich",
                    component = "summary",
                    op = "species_by_trait_range",
                    trait_name,
                    error = %e,
                    "Failed to query species by trait"
                );
                Vec::new()
            }
        }
    }

    /// Store statistics, or empty statistics when storage fails.
    pub async fn trait_statistics(&self) -> TraitStatistics {
        self.queries.statistics().await.unwrap_or_else(|e| {
            error!(
                subsystem = "enrich",
                component = "summary",
                op = "trait_statistics",
                error = %e,
                "Failed to read trait statistics"
            );
            TraitStatistics::default()
        })
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    pub async fn cleanup_expired(&self) -> usize {
        self.cache.cleanup_expired().await
    }

    pub async fn cache_info(&self) -> CacheInfo {
        self.cache.info().await
    }
}
