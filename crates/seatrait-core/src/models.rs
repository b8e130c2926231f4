//! Core data models for seatrait.
//!
//! These types are shared across all seatrait crates and represent the
//! trait ontology: species, trait categories, trait definitions, size
//! classes, the auxiliary geographic/taxonomic attributes, and the typed
//! trait values themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// External taxonomic key (WoRMS AphiaID).
pub type AphiaId = i64;

/// Internal species identifier issued by the species registry.
pub type SpeciesId = i64;

/// Internal trait definition identifier.
pub type TraitId = i64;

/// Internal trait category identifier.
pub type CategoryId = i64;

/// Internal size class identifier.
pub type SizeClassId = i64;

/// Internal trait value row identifier.
pub type TraitValueId = i64;

// =============================================================================
// SPECIES
// =============================================================================

/// A species registered in the ontology, deduplicated by AphiaID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub species_id: SpeciesId,
    pub aphia_id: AphiaId,
    pub scientific_name: Option<String>,
    pub genus: Option<String>,
    pub common_name: Option<String>,
    pub author: Option<String>,
    pub data_source: Option<String>,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

/// Request for registering a species.
#[derive(Debug, Clone, Default)]
pub struct CreateSpeciesRequest {
    pub aphia_id: AphiaId,
    pub scientific_name: Option<String>,
    pub genus: Option<String>,
    pub common_name: Option<String>,
    pub author: Option<String>,
    pub data_source: Option<String>,
}

impl CreateSpeciesRequest {
    /// Create a request carrying only the external key.
    pub fn new(aphia_id: AphiaId) -> Self {
        Self {
            aphia_id,
            ..Default::default()
        }
    }

    pub fn scientific_name(mut self, name: impl Into<String>) -> Self {
        self.scientific_name = Some(name.into());
        self
    }

    pub fn genus(mut self, genus: impl Into<String>) -> Self {
        self.genus = Some(genus.into());
        self
    }

    pub fn common_name(mut self, name: impl Into<String>) -> Self {
        self.common_name = Some(name.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn data_source(mut self, source: impl Into<String>) -> Self {
        self.data_source = Some(source.into());
        self
    }
}

// =============================================================================
// TRAIT CATALOG
// =============================================================================

/// Value type declared by a trait definition.
///
/// Determines which value slot a stored trait value occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Numeric,
    Categorical,
    Text,
    Boolean,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::Text => "text",
            Self::Boolean => "boolean",
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ValueType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "numeric" => Ok(Self::Numeric),
            "categorical" => Ok(Self::Categorical),
            "text" => Ok(Self::Text),
            "boolean" => Ok(Self::Boolean),
            _ => Err(format!("Invalid value type: {}", s)),
        }
    }
}

/// A node of the trait category hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitCategory {
    pub category_id: CategoryId,
    pub category_name: String,
    /// `None` for top-level domains (morphological, ecological, ...).
    pub parent_category_id: Option<CategoryId>,
    pub description: Option<String>,
}

/// A category with its children, rebuilt in memory from the flat table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub category: TraitCategory,
    pub children: Vec<CategoryNode>,
}

/// A trait definition: a named, typed characteristic of a species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitDefinition {
    pub trait_id: TraitId,
    pub trait_name: String,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub data_type: ValueType,
    pub unit: Option<String>,
    pub description: Option<String>,
}

/// A directed relationship between two trait definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitRelationship {
    pub relationship_id: i64,
    pub trait_name: String,
    pub related_trait_name: String,
    pub relationship_type: Option<String>,
    pub description: Option<String>,
}

// =============================================================================
// SIZE CLASSES AND AUXILIARY ATTRIBUTES
// =============================================================================

/// A species-scoped morphological size bracket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeClass {
    pub size_class_id: SizeClassId,
    pub species_id: SpeciesId,
    /// Sequence number, unique only within the owning species.
    pub size_class_no: i64,
    pub size_range: Option<String>,
    pub size_range_min: Option<f64>,
    pub size_range_max: Option<f64>,
    pub description: Option<String>,
}

/// Request for recording a size class.
///
/// When `size_range_min`/`size_range_max` are both absent they are parsed
/// from `size_range`.
#[derive(Debug, Clone, Default)]
pub struct CreateSizeClassRequest {
    pub species_id: SpeciesId,
    pub size_class_no: i64,
    pub size_range: Option<String>,
    pub size_range_min: Option<f64>,
    pub size_range_max: Option<f64>,
    pub description: Option<String>,
}

impl CreateSizeClassRequest {
    pub fn new(species_id: SpeciesId, size_class_no: i64) -> Self {
        Self {
            species_id,
            size_class_no,
            ..Default::default()
        }
    }

    pub fn size_range(mut self, range: impl Into<String>) -> Self {
        self.size_range = Some(range.into());
        self
    }

    pub fn bounds(mut self, min: f64, max: f64) -> Self {
        self.size_range_min = Some(min);
        self.size_range_max = Some(max);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A geographic area a species is recorded in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeographicDistribution {
    pub distribution_id: i64,
    pub species_id: SpeciesId,
    /// Area convention, e.g. `HELCOM` or `OSPAR`.
    pub area_type: String,
    pub area_value: String,
}

/// Full taxonomic classification of a species (at most one per species).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub kingdom: Option<String>,
    pub phylum: Option<String>,
    pub division: Option<String>,
    pub class_name: Option<String>,
    pub order_name: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
    pub species: Option<String>,
    pub rank: Option<String>,
}

// =============================================================================
// TRAIT VALUES
// =============================================================================

/// A typed trait value.
///
/// Exactly one variant exists per stored assertion; the variant always
/// matches the declared [`ValueType`] of the trait it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum TraitValue {
    Numeric(f64),
    Categorical(String),
    Text(String),
    Boolean(bool),
}

impl TraitValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Numeric(_) => ValueType::Numeric,
            Self::Categorical(_) => ValueType::Categorical,
            Self::Text(_) => ValueType::Text,
            Self::Boolean(_) => ValueType::Boolean,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Categorical(s) | Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Split into the four nullable storage columns.
    pub fn into_columns(self) -> ValueColumns {
        let mut columns = ValueColumns::default();
        match self {
            Self::Numeric(v) => columns.numeric = Some(v),
            Self::Categorical(s) => columns.categorical = Some(s),
            Self::Text(s) => columns.text = Some(s),
            Self::Boolean(b) => columns.boolean = Some(b),
        }
        columns
    }
}

impl std::fmt::Display for TraitValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "{}", v),
            Self::Categorical(s) | Self::Text(s) => f.write_str(s),
            Self::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// The four nullable value columns of the trait value table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueColumns {
    pub numeric: Option<f64>,
    pub text: Option<String>,
    pub categorical: Option<String>,
    pub boolean: Option<bool>,
}

/// An untyped candidate value as supplied by an import routine.
///
/// The storage column is chosen by the trait definition, never by the
/// shape of this value.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl RawValue {
    /// Null and NaN candidates are never stored.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Number(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Coerce into the value type declared by a trait definition.
    ///
    /// Returns `None` for missing values and for text that cannot be read
    /// as the declared numeric or boolean type.
    pub fn coerce(&self, value_type: ValueType) -> Option<TraitValue> {
        if self.is_missing() {
            return None;
        }
        match value_type {
            ValueType::Numeric => match self {
                Self::Number(v) => Some(TraitValue::Numeric(*v)),
                Self::Bool(b) => Some(TraitValue::Numeric(if *b { 1.0 } else { 0.0 })),
                Self::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|v| !v.is_nan())
                    .map(TraitValue::Numeric),
                Self::Null => None,
            },
            ValueType::Boolean => match self {
                Self::Bool(b) => Some(TraitValue::Boolean(*b)),
                Self::Number(v) => Some(TraitValue::Boolean(*v != 0.0)),
                Self::Text(s) => parse_bool(s).map(TraitValue::Boolean),
                Self::Null => None,
            },
            ValueType::Categorical => self.render().map(TraitValue::Categorical),
            ValueType::Text => self.render().map(TraitValue::Text),
        }
    }

    fn render(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Number(v) => Some(v.to_string()),
            Self::Text(s) => Some(s.clone()),
            Self::Bool(b) => Some(b.to_string()),
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        Self::Number(v as f64)
    }
}

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Request for asserting a trait value.
#[derive(Debug, Clone)]
pub struct CreateTraitValueRequest {
    pub species_id: SpeciesId,
    pub trait_name: String,
    pub value: RawValue,
    pub size_class_id: Option<SizeClassId>,
    /// Confidence in the assertion, 0–1.
    pub confidence: Option<f64>,
    pub data_source: Option<String>,
    pub notes: Option<String>,
}

impl CreateTraitValueRequest {
    pub fn new(
        species_id: SpeciesId,
        trait_name: impl Into<String>,
        value: impl Into<RawValue>,
    ) -> Self {
        Self {
            species_id,
            trait_name: trait_name.into(),
            value: value.into(),
            size_class_id: None,
            confidence: None,
            data_source: None,
            notes: None,
        }
    }

    pub fn size_class(mut self, size_class_id: SizeClassId) -> Self {
        self.size_class_id = Some(size_class_id);
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn data_source(mut self, source: impl Into<String>) -> Self {
        self.data_source = Some(source.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

// =============================================================================
// QUERY RESULTS
// =============================================================================

/// One trait value row joined with its definition, category and size class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitRecord {
    pub trait_name: String,
    pub data_type: ValueType,
    pub unit: Option<String>,
    pub category_name: Option<String>,
    pub value_numeric: Option<f64>,
    pub value_text: Option<String>,
    pub value_categorical: Option<String>,
    pub value_boolean: Option<bool>,
    pub confidence: Option<f64>,
    pub data_source: Option<String>,
    pub size_class_no: Option<i64>,
    pub size_range: Option<String>,
}

impl TraitRecord {
    /// The value stored in the slot matching the declared data type.
    pub fn value(&self) -> Option<TraitValue> {
        match self.data_type {
            ValueType::Numeric => self.value_numeric.map(TraitValue::Numeric),
            ValueType::Categorical => self.value_categorical.clone().map(TraitValue::Categorical),
            ValueType::Text => self.value_text.clone().map(TraitValue::Text),
            ValueType::Boolean => self.value_boolean.map(TraitValue::Boolean),
        }
    }
}

/// A species matched by a trait predicate query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesTraitMatch {
    pub aphia_id: AphiaId,
    pub scientific_name: Option<String>,
    pub genus: Option<String>,
    pub common_name: Option<String>,
    pub trait_name: String,
    pub value_numeric: Option<f64>,
    pub value_categorical: Option<String>,
    pub value_text: Option<String>,
    /// First non-null of numeric, categorical, text (in that order).
    pub trait_value: Option<TraitValue>,
}

/// Resolve the convenience value of a predicate match.
///
/// Precedence is numeric, then categorical, then text. Boolean values are
/// never considered.
pub fn resolve_trait_value(
    numeric: Option<f64>,
    categorical: Option<&str>,
    text: Option<&str>,
) -> Option<TraitValue> {
    if let Some(v) = numeric {
        return Some(TraitValue::Numeric(v));
    }
    if let Some(s) = categorical {
        return Some(TraitValue::Categorical(s.to_string()));
    }
    text.map(|s| TraitValue::Text(s.to_string()))
}

/// Predicate for [`crate::TraitQueryRepository::species_by_trait`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraitPredicate {
    pub trait_name: String,
    /// Inclusive lower bound on the numeric value.
    pub min_value: Option<f64>,
    /// Inclusive upper bound on the numeric value.
    pub max_value: Option<f64>,
    /// Exact match on the categorical value.
    pub categorical_value: Option<String>,
}

impl TraitPredicate {
    pub fn new(trait_name: impl Into<String>) -> Self {
        Self {
            trait_name: trait_name.into(),
            ..Default::default()
        }
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min_value = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max_value = Some(max);
        self
    }

    pub fn categorical(mut self, value: impl Into<String>) -> Self {
        self.categorical_value = Some(value.into());
        self
    }
}

/// Aggregate counts over the relational store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraitStatistics {
    pub total_species: i64,
    pub total_traits: i64,
    pub total_trait_values: i64,
    pub total_categories: i64,
    /// Species counts keyed by data source (`unknown` for null sources).
    pub species_by_source: BTreeMap<String, i64>,
    /// Trait definition counts keyed by category name.
    pub traits_by_category: BTreeMap<String, i64>,
}
