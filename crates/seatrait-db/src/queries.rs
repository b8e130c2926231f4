//! Query engine over the trait value store.
//!
//! Every read degrades to an empty result for absent species, unknown
//! traits and empty key lists. Only storage failures surface as errors.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, QueryBuilder, Row, Sqlite};
use tracing::debug;

use seatrait_core::defaults;
use seatrait_core::{
    resolve_trait_value, AphiaId, Error, Result, Species, SpeciesTraitMatch, TraitPredicate,
    TraitQueryRepository, TraitRecord, TraitStatistics,
};

use crate::species::fetch_species;

const RECORD_COLUMNS: &str = "t.trait_name, t.data_type, t.unit, tc.category_name, \
     tv.value_numeric, tv.value_text, tv.value_categorical, tv.value_boolean, \
     tv.confidence, tv.data_source, sc.size_class_no, sc.size_range";

/// Build the trait listing query.
///
/// A category filter turns the category join into an inner join so that
/// uncategorised traits drop out; without it they are kept.
fn traits_query(species_predicate: &str, with_category: bool, batch: bool) -> String {
    let category_join = if with_category {
        "JOIN trait_categories tc ON t.category_id = tc.category_id"
    } else {
        "LEFT JOIN trait_categories tc ON t.category_id = tc.category_id"
    };
    let category_filter = if with_category {
        "AND tc.category_name = ?"
    } else {
        ""
    };
    let (key_column, key_order) = if batch {
        ("s.aphia_id, ", "s.aphia_id, ")
    } else {
        ("", "")
    };

    format!(
        r#"
        SELECT {key_column}{RECORD_COLUMNS}
        FROM species s
        JOIN trait_values tv ON s.species_id = tv.species_id
        JOIN traits t ON tv.trait_id = t.trait_id
        {category_join}
        LEFT JOIN size_classes sc ON tv.size_class_id = sc.size_class_id
        WHERE {species_predicate} {category_filter}
        ORDER BY {key_order}t.trait_name, sc.size_class_no
        "#
    )
}

fn record_from_row(row: &SqliteRow) -> Result<TraitRecord> {
    let data_type: String = row.get("data_type");
    Ok(TraitRecord {
        trait_name: row.get("trait_name"),
        data_type: data_type.parse().map_err(Error::Internal)?,
        unit: row.get("unit"),
        category_name: row.get("category_name"),
        value_numeric: row.get("value_numeric"),
        value_text: row.get("value_text"),
        value_categorical: row.get("value_categorical"),
        value_boolean: row.get("value_boolean"),
        confidence: row.get("confidence"),
        data_source: row.get("data_source"),
        size_class_no: row.get("size_class_no"),
        size_range: row.get("size_range"),
    })
}

fn match_from_row(row: &SqliteRow) -> SpeciesTraitMatch {
    let value_numeric: Option<f64> = row.get("value_numeric");
    let value_categorical: Option<String> = row.get("value_categorical");
    let value_text: Option<String> = row.get("value_text");
    let trait_value = resolve_trait_value(
        value_numeric,
        value_categorical.as_deref(),
        value_text.as_deref(),
    );

    SpeciesTraitMatch {
        aphia_id: row.get("aphia_id"),
        scientific_name: row.get("scientific_name"),
        genus: row.get("genus"),
        common_name: row.get("common_name"),
        trait_name: row.get("trait_name"),
        value_numeric,
        value_categorical,
        value_text,
        trait_value,
    }
}

/// SQLite implementation of TraitQueryRepository.
#[derive(Clone)]
pub struct SqliteTraitQueryRepository {
    pool: Pool<Sqlite>,
}

impl SqliteTraitQueryRepository {
    /// Create a new SqliteTraitQueryRepository with the given connection pool.
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    async fn count(&self, table: &str) -> Result<i64> {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)
    }
}

#[async_trait]
impl TraitQueryRepository for SqliteTraitQueryRepository {
    async fn species_by_aphia_id(&self, aphia_id: AphiaId) -> Result<Option<Species>> {
        fetch_species(&self.pool, aphia_id).await
    }

    async fn traits_for_species(
        &self,
        aphia_id: AphiaId,
        category: Option<&str>,
    ) -> Result<Vec<TraitRecord>> {
        let sql = traits_query("s.aphia_id = ?", category.is_some(), false);
        let mut query = sqlx::query(&sql).bind(aphia_id);
        if let Some(category) = category {
            query = query.bind(category);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "queries",
            op = "traits_for_species",
            aphia_id,
            category = category.unwrap_or(""),
            result_count = rows.len(),
            "Trait listing"
        );
        rows.iter().map(record_from_row).collect()
    }

    async fn traits_for_species_batch(
        &self,
        aphia_ids: &[AphiaId],
        category: Option<&str>,
    ) -> Result<HashMap<AphiaId, Vec<TraitRecord>>> {
        let mut results: HashMap<AphiaId, Vec<TraitRecord>> = HashMap::new();
        for aphia_id in aphia_ids {
            results.entry(*aphia_id).or_default();
        }
        if results.is_empty() {
            debug!(
                subsystem = "db",
                component = "queries",
                op = "batch",
                key_count = 0,
                "Empty key list, no query issued"
            );
            return Ok(results);
        }

        let start = Instant::now();
        let keys: Vec<AphiaId> = results.keys().copied().collect();
        let keys_json = serde_json::to_string(&keys)?;

        let sql = traits_query(
            "s.aphia_id IN (SELECT value FROM json_each(?))",
            category.is_some(),
            true,
        );
        let mut query = sqlx::query(&sql).bind(keys_json);
        if let Some(category) = category {
            query = query.bind(category);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        for row in &rows {
            let aphia_id: AphiaId = row.get("aphia_id");
            results
                .entry(aphia_id)
                .or_default()
                .push(record_from_row(row)?);
        }

        debug!(
            subsystem = "db",
            component = "queries",
            op = "batch",
            key_count = keys.len(),
            result_count = rows.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Batch trait listing"
        );
        Ok(results)
    }

    async fn species_by_trait(
        &self,
        predicate: &TraitPredicate,
    ) -> Result<Vec<SpeciesTraitMatch>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT s.aphia_id, s.scientific_name, s.genus, s.common_name, t.trait_name,
                   tv.value_numeric, tv.value_categorical, tv.value_text
            FROM trait_values tv
            JOIN species s ON tv.species_id = s.species_id
            JOIN traits t ON tv.trait_id = t.trait_id
            WHERE t.trait_name = "#,
        );
        builder.push_bind(predicate.trait_name.as_str());

        // Bounds only constrain traits that store numbers.
        if let Some(min) = predicate.min_value {
            builder.push(" AND (t.data_type <> 'numeric' OR tv.value_numeric >= ");
            builder.push_bind(min);
            builder.push(")");
        }
        if let Some(max) = predicate.max_value {
            builder.push(" AND (t.data_type <> 'numeric' OR tv.value_numeric <= ");
            builder.push_bind(max);
            builder.push(")");
        }
        if let Some(value) = &predicate.categorical_value {
            builder.push(" AND tv.value_categorical = ");
            builder.push_bind(value.as_str());
        }
        builder.push(" ORDER BY s.aphia_id, tv.value_id");

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "queries",
            op = "species_by_trait",
            trait_name = %predicate.trait_name,
            result_count = rows.len(),
            "Predicate query"
        );
        Ok(rows.iter().map(match_from_row).collect())
    }

    async fn statistics(&self) -> Result<TraitStatistics> {
        let mut stats = TraitStatistics {
            total_species: self.count("species").await?,
            total_traits: self.count("traits").await?,
            total_trait_values: self.count("trait_values").await?,
            total_categories: self.count("trait_categories").await?,
            ..Default::default()
        };

        let rows = sqlx::query(
            "SELECT data_source, COUNT(*) AS count FROM species GROUP BY data_source",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        for row in &rows {
            let source: Option<String> = row.get("data_source");
            let source = source.unwrap_or_else(|| defaults::UNKNOWN_SOURCE.to_string());
            *stats.species_by_source.entry(source).or_insert(0) += row.get::<i64, _>("count");
        }

        let rows = sqlx::query(
            r#"
            SELECT tc.category_name, COUNT(t.trait_id) AS count
            FROM trait_categories tc
            LEFT JOIN traits t ON tc.category_id = t.category_id
            GROUP BY tc.category_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        for row in &rows {
            stats
                .traits_by_category
                .insert(row.get("category_name"), row.get("count"));
        }

        Ok(stats)
    }
}
