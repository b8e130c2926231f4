//! Trait value store.
//!
//! The declared type of the trait decides which of the four value columns
//! is written; the shape of the incoming value never does.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, trace, warn};

use seatrait_core::{
    CreateTraitValueRequest, Error, Result, TraitId, TraitValueId, TraitValueRepository,
    ValueType,
};

/// SQLite implementation of TraitValueRepository.
#[derive(Clone)]
pub struct SqliteTraitValueRepository {
    pool: Pool<Sqlite>,
}

impl SqliteTraitValueRepository {
    /// Create a new SqliteTraitValueRepository with the given connection pool.
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    async fn resolve_trait(&self, trait_name: &str) -> Result<Option<(TraitId, ValueType)>> {
        let row = sqlx::query("SELECT trait_id, data_type FROM traits WHERE trait_name = ?")
            .bind(trait_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let data_type: String = row.get("data_type");
        let data_type = data_type.parse::<ValueType>().map_err(Error::Internal)?;
        Ok(Some((row.get("trait_id"), data_type)))
    }

    async fn row_exists(&self, sql: &str, id: i64) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)
    }
}

#[async_trait]
impl TraitValueRepository for SqliteTraitValueRepository {
    async fn add(&self, req: CreateTraitValueRequest) -> Result<Option<TraitValueId>> {
        let Some((trait_id, data_type)) = self.resolve_trait(&req.trait_name).await? else {
            warn!(
                subsystem = "db",
                component = "trait_values",
                op = "add",
                trait_name = %req.trait_name,
                species_id = req.species_id,
                "Trait not found, skipping value"
            );
            return Ok(None);
        };

        if !self
            .row_exists(
                "SELECT EXISTS(SELECT 1 FROM species WHERE species_id = ?)",
                req.species_id,
            )
            .await?
        {
            warn!(
                subsystem = "db",
                component = "trait_values",
                op = "add",
                trait_name = %req.trait_name,
                species_id = req.species_id,
                "Species not found, skipping value"
            );
            return Ok(None);
        }

        if let Some(size_class_id) = req.size_class_id {
            if !self
                .row_exists(
                    "SELECT EXISTS(SELECT 1 FROM size_classes WHERE size_class_id = ?)",
                    size_class_id,
                )
                .await?
            {
                warn!(
                    subsystem = "db",
                    component = "trait_values",
                    op = "add",
                    trait_name = %req.trait_name,
                    species_id = req.species_id,
                    size_class_id,
                    "Size class not found, skipping value"
                );
                return Ok(None);
            }
        }

        if req.value.is_missing() {
            debug!(
                subsystem = "db",
                component = "trait_values",
                op = "add",
                trait_name = %req.trait_name,
                species_id = req.species_id,
                "Null value, nothing stored"
            );
            return Ok(None);
        }

        let Some(value) = req.value.coerce(data_type) else {
            warn!(
                subsystem = "db",
                component = "trait_values",
                op = "add",
                trait_name = %req.trait_name,
                species_id = req.species_id,
                data_type = %data_type,
                raw_value = ?req.value,
                "Value cannot be read as the declared type, skipping"
            );
            return Ok(None);
        };

        let confidence = match req.confidence {
            Some(c) if !(0.0..=1.0).contains(&c) => {
                warn!(
                    subsystem = "db",
                    component = "trait_values",
                    op = "add",
                    trait_name = %req.trait_name,
                    confidence = c,
                    "Confidence outside [0, 1], stored as null"
                );
                None
            }
            other => other,
        };

        let columns = value.into_columns();
        let result = sqlx::query(
            r#"
            INSERT INTO trait_values
                (species_id, trait_id, value_numeric, value_text, value_categorical,
                 value_boolean, size_class_id, confidence, data_source, notes, created_at_utc)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(req.species_id)
        .bind(trait_id)
        .bind(columns.numeric)
        .bind(&columns.text)
        .bind(&columns.categorical)
        .bind(columns.boolean)
        .bind(req.size_class_id)
        .bind(confidence)
        .bind(&req.data_source)
        .bind(&req.notes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        let value_id = result.last_insert_rowid();
        trace!(
            subsystem = "db",
            component = "trait_values",
            op = "add",
            trait_name = %req.trait_name,
            species_id = req.species_id,
            value_id,
            "Trait value stored"
        );
        Ok(Some(value_id))
    }
}
