//! Species registry implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use tracing::debug;

use seatrait_core::{
    AphiaId, CreateSpeciesRequest, Error, Result, Species, SpeciesId, SpeciesRepository,
};

pub(crate) const SPECIES_COLUMNS: &str = "s.species_id, s.aphia_id, s.scientific_name, s.genus, \
     s.common_name, s.author, s.data_source, s.created_at_utc, s.updated_at_utc";

pub(crate) fn species_from_row(row: &SqliteRow) -> Species {
    Species {
        species_id: row.get("species_id"),
        aphia_id: row.get("aphia_id"),
        scientific_name: row.get("scientific_name"),
        genus: row.get("genus"),
        common_name: row.get("common_name"),
        author: row.get("author"),
        data_source: row.get("data_source"),
        created_at_utc: row.get("created_at_utc"),
        updated_at_utc: row.get("updated_at_utc"),
    }
}

/// Fetch a species by AphiaID through any pool.
pub(crate) async fn fetch_species(pool: &Pool<Sqlite>, aphia_id: AphiaId) -> Result<Option<Species>> {
    let row = sqlx::query(&format!(
        "SELECT {SPECIES_COLUMNS} FROM species s WHERE s.aphia_id = ?"
    ))
    .bind(aphia_id)
    .fetch_optional(pool)
    .await
    .map_err(Error::Database)?;

    Ok(row.as_ref().map(species_from_row))
}

/// SQLite implementation of SpeciesRepository.
#[derive(Clone)]
pub struct SqliteSpeciesRepository {
    pool: Pool<Sqlite>,
}

impl SqliteSpeciesRepository {
    /// Create a new SqliteSpeciesRepository with the given connection pool.
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SpeciesRepository for SqliteSpeciesRepository {
    async fn add(&self, req: CreateSpeciesRequest) -> Result<SpeciesId> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO species
                (aphia_id, scientific_name, genus, common_name, author, data_source,
                 created_at_utc, updated_at_utc)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (aphia_id) DO NOTHING
            "#,
        )
        .bind(req.aphia_id)
        .bind(&req.scientific_name)
        .bind(&req.genus)
        .bind(&req.common_name)
        .bind(&req.author)
        .bind(&req.data_source)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 1 {
            let species_id = result.last_insert_rowid();
            debug!(
                subsystem = "db",
                component = "species",
                op = "add",
                aphia_id = req.aphia_id,
                species_id,
                "Species registered"
            );
            return Ok(species_id);
        }

        let species_id: SpeciesId =
            sqlx::query_scalar("SELECT species_id FROM species WHERE aphia_id = ?")
                .bind(req.aphia_id)
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "species",
            op = "add",
            aphia_id = req.aphia_id,
            species_id,
            "Species already registered"
        );
        Ok(species_id)
    }

    async fn get_by_aphia_id(&self, aphia_id: AphiaId) -> Result<Option<Species>> {
        fetch_species(&self.pool, aphia_id).await
    }
}
