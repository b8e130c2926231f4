//! Size-class registry.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, warn};

use seatrait_core::{
    CreateSizeClassRequest, Error, Result, SizeClass, SizeClassId, SizeClassRepository, SpeciesId,
};

const NUMBER: &str = r"[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?";

static RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^\s*({NUMBER})\s*[-–—]\s*({NUMBER})\s*$")).unwrap()
});

static SINGLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(&format!(r"^\s*({NUMBER})\s*$")).unwrap());

/// Parse a size range such as `"5-10"` or `"7.5"` into `(min, max)`.
///
/// A single number yields equal bounds. Anything else is logged and yields
/// `(None, None)`.
pub fn parse_size_range(text: &str) -> (Option<f64>, Option<f64>) {
    if let Some(caps) = RANGE_RE.captures(text) {
        let min = caps[1].parse::<f64>().ok();
        let max = caps[2].parse::<f64>().ok();
        if min.is_some() && max.is_some() {
            return (min, max);
        }
    } else if let Some(caps) = SINGLE_RE.captures(text) {
        if let Ok(value) = caps[1].parse::<f64>() {
            return (Some(value), Some(value));
        }
    }

    warn!(
        subsystem = "db",
        component = "size_classes",
        op = "parse_range",
        size_range = text,
        "Could not parse size range"
    );
    (None, None)
}

/// SQLite implementation of SizeClassRepository.
#[derive(Clone)]
pub struct SqliteSizeClassRepository {
    pool: Pool<Sqlite>,
}

impl SqliteSizeClassRepository {
    /// Create a new SqliteSizeClassRepository with the given connection pool.
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SizeClassRepository for SqliteSizeClassRepository {
    /// Record a size class; an existing `(species, number)` pair keeps its
    /// row and returns its id.
    async fn add(&self, req: CreateSizeClassRequest) -> Result<SizeClassId> {
        let (min, max) = match (req.size_range_min, req.size_range_max, &req.size_range) {
            (None, None, Some(range)) => parse_size_range(range),
            (min, max, _) => (min, max),
        };

        let result = sqlx::query(
            r#"
            INSERT INTO size_classes
                (species_id, size_class_no, size_range, size_range_min, size_range_max, description)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (species_id, size_class_no) DO NOTHING
            "#,
        )
        .bind(req.species_id)
        .bind(req.size_class_no)
        .bind(&req.size_range)
        .bind(min)
        .bind(max)
        .bind(&req.description)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 1 {
            return Ok(result.last_insert_rowid());
        }

        let id: SizeClassId = sqlx::query_scalar(
            "SELECT size_class_id FROM size_classes WHERE species_id = ? AND size_class_no = ?",
        )
        .bind(req.species_id)
        .bind(req.size_class_no)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "size_classes",
            op = "add",
            species_id = req.species_id,
            size_class_no = req.size_class_no,
            "Size class already recorded"
        );
        Ok(id)
    }

    async fn list_for_species(&self, species_id: SpeciesId) -> Result<Vec<SizeClass>> {
        let rows = sqlx::query(
            r#"
            SELECT size_class_id, species_id, size_class_no, size_range,
                   size_range_min, size_range_max, description
            FROM size_classes
            WHERE species_id = ?
            ORDER BY size_class_no
            "#,
        )
        .bind(species_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .iter()
            .map(|row| SizeClass {
                size_class_id: row.get("size_class_id"),
                species_id: row.get("species_id"),
                size_class_no: row.get("size_class_no"),
                size_range: row.get("size_range"),
                size_range_min: row.get("size_range_min"),
                size_range_max: row.get("size_range_max"),
                description: row.get("description"),
            })
            .collect())
    }
}
