//! Test fixtures for database integration tests.
//!
//! Each [`TestDatabase`] owns a fresh database file in its own temporary
//! directory, removed when the fixture is dropped.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use seatrait_db::test_fixtures::TestDatabase;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let test_db = TestDatabase::new().await;
//!     let id = test_db.add_species(148984, "Fucus vesiculosus").await;
//!     // Run your tests...
//! }
//! ```

use std::path::PathBuf;
use std::sync::Once;

use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

use crate::{CreateSpeciesRequest, Database, SpeciesId, SpeciesRepository};

static INIT_LOGGING: Once = Once::new();

/// Install a test-friendly subscriber once per process, filtered by `RUST_LOG`.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Throw-away database with the catalog seeded.
pub struct TestDatabase {
    pub db: Database,
    pub path: PathBuf,
    _dir: TempDir,
}

impl TestDatabase {
    /// Open a fresh database with categories and traits seeded.
    pub async fn new() -> Self {
        let test_db = Self::unseeded().await;
        test_db.db.seed().await.expect("Failed to seed trait catalog");
        test_db
    }

    /// Open a fresh database with the schema only.
    pub async fn unseeded() -> Self {
        init_test_logging();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("trait_ontology.db");
        let db = Database::open(&path)
            .await
            .expect("Failed to open test database");
        Self {
            db,
            path,
            _dir: dir,
        }
    }

    /// Register a species with a scientific name and return its id.
    pub async fn add_species(&self, aphia_id: i64, scientific_name: &str) -> SpeciesId {
        self.db
            .species
            .add(CreateSpeciesRequest::new(aphia_id).scientific_name(scientific_name))
            .await
            .expect("Failed to add species")
    }
}
