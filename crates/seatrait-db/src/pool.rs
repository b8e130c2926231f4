//! Database connection pool management.

use std::path::Path;
use std::time::{Duration, Instant};

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::{debug, info};

use seatrait_core::defaults;
use seatrait_core::{Error, Result};

/// Pool configuration options.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Connection acquire timeout.
    pub acquire_timeout: Duration,
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// Use write-ahead logging so readers do not block on the writer.
    pub wal: bool,
    /// Enforce foreign key constraints.
    pub foreign_keys: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: defaults::DB_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(defaults::DB_BUSY_TIMEOUT_SECS),
            wal: true,
            foreign_keys: true,
        }
    }
}

impl PoolConfig {
    /// Create a new pool configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of connections.
    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n.max(1);
        self
    }

    /// Set the connection acquire timeout.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set the busy timeout.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Enable or disable write-ahead logging.
    pub fn wal(mut self, enabled: bool) -> Self {
        self.wal = enabled;
        self
    }

    /// Enable or disable foreign key enforcement.
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }
}

/// Open a pool on a database file with default configuration.
pub async fn create_pool(path: impl AsRef<Path>) -> Result<SqlitePool> {
    create_pool_with_config(path, PoolConfig::default()).await
}

/// Open a pool on a database file, creating the file and its parent
/// directory if absent.
///
/// Connections are kept for the lifetime of the pool. Failure to create or
/// open the file is fatal for the caller.
pub async fn create_pool_with_config(path: impl AsRef<Path>, config: PoolConfig) -> Result<SqlitePool> {
    let path = path.as_ref();
    let start = Instant::now();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    info!(
        subsystem = "db",
        component = "pool",
        op = "create",
        path = %path.display(),
        max_connections = config.max_connections,
        busy_timeout_ms = config.busy_timeout.as_millis() as u64,
        wal = config.wal,
        "Opening database"
    );

    let journal_mode = if config.wal {
        SqliteJournalMode::Wal
    } else {
        SqliteJournalMode::Delete
    };

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(journal_mode)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(config.foreign_keys)
        .busy_timeout(config.busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(1)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "db",
        component = "pool",
        op = "established",
        pool_size = pool.size(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Database opened"
    );
    Ok(pool)
}

/// Log current pool metrics.
pub fn log_pool_metrics(pool: &SqlitePool) {
    debug!(
        subsystem = "db",
        component = "pool",
        op = "metrics",
        pool_size = pool.size(),
        pool_idle = pool.num_idle(),
        "Pool health check"
    );
}
