use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub type DbPool = Pool<SqliteConnectionManager>;

pub fn statuspage_data_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".statuspage"))
        .ok_or_else(|| Error::Config("could not determine home directory".to_string()))
}

pub fn default_db_path() -> Result<PathBuf> {
    Ok(statuspage_data_dir()?.join("state").join("statuspage.sqlite"))
}

pub fn create_pool(db_path: &Path) -> Result<DbPool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    // Foreign keys are per-connection in SQLite, so every pooled connection gets the pragma.
    let manager = SqliteConnectionManager::file(db_path)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;"));
    let pool = Pool::builder().max_size(8).build(manager)?;

    let conn = pool.get()?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    Ok(pool)
}

pub fn init_db(pool: &DbPool) -> Result<()> {
    let conn = pool.get()?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS components (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'operational'
                CHECK(status IN ('operational','degraded','outage')),
            \"group\" TEXT NOT NULL DEFAULT '',
            \"order\" INTEGER NOT NULL DEFAULT 0,
            visible INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS incidents (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL
                CHECK(status IN ('investigating','identified','monitoring','resolved')),
            impact TEXT NOT NULL DEFAULT 'none'
                CHECK(impact IN ('none','minor','major','critical')),
            created_by TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS affected_components (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            incident_id TEXT NOT NULL REFERENCES incidents(id) ON DELETE CASCADE,
            component_id TEXT NOT NULL,
            status TEXT CHECK(status IS NULL OR status IN ('operational','degraded','outage')),
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS methods_affected (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            incident_id TEXT NOT NULL REFERENCES incidents(id) ON DELETE CASCADE,
            type TEXT NOT NULL CHECK(type IN ('payin','payout')),
            country_code TEXT NOT NULL,
            status TEXT CHECK(status IS NULL OR status IN ('operational','degraded','outage')),
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS incident_updates (
            id TEXT PRIMARY KEY,
            incident_id TEXT NOT NULL REFERENCES incidents(id) ON DELETE CASCADE,
            message TEXT NOT NULL,
            status TEXT NOT NULL
                CHECK(status IN ('investigating','identified','monitoring','resolved')),
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_components_order ON components(\"order\");
        CREATE INDEX IF NOT EXISTS idx_incidents_created ON incidents(created_at);
        CREATE INDEX IF NOT EXISTS idx_incidents_status ON incidents(status);
        CREATE INDEX IF NOT EXISTS idx_affected_components_incident ON affected_components(incident_id);
        CREATE INDEX IF NOT EXISTS idx_methods_affected_incident ON methods_affected(incident_id);
        CREATE INDEX IF NOT EXISTS idx_incident_updates_incident ON incident_updates(incident_id);",
    )?;

    Ok(())
}

/// Opens the pool and brings the schema fully up to date.
pub fn open(db_path: &Path) -> Result<DbPool> {
    let pool = create_pool(db_path)?;
    init_db(&pool)?;
    let applied = crate::migrations::run_pending(&pool)?;
    if !applied.is_empty() {
        tracing::info!(migrations = ?applied, "applied schema migrations");
    }
    Ok(pool)
}

/// New opaque row id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
pub(crate) fn test_pool() -> (tempfile::TempDir, DbPool) {
    let dir = tempfile::tempdir().unwrap();
    let pool = open(&dir.path().join("test.sqlite")).unwrap();
    (dir, pool)
}
