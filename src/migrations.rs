use std::collections::HashSet;

use crate::db::DbPool;
use crate::error::Result;

pub struct Migration {
    pub name: &'static str,
    pub sql: &'static str,
}

pub fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            name: "001_initial_schema",
            sql: "-- initial schema created by init_db, this is a placeholder
                  SELECT 1;",
        },
        Migration {
            name: "002_component_payment_countries",
            sql: "ALTER TABLE components ADD COLUMN payin_countries TEXT NOT NULL DEFAULT '[]';
                  ALTER TABLE components ADD COLUMN payout_countries TEXT NOT NULL DEFAULT '[]';",
        },
        Migration {
            name: "003_maintenance_tables",
            sql: "CREATE TABLE IF NOT EXISTS maintenance (
                      id TEXT PRIMARY KEY,
                      title TEXT NOT NULL,
                      description TEXT NOT NULL DEFAULT '',
                      status TEXT NOT NULL DEFAULT 'scheduled'
                          CHECK(status IN ('scheduled','in_progress','completed')),
                      scheduled_start TEXT NOT NULL,
                      scheduled_end TEXT NOT NULL,
                      created_by TEXT,
                      created_at TEXT NOT NULL,
                      updated_at TEXT NOT NULL
                  );

                  CREATE TABLE IF NOT EXISTS maintenance_updates (
                      id TEXT PRIMARY KEY,
                      maintenance_id TEXT NOT NULL REFERENCES maintenance(id) ON DELETE CASCADE,
                      message TEXT NOT NULL,
                      status TEXT NOT NULL
                          CHECK(status IN ('scheduled','in_progress','completed')),
                      created_at TEXT NOT NULL
                  );

                  CREATE INDEX IF NOT EXISTS idx_maintenance_start ON maintenance(scheduled_start);
                  CREATE INDEX IF NOT EXISTS idx_maintenance_updates_maintenance ON maintenance_updates(maintenance_id);",
        },
        Migration {
            name: "004_subscriptions",
            sql: "CREATE TABLE IF NOT EXISTS subscriptions (
                      id TEXT PRIMARY KEY,
                      type TEXT NOT NULL CHECK(type IN ('email','sms','webhook')),
                      email TEXT,
                      phone TEXT,
                      webhook_url TEXT,
                      components TEXT,
                      created_at TEXT NOT NULL
                  );
                  CREATE INDEX IF NOT EXISTS idx_subscriptions_type ON subscriptions(type);",
        },
        Migration {
            name: "005_metrics",
            sql: "CREATE TABLE IF NOT EXISTS metrics (
                      id TEXT PRIMARY KEY,
                      component_id TEXT NOT NULL REFERENCES components(id) ON DELETE CASCADE,
                      name TEXT NOT NULL,
                      value REAL NOT NULL,
                      unit TEXT NOT NULL DEFAULT '',
                      timestamp TEXT NOT NULL
                  );
                  CREATE INDEX IF NOT EXISTS idx_metrics_component ON metrics(component_id);
                  CREATE INDEX IF NOT EXISTS idx_metrics_timestamp ON metrics(timestamp);",
        },
    ]
}

/// Applies every migration not yet recorded, each in its own transaction.
pub fn run_pending(pool: &DbPool) -> Result<Vec<String>> {
    let applied_set: HashSet<String> = applied(pool)?.into_iter().collect();
    let mut conn = pool.get()?;

    let mut newly_applied = Vec::new();

    for migration in all_migrations() {
        if applied_set.contains(migration.name) {
            continue;
        }
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.execute("INSERT INTO migrations (name) VALUES (?1)", [migration.name])?;
        tx.commit()?;
        newly_applied.push(migration.name.to_string());
    }

    Ok(newly_applied)
}

/// Names of recorded migrations, oldest first.
pub fn applied(pool: &DbPool) -> Result<Vec<String>> {
    let conn = pool.get()?;
    let names = conn
        .prepare("SELECT name FROM migrations ORDER BY id")?
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn fresh_pool() -> (tempfile::TempDir, DbPool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::create_pool(&dir.path().join("test.sqlite")).unwrap();
        db::init_db(&pool).unwrap();
        (dir, pool)
    }

    #[test]
    fn run_pending_on_fresh_db_applies_all() {
        let (_dir, pool) = fresh_pool();
        let applied = run_pending(&pool).unwrap();
        assert_eq!(applied.len(), all_migrations().len());
    }

    #[test]
    fn run_pending_is_idempotent() {
        let (_dir, pool) = fresh_pool();
        let first = run_pending(&pool).unwrap();
        let second = run_pending(&pool).unwrap();
        assert!(!first.is_empty());
        assert!(second.is_empty());
    }

    #[test]
    fn applied_returns_names_in_order() {
        let (_dir, pool) = fresh_pool();
        run_pending(&pool).unwrap();
        let names = applied(&pool).unwrap();
        let expected: Vec<&str> = all_migrations().iter().map(|m| m.name).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn component_country_columns_default_to_empty_lists() {
        let (_dir, pool) = fresh_pool();
        run_pending(&pool).unwrap();
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO components (id, name, created_at, updated_at) VALUES ('c1', 'API', 'x', 'x')",
            [],
        )
        .unwrap();
        let payin: String = conn
            .query_row("SELECT payin_countries FROM components WHERE id = 'c1'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(payin, "[]");
    }

    #[test]
    fn later_tables_exist_after_migrating() {
        let (_dir, pool) = fresh_pool();
        run_pending(&pool).unwrap();
        let conn = pool.get().unwrap();
        conn.execute_batch(
            "SELECT id, title, status, scheduled_start, scheduled_end FROM maintenance LIMIT 0;
             SELECT id, maintenance_id, message FROM maintenance_updates LIMIT 0;
             SELECT id, type, email, phone, webhook_url, components FROM subscriptions LIMIT 0;
             SELECT id, component_id, name, value, unit, timestamp FROM metrics LIMIT 0;",
        )
        .expect("migrated tables should exist with expected columns");
    }
}
