use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use tracing::info;

use crate::db::{new_id, DbPool};
use crate::error::{Error, Result};
use crate::types::{
    Maintenance, MaintenancePatch, MaintenanceStatus, MaintenanceUpdate, NewMaintenance,
};

const MAINTENANCE_COLUMNS: &str = "id, title, description, status, scheduled_start, \
     scheduled_end, created_by, created_at, updated_at";

fn row_to_maintenance(row: &rusqlite::Row<'_>) -> rusqlite::Result<Maintenance> {
    Ok(Maintenance {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        scheduled_start: row.get(4)?,
        scheduled_end: row.get(5)?,
        created_by: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        updates: Vec::new(),
    })
}

fn load_updates(
    conn: &Connection,
    only: Option<&str>,
) -> rusqlite::Result<HashMap<String, Vec<MaintenanceUpdate>>> {
    let mut stmt = conn.prepare(
        "SELECT maintenance_id, id, message, status, created_at FROM maintenance_updates
         WHERE (?1 IS NULL OR maintenance_id = ?1) ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt.query_map([only], |row| {
        Ok((
            row.get::<_, String>(0)?,
            MaintenanceUpdate {
                id: row.get(1)?,
                message: row.get(2)?,
                status: row.get(3)?,
                created_at: row.get(4)?,
            },
        ))
    })?;
    let mut by_maintenance: HashMap<String, Vec<MaintenanceUpdate>> = HashMap::new();
    for row in rows {
        let (maintenance_id, update) = row?;
        by_maintenance.entry(maintenance_id).or_default().push(update);
    }
    Ok(by_maintenance)
}

fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if end < start {
        return Err(Error::validation("scheduledEnd must not be before scheduledStart"));
    }
    Ok(())
}

fn insert_update(
    conn: &Connection,
    maintenance_id: &str,
    message: &str,
    status: MaintenanceStatus,
    now: DateTime<Utc>,
) -> Result<()> {
    if message.trim().is_empty() {
        return Err(Error::validation("update message must not be empty"));
    }
    conn.execute(
        "INSERT INTO maintenance_updates (id, maintenance_id, message, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![new_id(), maintenance_id, message.trim(), status, now],
    )?;
    Ok(())
}

/// All maintenance windows ordered by scheduled start, updates newest first.
pub fn maintenance_list_db(pool: &DbPool) -> Result<Vec<Maintenance>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {MAINTENANCE_COLUMNS} FROM maintenance ORDER BY scheduled_start"
    ))?;
    let mut windows = stmt
        .query_map([], row_to_maintenance)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let mut updates = load_updates(&conn, None)?;
    for window in &mut windows {
        window.updates = updates.remove(&window.id).unwrap_or_default();
    }
    Ok(windows)
}

fn maintenance_get_conn(conn: &Connection, id: &str) -> Result<Maintenance> {
    let mut window = conn
        .query_row(
            &format!("SELECT {MAINTENANCE_COLUMNS} FROM maintenance WHERE id = ?1"),
            [id],
            row_to_maintenance,
        )
        .optional()?
        .ok_or_else(|| Error::not_found(format!("maintenance {id}")))?;
    window.updates = load_updates(conn, Some(id))?.remove(id).unwrap_or_default();
    Ok(window)
}

pub fn maintenance_get_db(pool: &DbPool, id: &str) -> Result<Maintenance> {
    let conn = pool.get()?;
    maintenance_get_conn(&conn, id)
}

pub fn maintenance_create_db(pool: &DbPool, new: &NewMaintenance) -> Result<Maintenance> {
    if new.title.trim().is_empty() {
        return Err(Error::validation("maintenance title must not be empty"));
    }
    validate_window(new.scheduled_start, new.scheduled_end)?;

    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    let id = new_id();
    let now = Utc::now();
    tx.execute(
        &format!(
            "INSERT INTO maintenance ({MAINTENANCE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        ),
        rusqlite::params![
            id,
            new.title.trim(),
            new.description,
            new.status,
            new.scheduled_start,
            new.scheduled_end,
            new.created_by,
            now,
            now
        ],
    )?;
    if let Some(message) = &new.message {
        insert_update(&tx, &id, message, new.status, now)?;
    }
    let window = maintenance_get_conn(&tx, &id)?;
    tx.commit()?;
    info!(maintenance_id = %id, start = %new.scheduled_start, "Maintenance scheduled");
    Ok(window)
}

/// Partial edit; an attached update is appended and sets the window's status.
pub fn maintenance_update_db(
    pool: &DbPool,
    id: &str,
    patch: &MaintenancePatch,
) -> Result<Maintenance> {
    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let current = maintenance_get_conn(&tx, id)?;
    let now = Utc::now();

    let title = match &patch.title {
        Some(title) if title.trim().is_empty() => {
            return Err(Error::validation("maintenance title must not be empty"))
        }
        Some(title) => title.trim().to_string(),
        None => current.title.clone(),
    };
    let start = patch.scheduled_start.unwrap_or(current.scheduled_start);
    let end = patch.scheduled_end.unwrap_or(current.scheduled_end);
    validate_window(start, end)?;
    let status = patch
        .update
        .as_ref()
        .map(|u| u.status)
        .or(patch.status)
        .unwrap_or(current.status);

    tx.execute(
        "UPDATE maintenance SET title = ?1, description = ?2, status = ?3, scheduled_start = ?4,
             scheduled_end = ?5, updated_at = ?6
         WHERE id = ?7",
        rusqlite::params![
            title,
            patch.description.as_ref().unwrap_or(&current.description),
            status,
            start,
            end,
            now,
            id
        ],
    )?;
    if let Some(update) = &patch.update {
        insert_update(&tx, id, &update.message, update.status, now)?;
    }
    let window = maintenance_get_conn(&tx, id)?;
    tx.commit()?;
    Ok(window)
}

pub fn maintenance_delete_db(pool: &DbPool, id: &str) -> Result<()> {
    let conn = pool.get()?;
    let deleted = conn.execute("DELETE FROM maintenance WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(Error::not_found(format!("maintenance {id}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::types::NewMaintenanceUpdate;
    use chrono::Duration;

    fn window(title: &str, starts_in_hours: i64) -> NewMaintenance {
        let start = Utc::now() + Duration::hours(starts_in_hours);
        NewMaintenance {
            title: title.to_string(),
            description: "Database upgrade".to_string(),
            status: MaintenanceStatus::Scheduled,
            scheduled_start: start,
            scheduled_end: start + Duration::hours(2),
            created_by: None,
            message: Some("Maintenance scheduled.".to_string()),
        }
    }

    #[test]
    fn create_and_list_by_start() {
        let (_dir, pool) = test_pool();
        maintenance_create_db(&pool, &window("Later", 48)).unwrap();
        maintenance_create_db(&pool, &window("Sooner", 2)).unwrap();
        let listed = maintenance_list_db(&pool).unwrap();
        let titles: Vec<&str> = listed.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Sooner", "Later"]);
        assert!(listed.iter().all(|m| m.updates.len() == 1));
    }

    #[test]
    fn create_rejects_inverted_window() {
        let (_dir, pool) = test_pool();
        let mut bad = window("Backwards", 1);
        bad.scheduled_end = bad.scheduled_start - Duration::minutes(1);
        assert!(matches!(maintenance_create_db(&pool, &bad), Err(Error::Validation(_))));
    }

    #[test]
    fn update_appends_and_moves_status() {
        let (_dir, pool) = test_pool();
        let created = maintenance_create_db(&pool, &window("Upgrade", 1)).unwrap();
        let patch = MaintenancePatch {
            update: Some(NewMaintenanceUpdate {
                message: "Work started.".to_string(),
                status: MaintenanceStatus::InProgress,
            }),
            ..Default::default()
        };
        let updated = maintenance_update_db(&pool, &created.id, &patch).unwrap();
        assert_eq!(updated.status, MaintenanceStatus::InProgress);
        assert_eq!(updated.updates.len(), 2);
        assert_eq!(updated.updates[0].message, "Work started.");
        assert!(updated.is_upcoming_or_active(Utc::now()));
    }

    #[test]
    fn completed_window_is_not_active() {
        let (_dir, pool) = test_pool();
        let created = maintenance_create_db(&pool, &window("Upgrade", 1)).unwrap();
        let patch = MaintenancePatch {
            status: Some(MaintenanceStatus::Completed),
            ..Default::default()
        };
        let updated = maintenance_update_db(&pool, &created.id, &patch).unwrap();
        assert!(!updated.is_upcoming_or_active(Utc::now()));
    }

    #[test]
    fn delete_and_not_found() {
        let (_dir, pool) = test_pool();
        let created = maintenance_create_db(&pool, &window("Upgrade", 1)).unwrap();
        maintenance_delete_db(&pool, &created.id).unwrap();
        assert!(matches!(maintenance_get_db(&pool, &created.id), Err(Error::NotFound(_))));
        assert!(matches!(maintenance_delete_db(&pool, &created.id), Err(Error::NotFound(_))));
    }
}
