use chrono::Utc;

use crate::db::{new_id, DbPool};
use crate::error::{Error, Result};
use crate::types::{Metric, MetricFilter, NewMetric};

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 1000;

fn row_to_metric(row: &rusqlite::Row<'_>) -> rusqlite::Result<Metric> {
    Ok(Metric {
        id: row.get(0)?,
        component_id: row.get(1)?,
        name: row.get(2)?,
        value: row.get(3)?,
        unit: row.get(4)?,
        timestamp: row.get(5)?,
    })
}

/// Newest samples first, optionally for a single component.
pub fn metrics_list_db(pool: &DbPool, filter: &MetricFilter) -> Result<Vec<Metric>> {
    let conn = pool.get()?;
    let limit = filter.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let mut stmt = conn.prepare(
        "SELECT id, component_id, name, value, unit, timestamp FROM metrics
         WHERE (?1 IS NULL OR component_id = ?1)
         ORDER BY timestamp DESC, rowid DESC LIMIT ?2",
    )?;
    let metrics = stmt
        .query_map(rusqlite::params![filter.component_id, limit], row_to_metric)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(metrics)
}

pub fn metric_create_db(pool: &DbPool, new: &NewMetric) -> Result<Metric> {
    if new.name.trim().is_empty() {
        return Err(Error::validation("metric name must not be empty"));
    }
    if !new.value.is_finite() {
        return Err(Error::validation("metric value must be a finite number"));
    }

    let conn = pool.get()?;
    let known: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM components WHERE id = ?1)",
        [&new.component_id],
        |row| row.get(0),
    )?;
    if !known {
        return Err(Error::not_found(format!("component {}", new.component_id)));
    }

    let metric = Metric {
        id: new_id(),
        component_id: new.component_id.clone(),
        name: new.name.trim().to_string(),
        value: new.value,
        unit: new.unit.clone(),
        timestamp: Utc::now(),
    };
    conn.execute(
        "INSERT INTO metrics (id, component_id, name, value, unit, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            metric.id,
            metric.component_id,
            metric.name,
            metric.value,
            metric.unit,
            metric.timestamp
        ],
    )?;
    Ok(metric)
}

pub fn metric_delete_db(pool: &DbPool, id: &str) -> Result<()> {
    let conn = pool.get()?;
    if conn.execute("DELETE FROM metrics WHERE id = ?1", [id])? == 0 {
        return Err(Error::not_found(format!("metric {id}")));
    }
    Ok(())
}
