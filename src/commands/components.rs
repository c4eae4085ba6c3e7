use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use tracing::{info, warn};

use crate::db::{new_id, DbPool};
use crate::error::{Error, Result};
use crate::types::component::normalize_countries;
use crate::types::{Component, ComponentPatch, NewComponent, StatusType};

const COMPONENT_COLUMNS: &str = "id, name, description, status, \"group\", \"order\", visible, \
     payin_countries, payout_countries, created_at, updated_at";

fn countries_from_json(component_id: &str, raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(component_id, error = %e, "Failed to parse component country list");
        Vec::new()
    })
}

fn row_to_component(row: &rusqlite::Row<'_>) -> rusqlite::Result<Component> {
    let id: String = row.get(0)?;
    let payin: String = row.get(7)?;
    let payout: String = row.get(8)?;
    Ok(Component {
        name: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        group: row.get(4)?,
        order: row.get(5)?,
        visible: row.get(6)?,
        payin_countries: countries_from_json(&id, &payin),
        payout_countries: countries_from_json(&id, &payout),
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        id,
    })
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("component name must not be empty"));
    }
    Ok(())
}

/// All components in display order.
pub fn components_list_db(pool: &DbPool) -> Result<Vec<Component>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {COMPONENT_COLUMNS} FROM components ORDER BY \"order\", name"
    ))?;
    let components = stmt
        .query_map([], row_to_component)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(components)
}

/// Components exposed on the public page, in display order.
pub fn components_list_visible_db(pool: &DbPool) -> Result<Vec<Component>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {COMPONENT_COLUMNS} FROM components WHERE visible = 1 ORDER BY \"order\", name"
    ))?;
    let components = stmt
        .query_map([], row_to_component)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(components)
}

pub fn component_get_db(pool: &DbPool, id: &str) -> Result<Component> {
    let conn = pool.get()?;
    component_get_conn(&conn, id)
}

fn component_get_conn(conn: &Connection, id: &str) -> Result<Component> {
    conn.query_row(
        &format!("SELECT {COMPONENT_COLUMNS} FROM components WHERE id = ?1"),
        [id],
        row_to_component,
    )
    .optional()?
    .ok_or_else(|| Error::not_found(format!("component {id}")))
}

/// Insert a new component with status `operational`.
///
/// Without an explicit `order` the component is placed after the current last one.
pub fn component_create_db(pool: &DbPool, new: &NewComponent) -> Result<Component> {
    validate_name(&new.name)?;
    let conn = pool.get()?;
    let order = match new.order {
        Some(order) => order,
        None => conn.query_row(
            "SELECT COALESCE(MAX(\"order\"), 0) + 1 FROM components",
            [],
            |row| row.get(0),
        )?,
    };
    let now = Utc::now();
    let component = Component {
        id: new_id(),
        name: new.name.trim().to_string(),
        description: new.description.clone(),
        status: StatusType::Operational,
        group: new.group.clone(),
        order,
        visible: new.visible,
        payin_countries: normalize_countries(&new.payin_countries),
        payout_countries: normalize_countries(&new.payout_countries),
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        &format!(
            "INSERT INTO components ({COMPONENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        rusqlite::params![
            component.id,
            component.name,
            component.description,
            component.status,
            component.group,
            component.order,
            component.visible,
            serde_json::to_string(&component.payin_countries)?,
            serde_json::to_string(&component.payout_countries)?,
            component.created_at,
            component.updated_at,
        ],
    )?;
    info!(component_id = %component.id, name = %component.name, "Component created");
    Ok(component)
}

fn component_write_conn(conn: &Connection, component: &Component) -> Result<()> {
    let changed = conn.execute(
        "UPDATE components SET name = ?1, description = ?2, status = ?3, \"group\" = ?4,
             \"order\" = ?5, visible = ?6, payin_countries = ?7, payout_countries = ?8,
             updated_at = ?9
         WHERE id = ?10",
        rusqlite::params![
            component.name,
            component.description,
            component.status,
            component.group,
            component.order,
            component.visible,
            serde_json::to_string(&component.payin_countries)?,
            serde_json::to_string(&component.payout_countries)?,
            component.updated_at,
            component.id,
        ],
    )?;
    if changed == 0 {
        return Err(Error::not_found(format!("component {}", component.id)));
    }
    Ok(())
}

/// Apply a partial edit. Absent fields keep their stored value.
///
/// The read and the write share one IMMEDIATE transaction, so concurrent edits
/// to different fields of the same component are serialized.
pub fn component_update_db(pool: &DbPool, id: &str, patch: &ComponentPatch) -> Result<Component> {
    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut component = component_get_conn(&tx, id)?;

    if let Some(name) = &patch.name {
        validate_name(name)?;
        component.name = name.trim().to_string();
    }
    if let Some(description) = &patch.description {
        component.description = description.clone();
    }
    if let Some(group) = &patch.group {
        component.group = group.clone();
    }
    if let Some(status) = patch.status {
        component.status = status;
    }
    if let Some(order) = patch.order {
        component.order = order;
    }
    if let Some(visible) = patch.visible {
        component.visible = visible;
    }
    if let Some(countries) = &patch.payin_countries {
        component.payin_countries = normalize_countries(countries);
    }
    if let Some(countries) = &patch.payout_countries {
        component.payout_countries = normalize_countries(countries);
    }
    component.updated_at = Utc::now();

    component_write_conn(&tx, &component)?;
    tx.commit()?;
    Ok(component)
}

pub fn component_set_status_db(pool: &DbPool, id: &str, status: StatusType) -> Result<Component> {
    let patch = ComponentPatch {
        status: Some(status),
        ..Default::default()
    };
    let component = component_update_db(pool, id, &patch)?;
    info!(component_id = id, status = %status, "Component status updated");
    Ok(component)
}

pub fn component_set_visibility_db(pool: &DbPool, id: &str, visible: bool) -> Result<Component> {
    let patch = ComponentPatch {
        visible: Some(visible),
        ..Default::default()
    };
    component_update_db(pool, id, &patch)
}

pub fn component_delete_db(pool: &DbPool, id: &str) -> Result<()> {
    let conn = pool.get()?;
    let deleted = conn.execute("DELETE FROM components WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(Error::not_found(format!("component {id}")));
    }
    info!(component_id = id, "Component deleted");
    Ok(())
}

pub fn components_count_db(pool: &DbPool) -> Result<i64> {
    let conn = pool.get()?;
    let count = conn.query_row("SELECT COUNT(*) FROM components", [], |row| row.get(0))?;
    Ok(count)
}
