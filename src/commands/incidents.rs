use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use tracing::info;

use crate::db::{new_id, DbPool};
use crate::error::{Error, Result};
use crate::types::{
    AffectedComponent, AffectedMethod, Incident, IncidentPatch, IncidentStatus, IncidentUpdate,
    NewIncident, NewIncidentUpdate,
};

const INCIDENT_COLUMNS: &str =
    "id, title, description, status, impact, created_by, created_at, updated_at";

fn row_to_incident(row: &rusqlite::Row<'_>) -> rusqlite::Result<Incident> {
    Ok(Incident {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        impact: row.get(4)?,
        created_by: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        affected_components: Vec::new(),
        methods_affected: Vec::new(),
        updates: Vec::new(),
    })
}

/// Child rows keyed by incident id. `only` restricts loading to one incident.
struct Children {
    components: HashMap<String, Vec<AffectedComponent>>,
    methods: HashMap<String, Vec<AffectedMethod>>,
    updates: HashMap<String, Vec<IncidentUpdate>>,
}

fn load_children(conn: &Connection, only: Option<&str>) -> rusqlite::Result<Children> {
    let mut components: HashMap<String, Vec<AffectedComponent>> = HashMap::new();
    let mut stmt = conn.prepare(
        "SELECT incident_id, component_id, status FROM affected_components
         WHERE (?1 IS NULL OR incident_id = ?1) ORDER BY id",
    )?;
    let rows = stmt.query_map([only], |row| {
        Ok((
            row.get::<_, String>(0)?,
            AffectedComponent {
                component_id: row.get(1)?,
                status: row.get(2)?,
            },
        ))
    })?;
    for row in rows {
        let (incident_id, component) = row?;
        components.entry(incident_id).or_default().push(component);
    }

    let mut methods: HashMap<String, Vec<AffectedMethod>> = HashMap::new();
    let mut stmt = conn.prepare(
        "SELECT incident_id, type, country_code, status FROM methods_affected
         WHERE (?1 IS NULL OR incident_id = ?1) ORDER BY id",
    )?;
    let rows = stmt.query_map([only], |row| {
        Ok((
            row.get::<_, String>(0)?,
            AffectedMethod {
                method_type: row.get(1)?,
                country_code: row.get(2)?,
                status: row.get(3)?,
            },
        ))
    })?;
    for row in rows {
        let (incident_id, method) = row?;
        methods.entry(incident_id).or_default().push(method);
    }

    let mut updates: HashMap<String, Vec<IncidentUpdate>> = HashMap::new();
    let mut stmt = conn.prepare(
        "SELECT incident_id, id, message, status, created_at FROM incident_updates
         WHERE (?1 IS NULL OR incident_id = ?1) ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt.query_map([only], |row| {
        Ok((
            row.get::<_, String>(0)?,
            IncidentUpdate {
                id: row.get(1)?,
                message: row.get(2)?,
                status: row.get(3)?,
                created_at: row.get(4)?,
            },
        ))
    })?;
    for row in rows {
        let (incident_id, update) = row?;
        updates.entry(incident_id).or_default().push(update);
    }

    Ok(Children {
        components,
        methods,
        updates,
    })
}

fn attach(incident: &mut Incident, children: &mut Children) {
    incident.affected_components = children.components.remove(&incident.id).unwrap_or_default();
    incident.methods_affected = children.methods.remove(&incident.id).unwrap_or_default();
    incident.updates = children.updates.remove(&incident.id).unwrap_or_default();
}

/// All incidents, newest first, with affected components, methods and updates attached.
pub fn incidents_list_db(pool: &DbPool) -> Result<Vec<Incident>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {INCIDENT_COLUMNS} FROM incidents ORDER BY created_at DESC, rowid DESC"
    ))?;
    let mut incidents = stmt
        .query_map([], row_to_incident)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut children = load_children(&conn, None)?;
    for incident in &mut incidents {
        attach(incident, &mut children);
    }
    Ok(incidents)
}

fn incident_get_conn(conn: &Connection, id: &str) -> Result<Incident> {
    let mut incident = conn
        .query_row(
            &format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = ?1"),
            [id],
            row_to_incident,
        )
        .optional()?
        .ok_or_else(|| Error::not_found(format!("incident {id}")))?;
    let mut children = load_children(conn, Some(id))?;
    attach(&mut incident, &mut children);
    Ok(incident)
}

pub fn incident_get_db(pool: &DbPool, id: &str) -> Result<Incident> {
    let conn = pool.get()?;
    incident_get_conn(&conn, id)
}

fn normalize_components(components: &[AffectedComponent]) -> Result<Vec<AffectedComponent>> {
    let mut out: Vec<AffectedComponent> = Vec::with_capacity(components.len());
    for component in components {
        let id = component.component_id.trim();
        if id.is_empty() {
            return Err(Error::validation("affected component id must not be empty"));
        }
        match out.iter_mut().find(|c| c.component_id == id) {
            // Listed twice: keep the more severe status.
            Some(existing) => existing.status = existing.status.max(component.status),
            None => out.push(AffectedComponent {
                component_id: id.to_string(),
                status: component.status,
            }),
        }
    }
    Ok(out)
}

fn normalize_methods(methods: &[AffectedMethod]) -> Result<Vec<AffectedMethod>> {
    methods
        .iter()
        .map(|m| {
            let code = m.country_code.trim().to_ascii_uppercase();
            if code.is_empty() {
                return Err(Error::validation("affected method country code must not be empty"));
            }
            Ok(AffectedMethod {
                method_type: m.method_type,
                country_code: code,
                status: m.status,
            })
        })
        .collect()
}

fn replace_components(
    tx: &Transaction<'_>,
    incident_id: &str,
    components: &[AffectedComponent],
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    tx.execute(
        "DELETE FROM affected_components WHERE incident_id = ?1",
        [incident_id],
    )?;
    let mut stmt = tx.prepare(
        "INSERT INTO affected_components (incident_id, component_id, status, created_at)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for component in components {
        stmt.execute(rusqlite::params![
            incident_id,
            component.component_id,
            component.status,
            now
        ])?;
    }
    Ok(())
}

fn replace_methods(
    tx: &Transaction<'_>,
    incident_id: &str,
    methods: &[AffectedMethod],
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    tx.execute(
        "DELETE FROM methods_affected WHERE incident_id = ?1",
        [incident_id],
    )?;
    let mut stmt = tx.prepare(
        "INSERT INTO methods_affected (incident_id, type, country_code, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for method in methods {
        stmt.execute(rusqlite::params![
            incident_id,
            method.method_type,
            method.country_code,
            method.status,
            now
        ])?;
    }
    Ok(())
}

fn insert_update(
    tx: &Transaction<'_>,
    incident_id: &str,
    message: &str,
    status: IncidentStatus,
    now: DateTime<Utc>,
) -> Result<()> {
    if message.trim().is_empty() {
        return Err(Error::validation("update message must not be empty"));
    }
    tx.execute(
        "INSERT INTO incident_updates (id, incident_id, message, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![new_id(), incident_id, message.trim(), status, now],
    )?;
    Ok(())
}

/// Create an incident with its affected components, methods and optional first update.
///
/// Everything is written in one transaction; a failure leaves no partial incident behind.
pub fn incident_create_db(pool: &DbPool, new: &NewIncident) -> Result<Incident> {
    if new.title.trim().is_empty() {
        return Err(Error::validation("incident title must not be empty"));
    }
    let components = normalize_components(&new.affected_components)?;
    let methods = normalize_methods(&new.methods_affected)?;

    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    let id = new_id();
    let now = Utc::now();

    tx.execute(
        &format!("INSERT INTO incidents ({INCIDENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
        rusqlite::params![
            id,
            new.title.trim(),
            new.description,
            new.status,
            new.impact,
            new.created_by,
            now,
            now
        ],
    )?;
    replace_components(&tx, &id, &components, now)?;
    replace_methods(&tx, &id, &methods, now)?;
    if let Some(message) = &new.message {
        insert_update(&tx, &id, message, new.status, now)?;
    }

    let incident = incident_get_conn(&tx, &id)?;
    tx.commit()?;
    info!(incident_id = %id, status = %new.status, components = components.len(), "Incident created");
    Ok(incident)
}

/// Apply a partial edit to an incident.
///
/// Lists present in the patch replace the stored ones. An attached update is
/// appended and its status becomes the incident's status, which is how a
/// resolved incident gets reopened. No transition between statuses is refused.
pub fn incident_update_db(pool: &DbPool, id: &str, patch: &IncidentPatch) -> Result<Incident> {
    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let current = incident_get_conn(&tx, id)?;
    let now = Utc::now();

    let title = match &patch.title {
        Some(title) if title.trim().is_empty() => {
            return Err(Error::validation("incident title must not be empty"))
        }
        Some(title) => title.trim().to_string(),
        None => current.title.clone(),
    };
    let status = patch
        .update
        .as_ref()
        .map(|u| u.status)
        .or(patch.status)
        .unwrap_or(current.status);

    tx.execute(
        "UPDATE incidents SET title = ?1, description = ?2, status = ?3, impact = ?4, updated_at = ?5
         WHERE id = ?6",
        rusqlite::params![
            title,
            patch.description.as_ref().unwrap_or(&current.description),
            status,
            patch.impact.unwrap_or(current.impact),
            now,
            id
        ],
    )?;
    if let Some(components) = &patch.affected_components {
        replace_components(&tx, id, &normalize_components(components)?, now)?;
    }
    if let Some(methods) = &patch.methods_affected {
        replace_methods(&tx, id, &normalize_methods(methods)?, now)?;
    }
    if let Some(update) = &patch.update {
        insert_update(&tx, id, &update.message, update.status, now)?;
    }

    let incident = incident_get_conn(&tx, id)?;
    tx.commit()?;

    if current.is_resolved() && !incident.is_resolved() {
        info!(incident_id = id, status = %incident.status, "Resolved incident reopened");
    } else if current.status != incident.status {
        info!(incident_id = id, from = %current.status, to = %incident.status, "Incident status changed");
    }
    Ok(incident)
}

/// Append an update and move the incident to the update's status.
pub fn incident_post_update_db(
    pool: &DbPool,
    id: &str,
    update: &NewIncidentUpdate,
) -> Result<Incident> {
    let patch = IncidentPatch {
        update: Some(update.clone()),
        ..Default::default()
    };
    incident_update_db(pool, id, &patch)
}

/// Delete an incident; its children go with it via `ON DELETE CASCADE`.
pub fn incident_delete_db(pool: &DbPool, id: &str) -> Result<()> {
    let conn = pool.get()?;
    let deleted = conn.execute("DELETE FROM incidents WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(Error::not_found(format!("incident {id}")));
    }
    info!(incident_id = id, "Incident deleted");
    Ok(())
}
