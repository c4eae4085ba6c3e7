use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::{self, MethodSummary};
use crate::commands::components::{components_list_db, components_list_visible_db};
use crate::commands::incidents::incidents_list_db;
use crate::commands::maintenance::maintenance_list_db;
use crate::db::DbPool;
use crate::error::Result;
use crate::types::{Component, Incident, Maintenance, StatusType};

/// Everything the status page renders, computed from one store snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicOverview {
    pub overall_status: StatusType,
    pub status_text: String,
    pub last_updated: Option<DateTime<Utc>>,
    pub components: Vec<Component>,
    /// Empty when the methods component is missing or hidden.
    pub methods: Vec<MethodSummary>,
    pub incidents: Vec<Incident>,
    pub maintenance: Vec<Maintenance>,
}

pub fn build_overview(
    components: Vec<Component>,
    incidents: Vec<Incident>,
    maintenance: Vec<Maintenance>,
    methods_component: &str,
    now: DateTime<Utc>,
) -> PublicOverview {
    let overall_status = aggregate::overall_status(&components);
    let methods = components
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(methods_component))
        .map(|m| aggregate::method_summary(&incidents, m))
        .unwrap_or_default();

    PublicOverview {
        overall_status,
        status_text: aggregate::status_text(overall_status).to_string(),
        last_updated: aggregate::last_updated(&components),
        methods,
        components,
        incidents,
        maintenance: maintenance
            .into_iter()
            .filter(|m| m.is_upcoming_or_active(now))
            .collect(),
    }
}

/// Loads a snapshot and aggregates it. `visible_only` selects the public view,
/// which also drops operator identities.
pub fn overview_db(pool: &DbPool, methods_component: &str, visible_only: bool) -> Result<PublicOverview> {
    let (components, incidents, maintenance) = if visible_only {
        (
            components_list_visible_db(pool)?,
            incidents_list_db(pool)?
                .into_iter()
                .map(Incident::without_operator)
                .collect(),
            maintenance_list_db(pool)?
                .into_iter()
                .map(Maintenance::without_operator)
                .collect(),
        )
    } else {
        (
            components_list_db(pool)?,
            incidents_list_db(pool)?,
            maintenance_list_db(pool)?,
        )
    };
    Ok(build_overview(
        components,
        incidents,
        maintenance,
        methods_component,
        Utc::now(),
    ))
}
