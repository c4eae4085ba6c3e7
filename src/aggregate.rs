//! Status aggregation over in-memory snapshots of components and incidents.
//!
//! Every function here is pure and total: missing information folds to
//! [`StatusType::Operational`], and merging is a max over severities, so the
//! order of the input never changes a result. Resolved incidents are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Component, Incident, MethodType, StatusType};

/// Worst status across `components`; `Operational` when empty.
///
/// Callers decide which components count (the public page passes only visible ones).
pub fn overall_status<'a, I>(components: I) -> StatusType
where
    I: IntoIterator<Item = &'a Component>,
{
    components
        .into_iter()
        .map(|c| c.status)
        .fold(StatusType::Operational, StatusType::merge)
}

fn open_incidents<'a, I>(incidents: I) -> impl Iterator<Item = &'a Incident>
where
    I: IntoIterator<Item = &'a Incident>,
{
    incidents.into_iter().filter(|i| !i.is_resolved())
}

/// Status of one payment flow of the methods component.
///
/// An open incident that lists countries for `method_type` makes the flow
/// `Degraded`; it becomes `Outage` when that incident also puts
/// `component_id` in outage.
pub fn method_status<'a, I>(incidents: I, method_type: MethodType, component_id: &str) -> StatusType
where
    I: IntoIterator<Item = &'a Incident>,
{
    open_incidents(incidents)
        .filter(|incident| incident.methods(method_type).next().is_some())
        .map(|incident| match incident.component_status(component_id) {
            Some(StatusType::Outage) => StatusType::Outage,
            _ => StatusType::Degraded,
        })
        .fold(StatusType::Operational, StatusType::merge)
}

/// Status of one country for one payment flow.
///
/// Each matching entry contributes its own status, or when it has none, the
/// incident's worst component status raised to at least `Degraded`.
pub fn country_status<'a, I>(incidents: I, method_type: MethodType, country_code: &str) -> StatusType
where
    I: IntoIterator<Item = &'a Incident>,
{
    let code = country_code.trim();
    open_incidents(incidents)
        .flat_map(|incident| {
            let implied = incident.worst_component_status().merge(StatusType::Degraded);
            incident
                .methods(method_type)
                .filter(move |m| m.country_code.trim().eq_ignore_ascii_case(code))
                .map(move |m| m.status.unwrap_or(implied))
        })
        .fold(StatusType::Operational, StatusType::merge)
}

/// Headline text for a status.
pub fn status_text(status: StatusType) -> &'static str {
    match status {
        StatusType::Operational => "All Systems Operational",
        StatusType::Degraded => "Partial System Outage",
        StatusType::Outage => "Major System Outage",
    }
}

/// Badge shown next to an incident: resolved ones read as operational.
pub fn incident_display_status(incident: &Incident) -> StatusType {
    if incident.is_resolved() {
        StatusType::Operational
    } else {
        StatusType::Degraded
    }
}

/// Most recent `updated_at` among the components.
pub fn last_updated<'a, I>(components: I) -> Option<DateTime<Utc>>
where
    I: IntoIterator<Item = &'a Component>,
{
    components.into_iter().map(|c| c.updated_at).max()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryStatus {
    pub country_code: String,
    pub status: StatusType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodSummary {
    #[serde(rename = "type")]
    pub method_type: MethodType,
    pub status: StatusType,
    pub countries: Vec<CountryStatus>,
}

/// Per-flow, per-country breakdown for the methods component.
///
/// Countries come from the component's configured lists; a country that only
/// shows up in an open incident is appended after them so it is not hidden.
/// A country never reads worse than its flow: an incident that takes down
/// another component while methods are only degraded leaves its countries
/// degraded here, even though [`country_status`] alone reports the outage.
pub fn method_summary(incidents: &[Incident], methods: &Component) -> Vec<MethodSummary> {
    MethodType::ALL
        .iter()
        .map(|&method_type| {
            let mut codes: Vec<String> = methods
                .countries(method_type)
                .iter()
                .map(|c| c.to_ascii_uppercase())
                .collect();
            for entry in open_incidents(incidents).flat_map(|i| i.methods(method_type)) {
                let code = entry.country_code.trim().to_ascii_uppercase();
                if !codes.contains(&code) {
                    codes.push(code);
                }
            }

            let status = method_status(incidents, method_type, &methods.id);
            let countries = codes
                .into_iter()
                .map(|code| CountryStatus {
                    status: country_status(incidents, method_type, &code).min(status),
                    country_code: code,
                })
                .collect();

            MethodSummary {
                method_type,
                status,
                countries,
            }
        })
        .collect()
}
