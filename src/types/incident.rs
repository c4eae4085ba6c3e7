use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::{Impact, IncidentStatus, MethodType, StatusType};

/// A component touched by an incident, with the severity the incident assigns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedComponent {
    pub component_id: String,
    #[serde(default)]
    pub status: Option<StatusType>,
}

/// A country impacted for one payment-method direction.
///
/// `status` is optional: an entry without one only says the country is affected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedMethod {
    #[serde(rename = "type")]
    pub method_type: MethodType,
    pub country_code: String,
    #[serde(default)]
    pub status: Option<StatusType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentUpdate {
    pub id: String,
    pub message: String,
    pub status: IncidentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Incident {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: IncidentStatus,
    pub impact: Impact,
    /// Operator identity. Left out of public responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub affected_components: Vec<AffectedComponent>,
    pub methods_affected: Vec<AffectedMethod>,
    /// Newest first.
    pub updates: Vec<IncidentUpdate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Incident {
    /// Copy fit for the public page and for subscribers, without the operator identity.
    pub fn without_operator(self) -> Self {
        Self {
            created_by: None,
            ..self
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status.is_resolved()
    }

    pub fn affects(&self, component_id: &str) -> bool {
        self.affected_components
            .iter()
            .any(|c| c.component_id == component_id)
    }

    /// Severity this incident assigns to a component, if any.
    pub fn component_status(&self, component_id: &str) -> Option<StatusType> {
        self.affected_components
            .iter()
            .filter(|c| c.component_id == component_id)
            .filter_map(|c| c.status)
            .max()
    }

    /// Most severe component status recorded on the incident.
    pub fn worst_component_status(&self) -> StatusType {
        self.affected_components
            .iter()
            .filter_map(|c| c.status)
            .max()
            .unwrap_or_default()
    }

    pub fn methods(&self, method_type: MethodType) -> impl Iterator<Item = &AffectedMethod> {
        self.methods_affected
            .iter()
            .filter(move |m| m.method_type == method_type)
    }

    pub fn component_ids(&self) -> Vec<String> {
        self.affected_components
            .iter()
            .map(|c| c.component_id.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIncidentUpdate {
    pub message: String,
    pub status: IncidentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIncident {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: IncidentStatus,
    #[serde(default)]
    pub impact: Impact,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub affected_components: Vec<AffectedComponent>,
    #[serde(default)]
    pub methods_affected: Vec<AffectedMethod>,
    /// Initial update message, recorded with the incident's status.
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IncidentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<IncidentStatus>,
    pub impact: Option<Impact>,
    /// Replaces the whole list when present.
    pub affected_components: Option<Vec<AffectedComponent>>,
    /// Replaces the whole list when present.
    pub methods_affected: Option<Vec<AffectedMethod>>,
    pub update: Option<NewIncidentUpdate>,
}
