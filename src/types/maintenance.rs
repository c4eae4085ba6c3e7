use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::MaintenanceStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceUpdate {
    pub id: String,
    pub message: String,
    pub status: MaintenanceStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Maintenance {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: MaintenanceStatus,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    /// Operator identity. Left out of public responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub updates: Vec<MaintenanceUpdate>,
}

impl Maintenance {
    /// Not yet completed and not already over.
    pub fn is_upcoming_or_active(&self, now: DateTime<Utc>) -> bool {
        self.status != MaintenanceStatus::Completed && self.scheduled_end >= now
    }

    /// Copy fit for the public page, without the operator identity.
    pub fn without_operator(self) -> Self {
        Self {
            created_by: None,
            ..self
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMaintenanceUpdate {
    pub message: String,
    pub status: MaintenanceStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMaintenance {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: MaintenanceStatus,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaintenancePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<MaintenanceStatus>,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
    pub update: Option<NewMaintenanceUpdate>,
}
