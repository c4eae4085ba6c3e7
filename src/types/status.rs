use serde::{Deserialize, Serialize};

/// Health of a component, ordered by severity: `Operational < Degraded < Outage`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StatusType {
    #[default]
    Operational,
    Degraded,
    Outage,
}

text_enum!(StatusType {
    Operational => "operational",
    Degraded => "degraded",
    Outage => "outage",
});

impl StatusType {
    /// Severity merge: the more severe of the two.
    pub fn merge(self, other: StatusType) -> StatusType {
        self.max(other)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    #[default]
    Investigating,
    Identified,
    Monitoring,
    Resolved,
}

text_enum!(IncidentStatus {
    Investigating => "investigating",
    Identified => "identified",
    Monitoring => "monitoring",
    Resolved => "resolved",
});

impl IncidentStatus {
    pub fn is_resolved(self) -> bool {
        self == IncidentStatus::Resolved
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    #[default]
    None,
    Minor,
    Major,
    Critical,
}

text_enum!(Impact {
    None => "none",
    Minor => "minor",
    Major => "major",
    Critical => "critical",
});

/// Direction of a payment-method flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodType {
    Payin,
    Payout,
}

text_enum!(MethodType {
    Payin => "payin",
    Payout => "payout",
});

impl MethodType {
    pub const ALL: [MethodType; 2] = [MethodType::Payin, MethodType::Payout];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
}

text_enum!(MaintenanceStatus {
    Scheduled => "scheduled",
    InProgress => "in_progress",
    Completed => "completed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionType {
    Email,
    Sms,
    Webhook,
}

text_enum!(SubscriptionType {
    Email => "email",
    Sms => "sms",
    Webhook => "webhook",
});
