use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::{MethodType, StatusType};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Component {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: StatusType,
    pub group: String,
    pub order: i64,
    pub visible: bool,
    pub payin_countries: Vec<String>,
    pub payout_countries: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Component {
    /// Country codes served by this component for the given flow.
    pub fn countries(&self, method_type: MethodType) -> &[String] {
        match method_type {
            MethodType::Payin => &self.payin_countries,
            MethodType::Payout => &self.payout_countries,
        }
    }
}

fn default_visible() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComponent {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub group: String,
    /// Appended after the last component when absent.
    pub order: Option<i64>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub payin_countries: Vec<String>,
    #[serde(default)]
    pub payout_countries: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComponentPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub group: Option<String>,
    pub status: Option<StatusType>,
    pub order: Option<i64>,
    pub visible: Option<bool>,
    pub payin_countries: Option<Vec<String>>,
    pub payout_countries: Option<Vec<String>>,
}

/// Upper-cases, trims and de-duplicates country codes, keeping first-seen order.
pub fn normalize_countries(codes: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(codes.len());
    for code in codes {
        let code = code.trim().to_ascii_uppercase();
        if !code.is_empty() && !out.contains(&code) {
            out.push(code);
        }
    }
    out
}
