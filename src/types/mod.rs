/// Text mapping for enums stored as TEXT columns and sent as snake_case JSON.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("unknown {} value: {}", stringify!($name), other)),
                }
            }
        }

        impl rusqlite::types::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::from(self.as_str()))
            }
        }

        impl rusqlite::types::FromSql for $name {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: String| rusqlite::types::FromSqlError::Other(e.into()))
            }
        }
    };
}

pub mod component;
pub mod incident;
pub mod maintenance;
pub mod metric;
pub mod status;
pub mod subscription;

pub use component::{Component, ComponentPatch, NewComponent};
pub use incident::{
    AffectedComponent, AffectedMethod, Incident, IncidentPatch, IncidentUpdate, NewIncident,
    NewIncidentUpdate,
};
pub use maintenance::{
    Maintenance, MaintenancePatch, MaintenanceUpdate, NewMaintenance, NewMaintenanceUpdate,
};
pub use metric::{Metric, MetricFilter, NewMetric};
pub use status::{Impact, IncidentStatus, MaintenanceStatus, MethodType, StatusType, SubscriptionType};
pub use subscription::{NewSubscription, Subscription, SubscriptionPatch};
