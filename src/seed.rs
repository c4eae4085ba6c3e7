use tracing::info;

use crate::commands::components::{component_create_db, components_count_db};
use crate::db::DbPool;
use crate::error::Result;
use crate::types::NewComponent;

const METHOD_COUNTRIES: [&str; 6] = ["AR", "BR", "CO", "MX", "PE", "CL"];

fn default_components(methods_component: &str) -> Vec<NewComponent> {
    let plain = |name: &str, description: &str, group: &str| NewComponent {
        name: name.to_string(),
        description: description.to_string(),
        group: group.to_string(),
        order: None,
        visible: true,
        payin_countries: vec![],
        payout_countries: vec![],
    };
    let countries: Vec<String> = METHOD_COUNTRIES.iter().map(|c| c.to_string()).collect();

    vec![
        plain("API", "Public REST API", "Platform"),
        plain("Agent Panel", "Back office used by support agents", "Platform"),
        plain("Database", "Primary data store", "Infrastructure"),
        NewComponent {
            payin_countries: countries.clone(),
            payout_countries: countries,
            ..plain(methods_component, "Payment methods by country", "Payments")
        },
    ]
}

/// Inserts the default component set when the store has no components.
///
/// Returns how many components were created.
pub fn seed_if_empty(pool: &DbPool, methods_component: &str) -> Result<usize> {
    if components_count_db(pool)? > 0 {
        return Ok(0);
    }
    let defaults = default_components(methods_component);
    for component in &defaults {
        component_create_db(pool, component)?;
    }
    info!(count = defaults.len(), "Seeded default components");
    Ok(defaults.len())
}
