use std::sync::Arc;

use crate::config::Config;
use crate::db::DbPool;
use crate::error::Result;
use crate::notify::{IncidentEvent, Notifier};
use crate::types::Incident;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config, notifier: Notifier) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            notifier,
        }
    }

    /// Runs a blocking store call on the blocking thread pool.
    pub async fn db<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&DbPool) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || f(&pool)).await?
    }

    pub fn notify(&self, event: IncidentEvent, incident: &Incident) {
        self.notifier
            .spawn_incident_event(self.pool.clone(), event, incident.clone());
    }
}
