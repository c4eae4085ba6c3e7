//! Incident notifications for subscribers.
//!
//! Only webhook subscriptions are delivered; email and sms subscriptions are
//! kept in the store but skipped here. Delivery never fails the caller.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::commands::subscriptions::subscriptions_matching_db;
use crate::db::DbPool;
use crate::error::Result;
use crate::types::{Incident, Subscription, SubscriptionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IncidentEvent {
    #[serde(rename = "incident.created")]
    Created,
    #[serde(rename = "incident.updated")]
    Updated,
    #[serde(rename = "incident.update_posted")]
    UpdatePosted,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload<'a> {
    pub event: IncidentEvent,
    pub incident: &'a Incident,
    pub sent_at: DateTime<Utc>,
}

/// Webhook URLs among `subscriptions`, skipping other channel types.
pub fn webhook_targets(subscriptions: &[Subscription]) -> Vec<&str> {
    subscriptions
        .iter()
        .filter_map(|s| match s.subscription_type {
            SubscriptionType::Webhook => s.webhook_url.as_deref(),
            other => {
                debug!(subscription_id = %s.id, kind = %other, "Skipping non-webhook subscription");
                None
            }
        })
        .collect()
}

#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
}

impl Notifier {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }

    /// POSTs the event to every webhook target. Returns how many were accepted.
    pub async fn deliver(
        &self,
        event: IncidentEvent,
        incident: &Incident,
        subscriptions: &[Subscription],
    ) -> usize {
        let payload = WebhookPayload {
            event,
            incident,
            sent_at: Utc::now(),
        };
        let mut delivered = 0;
        for url in webhook_targets(subscriptions) {
            match self.client.post(url).json(&payload).send().await {
                Ok(resp) if resp.status().is_success() => delivered += 1,
                Ok(resp) => {
                    warn!(url, status = %resp.status(), incident_id = %incident.id, "Webhook rejected notification")
                }
                Err(e) => {
                    warn!(url, error = %e, incident_id = %incident.id, "Webhook delivery failed")
                }
            }
        }
        if delivered > 0 {
            info!(incident_id = %incident.id, ?event, delivered, "Incident notification sent");
        }
        delivered
    }

    /// Looks up matching subscriptions and delivers in the background.
    pub fn spawn_incident_event(
        &self,
        pool: DbPool,
        event: IncidentEvent,
        incident: Incident,
    ) -> JoinHandle<usize> {
        let notifier = self.clone();
        let incident = incident.without_operator();
        tokio::spawn(async move {
            let ids = incident.component_ids();
            let lookup =
                tokio::task::spawn_blocking(move || subscriptions_matching_db(&pool, &ids)).await;
            let subscriptions = match lookup {
                Ok(Ok(subscriptions)) => subscriptions,
                Ok(Err(e)) => {
                    warn!(error = %e, incident_id = %incident.id, "Failed to load subscriptions");
                    return 0;
                }
                Err(e) => {
                    warn!(error = %e, incident_id = %incident.id, "Subscription lookup task failed");
                    return 0;
                }
            };
            notifier.deliver(event, &incident, &subscriptions).await
        })
    }
}
