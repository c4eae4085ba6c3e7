use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use tracing::{info, warn};

use crate::db::{new_id, DbPool};
use crate::error::{Error, Result};
use crate::types::subscription::validate_contact;
use crate::types::{NewSubscription, Subscription, SubscriptionPatch};

const SUBSCRIPTION_COLUMNS: &str = "id, type, email, phone, webhook_url, components, created_at";

fn row_to_subscription(row: &rusqlite::Row<'_>) -> rusqlite::Result<Subscription> {
    let id: String = row.get(0)?;
    let components: Option<String> = row.get(5)?;
    Ok(Subscription {
        subscription_type: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        webhook_url: row.get(4)?,
        components: components.and_then(|raw| {
            serde_json::from_str(&raw)
                .map_err(|e| warn!(subscription_id = %id, error = %e, "Failed to parse subscription components"))
                .ok()
        }),
        created_at: row.get(6)?,
        id,
    })
}

fn components_json(components: &Option<Vec<String>>) -> Result<Option<String>> {
    Ok(match components {
        Some(ids) => Some(serde_json::to_string(ids)?),
        None => None,
    })
}

/// All subscriptions, newest first.
pub fn subscriptions_list_db(pool: &DbPool) -> Result<Vec<Subscription>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions ORDER BY created_at DESC, rowid DESC"
    ))?;
    let subscriptions = stmt
        .query_map([], row_to_subscription)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(subscriptions)
}

pub fn subscription_get_db(pool: &DbPool, id: &str) -> Result<Subscription> {
    let conn = pool.get()?;
    subscription_get_conn(&conn, id)
}

fn subscription_get_conn(conn: &Connection, id: &str) -> Result<Subscription> {
    conn.query_row(
        &format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE id = ?1"),
        [id],
        row_to_subscription,
    )
    .optional()?
    .ok_or_else(|| Error::not_found(format!("subscription {id}")))
}

fn build_subscription(new: &NewSubscription) -> Subscription {
    Subscription {
        id: new_id(),
        subscription_type: new.subscription_type,
        email: new.email.clone(),
        phone: new.phone.clone(),
        webhook_url: new.webhook_url.as_ref().map(|u| u.trim().to_string()),
        components: new.components.clone(),
        created_at: Utc::now(),
    }
}

fn insert_subscription(conn: &Connection, subscription: &Subscription) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO subscriptions ({SUBSCRIPTION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        rusqlite::params![
            subscription.id,
            subscription.subscription_type,
            subscription.email,
            subscription.phone,
            subscription.webhook_url,
            components_json(&subscription.components)?,
            subscription.created_at,
        ],
    )?;
    info!(subscription_id = %subscription.id, kind = %subscription.subscription_type, "Subscription created");
    Ok(())
}

pub fn subscription_create_db(pool: &DbPool, new: &NewSubscription) -> Result<Subscription> {
    new.validate()?;
    let subscription = build_subscription(new);
    let conn = pool.get()?;
    insert_subscription(&conn, &subscription)?;
    Ok(subscription)
}

/// Creates a subscription unless the store already holds `limit` of them.
pub fn subscription_create_within_db(
    pool: &DbPool,
    new: &NewSubscription,
    limit: u64,
) -> Result<Subscription> {
    new.validate()?;
    let subscription = build_subscription(new);

    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let count: i64 = tx.query_row("SELECT COUNT(*) FROM subscriptions", [], |row| row.get(0))?;
    if u64::try_from(count).unwrap_or(0) >= limit {
        warn!(count, limit, "Subscription limit reached");
        return Err(Error::validation("subscription limit reached"));
    }
    insert_subscription(&tx, &subscription)?;
    tx.commit()?;
    Ok(subscription)
}

/// Partial edit. The result is re-validated against the subscription's type.
pub fn subscription_update_db(
    pool: &DbPool,
    id: &str,
    patch: &SubscriptionPatch,
) -> Result<Subscription> {
    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut subscription = subscription_get_conn(&tx, id)?;
    if patch.email.is_some() {
        subscription.email = patch.email.clone();
    }
    if patch.phone.is_some() {
        subscription.phone = patch.phone.clone();
    }
    if let Some(url) = &patch.webhook_url {
        subscription.webhook_url = Some(url.trim().to_string());
    }
    if patch.components.is_some() {
        subscription.components = patch.components.clone();
    }
    validate_contact(
        subscription.subscription_type,
        &subscription.email,
        &subscription.phone,
        &subscription.webhook_url,
    )?;

    tx.execute(
        "UPDATE subscriptions SET email = ?1, phone = ?2, webhook_url = ?3, components = ?4
         WHERE id = ?5",
        rusqlite::params![
            subscription.email,
            subscription.phone,
            subscription.webhook_url,
            components_json(&subscription.components)?,
            id
        ],
    )?;
    tx.commit()?;
    Ok(subscription)
}

pub fn subscription_delete_db(pool: &DbPool, id: &str) -> Result<()> {
    let conn = pool.get()?;
    let deleted = conn.execute("DELETE FROM subscriptions WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(Error::not_found(format!("subscription {id}")));
    }
    info!(subscription_id = id, "Subscription removed");
    Ok(())
}

/// Subscriptions that want to hear about an event touching `component_ids`.
pub fn subscriptions_matching_db(pool: &DbPool, component_ids: &[String]) -> Result<Vec<Subscription>> {
    Ok(subscriptions_list_db(pool)?
        .into_iter()
        .filter(|s| s.wants(component_ids))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::types::SubscriptionType;

    fn webhook(url: &str, components: Option<Vec<&str>>) -> NewSubscription {
        NewSubscription {
            subscription_type: SubscriptionType::Webhook,
            email: None,
            phone: None,
            webhook_url: Some(url.to_string()),
            components: components.map(|ids| ids.into_iter().map(String::from).collect()),
        }
    }

    #[test]
    fn create_and_list_newest_first() {
        let (_dir, pool) = test_pool();
        let first = subscription_create_db(&pool, &webhook("https://a.example.com", None)).unwrap();
        let second =
            subscription_create_db(&pool, &webhook("https://b.example.com", Some(vec!["1"]))).unwrap();
        let listed = subscriptions_list_db(&pool).unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
        assert_eq!(listed[0].components, Some(vec!["1".to_string()]));
        assert_eq!(listed[1].components, None);
    }

    #[test]
    fn create_rejects_missing_contact() {
        let (_dir, pool) = test_pool();
        let sms = NewSubscription {
            subscription_type: SubscriptionType::Sms,
            email: None,
            phone: None,
            webhook_url: None,
            components: None,
        };
        assert!(matches!(subscription_create_db(&pool, &sms), Err(Error::Validation(_))));
        assert!(subscriptions_list_db(&pool).unwrap().is_empty());
    }

    #[test]
    fn update_is_revalidated() {
        let (_dir, pool) = test_pool();
        let created = subscription_create_db(&pool, &webhook("https://a.example.com", None)).unwrap();
        let bad = SubscriptionPatch {
            webhook_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            subscription_update_db(&pool, &created.id, &bad),
            Err(Error::Validation(_))
        ));

        let good = SubscriptionPatch {
            components: Some(vec!["3".to_string()]),
            ..Default::default()
        };
        let updated = subscription_update_db(&pool, &created.id, &good).unwrap();
        assert_eq!(updated.components, Some(vec!["3".to_string()]));
        assert_eq!(subscription_get_db(&pool, &created.id).unwrap(), updated);
    }

    #[test]
    fn concurrent_patches_to_different_fields_both_stick() {
        use std::sync::{Arc, Barrier};
        use std::thread;

        let (_dir, pool) = test_pool();
        for _ in 0..25 {
            let created =
                subscription_create_db(&pool, &webhook("https://a.example.com", None)).unwrap();
            let barrier = Arc::new(Barrier::new(2));
            let patches = [
                SubscriptionPatch {
                    webhook_url: Some("https://b.example.com".to_string()),
                    ..Default::default()
                },
                SubscriptionPatch {
                    components: Some(vec!["7".to_string()]),
                    ..Default::default()
                },
            ];
            let handles: Vec<_> = patches
                .into_iter()
                .map(|patch| {
                    let (pool, barrier, id) = (pool.clone(), barrier.clone(), created.id.clone());
                    thread::spawn(move || {
                        barrier.wait();
                        subscription_update_db(&pool, &id, &patch)
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap().unwrap();
            }

            let fetched = subscription_get_db(&pool, &created.id).unwrap();
            assert_eq!(fetched.webhook_url.as_deref(), Some("https://b.example.com"));
            assert_eq!(fetched.components, Some(vec!["7".to_string()]));
        }
    }

    #[test]
    fn create_within_stops_at_limit() {
        let (_dir, pool) = test_pool();
        subscription_create_within_db(&pool, &webhook("https://a.example.com", None), 2).unwrap();
        subscription_create_within_db(&pool, &webhook("https://b.example.com", None), 2).unwrap();
        let err = subscription_create_within_db(&pool, &webhook("https://c.example.com", None), 2)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(subscriptions_list_db(&pool).unwrap().len(), 2);
    }

    #[test]
    fn matching_filters_by_component() {
        let (_dir, pool) = test_pool();
        subscription_create_db(&pool, &webhook("https://all.example.com", None)).unwrap();
        subscription_create_db(&pool, &webhook("https://api.example.com", Some(vec!["1"]))).unwrap();
        subscription_create_db(&pool, &webhook("https://db.example.com", Some(vec!["5"]))).unwrap();

        let hits = subscriptions_matching_db(&pool, &["1".to_string()]).unwrap();
        let mut urls: Vec<String> = hits.into_iter().filter_map(|s| s.webhook_url).collect();
        urls.sort();
        assert_eq!(urls, vec!["https://all.example.com", "https://api.example.com"]);
    }

    #[test]
    fn delete_unknown_is_not_found() {
        let (_dir, pool) = test_pool();
        assert!(matches!(subscription_delete_db(&pool, "x"), Err(Error::NotFound(_))));
    }
}
