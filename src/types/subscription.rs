use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::status::SubscriptionType;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    #[serde(rename = "type")]
    pub subscription_type: SubscriptionType,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub webhook_url: Option<String>,
    /// `None` subscribes to every component.
    pub components: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether an event touching `component_ids` should reach this subscriber.
    ///
    /// Incidents that name no component reach everyone.
    pub fn wants(&self, component_ids: &[String]) -> bool {
        match &self.components {
            None => true,
            Some(_) if component_ids.is_empty() => true,
            Some(watched) => watched.iter().any(|w| component_ids.contains(w)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubscription {
    #[serde(rename = "type")]
    pub subscription_type: SubscriptionType,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub components: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscriptionPatch {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub webhook_url: Option<String>,
    pub components: Option<Vec<String>>,
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Checks that the contact field required by `kind` is filled in.
pub fn validate_contact(
    kind: SubscriptionType,
    email: &Option<String>,
    phone: &Option<String>,
    webhook_url: &Option<String>,
) -> Result<()> {
    match kind {
        SubscriptionType::Email => {
            if !present(email) {
                return Err(Error::validation("email is required for email subscriptions"));
            }
            if email.as_deref().is_some_and(|e| !e.contains('@')) {
                return Err(Error::validation("email address is malformed"));
            }
        }
        SubscriptionType::Sms => {
            if !present(phone) {
                return Err(Error::validation("phone is required for sms subscriptions"));
            }
        }
        SubscriptionType::Webhook => {
            let url = webhook_url.as_deref().map(str::trim).unwrap_or_default();
            if url.is_empty() {
                return Err(Error::validation(
                    "webhookUrl is required for webhook subscriptions",
                ));
            }
            parse_webhook_url(url)?;
        }
    }
    Ok(())
}

/// Parses a webhook target, which must be an absolute http(s) URL with a host.
pub fn parse_webhook_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::validation(format!("webhookUrl is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::validation("webhookUrl must be an http(s) URL"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(Error::validation("webhookUrl must name a host"));
    }
    Ok(url)
}

fn is_internal_v4(ip: Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        // 100.64.0.0/10 carrier-grade NAT
        || (ip.octets()[0] == 100 && (ip.octets()[1] & 0xc0) == 64)
}

fn is_internal_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_internal_v4(v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80
}

/// Rejects webhook targets on loopback, private or link-local addresses.
///
/// Applied to sign-ups from the public page. Host names are checked by
/// literal only; they are not resolved.
pub fn ensure_public_webhook(raw: &str) -> Result<()> {
    let url = parse_webhook_url(raw)?;
    let host = url.host_str().unwrap_or_default();
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let internal = match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => is_internal_v4(ip),
        Ok(IpAddr::V6(ip)) => is_internal_v6(ip),
        Err(_) => {
            let name = host.trim_end_matches('.').to_ascii_lowercase();
            name == "localhost" || name.ends_with(".localhost") || name.ends_with(".internal")
        }
    };
    if internal {
        return Err(Error::validation("webhookUrl must point to a public address"));
    }
    Ok(())
}

impl NewSubscription {
    pub fn validate(&self) -> Result<()> {
        validate_contact(
            self.subscription_type,
            &self.email,
            &self.phone,
            &self.webhook_url,
        )
    }

    /// `validate` plus the restrictions for unauthenticated sign-ups.
    pub fn validate_public(&self) -> Result<()> {
        self.validate()?;
        if self.subscription_type == SubscriptionType::Webhook {
            if let Some(url) = &self.webhook_url {
                ensure_public_webhook(url)?;
            }
        }
        Ok(())
    }
}
