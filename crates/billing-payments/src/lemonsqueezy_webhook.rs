//! LemonSqueezy Webhook Handling
//!
//! Receiver for stores still registered with LemonSqueezy. Deliveries carry
//! `X-Signature: <hex>`, the HMAC-SHA256 of the raw body keyed with the
//! secret given at registration. Plans are matched by variant id.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::fmt;
use std::sync::Arc;

use crate::error::{PaymentError, Result};
use crate::plan::Plan;
use crate::subscription::{
    BillingProvider, PaymentStatus, SubscriptionRecord, SubscriptionStatus, SubscriptionStore,
    TransactionRecord,
};
use crate::webhook::minor_units;

type HmacSha256 = Hmac<Sha256>;

const SUBSCRIPTION_EVENTS: [&str; 7] = [
    "subscription_created",
    "subscription_updated",
    "subscription_cancelled",
    "subscription_resumed",
    "subscription_expired",
    "subscription_paused",
    "subscription_unpaused",
];

const ORDER_CREATED: &str = "order_created";

/// Verify an `X-Signature` header against the raw body
pub fn verify_lemonsqueezy_signature(payload: &[u8], signature: &str, secret: &str) -> Result<()> {
    let received = hex::decode(signature.trim())
        .map_err(|e| PaymentError::WebhookSignature(format!("signature is not hex: {e}")))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::Config(e.to_string()))?;
    mac.update(payload);

    mac.verify_slice(&received)
        .map_err(|_| PaymentError::WebhookSignature("signature mismatch".into()))
}

/// Hex HMAC-SHA256 of `payload`, as LemonSqueezy sends it
pub fn lemonsqueezy_signature(payload: &[u8], secret: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::Config(e.to_string()))?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Variant ids of the two plans
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariantCatalog {
    casual: String,
    gigachad: String,
}

impl VariantCatalog {
    pub fn new(casual: impl Into<String>, gigachad: impl Into<String>) -> Self {
        Self {
            casual: casual.into(),
            gigachad: gigachad.into(),
        }
    }

    pub fn plan_for_variant(&self, variant_id: &str) -> Option<Plan> {
        if variant_id == self.casual {
            Some(Plan::Casual)
        } else if variant_id == self.gigachad {
            Some(Plan::Gigachad)
        } else {
            None
        }
    }
}

/// Receiver settings; absent when LemonSqueezy is not in use
#[derive(Clone)]
pub struct LemonSqueezyWebhookConfig {
    pub secret: String,
    pub variants: VariantCatalog,
}

impl LemonSqueezyWebhookConfig {
    pub const REQUIRED_VARS: [&'static str; 3] = [
        "LEMONSQUEEZY_WEBHOOK_SECRET",
        "LEMONSQUEEZY_CASUAL_VARIANT_ID",
        "LEMONSQUEEZY_GIGACHAD_VARIANT_ID",
    ];

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let values: Vec<Option<String>> = Self::REQUIRED_VARS
            .iter()
            .map(|var| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
            .collect();

        let missing: Vec<&str> = Self::REQUIRED_VARS
            .iter()
            .zip(&values)
            .filter(|(_, value)| value.is_none())
            .map(|(var, _)| *var)
            .collect();

        let [Some(secret), Some(casual), Some(gigachad)] = values.as_slice() else {
            return Err(PaymentError::Config(format!(
                "Missing required LemonSqueezy environment variables: {}",
                missing.join(", ")
            )));
        };

        Ok(Self {
            secret: secret.clone(),
            variants: VariantCatalog::new(casual.clone(), gigachad.clone()),
        })
    }
}

impl fmt::Debug for LemonSqueezyWebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LemonSqueezyWebhookConfig")
            .field("secret", &"<redacted>")
            .field("variants", &self.variants)
            .finish()
    }
}

/// Raw notification envelope
#[derive(Clone, Debug, Deserialize)]
pub struct LemonSqueezyEvent {
    pub meta: EventMeta,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EventMeta {
    pub event_name: String,
    #[serde(default)]
    pub custom_data: Option<serde_json::Value>,
}

/// Parsed LemonSqueezy event
#[derive(Clone, Debug, PartialEq)]
pub enum LemonSqueezyWebhookEvent {
    SubscriptionChanged {
        subscription_id: String,
        customer_id: Option<String>,
        variant_id: Option<String>,
        status: String,
        user_id: Option<String>,
        renews_at: Option<DateTime<Utc>>,
        ends_at: Option<DateTime<Utc>>,
    },

    OrderCreated {
        order_id: String,
        user_id: Option<String>,
        amount: Option<i64>,
        currency: Option<String>,
        status: String,
    },

    /// Handled event whose `data` could not be read
    Malformed { event_name: String, reason: String },

    Other { event_name: String },
}

#[derive(Deserialize)]
struct Resource<A> {
    id: serde_json::Value,
    attributes: A,
}

#[derive(Deserialize)]
struct SubscriptionAttributes {
    #[serde(default)]
    customer_id: Option<serde_json::Value>,
    #[serde(default)]
    variant_id: Option<serde_json::Value>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    user_id: Option<serde_json::Value>,
    #[serde(default)]
    renews_at: Option<DateTime<Utc>>,
    #[serde(default)]
    ends_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct OrderAttributes {
    #[serde(default)]
    total: Option<serde_json::Value>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    user_id: Option<serde_json::Value>,
}

/// LemonSqueezy ids are numbers in attributes and strings at the top level
fn id_string(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn resource<A: for<'de> Deserialize<'de>>(data: serde_json::Value) -> Result<(String, A)> {
    let resource: Resource<A> =
        serde_json::from_value(data).map_err(|e| PaymentError::WebhookParse(e.to_string()))?;
    let id = id_string(Some(&resource.id))
        .ok_or_else(|| PaymentError::WebhookParse("data.id is missing".into()))?;
    Ok((id, resource.attributes))
}

/// Webhook handler
pub struct LemonSqueezyWebhookHandler<S: SubscriptionStore> {
    store: Arc<S>,
    variants: VariantCatalog,
}

impl<S: SubscriptionStore> LemonSqueezyWebhookHandler<S> {
    pub const fn new(store: Arc<S>, variants: VariantCatalog) -> Self {
        Self { store, variants }
    }

    /// Verify webhook signature and parse event
    pub fn parse_event(
        &self,
        payload: &[u8],
        signature: &str,
        secret: &str,
    ) -> Result<LemonSqueezyEvent> {
        verify_lemonsqueezy_signature(payload, signature, secret)?;
        serde_json::from_slice(payload).map_err(|e| PaymentError::WebhookParse(e.to_string()))
    }

    /// Process a webhook event
    pub fn handle(&self, event: LemonSqueezyEvent) -> Result<LemonSqueezyWebhookEvent> {
        tracing::info!(
            event_name = %event.meta.event_name,
            data_id = ?event.data.get("id"),
            "Processing LemonSqueezy webhook"
        );

        let event_name = event.meta.event_name.clone();
        let parsed = match Self::parse_webhook_event(event) {
            Err(PaymentError::WebhookParse(reason)) => {
                LemonSqueezyWebhookEvent::Malformed { event_name, reason }
            }
            other => other?,
        };
        self.apply(&parsed)?;
        Ok(parsed)
    }

    fn apply(&self, event: &LemonSqueezyWebhookEvent) -> Result<()> {
        match event {
            LemonSqueezyWebhookEvent::SubscriptionChanged {
                subscription_id,
                customer_id,
                variant_id,
                status,
                user_id,
                renews_at,
                ends_at,
            } => {
                let Some(user_id) = user_id else {
                    tracing::error!(subscription_id = %subscription_id, "No user ID found in subscription event");
                    return Ok(());
                };
                let Some(plan) = variant_id
                    .as_deref()
                    .and_then(|v| self.variants.plan_for_variant(v))
                else {
                    tracing::error!(variant_id = ?variant_id, "Plan not found for variant");
                    return Ok(());
                };

                let status = SubscriptionStatus::from_lemonsqueezy(status);
                let mut record = SubscriptionRecord::new(
                    BillingProvider::LemonSqueezy,
                    user_id.clone(),
                    plan,
                    subscription_id.clone(),
                    status,
                );
                record.customer_id.clone_from(customer_id);
                record.current_period_end = renews_at.or(*ends_at);
                if matches!(status, SubscriptionStatus::Cancelled | SubscriptionStatus::Expired) {
                    record.cancelled_at = *ends_at;
                }

                self.store.upsert_subscription(record)?;

                tracing::info!(
                    subscription_id = %subscription_id,
                    user_id = %user_id,
                    plan = %plan,
                    status = status.as_str(),
                    "Subscription event processed"
                );
            }

            LemonSqueezyWebhookEvent::OrderCreated {
                order_id,
                user_id,
                amount,
                currency,
                status,
            } => {
                let Some(user_id) = user_id else {
                    tracing::error!(order_id = %order_id, "No user ID found in order event");
                    return Ok(());
                };

                self.store.record_transaction(TransactionRecord {
                    provider: BillingProvider::LemonSqueezy,
                    user_id: user_id.clone(),
                    transaction_id: order_id.clone(),
                    subscription_id: None,
                    amount: *amount,
                    currency: currency.clone(),
                    status: PaymentStatus::from_lemonsqueezy(status),
                    recorded_at: Utc::now(),
                })?;

                tracing::info!(order_id = %order_id, status = %status, "Order event processed");
            }

            LemonSqueezyWebhookEvent::Malformed { event_name, reason } => {
                tracing::error!(event_name = %event_name, reason = %reason, "Skipping malformed webhook event");
            }

            LemonSqueezyWebhookEvent::Other { event_name } => {
                tracing::debug!(event_name = %event_name, "Unhandled webhook event");
            }
        }

        Ok(())
    }

    fn parse_webhook_event(event: LemonSqueezyEvent) -> Result<LemonSqueezyWebhookEvent> {
        let event_name = event.meta.event_name.as_str();
        let custom_user = event
            .meta
            .custom_data
            .as_ref()
            .and_then(|c| id_string(c.get("user_id")));

        if SUBSCRIPTION_EVENTS.contains(&event_name) {
            let (id, attributes): (String, SubscriptionAttributes) = resource(event.data)?;
            return Ok(LemonSqueezyWebhookEvent::SubscriptionChanged {
                subscription_id: id,
                customer_id: id_string(attributes.customer_id.as_ref()),
                variant_id: id_string(attributes.variant_id.as_ref()),
                status: attributes.status,
                user_id: id_string(attributes.user_id.as_ref()).or(custom_user),
                renews_at: attributes.renews_at,
                ends_at: attributes.ends_at,
            });
        }

        if event_name == ORDER_CREATED {
            let (id, attributes): (String, OrderAttributes) = resource(event.data)?;
            return Ok(LemonSqueezyWebhookEvent::OrderCreated {
                order_id: id,
                user_id: id_string(attributes.user_id.as_ref()).or(custom_user),
                amount: minor_units(attributes.total.as_ref()),
                currency: attributes.currency,
                status: attributes.status,
            });
        }

        Ok(LemonSqueezyWebhookEvent::Other {
            event_name: event.meta.event_name,
        })
    }
}
