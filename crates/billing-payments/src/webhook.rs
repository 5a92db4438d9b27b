//! Paddle Webhook Handling
//!
//! Verifies `Paddle-Signature` headers and turns subscription and transaction
//! notifications into local records.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;

use crate::error::{PaymentError, Result};
use crate::plan::PlanCatalog;
use crate::subscription::{
    BillingProvider, PaymentStatus, SubscriptionRecord, SubscriptionStatus, SubscriptionStore,
    TransactionRecord,
};

type HmacSha256 = Hmac<Sha256>;

const SUBSCRIPTION_EVENTS: [&str; 6] = [
    "subscription.created",
    "subscription.updated",
    "subscription.cancelled",
    "subscription.resumed",
    "subscription.paused",
    "subscription.trialing",
];

const TRANSACTION_EVENTS: [&str; 2] = ["transaction.completed", "transaction.payment_failed"];

/// Verify a `Paddle-Signature` header (`ts=<unix>;h1=<hex>`)
///
/// The signed payload is `"{ts}:{body}"`, HMAC-SHA256 keyed with the
/// notification secret. Comparison is constant time.
pub fn verify_signature(payload: &[u8], header: &str, secret: &str) -> Result<()> {
    let parts: Vec<&str> = header.split(';').collect();
    let [ts_part, h1_part] = parts.as_slice() else {
        return Err(PaymentError::WebhookSignature(format!(
            "expected 2 parts, got {}",
            parts.len()
        )));
    };

    let (Some(timestamp), Some(received)) =
        (ts_part.trim().strip_prefix("ts="), h1_part.trim().strip_prefix("h1="))
    else {
        return Err(PaymentError::WebhookSignature("missing ts= or h1= prefix".into()));
    };

    let received = hex::decode(received)
        .map_err(|e| PaymentError::WebhookSignature(format!("signature is not hex: {e}")))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::Config(e.to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(payload);

    mac.verify_slice(&received)
        .map_err(|_| PaymentError::WebhookSignature("signature mismatch".into()))
}

/// Build a `Paddle-Signature` header value for `payload`
pub fn signature_header(timestamp: i64, payload: &[u8], secret: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::Config(e.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b":");
    mac.update(payload);
    let digest = hex::encode(mac.finalize().into_bytes());
    Ok(format!("ts={timestamp};h1={digest}"))
}

/// Raw notification envelope
#[derive(Clone, Debug, Deserialize)]
pub struct PaddleEvent {
    #[serde(default)]
    pub event_id: Option<String>,
    pub event_type: String,
    #[serde(default)]
    pub occurred_at: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Parsed webhook event
#[derive(Clone, Debug, PartialEq)]
pub enum WebhookEvent {
    /// Any subscription lifecycle change
    SubscriptionChanged {
        subscription_id: String,
        customer_id: Option<String>,
        status: String,
        price_id: Option<String>,
        user_id: Option<String>,
        current_period_start: Option<DateTime<Utc>>,
        current_period_end: Option<DateTime<Utc>>,
        cancelled_at: Option<DateTime<Utc>>,
    },

    /// Completed or failed payment
    TransactionRecorded {
        transaction_id: String,
        status: String,
        amount: Option<i64>,
        currency: Option<String>,
        user_id: Option<String>,
        subscription_id: Option<String>,
        failed: bool,
    },

    /// Handled event type whose `data` could not be read; acknowledged so
    /// Paddle does not redeliver it
    Malformed { event_type: String, reason: String },

    /// Unhandled event type
    Other { event_type: String },
}

#[derive(Deserialize)]
struct SubscriptionData {
    id: String,
    #[serde(default)]
    customer_id: Option<String>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    items: Vec<SubscriptionItem>,
    #[serde(default)]
    custom_data: Option<serde_json::Value>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
    #[serde(default)]
    current_billing_period: Option<BillingPeriod>,
    #[serde(default, alias = "canceled_at")]
    cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct SubscriptionItem {
    #[serde(default)]
    price: Option<PriceRef>,
}

#[derive(Deserialize)]
struct PriceRef {
    id: String,
}

#[derive(Deserialize)]
struct BillingPeriod {
    #[serde(default)]
    starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    ends_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct TransactionData {
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    currency_code: Option<String>,
    #[serde(default)]
    details: Option<TransactionDetails>,
    #[serde(default)]
    custom_data: Option<serde_json::Value>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
    #[serde(default)]
    subscription_id: Option<String>,
}

#[derive(Deserialize)]
struct TransactionDetails {
    #[serde(default)]
    totals: Option<TransactionTotals>,
}

#[derive(Deserialize)]
struct TransactionTotals {
    /// Paddle sends a decimal string; older fixtures use a number
    #[serde(default)]
    total: Option<serde_json::Value>,
}

fn user_id_from(
    custom_data: Option<&serde_json::Value>,
    metadata: Option<&serde_json::Value>,
) -> Option<String> {
    [custom_data, metadata]
        .into_iter()
        .flatten()
        .find_map(|v| v.get("user_id").and_then(serde_json::Value::as_str))
        .filter(|id| !id.is_empty())
        .map(ToString::to_string)
}

pub(crate) fn minor_units(total: Option<&serde_json::Value>) -> Option<i64> {
    match total? {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// Webhook handler
pub struct WebhookHandler<S: SubscriptionStore> {
    store: Arc<S>,
    catalog: PlanCatalog,
}

impl<S: SubscriptionStore> WebhookHandler<S> {
    pub const fn new(store: Arc<S>, catalog: PlanCatalog) -> Self {
        Self { store, catalog }
    }

    /// Verify webhook signature and parse event
    pub fn parse_event(&self, payload: &[u8], signature: &str, secret: &str) -> Result<PaddleEvent> {
        verify_signature(payload, signature, secret)?;
        serde_json::from_slice(payload).map_err(|e| PaymentError::WebhookParse(e.to_string()))
    }

    /// Process a webhook event
    pub fn handle(&self, event: PaddleEvent) -> Result<WebhookEvent> {
        tracing::info!(
            event_type = %event.event_type,
            event_id = ?event.event_id,
            "Processing Paddle webhook"
        );

        let event_type = event.event_type.clone();
        let parsed = match Self::parse_webhook_event(event) {
            Err(PaymentError::WebhookParse(reason)) => WebhookEvent::Malformed { event_type, reason },
            other => other?,
        };
        self.apply(&parsed)?;
        Ok(parsed)
    }

    fn apply(&self, event: &WebhookEvent) -> Result<()> {
        match event {
            WebhookEvent::SubscriptionChanged {
                subscription_id,
                customer_id,
                status,
                price_id,
                user_id,
                current_period_start,
                current_period_end,
                cancelled_at,
            } => {
                let Some(price_id) = price_id else {
                    tracing::error!(subscription_id = %subscription_id, "No price ID found in subscription event");
                    return Ok(());
                };
                let Some(plan) = self.catalog.plan_for_price(price_id) else {
                    tracing::error!(price_id = %price_id, "Plan not found for price ID");
                    return Ok(());
                };
                let Some(user_id) = user_id else {
                    tracing::error!(subscription_id = %subscription_id, "No user ID found in subscription event");
                    return Ok(());
                };

                let mut record = SubscriptionRecord::new(
                    BillingProvider::Paddle,
                    user_id.clone(),
                    plan,
                    subscription_id.clone(),
                    SubscriptionStatus::from_paddle(status),
                );
                record.customer_id.clone_from(customer_id);
                record.current_period_start = *current_period_start;
                record.current_period_end = *current_period_end;
                record.cancelled_at = *cancelled_at;

                let saved = self.store.upsert_subscription(record)?;

                tracing::info!(
                    subscription_id = %subscription_id,
                    user_id = %user_id,
                    plan = %plan,
                    status = saved.status.as_str(),
                    "Subscription event processed"
                );
            }

            WebhookEvent::TransactionRecorded {
                transaction_id,
                status,
                amount,
                currency,
                user_id,
                subscription_id,
                failed,
            } => {
                let Some(user_id) = user_id else {
                    tracing::error!(transaction_id = %transaction_id, "No user ID found in transaction event");
                    return Ok(());
                };

                let status = if *failed {
                    PaymentStatus::Failed
                } else {
                    PaymentStatus::from_paddle(status)
                };

                self.store.record_transaction(TransactionRecord {
                    provider: BillingProvider::Paddle,
                    user_id: user_id.clone(),
                    transaction_id: transaction_id.clone(),
                    subscription_id: subscription_id.clone(),
                    amount: *amount,
                    currency: currency.clone(),
                    status,
                    recorded_at: Utc::now(),
                })?;

                if *failed {
                    tracing::warn!(
                        transaction_id = %transaction_id,
                        user_id = %user_id,
                        "Payment failed - may need to notify customer"
                    );
                } else {
                    tracing::info!(
                        transaction_id = %transaction_id,
                        status = ?status,
                        "Transaction event processed"
                    );
                }
            }

            WebhookEvent::Malformed { event_type, reason } => {
                tracing::error!(event_type = %event_type, reason = %reason, "Skipping malformed webhook event");
            }

            WebhookEvent::Other { event_type } => {
                tracing::debug!(event_type = %event_type, "Unhandled webhook event");
            }
        }

        Ok(())
    }

    /// Parse Paddle event into our event type
    fn parse_webhook_event(event: PaddleEvent) -> Result<WebhookEvent> {
        let event_type = event.event_type.as_str();

        if SUBSCRIPTION_EVENTS.contains(&event_type) {
            let data: SubscriptionData = serde_json::from_value(event.data)
                .map_err(|e| PaymentError::WebhookParse(format!("Invalid subscription data: {e}")))?;
            let period = data.current_billing_period.as_ref();

            return Ok(WebhookEvent::SubscriptionChanged {
                price_id: data
                    .items
                    .first()
                    .and_then(|item| item.price.as_ref())
                    .map(|p| p.id.clone()),
                user_id: user_id_from(data.custom_data.as_ref(), data.metadata.as_ref()),
                current_period_start: period.and_then(|p| p.starts_at),
                current_period_end: period.and_then(|p| p.ends_at),
                subscription_id: data.id,
                customer_id: data.customer_id,
                status: data.status,
                cancelled_at: data.cancelled_at,
            });
        }

        if TRANSACTION_EVENTS.contains(&event_type) {
            let failed = event_type == "transaction.payment_failed";
            let data: TransactionData = serde_json::from_value(event.data)
                .map_err(|e| PaymentError::WebhookParse(format!("Invalid transaction data: {e}")))?;
            let total = data
                .details
                .as_ref()
                .and_then(|d| d.totals.as_ref())
                .and_then(|t| t.total.as_ref());

            return Ok(WebhookEvent::TransactionRecorded {
                amount: minor_units(total),
                user_id: user_id_from(data.custom_data.as_ref(), data.metadata.as_ref()),
                transaction_id: data.id,
                status: data.status,
                currency: data.currency_code,
                subscription_id: data.subscription_id,
                failed,
            });
        }

        Ok(WebhookEvent::Other {
            event_type: event.event_type,
        })
    }
}
