//! Subscription Records
//!
//! Local view of vendor subscriptions and payments, fed by webhooks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::{PaymentError, Result};
use crate::plan::Plan;

/// Vendor that reported a record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingProvider {
    Paddle,
    LemonSqueezy,
}

impl BillingProvider {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Paddle => "paddle",
            Self::LemonSqueezy => "lemonsqueezy",
        }
    }
}

impl fmt::Display for BillingProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Internal subscription status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Paused,
    Cancelled,
    Expired,
    PastDue,
}

impl SubscriptionStatus {
    /// Map a Paddle status; trials count as active, unknown values as cancelled
    pub fn from_paddle(status: &str) -> Self {
        match status {
            "active" | "trialing" => Self::Active,
            "paused" => Self::Paused,
            "expired" => Self::Expired,
            "past_due" => Self::PastDue,
            _ => Self::Cancelled,
        }
    }

    /// Map a LemonSqueezy status, case-insensitive; trials count as active
    pub fn from_lemonsqueezy(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "active" | "on_trial" => Self::Active,
            "paused" => Self::Paused,
            "expired" => Self::Expired,
            "past_due" | "unpaid" => Self::PastDue,
            _ => Self::Cancelled,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
            Self::PastDue => "past_due",
        }
    }
}

/// Internal payment status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Completed,
    Pending,
    Failed,
    Cancelled,
    Refunded,
}

impl PaymentStatus {
    /// Map a Paddle transaction status; unknown values are pending
    pub fn from_paddle(status: &str) -> Self {
        match status {
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "cancelled" | "canceled" => Self::Cancelled,
            "refunded" => Self::Refunded,
            _ => Self::Pending,
        }
    }

    /// Map a LemonSqueezy order status, case-insensitive; `paid` is completed
    pub fn from_lemonsqueezy(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "paid" => Self::Completed,
            "failed" => Self::Failed,
            "refunded" | "partial_refund" => Self::Refunded,
            _ => Self::Pending,
        }
    }
}

/// A subscription as last reported by its vendor
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// Internal record id, stable across upserts
    pub id: Uuid,
    pub provider: BillingProvider,
    pub user_id: String,
    pub plan: Plan,
    /// Vendor subscription id
    pub subscription_id: String,
    pub customer_id: Option<String>,
    pub status: SubscriptionStatus,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionRecord {
    pub fn new(
        provider: BillingProvider,
        user_id: String,
        plan: Plan,
        subscription_id: String,
        status: SubscriptionStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider,
            user_id,
            plan,
            subscription_id,
            customer_id: None,
            status,
            current_period_start: None,
            current_period_end: None,
            cancelled_at: None,
            updated_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }
}

/// A payment attempt as reported by its vendor
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub provider: BillingProvider,
    pub user_id: String,
    /// Vendor transaction (Paddle) or order (LemonSqueezy) id
    pub transaction_id: String,
    pub subscription_id: Option<String>,
    /// Minor currency units
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub status: PaymentStatus,
    pub recorded_at: DateTime<Utc>,
}

/// Subscription storage trait
pub trait SubscriptionStore: Send + Sync {
    /// Insert or replace by vendor subscription id, keeping the internal id
    fn upsert_subscription(&self, record: SubscriptionRecord) -> Result<SubscriptionRecord>;

    fn get_by_subscription(
        &self,
        provider: BillingProvider,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>>;

    /// The user's active subscription, if any
    fn active_for_user(&self, user_id: &str) -> Result<Option<SubscriptionRecord>>;

    /// Insert or replace by vendor transaction id
    fn record_transaction(&self, record: TransactionRecord) -> Result<()>;

    fn transactions_for_user(&self, user_id: &str) -> Result<Vec<TransactionRecord>>;
}

type RecordKey = (BillingProvider, String);

/// In-memory subscription store
pub struct MemorySubscriptionStore {
    subscriptions: RwLock<HashMap<RecordKey, SubscriptionRecord>>,
    transactions: RwLock<HashMap<RecordKey, TransactionRecord>>,
}

impl Default for MemorySubscriptionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            transactions: RwLock::new(HashMap::new()),
        }
    }
}

fn poisoned<T>(_: T) -> PaymentError {
    PaymentError::Storage("lock poisoned".into())
}

impl SubscriptionStore for MemorySubscriptionStore {
    fn upsert_subscription(&self, mut record: SubscriptionRecord) -> Result<SubscriptionRecord> {
        let mut subs = self.subscriptions.write().map_err(poisoned)?;
        let key = (record.provider, record.subscription_id.clone());

        if let Some(existing) = subs.get(&key) {
            record.id = existing.id;
        }
        record.updated_at = Utc::now();
        subs.insert(key, record.clone());

        Ok(record)
    }

    fn get_by_subscription(
        &self,
        provider: BillingProvider,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>> {
        let subs = self.subscriptions.read().map_err(poisoned)?;
        Ok(subs.get(&(provider, subscription_id.to_string())).cloned())
    }

    fn active_for_user(&self, user_id: &str) -> Result<Option<SubscriptionRecord>> {
        let subs = self.subscriptions.read().map_err(poisoned)?;
        Ok(subs
            .values()
            .filter(|s| s.user_id == user_id && s.is_active())
            .max_by_key(|s| s.current_period_end)
            .cloned())
    }

    fn record_transaction(&self, record: TransactionRecord) -> Result<()> {
        let mut txns = self.transactions.write().map_err(poisoned)?;
        txns.insert((record.provider, record.transaction_id.clone()), record);
        Ok(())
    }

    fn transactions_for_user(&self, user_id: &str) -> Result<Vec<TransactionRecord>> {
        let txns = self.transactions.read().map_err(poisoned)?;
        let mut out: Vec<_> = txns
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by_key(|t| t.recorded_at);
        Ok(out)
    }
}
