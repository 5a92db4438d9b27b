//! Application State

use std::sync::Arc;

use billing_core::AuthProvider;
use billing_payments::{
    CheckoutProvider, LemonSqueezyWebhookConfig, MemorySubscriptionStore, PlanCatalog,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Identity backend (Supabase, or deny-all when unconfigured)
    pub auth: Arc<dyn AuthProvider>,

    /// Subscriptions and transactions reported by webhooks
    pub subscriptions: Arc<MemorySubscriptionStore>,

    /// Paddle integration (optional - None if not configured)
    pub payments: Option<Payments>,

    /// Legacy LemonSqueezy receiver (optional)
    pub lemonsqueezy: Option<LemonSqueezyWebhookConfig>,

    /// Public base URL of the app, without trailing slash
    pub app_url: String,
}

/// Everything the payment routes need
#[derive(Clone)]
pub struct Payments {
    pub checkout: Arc<dyn CheckoutProvider>,
    pub webhook_secret: String,
    pub catalog: PlanCatalog,
}
