//! # billing-payments
//!
//! Plans, Paddle checkout and webhook processing, plus the legacy
//! LemonSqueezy API client and webhook receiver.
//!
//! ## Checkout Flow
//!
//! Paddle Billing hosts the payment page. We create a transaction carrying
//! the user id in `custom_data`, hand the returned checkout URL to the
//! browser, and learn about the outcome through webhooks.
//!
//! ```text
//! ┌─────────────┐  POST /transactions  ┌──────────────┐
//! │ billing-    │─────────────────────▶│    Paddle    │
//! │ server      │◀─────────────────────│  (hosted     │
//! └─────────────┘    checkout.url      │   checkout)  │
//!        ▲                             └──────┬───────┘
//!        │  subscription.* / transaction.*    │
//!        └────────────────────────────────────┘
//!              Paddle-Signature: ts=..;h1=..
//! ```
//!
//! Plan identifiers are a closed set (`CASUAL`, `GIGACHAD`); each maps to one
//! price ID configured through the environment. Price IDs are validated at
//! load time, so a bad deployment disables payments instead of failing at
//! the first checkout.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use billing_payments::{CheckoutRequest, PaddleClient, Plan};
//!
//! let paddle = PaddleClient::from_env()?;
//!
//! let session = paddle.create_checkout_session(CheckoutRequest {
//!     user_id: user.id,
//!     plan: Plan::Casual,
//!     customer_email: "user@example.com".into(),
//!     customer_name: None,
//!     success_url: "https://yoursite.com/success".into(),
//! }).await?;
//!
//! // Redirect user to: session.checkout_url
//! ```

mod checkout;
mod config;
mod error;
mod lemonsqueezy;
mod lemonsqueezy_webhook;
mod plan;
mod products;
mod subscription;
mod webhook;

pub use checkout::{CheckoutProvider, CheckoutRequest, CheckoutSession, PaddleApi, PaddleClient};
pub use config::{PaddleConfig, PaddleConnection, PaddleEnvironment};
pub use error::{PaymentError, Result};
pub use lemonsqueezy::{
    CreateWebhook, DEFAULT_WEBHOOK_EVENTS, LemonSqueezyClient, LemonSqueezyConfig, Store,
    WebhookRegistration,
};
pub use lemonsqueezy_webhook::{
    LemonSqueezyEvent, LemonSqueezyWebhookConfig, LemonSqueezyWebhookEvent,
    LemonSqueezyWebhookHandler, VariantCatalog, lemonsqueezy_signature,
    verify_lemonsqueezy_signature,
};
pub use plan::{Plan, PlanCatalog, PriceId};
pub use products::{ApiProbe, BillingCycle, Money, Price, Product};
pub use subscription::{
    BillingProvider, MemorySubscriptionStore, PaymentStatus, SubscriptionRecord, SubscriptionStatus,
    SubscriptionStore, TransactionRecord,
};
pub use webhook::{PaddleEvent, WebhookEvent, WebhookHandler, signature_header, verify_signature};
