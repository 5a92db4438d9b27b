//! Paddle Checkout Integration
//!
//! Creates hosted checkout sessions through the Paddle Billing transactions
//! API and manages existing subscriptions.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::config::{PaddleConfig, PaddleConnection};
use crate::error::{PaymentError, Result};
use crate::plan::{Plan, PlanCatalog};

/// Anything that can open a hosted checkout for a plan
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    /// Request a checkout session; returns the URL to redirect the user to
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession>;

    /// Vendor name for logs
    fn name(&self) -> &str;
}

/// Authenticated access to the Paddle REST API
///
/// Enough for the read endpoints; taking payments needs [`PaddleClient`].
pub struct PaddleApi {
    client: Client,
    connection: PaddleConnection,
}

impl PaddleApi {
    pub fn new(connection: PaddleConnection) -> Self {
        Self {
            client: Client::new(),
            connection,
        }
    }

    /// Create from environment variables; needs only the API key
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(PaddleConnection::from_env()?))
    }

    pub const fn connection(&self) -> &PaddleConnection {
        &self.connection
    }

    pub(crate) fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{path}", self.connection.base_url))
            .bearer_auth(&self.connection.api_key)
            .header("Content-Type", "application/json")
    }

    pub(crate) fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{path}", self.connection.base_url))
            .bearer_auth(&self.connection.api_key)
            .header("Content-Type", "application/json")
    }
}

/// Paddle client for checkout and subscription management
pub struct PaddleClient {
    api: PaddleApi,
    config: PaddleConfig,
}

impl PaddleClient {
    pub fn new(config: PaddleConfig) -> Self {
        Self {
            api: PaddleApi::new(config.connection.clone()),
            config,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(PaddleConfig::from_env()?))
    }

    /// Get the webhook secret
    pub fn webhook_secret(&self) -> &str {
        &self.config.webhook_secret
    }

    pub const fn catalog(&self) -> &PlanCatalog {
        &self.config.catalog
    }

    pub const fn config(&self) -> &PaddleConfig {
        &self.config
    }

    pub const fn api(&self) -> &PaddleApi {
        &self.api
    }

    /// Create a checkout session for one plan
    pub async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession> {
        let price_id = self.config.catalog.price_id(request.plan);

        let body = CreateTransaction {
            items: vec![TransactionItem {
                price_id: price_id.as_str(),
                quantity: 1,
            }],
            custom_data: CheckoutCustomData {
                user_id: &request.user_id,
                plan: request.plan,
                email: &request.customer_email,
                full_name: request.customer_name.as_deref(),
            },
            checkout: CheckoutSettings {
                url: &request.success_url,
            },
        };

        tracing::info!(
            user_id = %request.user_id,
            plan = %request.plan,
            price_id = %price_id,
            "Creating Paddle checkout"
        );

        let response = self.api.post("/transactions").json(&body).send().await?;
        if !response.status().is_success() {
            return Err(vendor_error(response, "Failed to create checkout session").await);
        }

        let envelope: Envelope<TransactionData> = response.json().await?;
        let checkout_url = envelope
            .data
            .checkout
            .and_then(|c| c.url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| PaymentError::Vendor {
                status: 200,
                message: "No checkout URL returned".into(),
            })?;

        Ok(CheckoutSession {
            id: envelope.data.id,
            checkout_url,
            plan: request.plan,
            customer_email: request.customer_email,
        })
    }

    /// Cancel at the end of the current billing period
    pub async fn cancel_subscription(&self, subscription_id: &str) -> Result<()> {
        let response = self
            .api
            .post(&format!("/subscriptions/{subscription_id}/cancel"))
            .json(&serde_json::json!({ "effective_from": "next_billing_period" }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(vendor_error(response, "Failed to cancel subscription").await);
        }

        tracing::info!(subscription_id = %subscription_id, "Scheduled subscription cancellation");
        Ok(())
    }

    /// Resume a paused subscription immediately
    pub async fn resume_subscription(&self, subscription_id: &str) -> Result<()> {
        let response = self
            .api
            .post(&format!("/subscriptions/{subscription_id}/resume"))
            .json(&serde_json::json!({ "effective_from": "immediately" }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(vendor_error(response, "Failed to resume subscription").await);
        }

        tracing::info!(subscription_id = %subscription_id, "Resumed subscription");
        Ok(())
    }
}

#[async_trait]
impl CheckoutProvider for PaddleClient {
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession> {
        Self::create_checkout_session(self, request).await
    }

    fn name(&self) -> &str {
        "Paddle"
    }
}

/// Turn a non-2xx Paddle response into [`PaymentError::Vendor`]
///
/// Paddle reports `{"error": {"detail": ...}}`; older payloads used
/// `message`. Falls back to `default` when neither is present.
pub(crate) async fn vendor_error(response: Response, default: &str) -> PaymentError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = vendor_message(&body).unwrap_or_else(|| default.to_string());

    tracing::warn!(status, message = %message, "Paddle API error");

    PaymentError::Vendor { status, message }
}

fn vendor_message(body: &str) -> Option<String> {
    let parsed: ErrorEnvelope = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    error.detail.or(error.message).filter(|m| !m.is_empty())
}

/// Request to create a checkout session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Auth provider user id, echoed back in webhooks
    pub user_id: String,

    /// Plan to purchase
    pub plan: Plan,

    /// Customer email
    pub customer_email: String,

    #[serde(default)]
    pub customer_name: Option<String>,

    /// URL the hosted checkout returns to after payment
    pub success_url: String,
}

/// Result of creating a checkout session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Paddle transaction ID
    pub id: String,

    /// URL to redirect user to
    pub checkout_url: String,

    /// Plan being purchased
    pub plan: Plan,

    /// Customer email
    pub customer_email: String,
}

#[derive(Serialize)]
struct CreateTransaction<'a> {
    items: Vec<TransactionItem<'a>>,
    custom_data: CheckoutCustomData<'a>,
    checkout: CheckoutSettings<'a>,
}

#[derive(Serialize)]
struct TransactionItem<'a> {
    price_id: &'a str,
    quantity: u32,
}

#[derive(Serialize)]
struct CheckoutCustomData<'a> {
    user_id: &'a str,
    plan: Plan,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_name: Option<&'a str>,
}

#[derive(Serialize)]
struct CheckoutSettings<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct Envelope<T> {
    pub(crate) data: T,
}

#[derive(Deserialize)]
struct TransactionData {
    id: String,
    #[serde(default)]
    checkout: Option<TransactionCheckout>,
}

#[derive(Deserialize)]
struct TransactionCheckout {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    message: Option<String>,
}
