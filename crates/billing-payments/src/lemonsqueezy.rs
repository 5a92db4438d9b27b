//! LemonSqueezy API Access
//!
//! Legacy vendor, kept for webhook and store inspection only. Speaks JSON:API
//! (`application/vnd.api+json`).

use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PaymentError, Result};

const JSON_API: &str = "application/vnd.api+json";
const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY_HERE";

/// Events subscribed when registering a webhook
pub const DEFAULT_WEBHOOK_EVENTS: [&str; 9] = [
    "order_created",
    "order_refunded",
    "subscription_created",
    "subscription_updated",
    "subscription_cancelled",
    "subscription_resumed",
    "subscription_expired",
    "subscription_paused",
    "subscription_unpaused",
];

#[derive(Clone)]
pub struct LemonSqueezyConfig {
    pub api_key: String,
    pub store_id: Option<String>,

    /// Explicit webhook target, overriding the one derived from the app URL
    pub webhook_url: Option<String>,

    /// Signing secret handed to LemonSqueezy when registering a webhook
    pub webhook_secret: Option<String>,

    pub base_url: String,
}

impl LemonSqueezyConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.lemonsqueezy.com/v1";

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = non_empty("LEMONSQUEEZY_API_KEY")
            .filter(|key| key != API_KEY_PLACEHOLDER)
            .ok_or_else(|| PaymentError::Config("LEMONSQUEEZY_API_KEY is not set".into()))?;

        Ok(Self {
            api_key,
            store_id: non_empty("LEMONSQUEEZY_STORE_ID"),
            webhook_url: non_empty("LEMONSQUEEZY_WEBHOOK_URL"),
            webhook_secret: non_empty("LEMONSQUEEZY_WEBHOOK_SECRET"),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Where webhooks should point for a deployment at `app_url`
    pub fn webhook_target(&self, app_url: &str) -> String {
        self.webhook_url.clone().unwrap_or_else(|| {
            format!("{}/api/webhooks/lemonsqueezy", app_url.trim_end_matches('/'))
        })
    }
}

impl fmt::Debug for LemonSqueezyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LemonSqueezyConfig")
            .field("api_key", &"<redacted>")
            .field("store_id", &self.store_id)
            .field("webhook_url", &self.webhook_url)
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// A webhook registration as reported by the API
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebhookRegistration {
    pub id: String,
    pub url: String,
    pub store_id: Option<i64>,
    pub events: Vec<String>,
    pub test_mode: bool,
    pub created_at: Option<String>,
    pub last_sent_at: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Store {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub url: String,
}

/// Parameters for registering a webhook
#[derive(Clone, Debug)]
pub struct CreateWebhook {
    pub store_id: String,
    pub url: String,
    pub events: Vec<String>,
    /// Key LemonSqueezy signs deliveries with (`X-Signature`)
    pub secret: Option<String>,
}

impl CreateWebhook {
    /// Registration for the default event set
    pub fn with_default_events(store_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
            url: url.into(),
            events: DEFAULT_WEBHOOK_EVENTS.iter().map(ToString::to_string).collect(),
            secret: None,
        }
    }

    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }
}

pub struct LemonSqueezyClient {
    client: Client,
    config: LemonSqueezyConfig,
}

impl LemonSqueezyClient {
    pub fn new(config: LemonSqueezyConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(LemonSqueezyConfig::from_env()?))
    }

    pub const fn config(&self) -> &LemonSqueezyConfig {
        &self.config
    }

    pub async fn list_webhooks(&self) -> Result<Vec<WebhookRegistration>> {
        let response = self
            .client
            .get(format!("{}/webhooks", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .header("Accept", JSON_API)
            .send()
            .await?;
        let document: Document<Vec<Resource<WebhookAttributes>>> = decode(response).await?;
        Ok(document.data.into_iter().map(Into::into).collect())
    }

    pub async fn create_webhook(&self, request: CreateWebhook) -> Result<WebhookRegistration> {
        let mut attributes = serde_json::json!({
            "url": request.url,
            "events": request.events,
        });
        if let Some(secret) = &request.secret {
            attributes["secret"] = serde_json::Value::String(secret.clone());
        }

        let body = serde_json::json!({
            "data": {
                "type": "webhooks",
                "attributes": attributes,
                "relationships": {
                    "store": {
                        "data": { "type": "stores", "id": request.store_id }
                    }
                }
            }
        });

        tracing::info!(url = %request.url, store_id = %request.store_id, "Registering LemonSqueezy webhook");

        let response = self
            .client
            .post(format!("{}/webhooks", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .header("Accept", JSON_API)
            .header("Content-Type", JSON_API)
            .body(serde_json::to_vec(&body)?)
            .send()
            .await?;
        let document: Document<Resource<WebhookAttributes>> = decode(response).await?;
        Ok(document.data.into())
    }

    pub async fn list_stores(&self) -> Result<Vec<Store>> {
        let response = self
            .client
            .get(format!("{}/stores", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .header("Accept", JSON_API)
            .send()
            .await?;
        let document: Document<Vec<Resource<StoreAttributes>>> = decode(response).await?;
        Ok(document.data.into_iter().map(Into::into).collect())
    }
}

/// Read a JSON:API document, or turn a non-2xx into [`PaymentError::Vendor`]
///
/// The body is read as text first since JSON:API responses are not always
/// served as `application/json`.
async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorDocument>(&body)
            .ok()
            .and_then(|doc| doc.errors.into_iter().find_map(|e| e.detail))
            .unwrap_or(body);
        tracing::warn!(status = status.as_u16(), message = %message, "LemonSqueezy API error");
        return Err(PaymentError::Vendor {
            status: status.as_u16(),
            message,
        });
    }

    Ok(serde_json::from_str(&body)?)
}

#[derive(Deserialize)]
struct Document<T> {
    data: T,
}

#[derive(Deserialize)]
struct Resource<A> {
    id: String,
    attributes: A,
}

#[derive(Deserialize)]
struct WebhookAttributes {
    url: String,
    #[serde(default)]
    store_id: Option<i64>,
    #[serde(default)]
    events: Vec<String>,
    #[serde(default)]
    test_mode: bool,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    last_sent_at: Option<String>,
}

impl From<Resource<WebhookAttributes>> for WebhookRegistration {
    fn from(r: Resource<WebhookAttributes>) -> Self {
        Self {
            id: r.id,
            url: r.attributes.url,
            store_id: r.attributes.store_id,
            events: r.attributes.events,
            test_mode: r.attributes.test_mode,
            created_at: r.attributes.created_at,
            last_sent_at: r.attributes.last_sent_at,
        }
    }
}

#[derive(Deserialize)]
struct StoreAttributes {
    name: String,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    url: String,
}

impl From<Resource<StoreAttributes>> for Store {
    fn from(r: Resource<StoreAttributes>) -> Self {
        Self {
            id: r.id,
            name: r.attributes.name,
            slug: r.attributes.slug,
            url: r.attributes.url,
        }
    }
}

#[derive(Deserialize)]
struct ErrorDocument {
    #[serde(default)]
    errors: Vec<ErrorObject>,
}

#[derive(Deserialize)]
struct ErrorObject {
    #[serde(default)]
    detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::tests::spawn_stub;
    use axum::{
        body::Bytes,
        http::{HeaderMap, StatusCode},
        routing::get,
        Router,
    };

    fn config(base_url: &str) -> LemonSqueezyConfig {
        LemonSqueezyConfig {
            api_key: "ls_test".into(),
            store_id: Some("12345".into()),
            webhook_url: None,
            webhook_secret: None,
            base_url: base_url.into(),
        }
    }

    async fn webhooks() -> (StatusCode, String) {
        (
            StatusCode::OK,
            serde_json::json!({
                "data": [{
                    "type": "webhooks",
                    "id": "7",
                    "attributes": {
                        "store_id": 12345,
                        "url": "https://app.example.com/api/webhooks/lemonsqueezy",
                        "events": ["order_created"],
                        "test_mode": true,
                        "created_at": "2024-06-01T00:00:00Z",
                        "last_sent_at": null
                    }
                }]
            })
            .to_string(),
        )
    }

    async fn create(headers: HeaderMap, body: Bytes) -> (StatusCode, String) {
        assert_eq!(headers.get("content-type").unwrap(), JSON_API);
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let attributes = &body["data"]["attributes"];
        let store = &body["data"]["relationships"]["store"]["data"];
        if store["id"] != "12345" {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                serde_json::json!({"errors": [{"status": "422", "detail": "The store id is invalid."}]})
                    .to_string(),
            );
        }
        if attributes["secret"] != "whsec_ls" {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                serde_json::json!({"errors": [{"status": "422", "detail": "The secret field is required."}]})
                    .to_string(),
            );
        }
        (
            StatusCode::CREATED,
            serde_json::json!({
                "data": {
                    "type": "webhooks",
                    "id": "8",
                    "attributes": {
                        "store_id": 12345,
                        "url": attributes["url"],
                        "events": attributes["events"],
                        "test_mode": false
                    }
                }
            })
            .to_string(),
        )
    }

    async fn stores(headers: HeaderMap) -> (StatusCode, String) {
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer ls_test") {
            return (StatusCode::UNAUTHORIZED, "Unauthenticated".into());
        }
        (
            StatusCode::OK,
            serde_json::json!({
                "data": [{
                    "type": "stores",
                    "id": "12345",
                    "attributes": {"name": "Algo", "slug": "algo", "url": "https://algo.lemonsqueezy.com"}
                }]
            })
            .to_string(),
        )
    }

    async fn base() -> String {
        let app = Router::new()
            .route("/webhooks", get(webhooks).post(create))
            .route("/stores", get(stores));
        spawn_stub(app).await
    }

    #[test]
    fn test_config_from_lookup() {
        let config = LemonSqueezyConfig::from_lookup(|k| match k {
            "LEMONSQUEEZY_API_KEY" => Some("key".into()),
            "LEMONSQUEEZY_STORE_ID" => Some(" ".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.store_id, None);
        assert_eq!(config.webhook_secret, None);
        assert_eq!(config.base_url, LemonSqueezyConfig::DEFAULT_BASE_URL);
        assert_eq!(
            config.webhook_target("https://app.example.com/"),
            "https://app.example.com/api/webhooks/lemonsqueezy"
        );

        assert!(LemonSqueezyConfig::from_lookup(|_| None).is_err());
        assert!(LemonSqueezyConfig::from_lookup(|_| Some(API_KEY_PLACEHOLDER.into())).is_err());
    }

    #[test]
    fn test_explicit_webhook_url_wins() {
        let mut config = config("http://unused");
        config.webhook_url = Some("https://hooks.example.com/ls".into());
        assert_eq!(config.webhook_target("https://app.example.com"), "https://hooks.example.com/ls");
    }

    #[tokio::test]
    async fn test_list_webhooks() {
        let client = LemonSqueezyClient::new(config(&base().await));
        let hooks = client.list_webhooks().await.unwrap();
        assert_eq!(hooks.len(), 1);
        assert_eq!(hooks[0].id, "7");
        assert_eq!(hooks[0].store_id, Some(12345));
        assert!(hooks[0].test_mode);
        assert_eq!(hooks[0].last_sent_at, None);
    }

    #[tokio::test]
    async fn test_create_webhook() {
        let client = LemonSqueezyClient::new(config(&base().await));
        let created = client
            .create_webhook(
                CreateWebhook::with_default_events(
                    "12345",
                    "https://app.example.com/api/webhooks/lemonsqueezy",
                )
                .with_secret("whsec_ls"),
            )
            .await
            .unwrap();
        assert_eq!(created.id, "8");
        assert_eq!(created.events.len(), DEFAULT_WEBHOOK_EVENTS.len());

        let err = client
            .create_webhook(
                CreateWebhook::with_default_events("999", "https://x.example.com")
                    .with_secret("whsec_ls"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "The store id is invalid.");

        let err = client
            .create_webhook(CreateWebhook::with_default_events(
                "12345",
                "https://app.example.com/api/webhooks/lemonsqueezy",
            ))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "The secret field is required.");
    }

    #[tokio::test]
    async fn test_list_stores_and_raw_error_body() {
        let base = base().await;
        let stores = LemonSqueezyClient::new(config(&base)).list_stores().await.unwrap();
        assert_eq!(stores[0].slug, "algo");

        let mut bad = config(&base);
        bad.api_key = "wrong".into();
        let err = LemonSqueezyClient::new(bad).list_stores().await.unwrap_err();
        match err {
            PaymentError::Vendor { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Unauthenticated");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
