//! HTTP Handlers

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    Json,
};
use serde::{Deserialize, Serialize};

use billing_core::{AuthError, Credentials};
use billing_payments::{
    CheckoutRequest, LemonSqueezyWebhookHandler, PaymentError, Plan, SubscriptionStore,
    WebhookHandler,
};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub auth_provider: String,
    pub payments_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    #[serde(rename = "planType", default)]
    pub plan_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub checkout_url: String,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Access token from `Authorization: Bearer`, falling back to the session cookie
fn credentials(headers: &HeaderMap) -> Option<Credentials> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(Credentials::from_authorization)
        .or_else(|| {
            headers
                .get(header::COOKIE)
                .and_then(|v| v.to_str().ok())
                .and_then(Credentials::from_cookie_header)
        })
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        auth_provider: state.auth.name().to_string(),
        payments_configured: state.payments.is_some(),
    })
}

/// Create a Paddle checkout for the signed-in user
///
/// The body is taken as raw bytes so that an unauthenticated caller gets 401
/// no matter what they sent.
pub async fn create_checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let unauthorized = || api_error(StatusCode::UNAUTHORIZED, "Unauthorized");

    let creds = credentials(&headers).ok_or_else(unauthorized)?;
    let user = state.auth.current_user(&creds).await.map_err(|e| {
        tracing::warn!(error = %e, "Checkout rejected: not authenticated");
        unauthorized()
    })?;

    let payload: CheckoutBody = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(error = %e, "Unparseable checkout body");
        api_error(StatusCode::BAD_REQUEST, "Invalid request body")
    })?;

    let plan_type = payload
        .plan_type
        .filter(|p| !p.is_empty())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Plan type is required"))?;

    let plan: Plan = plan_type.parse().map_err(|e: PaymentError| {
        tracing::info!(user_id = %user.id, plan_type = %plan_type, "Invalid plan type");
        api_error(StatusCode::BAD_REQUEST, e.user_message())
    })?;

    let profile = match state.auth.profile(&user.id).await {
        Ok(Some(profile)) => profile,
        Ok(None) | Err(AuthError::ProfileNotFound(_)) => {
            tracing::warn!(user_id = %user.id, "Profile not found");
            return Err(api_error(StatusCode::BAD_REQUEST, "Profile not found"));
        }
        Err(e) => {
            tracing::error!(user_id = %user.id, error = %e, "Profile lookup failed");
            return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.user_message()));
        }
    };

    let payments = state.payments.as_ref().ok_or_else(|| {
        tracing::error!("Checkout requested but Paddle is not configured");
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            PaymentError::Config("Paddle not configured".into()).user_message(),
        )
    })?;

    match state.subscriptions.active_for_user(&user.id) {
        Ok(None) => {}
        Ok(Some(existing)) => {
            tracing::info!(
                user_id = %user.id,
                subscription_id = %existing.subscription_id,
                "Checkout refused: already subscribed"
            );
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                PaymentError::ActiveSubscription.user_message(),
            ));
        }
        Err(e) => {
            tracing::error!(error = %e, "Subscription lookup failed");
            return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.user_message()));
        }
    }

    let customer_email = user
        .email
        .clone()
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| profile.email.clone());

    let request = CheckoutRequest {
        user_id: user.id.clone(),
        plan,
        customer_email,
        customer_name: profile.display_name().map(ToString::to_string),
        success_url: format!("{}/success?session_id={{checkout_id}}", state.app_url),
    };

    let session = payments
        .checkout
        .create_checkout_session(request)
        .await
        .map_err(|e| {
            if e.is_client_error() {
                tracing::warn!(user_id = %user.id, plan = %plan, error = %e, "Checkout rejected by vendor");
                api_error(StatusCode::BAD_REQUEST, e.user_message())
            } else {
                tracing::error!(user_id = %user.id, plan = %plan, error = %e, "Checkout error");
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        })?;

    tracing::info!(
        user_id = %user.id,
        plan = %plan,
        session_id = %session.id,
        provider = payments.checkout.name(),
        "Checkout session created"
    );

    Ok(Json(CheckoutResponse {
        checkout_url: session.checkout_url,
        success: true,
    }))
}

/// Paddle webhook handler
pub async fn paddle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let payments = state
        .payments
        .as_ref()
        .ok_or_else(|| api_error(StatusCode::SERVICE_UNAVAILABLE, "Payments not configured"))?;

    let signature = headers
        .get("paddle-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Webhook without Paddle-Signature header");
            api_error(StatusCode::UNAUTHORIZED, "Missing signature")
        })?;

    let handler = WebhookHandler::new(state.subscriptions.clone(), payments.catalog.clone());

    let processing_failed = || api_error(StatusCode::INTERNAL_SERVER_ERROR, "Webhook processing failed");

    let event = handler
        .parse_event(&body, signature, &payments.webhook_secret)
        .map_err(|e| match e {
            PaymentError::WebhookParse(_) => {
                tracing::error!(error = %e, "Webhook payload parse failed");
                processing_failed()
            }
            _ => {
                tracing::warn!(error = %e, "Webhook signature failed");
                api_error(StatusCode::UNAUTHORIZED, "Invalid signature")
            }
        })?;

    handler.handle(event).map_err(|e| {
        tracing::error!(error = %e, "Webhook processing error");
        processing_failed()
    })?;

    Ok(Json(WebhookAck { received: true }))
}

/// LemonSqueezy webhook handler
pub async fn lemonsqueezy_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let config = state
        .lemonsqueezy
        .as_ref()
        .ok_or_else(|| api_error(StatusCode::SERVICE_UNAVAILABLE, "Payments not configured"))?;

    let signature = headers
        .get("x-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Webhook without X-Signature header");
            api_error(StatusCode::UNAUTHORIZED, "Missing signature")
        })?;

    let handler =
        LemonSqueezyWebhookHandler::new(state.subscriptions.clone(), config.variants.clone());

    let processing_failed = || api_error(StatusCode::INTERNAL_SERVER_ERROR, "Webhook processing failed");

    let event = handler
        .parse_event(&body, signature, &config.secret)
        .map_err(|e| match e {
            PaymentError::WebhookParse(_) => {
                tracing::error!(error = %e, "Webhook payload parse failed");
                processing_failed()
            }
            _ => {
                tracing::warn!(error = %e, "Webhook signature failed");
                api_error(StatusCode::UNAUTHORIZED, "Invalid signature")
            }
        })?;

    handler.handle(event).map_err(|e| {
        tracing::error!(error = %e, "Webhook processing error");
        processing_failed()
    })?;

    Ok(Json(WebhookAck { received: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Payments;
    use async_trait::async_trait;
    use axum::{body::Body, http::Request, Router};
    use billing_core::{AuthProvider, DenyAllAuthProvider, Profile, User};
    use billing_payments::{
        BillingProvider, CheckoutProvider, CheckoutSession, LemonSqueezyWebhookConfig,
        MemorySubscriptionStore, PlanCatalog, PriceId, SubscriptionRecord, SubscriptionStatus,
        VariantCatalog, lemonsqueezy_signature, signature_header,
    };
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    const CASUAL: &str = "pri_01hv8x2kq3m4n5p6r7s8t9v0wx";
    const GIGACHAD: &str = "pri_01hv8x2kq3m4n5p6r7s8t9v0wy";
    const SECRET: &str = "pdl_ntfset_test";
    const LS_SECRET: &str = "ls_signing_secret";

    /// Tokens: `good` has a profile, `orphan` has none, `flaky` fails the
    /// profile lookup; anything else is rejected.
    struct FakeAuth;

    #[async_trait]
    impl AuthProvider for FakeAuth {
        async fn current_user(&self, credentials: &Credentials) -> billing_core::Result<User> {
            match credentials.access_token() {
                token @ ("good" | "orphan" | "flaky") => Ok(User {
                    id: format!("user-{token}"),
                    email: Some(format!("{token}@example.com")),
                }),
                _ => Err(AuthError::Unauthenticated("bad token".into())),
            }
        }

        async fn profile(&self, user_id: &str) -> billing_core::Result<Option<Profile>> {
            match user_id {
                "user-good" => Ok(Some(Profile {
                    id: user_id.into(),
                    email: "profile@example.com".into(),
                    full_name: Some("Ada Lovelace".into()),
                })),
                "user-flaky" => Err(AuthError::Network("connection reset".into())),
                _ => Ok(None),
            }
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    #[derive(Clone, Copy)]
    enum Outcome {
        Success,
        VendorError,
        Unexpected,
    }

    struct FakeCheckout {
        outcome: Outcome,
        requests: Mutex<Vec<CheckoutRequest>>,
    }

    impl FakeCheckout {
        fn new(outcome: Outcome) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CheckoutProvider for FakeCheckout {
        async fn create_checkout_session(
            &self,
            request: CheckoutRequest,
        ) -> billing_payments::Result<CheckoutSession> {
            self.requests.lock().unwrap().push(request.clone());
            match self.outcome {
                Outcome::Success => Ok(CheckoutSession {
                    id: "txn_01abc".into(),
                    checkout_url: "https://pay.example.com/checkout?_ptxn=txn_01abc".into(),
                    plan: request.plan,
                    customer_email: request.customer_email,
                }),
                Outcome::VendorError => Err(PaymentError::Vendor {
                    status: 400,
                    message: "Price is archived".into(),
                }),
                Outcome::Unexpected => Err(PaymentError::Storage("boom".into())),
            }
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn catalog() -> PlanCatalog {
        PlanCatalog::new(PriceId::parse(CASUAL).unwrap(), PriceId::parse(GIGACHAD).unwrap())
    }

    fn state(checkout: Option<Arc<FakeCheckout>>) -> AppState {
        AppState {
            auth: Arc::new(FakeAuth),
            subscriptions: Arc::new(MemorySubscriptionStore::new()),
            payments: checkout.map(|c| Payments {
                checkout: c,
                webhook_secret: SECRET.into(),
                catalog: catalog(),
            }),
            lemonsqueezy: None,
            app_url: "https://app.example.com".into(),
        }
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn checkout_request(token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/checkout")
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn checkout(
        state: AppState,
        token: Option<&str>,
        body: &str,
    ) -> (StatusCode, serde_json::Value) {
        send(crate::app(state), checkout_request(token, body)).await
    }

    #[tokio::test]
    async fn test_checkout_success() {
        let fake = FakeCheckout::new(Outcome::Success);
        let (status, body) = checkout(
            state(Some(fake.clone())),
            Some("good"),
            r#"{"planType":"CASUAL"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(body["checkoutUrl"].as_str().unwrap().starts_with("https://"));

        let requests = fake.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].plan, Plan::Casual);
        assert_eq!(requests[0].user_id, "user-good");
        assert_eq!(requests[0].customer_email, "good@example.com");
        assert_eq!(requests[0].customer_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(
            requests[0].success_url,
            "https://app.example.com/success?session_id={checkout_id}"
        );
    }

    #[tokio::test]
    async fn test_checkout_accepts_session_cookie() {
        let cookies = [
            "theme=dark; sb-abcdefgh-auth-token=%7B%22access_token%22%3A%22good%22%7D",
            "sb-abcdefgh-auth-token=good",
        ];
        for cookie in cookies {
            let fake = FakeCheckout::new(Outcome::Success);
            let request = Request::builder()
                .method("POST")
                .uri("/api/checkout")
                .header("cookie", cookie)
                .body(Body::from(r#"{"planType":"GIGACHAD"}"#))
                .unwrap();
            let (status, _) = send(crate::app(state(Some(fake.clone()))), request).await;
            assert_eq!(status, StatusCode::OK, "{cookie}");
            assert_eq!(fake.calls(), 1);
        }

        let request = Request::builder()
            .method("POST")
            .uri("/api/checkout")
            .header("cookie", "sb-access-token=good")
            .body(Body::from(r#"{"planType":"GIGACHAD"}"#))
            .unwrap();
        let (status, _) = send(
            crate::app(state(Some(FakeCheckout::new(Outcome::Success)))),
            request,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unauthenticated_regardless_of_body() {
        for body in [r#"{"planType":"CASUAL"}"#, r#"{"planType":"FREE"}"#, "not json", ""] {
            for token in [None, Some("expired")] {
                let fake = FakeCheckout::new(Outcome::Success);
                let (status, json) = checkout(state(Some(fake.clone())), token, body).await;
                assert_eq!(status, StatusCode::UNAUTHORIZED, "{body} {token:?}");
                assert_eq!(json["error"], "Unauthorized");
                assert_eq!(fake.calls(), 0);
            }
        }
    }

    #[tokio::test]
    async fn test_deny_all_provider_rejects() {
        let mut state = state(Some(FakeCheckout::new(Outcome::Success)));
        state.auth = Arc::new(DenyAllAuthProvider);
        let (status, _) = checkout(state, Some("good"), r#"{"planType":"CASUAL"}"#).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_plan_type() {
        for plan in ["FREE", "casual", "PRO", " CASUAL"] {
            let fake = FakeCheckout::new(Outcome::Success);
            let body = serde_json::json!({ "planType": plan }).to_string();
            let (status, json) = checkout(state(Some(fake.clone())), Some("good"), &body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{plan}");
            assert_eq!(json, serde_json::json!({ "error": "Invalid plan type" }));
            assert_eq!(fake.calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_bad_bodies() {
        let cases = [
            ("not json", "Invalid request body"),
            ("{}", "Plan type is required"),
            (r#"{"planType":""}"#, "Plan type is required"),
            (r#"{"planType":null}"#, "Plan type is required"),
        ];
        for (body, message) in cases {
            let (status, json) = checkout(
                state(Some(FakeCheckout::new(Outcome::Success))),
                Some("good"),
                body,
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(json["error"], message);
        }
    }

    #[tokio::test]
    async fn test_profile_missing_or_failing() {
        let (status, json) = checkout(
            state(Some(FakeCheckout::new(Outcome::Success))),
            Some("orphan"),
            r#"{"planType":"CASUAL"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Profile not found");

        let (status, json) = checkout(
            state(Some(FakeCheckout::new(Outcome::Success))),
            Some("flaky"),
            r#"{"planType":"CASUAL"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_payments_not_configured() {
        let (status, json) = checkout(state(None), Some("good"), r#"{"planType":"CASUAL"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Payment service configuration error");
    }

    #[tokio::test]
    async fn test_active_subscription_blocks_checkout() {
        let fake = FakeCheckout::new(Outcome::Success);
        let state = state(Some(fake.clone()));
        state
            .subscriptions
            .upsert_subscription(SubscriptionRecord::new(
                BillingProvider::Paddle,
                "user-good".into(),
                Plan::Casual,
                "sub_1".into(),
                SubscriptionStatus::Active,
            ))
            .unwrap();

        let (status, json) = checkout(state, Some("good"), r#"{"planType":"GIGACHAD"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "User already has an active subscription");
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn test_vendor_error_is_relayed() {
        let (status, json) = checkout(
            state(Some(FakeCheckout::new(Outcome::VendorError))),
            Some("good"),
            r#"{"planType":"CASUAL"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, serde_json::json!({ "error": "Price is archived" }));
    }

    #[tokio::test]
    async fn test_unexpected_error_is_internal() {
        let (status, json) = checkout(
            state(Some(FakeCheckout::new(Outcome::Unexpected))),
            Some("good"),
            r#"{"planType":"CASUAL"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Internal server error");
        assert!(json.get("checkoutUrl").is_none());
    }

    fn webhook_request(signature: Option<&str>, body: &[u8]) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/webhooks/paddle")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header("paddle-signature", signature);
        }
        builder.body(Body::from(body.to_vec())).unwrap()
    }

    fn subscription_event() -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "event_id": "evt_1",
            "event_type": "subscription.created",
            "data": {
                "id": "sub_42",
                "status": "active",
                "items": [{"price": {"id": CASUAL}}],
                "custom_data": {"user_id": "user-good"}
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_webhook_records_subscription() {
        let state = state(Some(FakeCheckout::new(Outcome::Success)));
        let store = state.subscriptions.clone();
        let body = subscription_event();
        let signature = signature_header(1_700_000_000, &body, SECRET).unwrap();

        let (status, json) = send(crate::app(state), webhook_request(Some(&signature), &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({ "received": true }));

        let record = store.get_by_subscription(BillingProvider::Paddle, "sub_42").unwrap().unwrap();
        assert_eq!(record.plan, Plan::Casual);
        assert!(store.active_for_user("user-good").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_webhook_signature_failures() {
        let body = subscription_event();
        let wrong = signature_header(1, &body, "another_secret").unwrap();

        let cases = [
            (None, "Missing signature"),
            (Some("garbage"), "Invalid signature"),
            (Some(wrong.as_str()), "Invalid signature"),
        ];
        for (signature, message) in cases {
            let state = state(Some(FakeCheckout::new(Outcome::Success)));
            let store = state.subscriptions.clone();
            let (status, json) = send(crate::app(state), webhook_request(signature, &body)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(json["error"], message);
            assert!(store.get_by_subscription(BillingProvider::Paddle, "sub_42").unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_webhook_bad_json_and_unconfigured() {
        let body = b"{not json";
        let signature = signature_header(1, body, SECRET).unwrap();
        let (status, json) = send(
            crate::app(state(Some(FakeCheckout::new(Outcome::Success)))),
            webhook_request(Some(&signature), body),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Webhook processing failed");

        let (status, _) = send(crate::app(state(None)), webhook_request(Some(&signature), body)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_webhook_acknowledges_malformed_event_data() {
        let state = state(Some(FakeCheckout::new(Outcome::Success)));
        let store = state.subscriptions.clone();
        let body = serde_json::to_vec(&serde_json::json!({
            "event_id": "evt_2",
            "event_type": "subscription.updated",
            "data": {"status": "active", "current_billing_period": {"starts_at": "yesterday"}}
        }))
        .unwrap();
        let signature = signature_header(1_700_000_000, &body, SECRET).unwrap();

        let (status, json) = send(crate::app(state), webhook_request(Some(&signature), &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({ "received": true }));
        assert!(store.active_for_user("user-good").unwrap().is_none());
    }

    fn lemonsqueezy_state() -> AppState {
        let mut state = state(None);
        state.lemonsqueezy = Some(LemonSqueezyWebhookConfig {
            secret: LS_SECRET.into(),
            variants: VariantCatalog::new("111", "222"),
        });
        state
    }

    fn lemonsqueezy_request(signature: Option<&str>, body: &[u8]) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/webhooks/lemonsqueezy")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header("x-signature", signature);
        }
        builder.body(Body::from(body.to_vec())).unwrap()
    }

    fn lemonsqueezy_event() -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "meta": {
                "event_name": "subscription_created",
                "custom_data": {"user_id": "user-good"}
            },
            "data": {
                "type": "subscriptions",
                "id": "9001",
                "attributes": {"variant_id": 111, "customer_id": 5, "status": "active"}
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_lemonsqueezy_webhook_records_subscription() {
        let state = lemonsqueezy_state();
        let store = state.subscriptions.clone();
        let body = lemonsqueezy_event();
        let signature = lemonsqueezy_signature(&body, LS_SECRET).unwrap();

        let (status, json) =
            send(crate::app(state), lemonsqueezy_request(Some(&signature), &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({ "received": true }));

        let record = store
            .get_by_subscription(BillingProvider::LemonSqueezy, "9001")
            .unwrap()
            .unwrap();
        assert_eq!(record.plan, Plan::Casual);
        assert_eq!(record.user_id, "user-good");
        assert!(store.get_by_subscription(BillingProvider::Paddle, "9001").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lemonsqueezy_webhook_rejections() {
        let body = lemonsqueezy_event();
        let wrong = lemonsqueezy_signature(&body, "another_secret").unwrap();

        let cases = [
            (None, "Missing signature"),
            (Some("zz"), "Invalid signature"),
            (Some(wrong.as_str()), "Invalid signature"),
        ];
        for (signature, message) in cases {
            let state = lemonsqueezy_state();
            let store = state.subscriptions.clone();
            let (status, json) =
                send(crate::app(state), lemonsqueezy_request(signature, &body)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(json["error"], message);
            assert!(store.active_for_user("user-good").unwrap().is_none());
        }

        let signature = lemonsqueezy_signature(&body, LS_SECRET).unwrap();
        let (status, json) = send(
            crate::app(state(Some(FakeCheckout::new(Outcome::Success)))),
            lemonsqueezy_request(Some(&signature), &body),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["error"], "Payments not configured");
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, json) = send(crate::app(state(None)), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["auth_provider"], "fake");
        assert_eq!(json["payments_configured"], false);
    }
}
