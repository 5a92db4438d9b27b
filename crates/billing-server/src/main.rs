//! plan-billing HTTP Server
//!
//! Axum-based server exposing plan checkout and the Paddle and LemonSqueezy
//! webhook receivers.

mod config;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use billing_auth::SupabaseAuthProvider;
use billing_core::{AuthProvider, DenyAllAuthProvider};
use billing_payments::{LemonSqueezyWebhookConfig, MemorySubscriptionStore, PaddleClient};

use crate::config::ServerConfig;
use crate::handlers::{create_checkout, health_check, lemonsqueezy_webhook, paddle_webhook};
use crate::state::{AppState, Payments};

/// Routes plus the shared middleware stack
fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/checkout", post(create_checkout))
        .route("/api/webhooks/paddle", post(paddle_webhook))
        .route("/api/webhooks/lemonsqueezy", post(lemonsqueezy_webhook))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment; .env.local wins over .env
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env();

    let auth: Arc<dyn AuthProvider> = match SupabaseAuthProvider::from_env() {
        Ok(provider) => {
            tracing::info!("✓ Supabase auth configured");
            Arc::new(provider)
        }
        Err(e) => {
            tracing::warn!("⚠ Supabase not configured - every checkout will be rejected");
            tracing::warn!("  {}", e);
            Arc::new(DenyAllAuthProvider)
        }
    };

    let payments = match PaddleClient::from_env() {
        Ok(client) => {
            tracing::info!(
                environment = %client.config().connection.environment,
                "✓ Paddle configured"
            );
            Some(Payments {
                webhook_secret: client.webhook_secret().to_string(),
                catalog: client.catalog().clone(),
                checkout: Arc::new(client),
            })
        }
        Err(e) => {
            tracing::warn!("⚠ Paddle not configured - payments disabled");
            tracing::warn!("  {}", e);
            None
        }
    };

    let lemonsqueezy = match LemonSqueezyWebhookConfig::from_env() {
        Ok(config) => {
            tracing::info!("✓ LemonSqueezy webhooks configured");
            Some(config)
        }
        Err(e) => {
            tracing::info!("LemonSqueezy webhooks disabled: {}", e);
            None
        }
    };

    let state = AppState {
        auth,
        subscriptions: Arc::new(MemorySubscriptionStore::new()),
        payments,
        lemonsqueezy,
        app_url: config.app_url.clone(),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 plan-billing server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("  App URL: {}", config.app_url);
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                     - Health check");
    tracing::info!("  POST /api/checkout               - Create Paddle checkout");
    tracing::info!("  POST /api/webhooks/paddle        - Paddle notifications");
    tracing::info!("  POST /api/webhooks/lemonsqueezy  - LemonSqueezy notifications");
    tracing::info!("");

    axum::serve(listener, app(state)).await?;

    Ok(())
}
