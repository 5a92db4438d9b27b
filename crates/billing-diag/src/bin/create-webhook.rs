//! Register the LemonSqueezy webhook for this deployment

use anyhow::Context;
use billing_diag::{env::APP_URL_VAR, lemonsqueezy::created_webhook_report};
use billing_payments::{CreateWebhook, LemonSqueezyClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    billing_diag::init();

    let client = LemonSqueezyClient::from_env()?;
    let store_id = client
        .config()
        .store_id
        .clone()
        .context("LEMONSQUEEZY_STORE_ID is not set")?;

    let app_url = billing_diag::process_env(APP_URL_VAR).unwrap_or_default();
    if client.config().webhook_url.is_none() && app_url.trim().is_empty() {
        anyhow::bail!("Set {APP_URL_VAR} or LEMONSQUEEZY_WEBHOOK_URL");
    }
    let url = client.config().webhook_target(app_url.trim());

    let secret = client
        .config()
        .webhook_secret
        .clone()
        .context("LEMONSQUEEZY_WEBHOOK_SECRET is not set")?;

    let hook = client
        .create_webhook(CreateWebhook::with_default_events(store_id, url).with_secret(secret))
        .await
        .context("Error creating webhook")?;

    print!("{}", created_webhook_report(&hook));
    Ok(())
}
