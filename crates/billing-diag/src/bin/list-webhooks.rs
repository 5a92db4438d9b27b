//! List LemonSqueezy webhook registrations

use anyhow::Context;
use billing_diag::lemonsqueezy::webhooks_report;
use billing_payments::LemonSqueezyClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    billing_diag::init();

    let client = LemonSqueezyClient::from_env()?;
    let hooks = client
        .list_webhooks()
        .await
        .context("Error fetching webhooks")?;

    print!("{}", webhooks_report(&hooks));
    Ok(())
}
