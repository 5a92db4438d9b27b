//! List LemonSqueezy stores (to find LEMONSQUEEZY_STORE_ID)

use anyhow::Context;
use billing_diag::lemonsqueezy::stores_report;
use billing_payments::LemonSqueezyClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    billing_diag::init();

    let stores = LemonSqueezyClient::from_env()?
        .list_stores()
        .await
        .context("Error fetching stores")?;

    print!("{}", stores_report(&stores));
    Ok(())
}
