//! List Paddle products and prices, with a `.env` snippet for the plans

use billing_diag::paddle::products_report;
use billing_payments::PaddleApi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    billing_diag::init();

    let api = PaddleApi::from_env()?;
    tracing::debug!(base_url = %api.connection().base_url, "Listing Paddle products");

    let report = products_report(&api).await;
    print!("{report}");

    if report.api_failed() {
        anyhow::bail!("Paddle API request failed");
    }
    Ok(())
}
