//! Paddle API Diagnostics

use billing_payments::{PaddleApi, PaddleClient, PaymentError, Plan, Price};

use crate::env::env_prefix_for;
use crate::report::{Report, Section};

fn describe(err: &PaymentError) -> String {
    match err {
        PaymentError::Vendor { status, message } => format!("{message} (HTTP {status})"),
        other => other.to_string(),
    }
}

fn price_summary(price: &Price) -> String {
    format!(
        "{} - {} {} / {} ({})",
        price.description.as_deref().unwrap_or("No description"),
        price.unit_price.amount,
        price.unit_price.currency_code,
        price.interval_label(),
        price.status
    )
}

/// API access probe plus a lookup of each configured price
pub async fn api_sections(client: &PaddleClient, report: &mut Report) {
    let mut access = Section::new("Paddle API Access");
    let connection = client.api().connection();
    access.line(format!("API Base URL: {}", connection.base_url));
    access.line(format!("Environment: {}", connection.environment));

    match client.api().probe_transactions().await {
        Ok(probe) if probe.is_success() => {
            access.ok("GET /transactions", format!("HTTP {}", probe.status));
        }
        Ok(probe) if probe.is_forbidden() => {
            access.fail(
                "GET /transactions",
                format!("HTTP 403 {}", probe.detail.unwrap_or_default()),
            );
            access.line("403 Forbidden usually means one of:");
            access.line("  - the API key lacks transaction permissions");
            access.line("  - the account is not verified or is restricted");
            access.line("  - a sandbox key is used against production (or the reverse)");
            report.mark_api_failure();
        }
        Ok(probe) => {
            access.fail(
                "GET /transactions",
                format!(
                    "HTTP {} {}",
                    probe.status,
                    probe.detail.unwrap_or_else(|| "Unknown error".into())
                ),
            );
            report.mark_api_failure();
        }
        Err(e) => {
            access.fail("GET /transactions", describe(&e));
            report.mark_api_failure();
        }
    }
    report.push(access);

    let mut prices = Section::new("Price ID Access");
    for plan in Plan::ALL {
        let price_id = client.catalog().price_id(plan);
        match client.api().get_price(price_id.as_str()).await {
            Ok(price) => prices.ok(plan.display_name(), price_summary(&price)),
            Err(e) => {
                prices.fail(plan.display_name(), format!("{price_id}: {}", describe(&e)));
                report.mark_api_failure();
            }
        }
    }
    report.push(prices);
}

/// Products with their prices and a suggested `.env` snippet
///
/// Needs only API access, so it works before the price IDs are configured.
pub async fn products_report(client: &PaddleApi) -> Report {
    let mut report = Report::new(format!(
        "Fetching Paddle products ({})...",
        client.connection().environment
    ));

    let products = match client.list_products().await {
        Ok(products) => products,
        Err(e) => {
            let mut section = Section::new("Products");
            section.fail("GET /products", describe(&e));
            report.push(section);
            report.mark_api_failure();
            return report;
        }
    };

    let mut snippet = Vec::new();

    for product in &products {
        let mut section = Section::new(format!("Product: {}", product.name));
        section.line(format!("Product ID: {}", product.id));
        section.line(format!(
            "Description: {}",
            product.description.as_deref().unwrap_or("-")
        ));
        section.line(format!("Status: {}", product.status));

        match client.list_prices(&product.id).await {
            Ok(prices) => {
                section.line(format!("Prices ({}):", prices.len()));
                for price in &prices {
                    section.ok(price.id.clone(), price_summary(price));
                }
                if let (Some(prefix), Some(first)) = (env_prefix_for(&product.name), prices.first()) {
                    snippet.push(format!("{prefix}_PRODUCT_ID={}", product.id));
                    snippet.push(format!("{prefix}_PRICE_ID={}", first.id));
                }
            }
            Err(e) => {
                section.fail("Prices", describe(&e));
                report.mark_api_failure();
            }
        }

        report.push(section);
    }

    let mut env = Section::new(format!("Found {} product(s); copy into .env.local", products.len()));
    env.line("# Paddle Product IDs");
    for line in snippet {
        env.line(line);
    }
    report.push(env);

    report
}
