//! Environment Variable Checks

use billing_payments::{PaddleEnvironment, PriceId};
use url::Url;

use crate::report::{Report, Section, Status};

/// Paddle variables, in report order
pub const PADDLE_VARS: [&str; 6] = [
    "PADDLE_API_KEY",
    "PADDLE_WEBHOOK_SECRET",
    "PADDLE_VENDOR_ID",
    "PADDLE_ENVIRONMENT",
    "PADDLE_CASUAL_PRICE_ID",
    "PADDLE_GIGACHAD_PRICE_ID",
];

pub const APP_URL_VAR: &str = "NEXT_PUBLIC_APP_URL";

pub const LEMONSQUEEZY_VARS: [&str; 2] = ["LEMONSQUEEZY_API_KEY", "LEMONSQUEEZY_STORE_ID"];

/// Variables whose values must not be printed in full
pub fn is_secret(name: &str) -> bool {
    name.contains("KEY") || name.contains("SECRET")
}

/// First 10 and last 4 characters; short values are hidden entirely
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 14 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..10].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

fn shown(name: &str, value: &str) -> String {
    if is_secret(name) {
        mask_secret(value)
    } else {
        value.to_string()
    }
}

/// Non-empty, trimmed value
fn read(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// One check per Paddle variable plus the app URL
pub fn paddle_section(lookup: &impl Fn(&str) -> Option<String>) -> Section {
    let mut section = Section::new("Paddle Environment Variables");

    let environment_raw = read(lookup, "PADDLE_ENVIRONMENT");
    let environment = PaddleEnvironment::parse(environment_raw.as_deref());

    for name in PADDLE_VARS {
        let Some(value) = read(lookup, name) else {
            if name == "PADDLE_ENVIRONMENT" {
                section.warn(name, "not set, defaults to sandbox");
            } else {
                section.fail(name, "MISSING");
            }
            continue;
        };

        let display = shown(name, &value);
        let (status, detail) = match name {
            "PADDLE_API_KEY" => api_key_status(&value, environment, display),
            "PADDLE_ENVIRONMENT" => match PaddleEnvironment::from_name(&value) {
                Some(_) => (Status::Ok, display),
                None => (
                    Status::Fail,
                    format!("{display} (expected sandbox or production; falls back to sandbox)"),
                ),
            },
            "PADDLE_CASUAL_PRICE_ID" | "PADDLE_GIGACHAD_PRICE_ID" => {
                if PriceId::is_valid(&value) {
                    (Status::Ok, display)
                } else {
                    (
                        Status::Fail,
                        format!("{display} (expected pri_ followed by 26 lowercase letters or digits)"),
                    )
                }
            }
            _ => (Status::Ok, display),
        };
        section.check(name, status, detail);
    }

    app_url_check(lookup, &mut section);
    section
}

fn api_key_status(value: &str, environment: PaddleEnvironment, display: String) -> (Status, String) {
    if !value.starts_with("pdl_") {
        return (Status::Fail, format!("{display} (should start with pdl_)"));
    }
    if !value.starts_with("pdl_live_") && !value.starts_with("pdl_sdbx_") {
        return (
            Status::Warn,
            format!("{display} (may be an old key format; expected pdl_live_ or pdl_sdbx_)"),
        );
    }
    let sandbox_key = value.starts_with("pdl_sdbx_");
    match (environment, sandbox_key) {
        (PaddleEnvironment::Production, true) => (
            Status::Warn,
            format!("{display} (sandbox key with production environment)"),
        ),
        (PaddleEnvironment::Sandbox, false) => (
            Status::Warn,
            format!("{display} (live key with sandbox environment)"),
        ),
        _ => (Status::Ok, display),
    }
}

fn app_url_check(lookup: &impl Fn(&str) -> Option<String>, section: &mut Section) {
    let Some(value) = read(lookup, APP_URL_VAR) else {
        section.fail(APP_URL_VAR, "MISSING");
        return;
    };

    match Url::parse(&value) {
        Ok(url) if url.has_host() && url.scheme() == "https" => section.ok(APP_URL_VAR, value),
        Ok(url) if url.has_host() => {
            section.warn(APP_URL_VAR, format!("{value} (not https; vendors require https webhooks)"));
        }
        Ok(_) | Err(_) => section.fail(APP_URL_VAR, format!("{value} (not an absolute URL)")),
    }
}

/// LemonSqueezy is optional; missing values only warn
pub fn lemonsqueezy_section(lookup: &impl Fn(&str) -> Option<String>) -> Section {
    let mut section = Section::new("LemonSqueezy Environment Variables (legacy)");

    for name in LEMONSQUEEZY_VARS {
        match read(lookup, name) {
            None => section.warn(name, "not set"),
            Some(value) if name == "LEMONSQUEEZY_STORE_ID" && !value.bytes().all(|b| b.is_ascii_digit()) => {
                section.fail(name, format!("{value} (store IDs are numeric)"));
            }
            Some(value) => section.ok(name, shown(name, &value)),
        }
    }

    section
}

/// Full environment report for `check-env`
pub fn env_report(lookup: &impl Fn(&str) -> Option<String>) -> Report {
    let mut report = Report::new("Checking Environment Variables...");
    report.push(paddle_section(lookup));
    report.push(lemonsqueezy_section(lookup));
    report
}

/// Webhook setup summary for `check-webhook-config`
pub fn webhook_config_report(lookup: &impl Fn(&str) -> Option<String>) -> Report {
    let mut report = Report::new("Checking Paddle Webhook Configuration...");

    let mut current = Section::new("Current Configuration");
    let app_url = read(lookup, APP_URL_VAR);
    match &app_url {
        Some(url) => current.ok(APP_URL_VAR, url.clone()),
        None => current.fail(APP_URL_VAR, "MISSING"),
    }
    match read(lookup, "PADDLE_WEBHOOK_SECRET") {
        Some(secret) => {
            current.ok("PADDLE_WEBHOOK_SECRET", "Set");
            current.line(format!("Webhook Secret Length: {} characters", secret.chars().count()));
            current.line(format!("Webhook Secret Preview: {}", mask_secret(&secret)));
        }
        None => current.fail("PADDLE_WEBHOOK_SECRET", "Missing"),
    }
    report.push(current);

    let mut expected = Section::new("Expected Webhook");
    if let Some(app_url) = app_url {
        let webhook_url = format!("{}/api/webhooks/paddle", app_url.trim_end_matches('/'));
        if webhook_url.starts_with("https://") {
            expected.ok("Webhook URL", webhook_url);
        } else {
            expected.warn("Webhook URL", format!("{webhook_url} (HTTPS required)"));
        }
    } else {
        expected.fail("Webhook URL", "cannot be derived without NEXT_PUBLIC_APP_URL");
    }
    expected.line("Paddle Dashboard → Developer Tools → Notifications:");
    expected.line("  the destination URL must match exactly");
    expected.line("  the secret must match PADDLE_WEBHOOK_SECRET");
    expected.line("  the destination must be active");
    report.push(expected);

    report
}

/// `.env` prefix suggested for a product name
pub fn env_prefix_for(product_name: &str) -> Option<&'static str> {
    let name = product_name.to_lowercase();
    if name.contains("casual") {
        Some("PADDLE_CASUAL")
    } else if name.contains("gigachad") || name.contains("giga") {
        Some("PADDLE_GIGACHAD")
    } else {
        None
    }
}
