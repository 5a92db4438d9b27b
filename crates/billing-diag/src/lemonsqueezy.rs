//! LemonSqueezy Reports

use billing_payments::{Store, WebhookRegistration};

use crate::report::{Report, Section};

fn webhook_lines(section: &mut Section, hook: &WebhookRegistration) {
    section.line(format!("ID: {}", hook.id));
    section.line(format!("URL: {}", hook.url));
    section.line(format!(
        "Store ID: {}",
        hook.store_id.map_or_else(|| "-".to_string(), |id| id.to_string())
    ));
    section.line(format!("Events: {}", hook.events.join(", ")));
    section.line(format!("Test Mode: {}", hook.test_mode));
    section.line(format!("Created: {}", hook.created_at.as_deref().unwrap_or("-")));
    section.line(format!("Last Sent: {}", hook.last_sent_at.as_deref().unwrap_or("Never")));
}

pub fn webhooks_report(hooks: &[WebhookRegistration]) -> Report {
    let mut report = Report::new("Checking LemonSqueezy webhooks...");

    if hooks.is_empty() {
        let mut section = Section::new("Webhooks");
        section.warn("No webhooks registered", "");
        report.push(section);
        return report;
    }

    for (index, hook) in hooks.iter().enumerate() {
        let mut section = Section::new(format!("Webhook #{}", index + 1));
        webhook_lines(&mut section, hook);
        report.push(section);
    }
    report
}

pub fn created_webhook_report(hook: &WebhookRegistration) -> Report {
    let mut report = Report::new("Creating LemonSqueezy webhook...");
    let mut section = Section::new("Created Webhook");
    section.ok("Webhook created successfully", "");
    webhook_lines(&mut section, hook);
    report.push(section);
    report
}

pub fn stores_report(stores: &[Store]) -> Report {
    let mut report = Report::new("Fetching LemonSqueezy stores...");

    if stores.is_empty() {
        let mut section = Section::new("Stores");
        section.warn("No stores found", "");
        report.push(section);
        return report;
    }

    for store in stores {
        let mut section = Section::new(format!("Store {}", store.id));
        section.line(format!("Store ID: {}", store.id));
        section.line(format!("Store Name: {}", store.name));
        section.line(format!("Store Slug: {}", store.slug));
        section.line(format!("Store URL: {}", store.url));
        report.push(section);
    }
    report
}
