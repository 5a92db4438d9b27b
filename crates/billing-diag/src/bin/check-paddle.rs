//! Check Paddle variables, API access and each configured price

use billing_diag::{Report, Section, env::paddle_section, paddle::api_sections, process_env};
use billing_payments::PaddleClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    billing_diag::init();

    let mut report = Report::new("Checking Paddle Configuration...");
    report.push(paddle_section(&process_env));

    match PaddleClient::from_env() {
        Ok(client) => api_sections(&client, &mut report).await,
        Err(e) => {
            let mut section = Section::new("Paddle API Access");
            section.fail("Skipped", e.to_string());
            report.push(section);
            report.mark_api_failure();
        }
    }

    print!("{report}");

    if report.api_failed() {
        anyhow::bail!("Paddle API check failed");
    }
    Ok(())
}
