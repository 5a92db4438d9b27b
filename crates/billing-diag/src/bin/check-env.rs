//! Print every billing variable, masking secrets and flagging bad values

use billing_diag::{env::env_report, process_env};

fn main() {
    billing_diag::init();

    let report = env_report(&process_env);
    tracing::debug!(
        failures = report.count(billing_diag::Status::Fail),
        "Environment check finished"
    );
    print!("{report}");
}
