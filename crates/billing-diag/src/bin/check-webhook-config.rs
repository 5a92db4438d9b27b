//! Show the Paddle webhook URL this deployment expects

use billing_diag::{env::webhook_config_report, process_env};

fn main() {
    billing_diag::init();
    print!("{}", webhook_config_report(&process_env));
}
