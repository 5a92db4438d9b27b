//! # billing-diag
//!
//! Zero-argument diagnostics for a billing deployment. Each binary under
//! `src/bin` loads `.env.local` and `.env`, builds a [`Report`], prints it and
//! exits non-zero only when a vendor call failed.
//!
//! | Binary                 | Checks                                         |
//! |------------------------|------------------------------------------------|
//! | `check-env`            | every variable, secrets masked                 |
//! | `check-paddle`         | Paddle variables, API access, price lookups    |
//! | `check-webhook-config` | expected Paddle webhook URL and secret         |
//! | `list-paddle-products` | products, prices and a `.env` snippet          |
//! | `list-webhooks`        | LemonSqueezy webhook registrations             |
//! | `create-webhook`       | registers the LemonSqueezy webhook             |
//! | `list-stores`          | LemonSqueezy stores                            |

pub mod env;
pub mod lemonsqueezy;
pub mod paddle;
pub mod report;

pub use report::{Report, Section, Status};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Load `.env.local` then `.env`, and log warnings to stderr
///
/// `RUST_LOG` overrides the level.
pub fn init() {
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Process environment as a lookup function
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
