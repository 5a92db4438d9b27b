//! Paddle Configuration

use std::fmt;

use crate::error::{PaymentError, Result};
use crate::plan::PlanCatalog;

/// Paddle API environment
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PaddleEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl PaddleEnvironment {
    /// Recognised names, case-insensitive: `sandbox` or `production`
    pub fn from_name(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("production") {
            Some(Self::Production)
        } else if value.eq_ignore_ascii_case("sandbox") {
            Some(Self::Sandbox)
        } else {
            None
        }
    }

    /// Unset or unrecognised values select the sandbox
    pub fn parse(value: Option<&str>) -> Self {
        value.and_then(Self::from_name).unwrap_or_default()
    }

    pub const fn base_url(&self) -> &'static str {
        match self {
            Self::Sandbox => "https://sandbox-api.paddle.com",
            Self::Production => "https://api.paddle.com",
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for PaddleEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Placeholder value shipped in example env files
const API_KEY_PLACEHOLDER: &str = "your_paddle_api_key_here";

/// What is needed to make authenticated API calls
#[derive(Clone)]
pub struct PaddleConnection {
    pub api_key: String,
    pub environment: PaddleEnvironment,

    /// API root; derived from `environment` unless overridden
    pub base_url: String,
}

impl PaddleConnection {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Only `PADDLE_API_KEY` is required; `PADDLE_ENVIRONMENT` picks the host
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("PADDLE_API_KEY")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| PaymentError::Config("PADDLE_API_KEY not set".into()))?;
        if api_key == API_KEY_PLACEHOLDER {
            return Err(PaymentError::Config(
                "PADDLE_API_KEY is not properly configured".into(),
            ));
        }

        let environment = PaddleEnvironment::parse(lookup("PADDLE_ENVIRONMENT").as_deref());

        Ok(Self {
            api_key,
            environment,
            base_url: environment.base_url().to_string(),
        })
    }

    /// Point the client at another API root (used against local stubs)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl fmt::Debug for PaddleConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaddleConnection")
            .field("api_key", &"<redacted>")
            .field("environment", &self.environment)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Everything needed to take payments through Paddle
#[derive(Clone)]
pub struct PaddleConfig {
    pub connection: PaddleConnection,
    pub webhook_secret: String,
    pub vendor_id: String,
    pub catalog: PlanCatalog,
}

impl PaddleConfig {
    /// Variables that must be present for payments to be enabled
    pub const REQUIRED_VARS: [&'static str; 5] = [
        "PADDLE_API_KEY",
        "PADDLE_WEBHOOK_SECRET",
        "PADDLE_VENDOR_ID",
        "PADDLE_CASUAL_PRICE_ID",
        "PADDLE_GIGACHAD_PRICE_ID",
    ];

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let missing: Vec<&str> = Self::REQUIRED_VARS
            .iter()
            .copied()
            .filter(|var| lookup(var).is_none_or(|v| v.trim().is_empty()))
            .collect();
        if !missing.is_empty() {
            return Err(PaymentError::Config(format!(
                "Missing required Paddle environment variables: {}",
                missing.join(", ")
            )));
        }

        let get = |var: &str| lookup(var).unwrap_or_default().trim().to_string();

        Ok(Self {
            connection: PaddleConnection::from_lookup(&lookup)?,
            webhook_secret: get("PADDLE_WEBHOOK_SECRET"),
            vendor_id: get("PADDLE_VENDOR_ID"),
            catalog: PlanCatalog::from_lookup(&lookup)?,
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.connection = self.connection.with_base_url(base_url);
        self
    }
}

impl fmt::Debug for PaddleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaddleConfig")
            .field("connection", &self.connection)
            .field("webhook_secret", &"<redacted>")
            .field("vendor_id", &self.vendor_id)
            .field("catalog", &self.catalog)
            .finish()
    }
}
