//! Plans and Price IDs
//!
//! The plan set is closed and fixed at deploy time. Each plan maps to one
//! Paddle price, configured through environment variables.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, Result};

static PRICE_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^pri_[a-z0-9]{26}$").expect("price id pattern is a valid regex")
});

/// Subscription plan tiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Plan {
    Casual,
    Gigachad,
}

impl Plan {
    pub const ALL: [Self; 2] = [Self::Casual, Self::Gigachad];

    /// Wire identifier
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Casual => "CASUAL",
            Self::Gigachad => "GIGACHAD",
        }
    }

    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Casual => "Casual Learner",
            Self::Gigachad => "GigaChad Developer",
        }
    }

    /// Monthly list price in USD cents
    pub const fn list_price_cents(&self) -> i64 {
        match self {
            Self::Casual => 900,
            Self::Gigachad => 1900,
        }
    }

    /// Environment variable holding this plan's Paddle price ID
    pub const fn price_env_var(&self) -> &'static str {
        match self {
            Self::Casual => "PADDLE_CASUAL_PRICE_ID",
            Self::Gigachad => "PADDLE_GIGACHAD_PRICE_ID",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = PaymentError;

    /// Exact match on the wire identifier
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|plan| plan.as_str() == s)
            .ok_or_else(|| PaymentError::InvalidPlan(s.to_string()))
    }
}

/// Paddle price identifier (`pri_` + 26 lowercase alphanumerics)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PriceId(String);

impl PriceId {
    pub fn parse(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if Self::is_valid(&s) {
            Ok(Self(s))
        } else {
            Err(PaymentError::InvalidPriceId(s))
        }
    }

    /// Format check only; says nothing about whether the price exists
    pub fn is_valid(s: &str) -> bool {
        PRICE_ID_PATTERN.is_match(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PriceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PriceId {
    type Error = PaymentError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<PriceId> for String {
    fn from(value: PriceId) -> Self {
        value.0
    }
}

/// Plan to price mapping
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanCatalog {
    casual: PriceId,
    gigachad: PriceId,
}

impl PlanCatalog {
    pub const fn new(casual: PriceId, gigachad: PriceId) -> Self {
        Self { casual, gigachad }
    }

    /// Read both price IDs through `lookup`, validating their format
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |plan: Plan| -> Result<PriceId> {
            let var = plan.price_env_var();
            let raw = lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| PaymentError::Config(format!("{var} not set")))?;
            PriceId::parse(raw.trim())
                .map_err(|e| PaymentError::Config(format!("{var} is not properly configured: {e}")))
        };

        Ok(Self {
            casual: read(Plan::Casual)?,
            gigachad: read(Plan::Gigachad)?,
        })
    }

    pub const fn price_id(&self, plan: Plan) -> &PriceId {
        match plan {
            Plan::Casual => &self.casual,
            Plan::Gigachad => &self.gigachad,
        }
    }

    /// Reverse lookup used when webhooks report a price
    pub fn plan_for_price(&self, price_id: &str) -> Option<Plan> {
        Plan::ALL
            .into_iter()
            .find(|plan| self.price_id(*plan).as_str() == price_id)
    }
}
