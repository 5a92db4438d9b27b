//! Paddle Catalog Reads
//!
//! Read-only endpoints used by the diagnostic tools: products, prices and an
//! access probe.

use serde::{Deserialize, Serialize};

use crate::checkout::{Envelope, PaddleApi, vendor_error};
use crate::error::Result;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Money {
    /// Minor units, as a decimal string
    pub amount: String,
    pub currency_code: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BillingCycle {
    pub interval: String,
    pub frequency: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Price {
    pub id: String,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: String,
    pub unit_price: Money,
    #[serde(default)]
    pub billing_cycle: Option<BillingCycle>,
}

impl Price {
    /// `month`, `year`... or `one-time` when there is no cycle
    pub fn interval_label(&self) -> &str {
        self.billing_cycle
            .as_ref()
            .map_or("one-time", |c| c.interval.as_str())
    }
}

/// Outcome of an authenticated request whose body we don't care about
#[derive(Clone, Debug)]
pub struct ApiProbe {
    pub status: u16,
    pub detail: Option<String>,
}

impl ApiProbe {
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    pub const fn is_forbidden(&self) -> bool {
        self.status == 403
    }
}

impl PaddleApi {
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        let response = self.get("/products").send().await?;
        if !response.status().is_success() {
            return Err(vendor_error(response, "Failed to list products").await);
        }
        let envelope: Envelope<Vec<Product>> = response.json().await?;
        Ok(envelope.data)
    }

    pub async fn list_prices(&self, product_id: &str) -> Result<Vec<Price>> {
        let response = self
            .get("/prices")
            .query(&[("product_id", product_id)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(vendor_error(response, "Failed to list prices").await);
        }
        let envelope: Envelope<Vec<Price>> = response.json().await?;
        Ok(envelope.data)
    }

    pub async fn get_price(&self, price_id: &str) -> Result<Price> {
        let response = self.get(&format!("/prices/{price_id}")).send().await?;
        if !response.status().is_success() {
            return Err(vendor_error(response, "Price not accessible").await);
        }
        let envelope: Envelope<Price> = response.json().await?;
        Ok(envelope.data)
    }

    /// `GET /transactions`; only the status matters
    pub async fn probe_transactions(&self) -> Result<ApiProbe> {
        let response = self.get("/transactions").send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(ApiProbe {
                status: status.as_u16(),
                detail: None,
            });
        }
        let detail = match vendor_error(response, "Unknown error").await {
            crate::PaymentError::Vendor { message, .. } => Some(message),
            other => Some(other.to_string()),
        };
        Ok(ApiProbe {
            status: status.as_u16(),
            detail,
        })
    }
}
