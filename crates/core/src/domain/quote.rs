use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::client::ClientInfo;
use crate::errors::DomainError;
use crate::pricing::QuoteTotals;

/// One cart entry as submitted by the client. At least one of `sku`/`name`
/// must resolve against the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedItem {
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub qty: u32,
    pub days: u32,
}

impl RequestedItem {
    /// Identifier used in error reports when the item cannot be resolved.
    pub fn identifier(&self) -> String {
        self.sku
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.name.as_deref().filter(|s| !s.trim().is_empty()))
            .unwrap_or("?")
            .to_owned()
    }
}

/// Which line subtotals form the eligible base of the manual discount.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountApplyTo {
    #[default]
    Discountable,
    All,
}

/// Validated input to the pricing engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteInput {
    pub items: Vec<RequestedItem>,
    #[serde(default)]
    pub discount_rate: Decimal,
    #[serde(default)]
    pub discount_fixed: Decimal,
    #[serde(default)]
    pub discount_apply_to: DiscountApplyTo,
    #[serde(default)]
    pub delivery_fee: Decimal,
}

impl QuoteInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.items.is_empty() {
            return Err(DomainError::InvalidInput("items must not be empty".to_owned()));
        }
        for (index, item) in self.items.iter().enumerate() {
            let has_sku = item.sku.as_deref().is_some_and(|s| !s.trim().is_empty());
            let has_name = item.name.as_deref().is_some_and(|s| !s.trim().is_empty());
            if !has_sku && !has_name {
                return Err(DomainError::InvalidInput(format!(
                    "items[{index}] needs a sku or a name"
                )));
            }
            if item.qty == 0 {
                return Err(DomainError::InvalidInput(format!(
                    "items[{index}].qty must be a positive integer"
                )));
            }
            if item.days == 0 {
                return Err(DomainError::InvalidInput(format!(
                    "items[{index}].days must be a positive integer"
                )));
            }
        }
        if self.discount_rate < Decimal::ZERO || self.discount_rate > Decimal::ONE {
            return Err(DomainError::InvalidInput(
                "discount_rate must be a fraction between 0 and 1".to_owned(),
            ));
        }
        if self.discount_fixed < Decimal::ZERO {
            return Err(DomainError::InvalidInput("discount_fixed must not be negative".to_owned()));
        }
        if self.delivery_fee < Decimal::ZERO {
            return Err(DomainError::InvalidInput("delivery_fee must not be negative".to_owned()));
        }
        Ok(())
    }
}

/// A fully priced quote ready for persistence and rendering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub quote_id: String,
    pub client: ClientInfo,
    pub totals: QuoteTotals,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}
