use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Catalog entry for a rentable item. `deposit_rate` is a fraction of the
/// line subtotal carried for deposit reporting; it never enters the totals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub sku: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    pub daily_price: Decimal,
    #[serde(default)]
    pub deposit_rate: Decimal,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_true")]
    pub discountable: bool,
}

fn default_true() -> bool {
    true
}
