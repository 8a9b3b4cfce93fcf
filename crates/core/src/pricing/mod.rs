pub mod exclusion;
pub mod extra;
pub mod tiers;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::domain::quote::{DiscountApplyTo, QuoteInput};
use crate::errors::DomainError;

use self::exclusion::ExclusionReason;
use self::extra::extra_discount;
use self::tiers::day_discount_rate;

/// Process-wide pricing constants, injected at startup and constant for the
/// process lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSettings {
    pub iva_rate: Decimal,
    pub default_deposit_rate: Decimal,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self { iva_rate: Decimal::new(16, 2), default_deposit_rate: Decimal::ZERO }
    }
}

/// One priced catalog item within a quote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub sku: String,
    pub name: String,
    pub category: String,
    pub daily_price: Decimal,
    pub deposit_rate: Decimal,
    pub discountable: bool,
    pub qty: u32,
    pub days: u32,
    pub subtotal: Decimal,
    pub deposit: Decimal,
    pub excluded: bool,
    pub exclusion: ExclusionReason,
    pub auto_rate: Decimal,
    pub auto_discount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountBreakdown {
    pub auto_discount_total: Decimal,
    pub extra_discount: Decimal,
    pub discount_rate: Decimal,
    pub discount_apply_to: DiscountApplyTo,
}

/// Output contract consumed by the PDF, persistence and email collaborators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub lines: Vec<PricedLine>,
    pub merchandise: Decimal,
    pub discount: Decimal,
    pub discount_breakdown: DiscountBreakdown,
    pub delivery_fee: Decimal,
    pub subtotal: Decimal,
    pub iva: Decimal,
    pub total: Decimal,
    pub deposit_total: Decimal,
    pub iva_rate: Decimal,
}

pub trait PricingEngine: Send + Sync {
    fn price(&self, catalog: &Catalog, input: &QuoteInput) -> Result<QuoteTotals, DomainError>;
}

#[derive(Clone, Debug, Default)]
pub struct DeterministicPricingEngine {
    settings: PricingSettings,
}

impl DeterministicPricingEngine {
    pub fn new(settings: PricingSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> PricingSettings {
        self.settings
    }
}

impl PricingEngine for DeterministicPricingEngine {
    fn price(&self, catalog: &Catalog, input: &QuoteInput) -> Result<QuoteTotals, DomainError> {
        price_quote(catalog, input, self.settings)
    }
}

/// Resolves every requested item against the catalog and computes the full
/// totals. Fail-fast: a single unresolved sku/name rejects the whole request
/// with the complete list of unresolved identifiers.
pub fn price_quote(
    catalog: &Catalog,
    input: &QuoteInput,
    settings: PricingSettings,
) -> Result<QuoteTotals, DomainError> {
    input.validate()?;

    let mut missing = Vec::new();
    let mut lines = Vec::with_capacity(input.items.len());
    for item in &input.items {
        match catalog.resolve(item.sku.as_deref(), item.name.as_deref()) {
            Some(product) => {
                lines.push(price_line(
                    product.sku.clone(),
                    product.name.clone(),
                    product.category.clone(),
                    product.daily_price,
                    if product.deposit_rate.is_zero() && settings.default_deposit_rate > Decimal::ZERO
                    {
                        settings.default_deposit_rate
                    } else {
                        product.deposit_rate
                    },
                    product.discountable,
                    item.qty,
                    item.days,
                ));
            }
            None => missing.push(item.identifier()),
        }
    }
    if !missing.is_empty() {
        return Err(DomainError::UnresolvedItems { missing });
    }

    Ok(aggregate(
        lines,
        input.discount_rate,
        input.discount_fixed,
        input.discount_apply_to,
        input.delivery_fee,
        settings.iva_rate,
    ))
}

#[allow(clippy::too_many_arguments)]
fn price_line(
    sku: String,
    name: String,
    category: String,
    daily_price: Decimal,
    deposit_rate: Decimal,
    discountable: bool,
    qty: u32,
    days: u32,
) -> PricedLine {
    let subtotal = daily_price * Decimal::from(qty) * Decimal::from(days);
    let deposit = deposit_rate * subtotal;
    let exclusion = exclusion::classify(&category, &name, discountable);
    let auto_rate = if exclusion.is_excluded() { Decimal::ZERO } else { day_discount_rate(days) };
    let auto_discount = subtotal * auto_rate;

    PricedLine {
        sku,
        name,
        category,
        daily_price,
        deposit_rate,
        discountable,
        qty,
        days,
        subtotal,
        deposit,
        excluded: exclusion.is_excluded(),
        exclusion,
        auto_rate,
        auto_discount,
    }
}

/// Composes the two discount layers. Both are computed against gross line
/// subtotals and summed, never compounded multiplicatively.
fn aggregate(
    lines: Vec<PricedLine>,
    discount_rate: Decimal,
    discount_fixed: Decimal,
    discount_apply_to: DiscountApplyTo,
    delivery_fee: Decimal,
    iva_rate: Decimal,
) -> QuoteTotals {
    let merchandise: Decimal = lines.iter().map(|line| line.subtotal).sum();
    let auto_discount_total: Decimal = lines.iter().map(|line| line.auto_discount).sum();
    let deposit_total: Decimal = lines.iter().map(|line| line.deposit).sum();

    let eligible_base = match discount_apply_to {
        DiscountApplyTo::All => merchandise,
        DiscountApplyTo::Discountable => {
            lines.iter().filter(|line| !line.excluded).map(|line| line.subtotal).sum()
        }
    };
    let extra = extra_discount(eligible_base, discount_rate, discount_fixed);

    let discount = auto_discount_total + extra.total();
    let subtotal = merchandise - discount + delivery_fee;
    let iva = subtotal * iva_rate;
    let total = subtotal + iva;

    QuoteTotals {
        lines,
        merchandise,
        discount,
        discount_breakdown: DiscountBreakdown {
            auto_discount_total,
            extra_discount: extra.total(),
            discount_rate,
            discount_apply_to,
        },
        delivery_fee,
        subtotal,
        iva,
        total,
        deposit_total,
        iva_rate,
    }
}
