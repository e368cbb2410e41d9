//! Line-item pricing
//!
//! Prices are `Decimal` amounts rounded to cents, half away from zero.
//! Percentages are not range-checked here; catalog rows are constrained to
//! [0, 100] by the schema.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// How a weekly promo percentage is applied to an already discounted total.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromoFormula {
    /// `total -= total * (100 - promo) / 100`: removes the complement of the
    /// promo percentage. A 20% promo keeps 20% of the total.
    #[default]
    Literal,
    /// `total *= (100 - promo) / 100`, the same way the product discount works.
    Multiplicative,
}

impl PromoFormula {
    pub fn apply(self, total: Decimal, promo_pct: Decimal) -> Decimal {
        match self {
            Self::Literal => total - total * remaining_share(promo_pct),
            Self::Multiplicative => total * remaining_share(promo_pct),
        }
    }
}

impl FromStr for PromoFormula {
    type Err = UnknownFormula;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "literal" => Ok(Self::Literal),
            "multiplicative" => Ok(Self::Multiplicative),
            _ => Err(UnknownFormula(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown promo formula `{0}` (expected literal or multiplicative)")]
pub struct UnknownFormula(pub String);

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn remaining_share(pct: Decimal) -> Decimal {
    (Decimal::ONE_HUNDRED - pct) / Decimal::ONE_HUNDRED
}

/// Price after the product-level discount only.
pub fn discounted_price(price: Decimal, discount_pct: Decimal) -> Decimal {
    round_money(price * remaining_share(discount_pct))
}

/// Subtotal of one line: `(base + additional) * (100 - discount)/100 * quantity`,
/// then the promo per `formula`, rounded to cents.
///
/// A quantity of zero counts as one. A promo of `None` or zero percent leaves
/// the total untouched.
pub fn compute_subtotal(
    base_price: Decimal,
    additional_price: Decimal,
    discount_pct: Decimal,
    promo_pct: Option<Decimal>,
    quantity: i32,
    formula: PromoFormula,
) -> Decimal {
    let quantity = if quantity == 0 { 1 } else { quantity };
    let mut total =
        (base_price + additional_price) * remaining_share(discount_pct) * Decimal::from(quantity);
    if let Some(promo) = promo_pct.filter(|p| !p.is_zero()) {
        total = formula.apply(total, promo);
    }
    round_money(total)
}
