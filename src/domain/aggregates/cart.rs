//! Cart Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::value_objects::{Quantity, RecordStatus, UnknownStatus};
use crate::{EcommerceError, Result};

/// `Active` until an order placed from the cart succeeds; `Checkout` is terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartStatus {
    #[default]
    Active,
    Checkout,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Checkout => "checkout",
        }
    }
}

impl FromStr for CartStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "checkout" => Ok(Self::Checkout),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for CartStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Sum of item quantities
    pub total_amount: i32,
    /// Sum of item subtotals
    pub total_price: Decimal,
    pub cart_status: CartStatus,
    #[serde(skip)]
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Cart {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            total_amount: 0,
            total_price: Decimal::ZERO,
            cart_status: CartStatus::Active,
            status: RecordStatus::Active,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status.is_active() && self.cart_status == CartStatus::Active
    }

    /// Adds one freshly inserted item to the running totals.
    ///
    /// Fails with `InvalidQuantity` when the item count no longer fits.
    pub fn accumulate(&mut self, quantity: i32, subtotal: Decimal) -> Result<()> {
        let amount = self
            .total_amount
            .checked_add(quantity)
            .ok_or(EcommerceError::InvalidQuantity)?;
        let price = self
            .total_price
            .checked_add(subtotal)
            .ok_or(EcommerceError::InvalidQuantity)?;
        self.total_amount = amount;
        self.total_price = price;
        self.touch();
        Ok(())
    }

    /// Recomputes the totals from scratch over the active items.
    pub fn reconcile(&mut self, items: &[CartItem]) -> Result<()> {
        let mut amount: i32 = 0;
        let mut price = Decimal::ZERO;
        for item in items
            .iter()
            .filter(|i| i.cart_id == self.id && i.status.is_active())
        {
            amount = amount
                .checked_add(item.quantity)
                .ok_or(EcommerceError::InvalidQuantity)?;
            price = price
                .checked_add(item.subtotal)
                .ok_or(EcommerceError::InvalidQuantity)?;
        }
        self.total_amount = amount;
        self.total_price = price;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub subtotal: Decimal,
    #[serde(skip)]
    pub status: RecordStatus,
}

impl CartItem {
    pub fn new(cart_id: Uuid, product_id: Uuid, quantity: Quantity, subtotal: Decimal) -> Self {
        Self {
            id: Uuid::now_v7(),
            cart_id,
            product_id,
            quantity: quantity.value(),
            subtotal,
            status: RecordStatus::Active,
        }
    }
}

/// Variant option picked for a cart item, with the surcharge captured when it was picked
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartItemVariant {
    pub id: Uuid,
    pub cart_item_id: Uuid,
    pub variant_id: Uuid,
    pub option_id: Uuid,
    pub additional_price: Decimal,
    #[serde(skip)]
    pub status: RecordStatus,
}

impl CartItemVariant {
    pub fn new(
        cart_item_id: Uuid,
        variant_id: Uuid,
        option_id: Uuid,
        additional_price: Decimal,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            cart_item_id,
            variant_id,
            option_id,
            additional_price,
            status: RecordStatus::Active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(cart: &Cart, qty: i32, subtotal: i64) -> CartItem {
        CartItem::new(
            cart.id,
            Uuid::now_v7(),
            Quantity::requested(qty).unwrap(),
            Decimal::new(subtotal, 2),
        )
    }

    #[test]
    fn test_accumulate_then_reconcile() {
        let mut cart = Cart::new(Uuid::now_v7());
        let mut items = vec![
            item(&cart, 2, 2000),
            item(&cart, 1, 1500),
            item(&cart, 4, 400),
        ];
        for i in &items {
            cart.accumulate(i.quantity, i.subtotal).unwrap();
        }
        assert_eq!(
            (cart.total_amount, cart.total_price),
            (7, Decimal::new(3900, 2))
        );

        items[2].status = RecordStatus::Deleted;
        cart.reconcile(&items).unwrap();
        assert_eq!(
            (cart.total_amount, cart.total_price),
            (3, Decimal::new(3500, 2))
        );
    }

    #[test]
    fn test_accumulate_overflow_leaves_totals() {
        let mut cart = Cart::new(Uuid::now_v7());
        cart.accumulate(i32::MAX - 1, Decimal::ONE).unwrap();
        let err = cart.accumulate(5, Decimal::ONE).unwrap_err();
        assert!(matches!(err, EcommerceError::InvalidQuantity));
        assert_eq!(
            (cart.total_amount, cart.total_price),
            (i32::MAX - 1, Decimal::ONE)
        );
    }

    #[test]
    fn test_reconcile_overflow() {
        let mut cart = Cart::new(Uuid::now_v7());
        let mut items = vec![item(&cart, 1, 100), item(&cart, 1, 100)];
        items[0].quantity = i32::MAX;
        assert!(matches!(
            cart.reconcile(&items),
            Err(EcommerceError::InvalidQuantity)
        ));
    }

    #[test]
    fn test_checkout_closes_cart() {
        let mut cart = Cart::new(Uuid::now_v7());
        assert!(cart.is_open());
        cart.cart_status = CartStatus::Checkout;
        assert!(!cart.is_open());
        assert_eq!(
            "checkout".parse::<CartStatus>().unwrap(),
            CartStatus::Checkout
        );
    }
}
