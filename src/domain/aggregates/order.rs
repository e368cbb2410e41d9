//! Order Aggregate
//!
//! Orders are frozen copies of a cart: items and variant picks are copied, not
//! referenced, so later cart or catalog edits leave historical orders intact.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::aggregates::cart::{Cart, CartItem, CartItemVariant};
use crate::domain::value_objects::UnknownStatus;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Shipping {
    pub shipping_type: String,
    pub shipping_cost: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub cart_id: Uuid,
    pub address_id: Uuid,
    pub shipping_type: String,
    pub shipping_cost: Decimal,
    pub payment_method: String,
    pub total_amount: i32,
    pub total_price: Decimal,
    pub order_status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Prices the order from the cart totals plus shipping.
    pub fn from_cart(
        cart: &Cart,
        address_id: Uuid,
        shipping: Shipping,
        payment_method: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: cart.user_id,
            cart_id: cart.id,
            address_id,
            total_amount: cart.total_amount,
            total_price: cart.total_price + shipping.shipping_cost,
            shipping_type: shipping.shipping_type,
            shipping_cost: shipping.shipping_cost,
            payment_method: payment_method.into(),
            order_status: OrderStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub subtotal: Decimal,
    /// Source cart line
    pub cart_item_id: Uuid,
}

impl OrderItem {
    pub fn freeze(order_id: Uuid, item: &CartItem) -> Self {
        Self {
            id: Uuid::now_v7(),
            order_id,
            product_id: item.product_id,
            quantity: item.quantity,
            subtotal: item.subtotal,
            cart_item_id: item.id,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderItemVariant {
    pub id: Uuid,
    pub order_item_id: Uuid,
    pub variant_id: Uuid,
    pub option_id: Uuid,
    pub additional_price: Decimal,
}

impl OrderItemVariant {
    pub fn freeze(order_item_id: Uuid, picked: &CartItemVariant) -> Self {
        Self {
            id: Uuid::now_v7(),
            order_item_id,
            variant_id: picked.variant_id,
            option_id: picked.option_id,
            additional_price: picked.additional_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Quantity;

    #[test]
    fn test_order_totals_from_cart() {
        let mut cart = Cart::new(Uuid::now_v7());
        cart.accumulate(2, Decimal::new(2000, 2)).unwrap();
        cart.accumulate(1, Decimal::new(1500, 2)).unwrap();
        let shipping = Shipping {
            shipping_type: "regular".into(),
            shipping_cost: Decimal::new(500, 2),
        };
        let order = Order::from_cart(&cart, Uuid::now_v7(), shipping, "bank_transfer");
        assert_eq!(order.total_amount, 3);
        assert_eq!(order.total_price, Decimal::new(4000, 2));
        assert_eq!(order.order_status, OrderStatus::Pending);
    }

    #[test]
    fn test_freeze_copies_line() {
        let item = CartItem::new(
            Uuid::now_v7(),
            Uuid::now_v7(),
            Quantity::requested(2).unwrap(),
            Decimal::new(19000, 2),
        );
        let frozen = OrderItem::freeze(Uuid::now_v7(), &item);
        assert_eq!(
            (frozen.product_id, frozen.quantity, frozen.subtotal, frozen.cart_item_id),
            (item.product_id, 2, item.subtotal, item.id)
        );
    }
}
