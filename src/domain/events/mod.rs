//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEvent {
    Order(OrderEvent),
    Cart(CartEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed {
        order_id: Uuid,
        user_id: Uuid,
        cart_id: Uuid,
        total_amount: i32,
        total_price: Decimal,
    },
    Failed {
        order_id: Uuid,
        user_id: Uuid,
        cart_id: Uuid,
        reason: String,
    },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartEvent {
    CheckedOut {
        cart_id: Uuid,
        order_id: Uuid,
    },
}

impl DomainEvent {
    /// NATS subject the event is published on
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Order(OrderEvent::Placed { .. }) => "storefront.order.placed",
            Self::Order(OrderEvent::Failed { .. }) => "storefront.order.failed",
            Self::Cart(CartEvent::CheckedOut { .. }) => "storefront.cart.checked_out",
        }
    }
}
