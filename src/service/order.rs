//! Order materializer
//!
//! Placing an order happens in two phases. The order row is first written as
//! `pending` on its own, so a failed attempt leaves a record. The second phase
//! copies the cart lines into order lines, stamps the order `success` and
//! checks the cart out, all in one unit of work. When that fails nothing of it
//! persists, the order is stamped `failed` and the cart stays open for a retry.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{
    Address, AuthedUser, Order, OrderItem, OrderItemVariant, OrderStatus, Shipping,
};
use crate::domain::events::{CartEvent, DomainEvent, OrderEvent};
use crate::publisher::EventPublisher;
use crate::service::catalog::{CatalogService, ChosenOption, ProductView};
use crate::service::validate;
use crate::store::Store;
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct OrderCreateRequest {
    pub cart_id: Uuid,
    pub address_id: Uuid,
    #[validate(length(min = 1, max = 64))]
    pub shipping_type: String,
    pub shipping_cost: Decimal,
    #[validate(length(min = 1, max = 64))]
    pub payment_method: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderItemView {
    #[serde(flatten)]
    pub item: OrderItem,
    pub product: Option<ProductView>,
    pub variants: Vec<ChosenOption>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub address: Option<Address>,
    pub items: Vec<OrderItemView>,
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    catalog: CatalogService,
    publisher: Arc<dyn EventPublisher>,
}

impl OrderService {
    pub fn new(
        store: Arc<dyn Store>,
        catalog: CatalogService,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            catalog,
            publisher,
        }
    }

    pub async fn create_order(
        &self,
        user: &AuthedUser,
        request: OrderCreateRequest,
    ) -> Result<Order> {
        validate(&request)?;
        if request.shipping_cost < Decimal::ZERO {
            return Err(EcommerceError::Validation(
                "shipping_cost must not be negative".into(),
            ));
        }

        let cart = self
            .store
            .cart(request.cart_id)
            .await?
            .ok_or(EcommerceError::CartNotFound)?;
        if cart.user_id != user.id {
            return Err(EcommerceError::NotOwner("cart"));
        }
        if !cart.is_open() {
            return Err(EcommerceError::CartCheckedOut);
        }
        let address = self
            .store
            .address(request.address_id)
            .await?
            .filter(|a| a.is_usable_by(user.id))
            .ok_or(EcommerceError::AddressNotFound)?;
        if self.store.cart_items(cart.id).await?.is_empty() {
            return Err(EcommerceError::EmptyCart);
        }

        let shipping = Shipping {
            shipping_type: request.shipping_type,
            shipping_cost: request.shipping_cost,
        };
        let mut order = Order::from_cart(&cart, address.id, shipping, request.payment_method);
        self.store.insert_order(&order).await?;
        tracing::info!(
            order_id = %order.id,
            cart_id = %cart.id,
            user_id = %user.id,
            "Order pending"
        );

        match self.materialize(&order).await {
            Ok(lines) => {
                order.order_status = OrderStatus::Success;
                tracing::info!(
                    order_id = %order.id,
                    lines,
                    total_price = %order.total_price,
                    "Order placed"
                );
                self.publisher
                    .publish(DomainEvent::Order(OrderEvent::Placed {
                        order_id: order.id,
                        user_id: order.user_id,
                        cart_id: order.cart_id,
                        total_amount: order.total_amount,
                        total_price: order.total_price,
                    }))
                    .await;
                self.publisher
                    .publish(DomainEvent::Cart(CartEvent::CheckedOut {
                        cart_id: order.cart_id,
                        order_id: order.id,
                    }))
                    .await;
                Ok(order)
            }
            Err(e) => {
                tracing::error!(order_id = %order.id, error = %e, "Order materialization failed");
                if let Err(stamp) = self
                    .store
                    .set_order_status(order.id, OrderStatus::Failed)
                    .await
                {
                    tracing::error!(
                        order_id = %order.id,
                        error = %stamp,
                        "Failed to stamp order as failed"
                    );
                }
                let reason = e.to_string();
                self.publisher
                    .publish(DomainEvent::Order(OrderEvent::Failed {
                        order_id: order.id,
                        user_id: order.user_id,
                        cart_id: order.cart_id,
                        reason: reason.clone(),
                    }))
                    .await;
                Err(EcommerceError::OrderFailed {
                    order_id: order.id,
                    reason,
                })
            }
        }
    }

    // The unit of work is dropped, and so rolled back, on every early return.
    async fn materialize(&self, order: &Order) -> Result<usize> {
        let mut uow = self.store.begin().await?;
        let cart = uow
            .cart_by_id(order.cart_id)
            .await?
            .ok_or(EcommerceError::CartNotFound)?;
        if !cart.is_open() {
            return Err(EcommerceError::CartCheckedOut);
        }
        if cart.total_amount != order.total_amount
            || cart.total_price + order.shipping_cost != order.total_price
        {
            return Err(EcommerceError::Storage(
                "cart changed while the order was being placed".into(),
            ));
        }
        let items = uow.cart_items(cart.id).await?;
        if items.is_empty() {
            return Err(EcommerceError::EmptyCart);
        }

        for item in &items {
            let frozen = OrderItem::freeze(order.id, item);
            uow.insert_order_item(&frozen).await?;
            for picked in uow.cart_item_variants(item.id).await? {
                uow.insert_order_item_variant(&OrderItemVariant::freeze(frozen.id, &picked))
                    .await?;
            }
        }
        uow.set_order_status(order.id, OrderStatus::Success).await?;
        if !uow.checkout_cart(cart.id).await? {
            return Err(EcommerceError::CartCheckedOut);
        }
        uow.commit().await?;
        Ok(items.len())
    }

    pub async fn order_by_id(&self, user: &AuthedUser, order_id: Uuid) -> Result<OrderView> {
        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or(EcommerceError::OrderNotFound)?;
        if order.user_id != user.id {
            return Err(EcommerceError::NotOwner("order"));
        }
        self.hydrate(order).await
    }

    pub async fn orders_by_user(&self, user: &AuthedUser) -> Result<Vec<OrderView>> {
        let mut views = Vec::new();
        for order in self.store.orders_by_user(user.id).await? {
            views.push(self.hydrate(order).await?);
        }
        Ok(views)
    }

    // Products retired after the order was placed still show in its history.
    async fn hydrate(&self, order: Order) -> Result<OrderView> {
        let address = self.store.address(order.address_id).await?;
        let mut items = Vec::new();
        for item in self.store.order_items(order.id).await? {
            let product = self
                .store
                .product_including_deleted(item.product_id)
                .await?
                .map(ProductView::from);
            let mut variants = Vec::new();
            for picked in self.store.order_item_variants(item.id).await? {
                let chosen = self
                    .catalog
                    .chosen_option(picked.variant_id, picked.option_id, picked.additional_price)
                    .await?;
                variants.push(chosen);
            }
            items.push(OrderItemView {
                item,
                product,
                variants,
            });
        }
        Ok(OrderView {
            order,
            address,
            items,
        })
    }
}
